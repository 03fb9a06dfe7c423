//! Shared boundary types for the brrtfetch rendering pipeline.
//!
//! This module defines the data contracts between stages:
//! - Engine → Renderer (in-memory): `Canvas` bitmaps, one per GIF frame
//! - Renderer → Player / cache (serialized): `RenderedFrame`s

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Render configuration
// ---------------------------------------------------------------------------

/// Everything that determines the rendered output for a given source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Target glyph-grid width in columns.
    pub width: u16,
    /// Target glyph-grid height in rows. Each row covers two pixel rows.
    pub height: u16,
    pub fps: u32,
    pub color: bool,
    /// Error-diffusion strength in `[0, 1]`; zero disables dithering.
    pub dither: f64,
    /// Brightness multiplier applied to the monochrome threshold.
    pub multiplier: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 2,
            height: 1,
            fps: 20,
            color: true,
            dither: 0.0,
            multiplier: 1.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A rectangle in canvas pixel coordinates. May extend past the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Bounds { left, top, width, height }
    }

    /// Clip to a `width` × `height` canvas, returning `(x0, y0, x1, y1)`
    /// with exclusive upper bounds.
    pub fn clip(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let x0 = self.left.min(width);
        let y0 = self.top.min(height);
        let x1 = self.left.saturating_add(self.width).min(width);
        let y1 = self.top.saturating_add(self.height).min(height);
        (x0, y0, x1, y1)
    }
}

// ---------------------------------------------------------------------------
// Canvas bitmap
// ---------------------------------------------------------------------------

/// A full-resolution, non-premultiplied RGBA bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// A fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Canvas {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Byte offset of pixel `(x, y)`.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride() + x as usize * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let o = self.offset(x, y);
        [
            self.pixels[o],
            self.pixels[o + 1],
            self.pixels[o + 2],
            self.pixels[o + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let o = self.offset(x, y);
        self.pixels[o..o + 4].copy_from_slice(&rgba);
    }

    /// Overwrite this canvas with `other`. Both must share dimensions.
    pub fn copy_from(&mut self, other: &Canvas) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.pixels.copy_from_slice(&other.pixels);
    }

    /// Set every pixel inside `bounds` (clipped) to transparent black.
    pub fn clear(&mut self, bounds: Bounds) {
        let (x0, y0, x1, y1) = bounds.clip(self.width, self.height);
        if x0 >= x1 {
            return;
        }
        for y in y0..y1 {
            let start = self.offset(x0, y);
            let end = self.offset(x1, y);
            self.pixels[start..end].fill(0);
        }
    }

    /// Source-over composite an RGBA `source` covering `bounds` onto this
    /// canvas. Pixels falling outside the canvas are dropped.
    pub fn draw_over(&mut self, bounds: Bounds, source: &[u8]) {
        let (x0, y0, x1, y1) = bounds.clip(self.width, self.height);
        let src_stride = bounds.width as usize * 4;
        for y in y0..y1 {
            for x in x0..x1 {
                let s = (y - bounds.top) as usize * src_stride + (x - bounds.left) as usize * 4;
                let Some(src) = source.get(s..s + 4) else {
                    continue;
                };
                let d = self.offset(x, y);
                blend_over(&mut self.pixels[d..d + 4], src);
            }
        }
    }
}

/// Straight-alpha source-over blend of `src` onto `dst`.
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let sa = src[3] as u32;
    match sa {
        0 => {}
        255 => dst.copy_from_slice(src),
        _ => {
            let da = dst[3] as u32;
            // Destination contribution scaled by (1 - sa), in 0..=255*255.
            let dw = da * (255 - sa);
            let out_a = sa * 255 + dw;
            for c in 0..3 {
                let v = (src[c] as u32 * sa * 255 + dst[c] as u32 * dw) / out_a;
                dst[c] = v as u8;
            }
            dst[3] = ((out_a + 127) / 255) as u8;
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer → Player boundary (serialized to the frame cache)
// ---------------------------------------------------------------------------

/// One fully rendered terminal frame: glyph rows separated by `\n`, with no
/// trailing newline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedFrame(pub Vec<u8>);

impl RenderedFrame {
    /// Iterate over the glyph rows.
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.0.split(|&b| b == b'\n')
    }
}
