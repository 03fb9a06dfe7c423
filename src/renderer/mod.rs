//! Renderer — the glyph rasterizer.
//!
//! Takes full-canvas bitmaps (in-memory, from the engine) and produces
//! terminal text, one half-block glyph per pair of vertically stacked pixels.
//!
//! The renderer is pure and stateless. Given the same input, it always
//! produces the same output. It knows nothing about time, playback, or the
//! terminal it will end up on.

pub mod pipeline;
pub mod pool;

use std::io;

use crossterm::{queue, style};

use crate::types::{Canvas, RenderConfig};

pub const UPPER_HALF_BLOCK: char = '\u{2580}';
pub const LOWER_HALF_BLOCK: char = '\u{2584}';
pub const FULL_BLOCK: char = '\u{2588}';

/// Monochrome cells light up above this luminance (times the multiplier).
const MONO_THRESHOLD: f64 = 100.0;

pub struct Renderer;

impl Renderer {
    /// Render `canvas` into `config.height` rows of `config.width` glyphs,
    /// appending to `out`. Rows are separated by `\n`; the last row has no
    /// trailing newline.
    ///
    /// Sampling is nearest-neighbor: each glyph looks at one source pixel
    /// for its top half and one for its bottom half.
    pub fn render(canvas: &Canvas, config: &RenderConfig, out: &mut Vec<u8>) -> io::Result<()> {
        let (src_w, src_h) = (canvas.width(), canvas.height());
        let scale_x = src_w as f64 / config.width as f64;
        let scale_y = src_h as f64 / (config.height as f64 * 2.0);

        let sample = |x: u32, y: u32| {
            if x < src_w && y < src_h {
                canvas.pixel(x, y)
            } else {
                [0; 4]
            }
        };

        for y in 0..config.height as u32 {
            let py_top = (f64::from(y * 2) * scale_y) as u32;
            let py_bottom = (f64::from(y * 2 + 1) * scale_y) as u32;
            for x in 0..config.width as u32 {
                let px = (f64::from(x) * scale_x) as u32;
                let top = sample(px, py_top);
                let bottom = sample(px, py_bottom);
                if config.color {
                    Self::color_glyph(out, top, bottom)?;
                } else {
                    Self::mono_glyph(out, top, bottom, config.multiplier)?;
                }
            }
            if y + 1 < config.height as u32 {
                out.push(b'\n');
            }
        }
        Ok(())
    }

    fn color_glyph(out: &mut Vec<u8>, top: [u8; 4], bottom: [u8; 4]) -> io::Result<()> {
        match (top[3] > 0, bottom[3] > 0) {
            (false, false) => queue!(out, style::ResetColor, style::Print(' ')),
            (true, false) => queue!(
                out,
                style::SetForegroundColor(rgb(top)),
                style::SetBackgroundColor(style::Color::Reset),
                style::Print(UPPER_HALF_BLOCK),
            ),
            (false, true) => queue!(
                out,
                style::SetForegroundColor(rgb(bottom)),
                style::SetBackgroundColor(style::Color::Reset),
                style::Print(LOWER_HALF_BLOCK),
            ),
            (true, true) => queue!(
                out,
                style::SetForegroundColor(rgb(top)),
                style::SetBackgroundColor(rgb(bottom)),
                style::Print(UPPER_HALF_BLOCK),
            ),
        }
    }

    fn mono_glyph(
        out: &mut Vec<u8>,
        top: [u8; 4],
        bottom: [u8; 4],
        multiplier: f64,
    ) -> io::Result<()> {
        let threshold = MONO_THRESHOLD * multiplier;
        let lit = |p: [u8; 4]| p[3] > 0 && luminance(p) > threshold;
        let glyph = match (lit(top), lit(bottom)) {
            (true, true) => FULL_BLOCK,
            (true, false) => UPPER_HALF_BLOCK,
            (false, true) => LOWER_HALF_BLOCK,
            (false, false) => ' ',
        };
        queue!(out, style::Print(glyph))
    }
}

fn luminance(p: [u8; 4]) -> f64 {
    0.21 * p[0] as f64 + 0.72 * p[1] as f64 + 0.07 * p[2] as f64
}

fn rgb(p: [u8; 4]) -> style::Color {
    style::Color::Rgb {
        r: p[0],
        g: p[1],
        b: p[2],
    }
}
