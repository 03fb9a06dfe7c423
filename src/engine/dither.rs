//! Floyd–Steinberg error diffusion over a full canvas, per color channel.

use crate::types::Canvas;

/// Quantization step at full intensity.
const STEP: f64 = 48.0;

/// Neighbor offsets and their share of the error. Weights sum to one.
const DIFFUSION: [(i64, i64, f64); 4] = [
    (1, 0, 7.0 / 16.0),
    (-1, 1, 3.0 / 16.0),
    (0, 1, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

/// Dither `canvas` in place. An intensity of zero leaves it untouched.
///
/// Pixels with alpha below 128 are skipped and never receive error.
pub fn dither(canvas: &mut Canvas, intensity: f64) {
    if intensity <= 0.0 {
        return;
    }
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            diffuse_from(canvas, x, y, intensity);
        }
    }
}

fn clamp(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Quantize pixel `(x, y)` and push its error onto opaque neighbors.
fn diffuse_from(canvas: &mut Canvas, x: u32, y: u32, intensity: f64) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let stride = canvas.stride();
    let o = canvas.offset(x, y);
    let px = canvas.pixels_mut();

    if px[o + 3] < 128 {
        return;
    }

    let step = STEP * intensity;
    let mut error = [0.0; 3];
    for c in 0..3 {
        let old = px[o + c] as f64;
        let new = (old / step + 0.5).floor() * step;
        px[o + c] = clamp(new);
        error[c] = (old - new) * intensity;
    }

    for (dx, dy, weight) in DIFFUSION {
        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
        if nx < 0 || ny < 0 || nx >= w || ny >= h {
            continue;
        }
        let n = ny as usize * stride + nx as usize * 4;
        if px[n + 3] <= 128 {
            continue;
        }
        for c in 0..3 {
            // Truncate the share, not the sum, so no neighbor gets more than its weight.
            px[n + c] = clamp(px[n + c] as f64 + (error[c] * weight).trunc());
        }
    }
}
