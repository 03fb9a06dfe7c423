//! Target grid sizing.
//!
//! Turns the requested width/height/scale and the current terminal size into
//! the glyph grid the GIF is rendered at. Never fails: every path ends in at
//! least a 2×1 grid.

use crossterm::terminal;
use tracing::debug;

use crate::types::RenderConfig;

/// Used when the terminal cannot be measured.
pub const FALLBACK_TERMINAL: (u16, u16) = (80, 24);

/// Current terminal size as `(columns, rows)`.
pub fn terminal_size() -> (u16, u16) {
    match terminal::size() {
        Ok(size) => size,
        Err(e) => {
            debug!("terminal size unavailable ({e}), assuming 80x24");
            FALLBACK_TERMINAL
        }
    }
}

/// How the user asked for the grid to be sized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizing {
    /// Columns; 0 = automatic.
    pub width: i32,
    /// Rows; negative or 0 = derived from width and aspect ratio.
    pub height: i32,
    /// Percentage of the terminal used when autoscaling.
    pub scale: u32,
}

impl Default for Sizing {
    fn default() -> Self {
        Sizing {
            width: 0,
            height: -1,
            scale: 40,
        }
    }
}

impl Sizing {
    /// Resolve the grid for a `gif` (pixels) shown on a `term` (cells),
    /// copying every other field from `base`.
    pub fn resolve(&self, base: &RenderConfig, term: (u16, u16), gif: (u32, u32)) -> RenderConfig {
        let mut config = base.clone();

        if self.width > 0 && self.height > 0 {
            config.width = clamp_cells(self.width as f64).max(2);
            config.height = clamp_cells(self.height as f64).max(1);
            return config;
        }

        let scale = self.scale as f64 / 100.0;
        let max_w = term.0 as f64 * scale;
        let max_h = term.1 as f64 * scale;

        // A cell is about twice as tall as it is wide.
        let ratio = gif.0 as f64 / (gif.1 as f64 / 2.0);

        let mut w = max_w;
        let mut h = w / ratio;
        if h > max_h {
            h = max_h;
            w = h * ratio;
        }

        let (w, h) = if self.width > 0 {
            (self.width as f64, self.width as f64 / ratio)
        } else if self.height > 0 {
            (self.height as f64 * ratio, self.height as f64)
        } else {
            (w, h)
        };

        config.width = clamp_cells(w).max(2);
        config.height = clamp_cells(h).max(1);
        config
    }
}

/// Truncate toward zero into the cell range; NaN becomes 0.
fn clamp_cells(v: f64) -> u16 {
    v as u16
}
