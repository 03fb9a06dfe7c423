//! Engine — the disposal compositor.
//!
//! Turns a `DecodedGif` (partial frames) into a sequence of full-canvas
//! bitmaps, one per frame, honoring each frame's disposal method.
//!
//! The engine understands GIF frame semantics. It never deals with
//! terminals, glyphs or ANSI codes.

pub mod dither;
pub mod source;

use crate::types::{Bounds, Canvas};
use source::{DecodedGif, Disposal};

/// Disposal bookkeeping carried from one frame to the next.
#[derive(Debug, Default)]
struct DisposalState {
    last: Disposal,
    last_bounds: Bounds,
    /// Canvas as it was before the last frame was drawn. Only filled when
    /// that frame asked for `RestorePrevious`.
    snapshot: Option<Canvas>,
}

/// Walks a decoded GIF frame by frame, keeping one persistent canvas.
pub struct Compositor<'a> {
    gif: &'a DecodedGif,
    canvas: Canvas,
    state: DisposalState,
    next: usize,
}

impl<'a> Compositor<'a> {
    pub fn new(gif: &'a DecodedGif) -> Self {
        Compositor {
            gif,
            canvas: Canvas::new(gif.width, gif.height),
            state: DisposalState::default(),
            next: 0,
        }
    }

    /// Composite the next frame and return the full canvas.
    ///
    /// The returned canvas is overwritten by the following call; callers that
    /// keep a frame must copy it out first.
    pub fn advance(&mut self) -> Option<&Canvas> {
        let gif = self.gif;
        let frame = gif.frames.get(self.next)?;

        if self.next > 0 {
            self.dispose_last();
        }

        if frame.disposal == Disposal::RestorePrevious {
            match &mut self.state.snapshot {
                Some(snapshot) => snapshot.copy_from(&self.canvas),
                None => self.state.snapshot = Some(self.canvas.clone()),
            }
        }

        self.canvas.draw_over(frame.bounds, &frame.rgba);
        self.state.last = frame.disposal;
        self.state.last_bounds = frame.bounds;
        self.next += 1;

        Some(&self.canvas)
    }

    fn dispose_last(&mut self) {
        match self.state.last {
            Disposal::None | Disposal::Keep => {}
            Disposal::RestoreBackground => self.canvas.clear(self.state.last_bounds),
            Disposal::RestorePrevious => {
                if let Some(snapshot) = &self.state.snapshot {
                    self.canvas.copy_from(snapshot);
                }
            }
        }
    }

    /// Composite every frame into owned bitmaps.
    #[cfg(test)]
    fn composite_all(gif: &DecodedGif) -> Vec<Canvas> {
        let mut compositor = Compositor::new(gif);
        let mut out = Vec::with_capacity(gif.frames.len());
        while let Some(canvas) = compositor.advance() {
            out.push(canvas.clone());
        }
        out
    }
}
