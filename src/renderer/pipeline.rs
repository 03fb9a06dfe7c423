//! Parallel frame rendering.
//!
//! One producer composites frames strictly in order into pooled bitmaps; a
//! fixed set of workers dithers and rasterizes them concurrently; the
//! calling thread collects the results back into source order.

use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::Renderer;
use super::pool::{Pool, Pooled};
use crate::engine::Compositor;
use crate::engine::dither::dither;
use crate::engine::source::DecodedGif;
use crate::types::{Canvas, RenderConfig, RenderedFrame};

struct Job<'p> {
    index: usize,
    canvas: Pooled<'p, Canvas>,
}

pub struct Pipeline {
    workers: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Pipeline::new(workers)
    }
}

impl Pipeline {
    pub fn new(workers: usize) -> Self {
        Pipeline {
            workers: workers.max(1),
        }
    }

    /// Composite, dither and rasterize every frame of `gif`.
    pub fn render(&self, gif: &DecodedGif, config: &RenderConfig) -> Vec<RenderedFrame> {
        self.render_with(gif, |canvas, out| {
            if config.dither > 0.0 {
                dither(canvas, config.dither);
            }
            if let Err(e) = Renderer::render(canvas, config, out) {
                warn!("glyph rendering failed: {e}");
            }
        })
    }

    /// Run the pipeline with a custom per-frame stage.
    ///
    /// `stage` receives an exclusive, already composited bitmap and an empty
    /// scratch buffer to write the frame's bytes into. Results come back in
    /// source order regardless of which worker finishes first.
    pub fn render_with<F>(&self, gif: &DecodedGif, stage: F) -> Vec<RenderedFrame>
    where
        F: Fn(&mut Canvas, &mut Vec<u8>) + Sync,
    {
        let total = gif.frames.len();
        if total == 0 {
            return Vec::new();
        }
        debug!(frames = total, workers = self.workers, "rendering");

        let bitmaps = Pool::bounded(
            (0..self.workers * 2)
                .map(|_| Canvas::new(gif.width, gif.height))
                .collect(),
        );
        let scratch: Pool<Vec<u8>> = Pool::elastic(Vec::new);

        let mut slots: Vec<Option<RenderedFrame>> = vec![None; total];

        // Workers borrow the receiver, so it has to outlive the scope.
        let (job_tx, job_rx) = mpsc::sync_channel::<Job>(self.workers);
        let job_rx = Mutex::new(job_rx);
        let (result_tx, result_rx) = mpsc::channel::<(usize, RenderedFrame)>();

        thread::scope(|s| {
            let bitmaps = &bitmaps;
            s.spawn(move || {
                let mut compositor = Compositor::new(gif);
                let mut index = 0;
                while let Some(canvas) = compositor.advance() {
                    let mut pooled = bitmaps.checkout();
                    pooled.copy_from(canvas);
                    if job_tx.send(Job { index, canvas: pooled }).is_err() {
                        break;
                    }
                    index += 1;
                }
            });

            for _ in 0..self.workers {
                let job_rx = &job_rx;
                let result_tx = result_tx.clone();
                let scratch = &scratch;
                let stage = &stage;
                s.spawn(move || {
                    loop {
                        // Hold the lock only for the receive.
                        let job = job_rx.lock().recv();
                        let Ok(mut job) = job else { break };

                        let mut buf = scratch.checkout();
                        buf.clear();
                        stage(&mut *job.canvas, &mut *buf);
                        let frame = RenderedFrame(buf.to_vec());
                        drop(job.canvas);

                        if result_tx.send((job.index, frame)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (index, frame) in result_rx {
                slots[index] = Some(frame);
            }
        });

        debug!(frames = total, "rendering finished");
        slots.into_iter().map(Option::unwrap_or_default).collect()
    }
}
