//! Source GIF types — the decoded, not yet composited animation.
//!
//! A `DecodedGif` is a logical canvas size plus a list of partial frames,
//! each carrying its own bounds, RGBA pixels and disposal instruction. The
//! compositor turns these into full-canvas bitmaps.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Bounds;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode GIF: {0}")]
    Decode(#[from] gif::DecodingError),
}

/// What happens to the canvas after a frame has been shown, before the next
/// frame is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disposal {
    /// Unspecified; the canvas is left as is.
    #[default]
    None,
    /// Leave the frame in place.
    Keep,
    /// Clear the frame's bounds to transparent.
    RestoreBackground,
    /// Restore the canvas to how it was before the frame was drawn.
    RestorePrevious,
}

impl From<gif::DisposalMethod> for Disposal {
    fn from(method: gif::DisposalMethod) -> Self {
        match method {
            gif::DisposalMethod::Any => Disposal::None,
            gif::DisposalMethod::Keep => Disposal::Keep,
            gif::DisposalMethod::Background => Disposal::RestoreBackground,
            gif::DisposalMethod::Previous => Disposal::RestorePrevious,
        }
    }
}

/// One frame as stored in the file: only the region it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFrame {
    pub bounds: Bounds,
    /// RGBA pixels, `bounds.width * bounds.height * 4` bytes.
    pub rgba: Vec<u8>,
    pub disposal: Disposal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedGif {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<PartialFrame>,
}

impl DecodedGif {
    /// Decode every frame of a GIF stream.
    pub fn decode<R: Read>(reader: R) -> Result<Self, SourceError> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(reader)?;

        let width = decoder.width() as u32;
        let height = decoder.height() as u32;
        let mut frames = Vec::new();

        while let Some(frame) = decoder.read_next_frame()? {
            frames.push(PartialFrame {
                bounds: Bounds::new(
                    frame.left as u32,
                    frame.top as u32,
                    frame.width as u32,
                    frame.height as u32,
                ),
                rgba: frame.buffer.to_vec(),
                disposal: frame.dispose.into(),
            });
        }

        Ok(DecodedGif { width, height, frames })
    }

    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::decode(BufReader::new(file))
    }

    /// Like `open`, but a missing or corrupt file yields a zero-frame GIF.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::open(path) {
            Ok(gif) => {
                debug!(
                    frames = gif.frames.len(),
                    width = gif.width,
                    height = gif.height,
                    "decoded {}",
                    path.display()
                );
                gif
            }
            Err(e) => {
                warn!("{e}; continuing with no frames");
                DecodedGif::default()
            }
        }
    }
}
