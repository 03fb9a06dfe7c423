//! On-disk cache of rendered frame sequences.
//!
//! Entries are keyed by a digest of the source file's identity (absolute
//! path, size, modification time) plus the target grid size. Of the rest of
//! the render configuration only the dither intensity is checked on load,
//! so changing fps, color mode or brightness reuses an existing entry.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{RenderConfig, RenderedFrame};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache record is corrupt: {0}")]
    Codec(#[from] bincode::Error),
    #[error("cached dither {stored} does not match requested {requested}")]
    DitherMismatch { stored: f64, requested: f64 },
}

/// Identity of a source file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    pub path: PathBuf,
    pub size: u64,
    pub modified_nanos: u128,
}

impl SourceIdentity {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let path = fs::canonicalize(path)?;
        let meta = fs::metadata(&path)?;
        let modified_nanos = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Ok(SourceIdentity {
            path,
            size: meta.len(),
            modified_nanos,
        })
    }

    /// Hex SHA-256 over path, size and modification time.
    pub fn digest(&self) -> String {
        let key = format!(
            "{}-{}-{}",
            self.path.display(),
            self.size,
            self.modified_nanos
        );
        Sha256::digest(key.as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CacheRecord {
    frames: Vec<RenderedFrame>,
    config: RenderConfig,
}

/// Borrowed twin of `CacheRecord`; encodes to the same bytes.
#[derive(Serialize)]
struct CacheRecordRef<'a> {
    frames: &'a [RenderedFrame],
    config: &'a RenderConfig,
}

pub struct FrameCache {
    dir: PathBuf,
}

impl FrameCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FrameCache { dir: dir.into() }
    }

    /// Cache rooted in the system temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn path_for(&self, source: &SourceIdentity, config: &RenderConfig) -> PathBuf {
        self.dir.join(format!(
            "brrtfetch_{}_{}_{}.bin",
            source.digest(),
            config.width,
            config.height
        ))
    }

    pub fn load(&self, path: &Path, config: &RenderConfig) -> Result<Vec<RenderedFrame>, CacheError> {
        let reader = BufReader::new(File::open(path)?);
        let record: CacheRecord = bincode::deserialize_from(reader)?;
        if record.config.dither != config.dither {
            return Err(CacheError::DitherMismatch {
                stored: record.config.dither,
                requested: config.dither,
            });
        }
        Ok(record.frames)
    }

    pub fn store(
        &self,
        path: &Path,
        frames: &[RenderedFrame],
        config: &RenderConfig,
    ) -> Result<(), CacheError> {
        let record = CacheRecordRef { frames, config };
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &record)?;
        Ok(())
    }

    /// Return the cached frames for `source` and `config`, or call `render`
    /// and store its result.
    ///
    /// Without a source identity nothing is read or written. Cache failures
    /// are never fatal: a bad read is a miss and a bad write is dropped.
    pub fn fetch<F>(
        &self,
        source: Option<&SourceIdentity>,
        config: &RenderConfig,
        render: F,
    ) -> Vec<RenderedFrame>
    where
        F: FnOnce() -> Vec<RenderedFrame>,
    {
        let Some(source) = source else {
            return render();
        };
        let path = self.path_for(source, config);

        match self.load(&path, config) {
            Ok(frames) => {
                debug!(frames = frames.len(), "cache hit {}", path.display());
                return frames;
            }
            Err(e) => debug!("cache miss {}: {e}", path.display()),
        }

        let frames = render();
        match self.store(&path, &frames, config) {
            Ok(()) => debug!(frames = frames.len(), "cached {}", path.display()),
            Err(e) => warn!("could not write cache {}: {e}", path.display()),
        }
        frames
    }
}
