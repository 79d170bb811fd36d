//! Raw payload archive.
//!
//! Every fetched body is written to disk before parsing so a bad payload can
//! be inspected after the run fails. Files are named
//! `<prefix>_<epoch_secs>.<ext>` under the archive directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone)]
pub struct RawArchive {
    dir: PathBuf,
}

impl RawArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a payload fetched at `at` would be written to.
    pub fn path_for(&self, prefix: &str, ext: &str, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("{prefix}_{}.{ext}", at.timestamp()))
    }

    /// Write `content` verbatim. Creates the directory if needed.
    pub fn save(&self, prefix: &str, ext: &str, content: &str, at: DateTime<Utc>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create archive dir {}", self.dir.display()))?;
        let path = self.path_for(prefix, ext, at);
        fs::write(&path, content).with_context(|| format!("write archive {}", path.display()))?;
        info!(path = %path.display(), bytes = content.len(), "raw payload archived");
        Ok(path)
    }
}
