//! Drop-guarded scratch directory for downloads and extraction.
//!
//! Every invocation works inside one unique directory under the system
//! temp dir. The directory is removed when the guard drops, so a failed
//! install leaves no partial state behind.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::runtime::Runtime;

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A unique temporary working directory, removed on drop.
pub struct Scratch<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> Scratch<'a, R> {
    /// Creates a fresh scratch directory under the system temp dir.
    pub fn create(runtime: &'a R, prefix: &str) -> Result<Self> {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = runtime
            .temp_dir()
            .join(format!("{}-{}-{}", prefix, std::process::id(), n));
        runtime
            .create_dir_all(&path)
            .with_context(|| format!("Failed to create scratch directory at {:?}", path))?;
        Ok(Self { runtime, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Subdirectory inside the scratch directory, created on demand.
    pub fn dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.path.join(name);
        self.runtime
            .create_dir_all(&dir)
            .with_context(|| format!("Failed to create scratch subdirectory at {:?}", dir))?;
        Ok(dir)
    }
}

impl<R: Runtime> Drop for Scratch<'_, R> {
    fn drop(&mut self) {
        debug!("Cleaning up scratch directory {:?}", self.path);
        let _ = self.runtime.remove_dir_all(&self.path);
    }
}
