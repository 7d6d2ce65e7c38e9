//! Scratch working directory owned by a top-level run.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::context::ARTIFACT;
use crate::error::{BuildError, Result};

const PREFIX: &str = ".frida_builder_";

/// The working directory of one top-level run.
///
/// Dropping it removes the directory, so a failed run leaves nothing behind.
/// On success call [`WorkDir::finish`] to copy the artifact out first.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create a fresh directory inside `root`.
    pub fn create_in(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(root)
            .map_err(|e| BuildError::io("failed to make tempdir", e))?;
        debug!(dir = %dir.path().display(), "Created working directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the artifact the last step wrote.
    pub fn artifact(&self) -> PathBuf {
        self.path().join(ARTIFACT)
    }

    /// Copy the artifact to `output`, then delete the directory.
    ///
    /// Returns the number of bytes copied.
    pub fn finish(self, output: &Path) -> Result<u64> {
        let bytes = std::fs::copy(self.artifact(), output)
            .map_err(|e| BuildError::io("failed to copy output", e))?;

        let dir = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            BuildError::io(format!("failed to remove {}", dir.display()), e)
        })?;
        Ok(bytes)
    }
}
