//! Per-run temporary storage.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::ListinoError;

/// Temporary directory holding the documents of one run.
///
/// The directory and everything in it is removed when the workspace is
/// dropped, whichever way the run ends.
pub struct RunWorkspace {
    dir: TempDir,
    count: usize,
}

impl RunWorkspace {
    /// Create a fresh workspace in the system temp directory.
    pub fn create() -> Result<Self, ListinoError> {
        let dir = tempfile::Builder::new()
            .prefix("listino-run-")
            .tempdir()
            .map_err(|e| ListinoError::Storage(format!("cannot create run directory: {}", e)))?;

        debug!("Created run workspace {}", dir.path().display());
        Ok(Self { dir, count: 0 })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy a file into the workspace and return the copy's path.
    ///
    /// Copies are prefixed with a sequence number so that files with the
    /// same name from different folders do not clash.
    pub fn materialize(&mut self, source: &Path) -> Result<PathBuf, std::io::Error> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let target = self.dir.path().join(format!("{:04}-{}", self.count, name));
        self.count += 1;

        std::fs::copy(source, &target)?;
        debug!("Materialized {} as {}", source.display(), target.display());
        Ok(target)
    }
}
