//! Output-file lifecycle.
//!
//! §5 requires that "on failure with `keep-failed = false` the output file
//! can be unlinked cleanly": the driver never touches the filesystem, so
//! the frontend is the one place a partially written artifact can leak.
//! [`OutputGuard`] ties the output path's lifetime to a scope: unless
//! explicitly committed, dropping it unlinks whatever was written.

use std::path::{Path, PathBuf};

pub struct OutputGuard {
    path: PathBuf,
    committed: bool,
}

impl OutputGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), committed: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marks the file as one to keep; the guard becomes a no-op on drop.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.committed {
            // Best-effort: the file may never have been created (e.g. the
            // open itself failed), in which case there is nothing to do.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
