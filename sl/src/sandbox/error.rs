//! Sandbox error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving a path against a [`super::Root`]
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Path {path} escapes root {root}")]
    Escape { path: PathBuf, root: PathBuf },

    #[error("Root {path} cannot be resolved")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Root {path} is not a directory")]
    RootNotADirectory { path: PathBuf },
}

impl PathError {
    /// Whether this error is a sandbox escape (as opposed to a bad root)
    pub fn is_escape(&self) -> bool {
        matches!(self, PathError::Escape { .. })
    }
}
