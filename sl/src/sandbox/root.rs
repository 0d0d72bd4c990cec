//! Root - the canonical directory every tool operation is confined to

use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::PathError;

/// Canonical, absolute sandbox root
///
/// Constructed once per session and never mutated. All containment checks
/// compare path components against this value, so `/work` never admits
/// `/workshop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    path: PathBuf,
}

impl Root {
    /// Canonicalize `path` and use it as a sandbox root
    pub fn new(path: impl AsRef<Path>) -> Result<Self, PathError> {
        let path = path.as_ref();
        debug!(?path, "Root::new: called");
        let canonical = path.canonicalize().map_err(|source| PathError::InvalidRoot {
            path: path.to_path_buf(),
            source,
        })?;

        if !canonical.is_dir() {
            debug!(?canonical, "Root::new: not a directory");
            return Err(PathError::RootNotADirectory { path: canonical });
        }

        Ok(Self { path: canonical })
    }

    /// The canonical root path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a planner-supplied path against this root
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Result<PathBuf, PathError> {
        resolve(self, relative)
    }

    /// Component-wise containment: equal to the root or below it
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }
}

impl AsRef<Path> for Root {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Resolve `relative` against `root`, rejecting anything that lands outside it
///
/// The joined path is canonicalized through the filesystem component by
/// component. Components that do not exist yet (a file about to be written,
/// say) are kept lexically, so `new/../../x` is still caught and
/// `new/../link/x` still follows `link`. An existing entry that cannot be canonicalized (a
/// dangling symlink) is treated as an escape since its target is unknown.
pub fn resolve(root: &Root, relative: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    let relative = relative.as_ref();
    debug!(?relative, %root, "resolve: called");

    let joined = root.path.join(relative);
    let escape = || PathError::Escape {
        path: relative.to_path_buf(),
        root: root.path.clone(),
    };

    let canonical = canonicalize_lenient(&joined).ok_or_else(escape)?;

    if root.contains(&canonical) {
        debug!(?canonical, "resolve: path is within root");
        Ok(canonical)
    } else {
        debug!(?canonical, "resolve: sandbox escape detected");
        Err(escape())
    }
}

/// Walk `path` one component at a time, canonicalizing every prefix that exists
///
/// A prefix that exists is replaced by its canonical form, so a symlink is
/// followed at the point it appears even when an earlier missing directory
/// and `..` lead back to it. Prefixes that do not exist are kept lexically.
/// Returns `None` for an existing entry that cannot be canonicalized.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let mut current = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => current.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                current.pop();
            }
            Component::Normal(name) => {
                current.push(name);
                if current.symlink_metadata().is_ok() {
                    current = current.canonicalize().ok()?;
                }
            }
        }
    }

    Some(current)
}
