//! Path sandboxing
//!
//! Every path a tool touches goes through [`resolve`] first. A [`Root`] is
//! canonicalized once when the session starts; candidate paths are joined
//! onto it, resolved through the filesystem (symlinks, `.` and `..`), and
//! accepted only when the result sits at or below the root by path
//! components.

mod error;
mod root;

pub use error::PathError;
pub use root::{Root, resolve};
