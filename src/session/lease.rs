//! Process-wide registry of modules with a live session.
//!
//! The wrapped engine keeps its state in process globals, so at most one
//! session may drive a given module at a time.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

static ACTIVE: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Exclusive claim on a module; released on drop.
#[derive(Debug)]
pub(crate) struct InstanceLease {
    key: PathBuf,
}

impl InstanceLease {
    /// Claim `path`, or `None` if another session holds it.
    ///
    /// Paths are canonicalized when possible so that aliases of the same
    /// file collide.
    pub(crate) fn acquire(path: &Path) -> Option<Self> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            return None;
        }
        tracing::trace!(module = %key.display(), "instance lease acquired");
        Some(Self { key })
    }

    /// The canonical module path.
    pub(crate) fn key(&self) -> &Path {
        &self.key
    }
}

impl Drop for InstanceLease {
    fn drop(&mut self) {
        let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        active.remove(&self.key);
        tracing::trace!(module = %self.key.display(), "instance lease released");
    }
}
