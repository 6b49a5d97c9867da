//! Location-keyed exclusive lock.
//!
//! At most one pipeline run or execution job may hold a given artifact
//! location. The table is process-wide; paths are compared as given, so
//! callers must key the same location with the same path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

static LOCATIONS: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();

fn table() -> MutexGuard<'static, HashSet<PathBuf>> {
    let mutex = LOCATIONS.get_or_init(|| Mutex::new(HashSet::new()));
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Holds one location exclusively until dropped.
#[derive(Debug)]
pub struct LocationGuard {
    location: PathBuf,
}

impl LocationGuard {
    pub fn location(&self) -> &Path {
        &self.location
    }
}

impl Drop for LocationGuard {
    fn drop(&mut self) {
        table().remove(&self.location);
    }
}

/// Acquire the location, or return `None` when another holder has it. There
/// is no blocking variant; a busy location is surfaced to the caller
/// immediately.
pub fn try_acquire(location: &Path) -> Option<LocationGuard> {
    let mut held = table();
    if held.insert(location.to_path_buf()) {
        Some(LocationGuard {
            location: location.to_path_buf(),
        })
    } else {
        None
    }
}
