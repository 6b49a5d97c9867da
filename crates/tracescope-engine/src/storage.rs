//! Artifact storage.
//!
//! The three artifact files live side by side in the model directory: the
//! generated module, its companion config, and the out-file the execution
//! job streams into. Module and config are written through a sibling temp
//! file and renamed into place, so a reader never observes a half-written
//! artifact. The out-file is only ever truncated here; the execution job
//! owns its content.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use tracescope_ir::GeneratedArtifact;

/// Errors from artifact reads and writes. Cleanup failures are not errors;
/// they are logged and ignored.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write artifact file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Locations of one run's artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    dir: PathBuf,
    module: PathBuf,
    config: PathBuf,
    out: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, module_name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            module: dir.join(format!("{module_name}.tla")),
            config: dir.join(format!("{module_name}.cfg")),
            out: dir.join(format!("{module_name}.out")),
        }
    }

    /// The directory keying the exclusive execution rule.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn module(&self) -> &Path {
        &self.module
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    /// Output stream written by the execution job and tailed by the log
    /// reader downstream.
    pub fn out(&self) -> &Path {
        &self.out
    }
}

/// Create the artifact directory and clear leftovers from a previous run.
/// Stale temp files are deleted best-effort; a failed deletion is logged
/// and does not stop the run.
pub fn prepare(paths: &ArtifactPaths) -> Result<(), StorageError> {
    fs::create_dir_all(paths.dir()).map_err(|source| StorageError::CreateDir {
        path: paths.dir().to_path_buf(),
        source,
    })?;
    if let Ok(entries) = fs::read_dir(paths.dir()) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(".tmp") {
                if let Err(error) = fs::remove_file(entry.path()) {
                    warn!(
                        path = %entry.path().display(),
                        %error,
                        "could not remove stale temp file"
                    );
                }
            }
        }
    }
    Ok(())
}

/// Write the module and config atomically and truncate the out-file. Called
/// once per phase; the previous phase's files are overwritten in place.
pub fn write_artifact(paths: &ArtifactPaths, artifact: &GeneratedArtifact) -> Result<(), StorageError> {
    write_atomic(paths.module(), &artifact.module)?;
    write_atomic(paths.config(), &artifact.config)?;
    write_atomic(paths.out(), "")
}

fn write_atomic(path: &Path, content: &str) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let write = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, content).map_err(write)?;
    fs::rename(&tmp, path).map_err(write)
}
