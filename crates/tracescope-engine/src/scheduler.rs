//! Execution scheduler boundary.
//!
//! The engine does not run the external checker; it hands a finished
//! artifact to a host-provided scheduler. The job owns the location guard
//! for its whole lifetime, so the artifact cannot be overwritten or
//! re-launched while the checker reads it.

use std::path::{Path, PathBuf};

use crate::lock::LocationGuard;
use crate::storage::ArtifactPaths;

/// Priority tag attached to the scheduled job, used downstream to
/// multiplex output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPriority {
    Interactive,
    /// Long-running background work; exploration jobs default to this.
    #[default]
    Long,
}

/// A scheduled unit of work for the external checker.
///
/// Dropping the job releases the artifact location; schedulers keep it alive
/// for as long as the checker process runs.
#[derive(Debug)]
pub struct ExecutionJob {
    module: PathBuf,
    config: PathBuf,
    output: PathBuf,
    priority: JobPriority,
    workers: usize,
    guard: LocationGuard,
}

impl ExecutionJob {
    pub(crate) fn new(paths: &ArtifactPaths, guard: LocationGuard) -> Self {
        Self {
            module: paths.module().to_path_buf(),
            config: paths.config().to_path_buf(),
            output: paths.out().to_path_buf(),
            priority: JobPriority::default(),
            // Exploration replays a fixed trace; one worker is enough.
            workers: 1,
            guard,
        }
    }

    pub fn module(&self) -> &Path {
        &self.module
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The location the job holds exclusively.
    pub fn location(&self) -> &Path {
        self.guard.location()
    }

    /// The handle returned to the host at handoff.
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            output: self.output.clone(),
            priority: self.priority,
        }
    }
}

/// What the downstream log reader needs: where the job's output stream
/// lives and the priority tag it is multiplexed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub output: PathBuf,
    pub priority: JobPriority,
}

/// External job scheduler boundary.
pub trait ExecutionScheduler {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Take ownership of the job and schedule it. Implementations must keep
    /// the job alive for the checker's entire run; dropping it releases the
    /// artifact location.
    fn schedule(&mut self, job: ExecutionJob) -> Result<JobHandle, Self::Error>;
}
