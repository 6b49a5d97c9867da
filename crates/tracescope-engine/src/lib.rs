#![doc = include_str!("../README.md")]

//! Trace-exploration pipeline engine.
//!
//! This crate orchestrates one exploration run: speculative synthesis,
//! validation through the external analyzer boundary, level resolution,
//! final synthesis, and handoff to the external execution scheduler.

pub mod controller;
pub mod errors;
pub mod gate;
pub mod lock;
pub mod scheduler;
pub mod storage;

pub use controller::{CancellationToken, PipelineController, MODULE_NAME};
pub use errors::{AbortReason, PipelineError, PipelinePhase};
pub use gate::{AnalysisVerdict, AnalyzerDiagnostic, SymbolTable, ValidationGate};
pub use scheduler::{ExecutionJob, ExecutionScheduler, JobHandle, JobPriority};
pub use storage::ArtifactPaths;
