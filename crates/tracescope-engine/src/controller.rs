//! The pipeline controller: a one-shot state machine over
//! `Idle -> Building -> AwaitingValidation -> LevelResolved -> Finalizing ->
//! HandedOff`, with `Aborted` reachable from the three middle states.
//!
//! Each controller value runs exactly one build/validate/finalize cycle and
//! carries all per-run state itself; two concurrent runs share nothing but
//! the location lock. Cancellation is honored at phase boundaries only, so a
//! phase that has started always runs to completion or failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use tracescope_codegen::writer::SynthesisError;
use tracescope_codegen::{synthesize, ExpressionRegistry, SynthesisPhase};
use tracescope_ir::{LaunchSpec, TraceExpression};

use crate::errors::{AbortReason, PipelineError, PipelinePhase};
use crate::gate::{AnalysisVerdict, ValidationGate};
use crate::lock::{self, LocationGuard};
use crate::scheduler::{ExecutionJob, ExecutionScheduler, JobHandle};
use crate::storage::{self, ArtifactPaths};

/// Name of the generated module, and stem of the three artifact files.
pub const MODULE_NAME: &str = "Explore";

/// Cooperative cancellation flag shared with the host.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives one trace-exploration run.
pub struct PipelineController {
    spec: LaunchSpec,
    registry: ExpressionRegistry,
    paths: ArtifactPaths,
    phase: PipelinePhase,
    abort: Option<AbortReason>,
    guard: Option<LocationGuard>,
    cancel: CancellationToken,
}

impl PipelineController {
    /// Create a controller for one run. `reserved` lists the names already
    /// visible in the base specification, which generated names must avoid;
    /// the speculative parse then verifies the avoidance.
    pub fn new(
        spec: LaunchSpec,
        reserved: impl IntoIterator<Item = String>,
        cancel: CancellationToken,
    ) -> Self {
        let paths = ArtifactPaths::new(&spec.model_location, MODULE_NAME);
        Self {
            spec,
            registry: ExpressionRegistry::new(reserved),
            paths,
            phase: PipelinePhase::Idle,
            abort: None,
            guard: None,
            cancel,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Why the run aborted, once it has.
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.abort.as_ref()
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// The registered expressions, with whatever levels are resolved so far.
    pub fn expressions(&self) -> &[TraceExpression] {
        self.registry.expressions()
    }

    /// Acquire the artifact location, register the expressions, and write
    /// the speculative module. Any previous artifact at the location is
    /// overwritten.
    pub fn build(&mut self) -> Result<(), PipelineError> {
        self.expect("build", PipelinePhase::Idle)?;
        self.enter(PipelinePhase::Building)?;

        let guard = lock::try_acquire(self.paths.dir())
            .ok_or_else(|| PipelineError::LocationBusy(self.paths.dir().to_path_buf()))?;
        self.guard = Some(guard);

        self.registry.register(&self.spec.expressions);
        for expr in self.registry.expressions() {
            debug!(
                identifier = expr.identifier(),
                variable = expr.variable(),
                "registered trace expression"
            );
        }

        let artifact = synthesize(
            &self.spec,
            MODULE_NAME,
            &mut self.registry,
            SynthesisPhase::Speculative,
        )
        .map_err(|e| self.invariant(e))?;
        storage::prepare(&self.paths)?;
        storage::write_artifact(&self.paths, &artifact)?;
        info!(module = %self.paths.module().display(), "wrote speculative artifact");
        Ok(())
    }

    /// Submit the speculative module to the analyzer and resolve every
    /// expression's level from the returned symbol table.
    pub fn submit<G: ValidationGate>(&mut self, gate: &mut G) -> Result<(), PipelineError> {
        self.expect("submit", PipelinePhase::Building)?;
        self.enter(PipelinePhase::AwaitingValidation)?;

        let verdict = gate
            .analyze(self.paths.module())
            .map_err(|e| PipelineError::Analyzer(e.to_string()))?;
        let table = match verdict {
            AnalysisVerdict::Rejected(diagnostics) => {
                self.phase = PipelinePhase::Aborted;
                self.abort = Some(AbortReason::Diagnostics(diagnostics.clone()));
                info!(count = diagnostics.len(), "analyzer rejected the module");
                return Err(PipelineError::Validation(diagnostics));
            }
            AnalysisVerdict::Accepted(table) => table,
        };

        let identifiers: Vec<String> = self
            .registry
            .expressions()
            .iter()
            .map(|e| e.identifier().to_string())
            .collect();
        for identifier in &identifiers {
            let level = table.lookup(identifier).ok_or_else(|| {
                self.invariant_detail(format!(
                    "identifier '{identifier}' is missing from the analyzer symbol table"
                ))
            })?;
            self.registry
                .set_level(identifier, level)
                .map_err(|e| self.invariant_detail(e.to_string()))?;
        }

        let temporal: Vec<String> = self
            .registry
            .temporal_expressions()
            .iter()
            .map(|e| e.source().to_string())
            .collect();
        if !temporal.is_empty() {
            self.phase = PipelinePhase::Aborted;
            self.abort = Some(AbortReason::TemporalExpressions(temporal.clone()));
            return Err(PipelineError::SemanticRejection {
                expressions: temporal,
            });
        }

        self.phase = PipelinePhase::LevelResolved;
        info!("expression levels resolved");
        Ok(())
    }

    /// Re-synthesize with the expression variables woven into the trace
    /// encodings, attach the terminal property, and overwrite the artifact
    /// together with its companion config.
    pub fn finalize(&mut self) -> Result<(), PipelineError> {
        self.expect("finalize", PipelinePhase::LevelResolved)?;
        self.enter(PipelinePhase::Finalizing)?;

        if let Some(expr) = self
            .registry
            .expressions()
            .iter()
            .find(|e| !e.level().is_resolved())
        {
            let detail = format!("expression '{}' is still unresolved", expr.identifier());
            return Err(self.invariant_detail(detail));
        }

        let artifact = synthesize(
            &self.spec,
            MODULE_NAME,
            &mut self.registry,
            SynthesisPhase::Final,
        )
        .map_err(|e| self.invariant(e))?;
        storage::write_artifact(&self.paths, &artifact)?;
        info!(
            module = %self.paths.module().display(),
            terminal = self.spec.terminal.kind(),
            "wrote final artifact"
        );
        Ok(())
    }

    /// Hand the finished artifact to the execution scheduler. The location
    /// guard moves into the job and is held for the job's whole lifetime.
    pub fn handoff<S: ExecutionScheduler>(
        &mut self,
        scheduler: &mut S,
    ) -> Result<JobHandle, PipelineError> {
        self.expect("handoff", PipelinePhase::Finalizing)?;
        self.enter(PipelinePhase::HandedOff)?;

        let guard = self
            .guard
            .take()
            .ok_or_else(|| self.invariant_detail("location guard missing at handoff".into()))?;
        let job = ExecutionJob::new(&self.paths, guard);
        let handle = scheduler
            .schedule(job)
            .map_err(|e| PipelineError::Scheduler(e.to_string()))?;
        info!(output = %handle.output.display(), "handed off execution job");
        Ok(handle)
    }

    /// Drive the whole cycle in order.
    pub fn run<G: ValidationGate, S: ExecutionScheduler>(
        &mut self,
        gate: &mut G,
        scheduler: &mut S,
    ) -> Result<JobHandle, PipelineError> {
        self.build()?;
        self.submit(gate)?;
        self.finalize()?;
        self.handoff(scheduler)
    }

    fn expect(&self, method: &'static str, expected: PipelinePhase) -> Result<(), PipelineError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(PipelineError::OutOfOrder {
                method,
                expected,
                actual: self.phase,
            })
        }
    }

    /// Phase-boundary gate: honor a pending cancellation, otherwise enter
    /// the next phase.
    fn enter(&mut self, next: PipelinePhase) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            self.phase = PipelinePhase::Aborted;
            self.abort = Some(AbortReason::Cancelled);
            return Err(PipelineError::Cancelled { phase: next });
        }
        self.phase = next;
        Ok(())
    }

    fn invariant(&mut self, error: SynthesisError) -> PipelineError {
        self.invariant_detail(error.to_string())
    }

    fn invariant_detail(&mut self, detail: String) -> PipelineError {
        let phase = self.phase;
        self.phase = PipelinePhase::Aborted;
        self.abort = Some(AbortReason::Internal(detail.clone()));
        PipelineError::SynthesisInvariant { phase, detail }
    }
}
