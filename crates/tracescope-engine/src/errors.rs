//! Error taxonomy surfaced to hosts.
//!
//! Every failure surfaces exactly once, with the phase and the identifiers
//! involved; nothing in the pipeline retries. Validation diagnostics and the
//! temporal-expression rejection are recoverable by the caller (edit and
//! launch again); the structural and invariant kinds are not.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use tracescope_ir::StructuralError;

use crate::gate::AnalyzerDiagnostic;
use crate::storage::StorageError;

/// Phases of one pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Building,
    AwaitingValidation,
    LevelResolved,
    Finalizing,
    HandedOff,
    Aborted,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::AwaitingValidation => "awaiting-validation",
            Self::LevelResolved => "level-resolved",
            Self::Finalizing => "finalizing",
            Self::HandedOff => "handed-off",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Why an aborted run stopped.
#[derive(Debug, Clone)]
pub enum AbortReason {
    /// The analyzer rejected the speculative module.
    Diagnostics(Vec<AnalyzerDiagnostic>),
    /// One or more expressions resolved to the temporal level.
    TemporalExpressions(Vec<String>),
    /// The host requested cancellation at a phase boundary.
    Cancelled,
    /// An internal invariant failed; the run cannot continue.
    Internal(String),
}

fn format_diagnostics(diagnostics: &[AnalyzerDiagnostic]) -> String {
    let mut out = format!(
        "the generated module failed validation with {} diagnostic(s):\n",
        diagnostics.len()
    );
    for diagnostic in diagnostics {
        out.push_str(&format!("  {diagnostic}\n"));
    }
    out.pop();
    out
}

/// Errors surfaced by the pipeline controller.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    /// The launch attribute map failed presence or shape validation.
    #[error(transparent)]
    #[diagnostic(code(tracescope::launch::structural))]
    Structural(#[from] StructuralError),

    /// A defect in the pipeline itself: an identifier collision, a symbol
    /// missing after a successful parse, or synthesis from a mutated spec.
    #[error("internal invariant violated while {phase}: {detail}")]
    #[diagnostic(
        code(tracescope::pipeline::invariant),
        help("this indicates a defect in the explorer, not in the model or the expressions; please report it")
    )]
    SynthesisInvariant {
        phase: PipelinePhase,
        detail: String,
    },

    /// The analyzer rejected the speculative module. Diagnostics are
    /// reproduced verbatim; their locations refer to the generated module.
    #[error("{}", format_diagnostics(.0))]
    #[diagnostic(
        code(tracescope::pipeline::diagnostics),
        help("correct the listed expressions, or re-record the trace if the base specification changed")
    )]
    Validation(Vec<AnalyzerDiagnostic>),

    /// One or more expressions are temporal formulas, which cannot be
    /// tracked state by state along a trace.
    #[error("temporal-level trace expressions are unsupported: {}", .expressions.join("; "))]
    #[diagnostic(
        code(tracescope::pipeline::temporal),
        help("rewrite the listed expressions at state or action level and launch again")
    )]
    SemanticRejection { expressions: Vec<String> },

    #[error(transparent)]
    #[diagnostic(code(tracescope::storage::write))]
    Storage(#[from] StorageError),

    /// Another run's execution job still holds the artifact location.
    #[error("artifact location {} is held by a running execution job", .0.display())]
    #[diagnostic(
        code(tracescope::schedule::busy),
        help("wait for the job at this location to finish, or launch into a different model directory")
    )]
    LocationBusy(PathBuf),

    /// The host cancelled the run at a phase boundary.
    #[error("run cancelled before {phase}")]
    #[diagnostic(code(tracescope::pipeline::cancelled))]
    Cancelled { phase: PipelinePhase },

    /// An entry point was called out of its state-machine order.
    #[error("{method} requires the {expected} phase, but the run is {actual}")]
    #[diagnostic(code(tracescope::pipeline::order))]
    OutOfOrder {
        method: &'static str,
        expected: PipelinePhase,
        actual: PipelinePhase,
    },

    /// The analyzer could not be run at all.
    #[error("analyzer failed to run: {0}")]
    #[diagnostic(code(tracescope::gate::analyzer))]
    Analyzer(String),

    /// The execution scheduler refused the handoff.
    #[error("execution scheduler refused the job: {0}")]
    #[diagnostic(code(tracescope::schedule::refused))]
    Scheduler(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_reproduces_diagnostics_verbatim() {
        let err = PipelineError::Validation(vec![
            AnalyzerDiagnostic::at("unknown variable 'q'", "line 14, col 7"),
            AnalyzerDiagnostic::new("module has no terminating line"),
        ]);
        let text = err.to_string();
        assert!(text.contains("2 diagnostic(s)"));
        assert!(text.contains("line 14, col 7: unknown variable 'q'"));
        assert!(text.contains("module has no terminating line"));
    }

    #[test]
    fn test_semantic_rejection_names_the_expressions() {
        let err = PipelineError::SemanticRejection {
            expressions: vec!["[]x > 0".into()],
        };
        assert!(err.to_string().contains("[]x > 0"));
        assert!(err.to_string().contains("temporal"));
    }
}
