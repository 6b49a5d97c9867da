//! Boundary to the external static analyzer.
//!
//! The engine never parses the specification language itself. It hands the
//! generated module to an analyzer behind [`ValidationGate`] and consumes
//! either a list of diagnostics or a symbol table. Diagnostics pass through
//! verbatim; they reference locations inside the generated module, and the
//! host may need to show them to the user exactly as the analyzer produced
//! them.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracescope_ir::ExpressionLevel;

/// One analyzer diagnostic, carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerDiagnostic {
    pub message: String,
    /// Location text inside the generated module, when the analyzer
    /// reported one.
    pub location: Option<String>,
}

impl AnalyzerDiagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    pub fn at(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

impl fmt::Display for AnalyzerDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// The analyzer's mapping from identifier to semantic level.
///
/// Only the level is needed from a looked-up entry, so the table is a plain
/// map rather than a view onto any analyzer-specific node type.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    levels: HashMap<String, ExpressionLevel>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, level: ExpressionLevel) {
        self.levels.insert(identifier.into(), level);
    }

    pub fn lookup(&self, identifier: &str) -> Option<ExpressionLevel> {
        self.levels.get(identifier).copied()
    }
}

impl FromIterator<(String, ExpressionLevel)> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = (String, ExpressionLevel)>>(iter: T) -> Self {
        Self {
            levels: iter.into_iter().collect(),
        }
    }
}

/// Outcome of one analyzer run over the generated module.
#[derive(Debug, Clone)]
pub enum AnalysisVerdict {
    Accepted(SymbolTable),
    Rejected(Vec<AnalyzerDiagnostic>),
}

/// External static analyzer boundary.
///
/// `analyze` may block for an arbitrary time; the engine treats it as a
/// suspension point and performs no work of its own while it runs. Transport
/// failures (the analyzer could not run at all) are the implementor's error
/// type; a module that ran through the analyzer but failed to parse is a
/// [`Rejected`](AnalysisVerdict::Rejected) verdict, not an error.
pub trait ValidationGate {
    type Error: std::error::Error + Send + Sync + 'static;

    fn analyze(&mut self, module: &Path) -> Result<AnalysisVerdict, Self::Error>;
}
