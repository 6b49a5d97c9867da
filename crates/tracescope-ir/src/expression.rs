//! Trace expressions and their semantic levels.

use std::fmt;

/// Semantic level of a trace expression, as reported by the static analyzer.
///
/// Expressions start out [`Unresolved`](ExpressionLevel::Unresolved) and are
/// resolved exactly once from the analyzer's symbol table after the
/// speculative module has parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpressionLevel {
    #[default]
    Unresolved,
    Constant,
    State,
    Action,
    Temporal,
}

impl ExpressionLevel {
    /// Map the analyzer's numeric level (0..=3) to a level value.
    pub fn from_analyzer(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Constant),
            1 => Some(Self::State),
            2 => Some(Self::Action),
            3 => Some(Self::Temporal),
            _ => None,
        }
    }

    pub fn is_temporal(self) -> bool {
        self == Self::Temporal
    }

    pub fn is_resolved(self) -> bool {
        self != Self::Unresolved
    }
}

impl fmt::Display for ExpressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unresolved => "unresolved",
            Self::Constant => "constant",
            Self::State => "state",
            Self::Action => "action",
            Self::Temporal => "temporal",
        };
        f.write_str(name)
    }
}

/// A user-authored diagnostic expression together with the names synthesized
/// for it: the operator identifier its source text is bound to and the fresh
/// variable that tracks its value through the trace.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceExpression {
    source: String,
    identifier: String,
    variable: String,
    level: ExpressionLevel,
}

impl TraceExpression {
    pub fn new(source: String, identifier: String, variable: String) -> Self {
        Self {
            source,
            identifier,
            variable,
            level: ExpressionLevel::Unresolved,
        }
    }

    /// The expression exactly as the user wrote it.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The operator identifier the source text is bound to in the module.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The declared variable holding the expression's value.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn level(&self) -> ExpressionLevel {
        self.level
    }

    /// Record the level resolved from the analyzer's symbol table.
    ///
    /// Returns the previous level when it was already resolved, so the
    /// registry can reject a second resolution.
    pub fn resolve_level(&mut self, level: ExpressionLevel) -> Option<ExpressionLevel> {
        if self.level.is_resolved() {
            return Some(self.level);
        }
        self.level = level;
        None
    }
}
