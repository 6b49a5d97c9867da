//! Recorded counterexample traces.
//!
//! A trace is the ordered sequence of states the checker reported for a
//! counterexample. Values are kept as the literal text the checker printed;
//! nothing here ever evaluates or reinterprets them.

use indexmap::IndexMap;
use thiserror::Error;

/// Errors raised while capturing a trace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("a trace must contain at least one state")]
    Empty,
    #[error("state {found} is out of order, expected ordinal {expected}")]
    OutOfOrder { expected: usize, found: usize },
    #[error("state {ordinal} does not share the variable set of state 1")]
    VariableMismatch { ordinal: usize },
}

/// One recorded state: an ordinal (1-based) and the value text of every
/// variable at that state, in the checker's declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceState {
    ordinal: usize,
    values: IndexMap<String, String>,
}

impl TraceState {
    pub fn new(ordinal: usize, values: IndexMap<String, String>) -> Self {
        Self { ordinal, values }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Variable/value pairs in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn same_variables(&self, other: &TraceState) -> bool {
        self.values.len() == other.values.len()
            && self.values.keys().all(|k| other.values.contains_key(k))
    }
}

/// An ordered, non-empty sequence of states sharing one variable set.
///
/// Construction validates the shape once; the trace is immutable afterwards
/// for the lifetime of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Trace {
    states: Vec<TraceState>,
}

impl Trace {
    /// Capture a trace, checking that it is non-empty, that ordinals run
    /// 1..=N, and that every state carries the same variable set as the
    /// first.
    pub fn new(states: Vec<TraceState>) -> Result<Self, TraceError> {
        let first = states.first().ok_or(TraceError::Empty)?;
        for (i, state) in states.iter().enumerate() {
            if state.ordinal != i + 1 {
                return Err(TraceError::OutOfOrder {
                    expected: i + 1,
                    found: state.ordinal,
                });
            }
            if !state.same_variables(first) {
                return Err(TraceError::VariableMismatch {
                    ordinal: state.ordinal,
                });
            }
        }
        Ok(Self { states })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn states(&self) -> &[TraceState] {
        &self.states
    }

    pub fn first(&self) -> &TraceState {
        &self.states[0]
    }

    /// Look up a state by its 1-based ordinal.
    pub fn state(&self, ordinal: usize) -> Option<&TraceState> {
        ordinal.checked_sub(1).and_then(|i| self.states.get(i))
    }

    /// The shared variable set, in the first state's declaration order.
    pub fn variables(&self) -> Vec<&str> {
        self.states[0].values().map(|(name, _)| name).collect()
    }
}
