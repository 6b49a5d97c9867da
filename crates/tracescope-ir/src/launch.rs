//! Launch spec: the aggregated configuration driving one pipeline run.
//!
//! Hosts hand over a generic attribute-keyed map; [`LaunchSpec::from_attributes`]
//! validates presence and shape only. Whether the configured text is
//! semantically meaningful is established later by the validation gate.

use std::path::PathBuf;

use indexmap::IndexMap;
use thiserror::Error;

use crate::trace::{Trace, TraceError, TraceState};

/// Well-known attribute names of the launch map.
pub mod attribute {
    pub const SPEC_MODULE: &str = "spec-module";
    pub const MODEL_LOCATION: &str = "model-location";
    pub const CONSTANTS: &str = "constants";
    pub const MODEL_VALUES: &str = "model-values";
    pub const NEW_DEFINITIONS: &str = "new-definitions";
    pub const OVERRIDES: &str = "overrides";
    pub const TRACE_EXPRESSIONS: &str = "trace-expressions";
    pub const TRACE_INIT: &str = "trace-init";
    pub const TRACE_NEXT: &str = "trace-next";
    pub const FINAL_STATE_CONJUNCTION: &str = "final-state-conjunction";
    pub const BACK_TO_STATE_TARGET: &str = "back-to-state-target";
    pub const IS_STUTTERING: &str = "is-stuttering";
    pub const IS_BACK_TO_STATE: &str = "is-back-to-state";
}

/// A named assignment, used both for constant bindings and definition
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    pub name: String,
    pub value: String,
}

impl Assignment {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A typed model-value set, written `{a, b, c}` with an optional type tag in
/// front of the braces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TypedSet {
    pub type_tag: Option<String>,
    pub values: Vec<String>,
}

impl TypedSet {
    /// Parse a set literal. The empty string parses to the empty set; no
    /// further validation happens here.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }
        let (tag, body) = match text.find('{') {
            Some(open) => {
                let tag = text[..open].trim();
                let body = text[open + 1..].trim_end_matches('}');
                ((!tag.is_empty()).then(|| tag.to_string()), body)
            }
            None => (None, text),
        };
        let values = body
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            type_tag: tag,
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The single terminal property attached to the final module.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminalProperty {
    /// Plain invariant built from the final-state conjunction.
    Invariant(String),
    /// The trace ends in stuttering at its final state.
    Stuttering(String),
    /// The trace loops back to an earlier state, named by its 1-based
    /// ordinal.
    BackToState { conjunction: String, target: usize },
}

impl TerminalProperty {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invariant(_) => "invariant",
            Self::Stuttering(_) => "stuttering",
            Self::BackToState { .. } => "back-to-state",
        }
    }
}

/// One value of the host-supplied attribute map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    Text(String),
    Flag(bool),
    Index(usize),
    List(Vec<String>),
    Assignments(Vec<Assignment>),
    State(TraceState),
    States(Vec<TraceState>),
}

impl AttributeValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Flag(_) => "flag",
            Self::Index(_) => "index",
            Self::List(_) => "list",
            Self::Assignments(_) => "assignments",
            Self::State(_) => "state",
            Self::States(_) => "states",
        }
    }
}

/// Generic attribute-keyed configuration map, insertion ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeMap {
    entries: IndexMap<String, AttributeValue>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) -> &mut Self {
        self.entries.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(name)
    }
}

/// Launch configuration that fails presence or shape validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("launch attribute '{0}' is missing")]
    MissingAttribute(&'static str),
    #[error("launch attribute '{name}' has kind {found}, expected {expected}")]
    WrongKind {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("recorded trace is malformed: {0}")]
    Trace(#[from] TraceError),
    #[error("back-to-state target {target} is not an ordinal of the {len}-state trace")]
    BackToStateTarget { target: usize, len: usize },
}

/// Aggregated configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Base specification module the generated module extends.
    pub spec_module: String,
    /// Directory the artifact files are written to.
    pub model_location: PathBuf,
    pub constants: Vec<Assignment>,
    pub model_values: TypedSet,
    pub new_definitions: Option<String>,
    pub overrides: Vec<Assignment>,
    /// The recorded counterexample trace.
    pub trace: Trace,
    /// Raw expression sources, in the order the user listed them.
    pub expressions: Vec<String>,
    pub terminal: TerminalProperty,
}

impl LaunchSpec {
    /// Build a launch spec from a host attribute map.
    ///
    /// Required attributes: `spec-module`, `model-location`, `trace-init`,
    /// `trace-next`, `trace-expressions`, and `final-state-conjunction`.
    /// The remaining attributes default to empty when absent; absent blocks
    /// are simply omitted from the generated module.
    ///
    /// Conflicting terminal-property flags resolve with stuttering winning
    /// over back-to-state winning over the plain invariant.
    pub fn from_attributes(attrs: &AttributeMap) -> Result<Self, StructuralError> {
        let spec_module = required_text(attrs, attribute::SPEC_MODULE)?.to_string();
        let model_location = PathBuf::from(required_text(attrs, attribute::MODEL_LOCATION)?);

        let first = match attrs.get(attribute::TRACE_INIT) {
            Some(AttributeValue::State(state)) => state.clone(),
            Some(other) => return Err(wrong_kind(attribute::TRACE_INIT, "state", other)),
            None => return Err(StructuralError::MissingAttribute(attribute::TRACE_INIT)),
        };
        let rest = match attrs.get(attribute::TRACE_NEXT) {
            Some(AttributeValue::States(states)) => states.clone(),
            Some(other) => return Err(wrong_kind(attribute::TRACE_NEXT, "states", other)),
            None => return Err(StructuralError::MissingAttribute(attribute::TRACE_NEXT)),
        };
        let mut states = Vec::with_capacity(1 + rest.len());
        states.push(first);
        states.extend(rest);
        let trace = Trace::new(states)?;

        let expressions = match attrs.get(attribute::TRACE_EXPRESSIONS) {
            Some(AttributeValue::List(list)) => list.clone(),
            Some(other) => return Err(wrong_kind(attribute::TRACE_EXPRESSIONS, "list", other)),
            None => {
                return Err(StructuralError::MissingAttribute(
                    attribute::TRACE_EXPRESSIONS,
                ))
            }
        };

        let final_state = required_text(attrs, attribute::FINAL_STATE_CONJUNCTION)?.to_string();
        let stuttering = flag(attrs, attribute::IS_STUTTERING)?;
        let back_to_state = flag(attrs, attribute::IS_BACK_TO_STATE)?;
        let terminal = if stuttering {
            TerminalProperty::Stuttering(final_state)
        } else if back_to_state {
            let target = match attrs.get(attribute::BACK_TO_STATE_TARGET) {
                Some(AttributeValue::Index(i)) => *i,
                Some(other) => {
                    return Err(wrong_kind(attribute::BACK_TO_STATE_TARGET, "index", other))
                }
                None => {
                    return Err(StructuralError::MissingAttribute(
                        attribute::BACK_TO_STATE_TARGET,
                    ))
                }
            };
            if trace.state(target).is_none() {
                return Err(StructuralError::BackToStateTarget {
                    target,
                    len: trace.len(),
                });
            }
            TerminalProperty::BackToState {
                conjunction: final_state,
                target,
            }
        } else {
            TerminalProperty::Invariant(final_state)
        };

        Ok(Self {
            spec_module,
            model_location,
            constants: assignments(attrs, attribute::CONSTANTS)?,
            model_values: match attrs.get(attribute::MODEL_VALUES) {
                Some(AttributeValue::Text(text)) => TypedSet::parse(text),
                Some(other) => return Err(wrong_kind(attribute::MODEL_VALUES, "text", other)),
                None => TypedSet::default(),
            },
            new_definitions: match attrs.get(attribute::NEW_DEFINITIONS) {
                Some(AttributeValue::Text(text)) if !text.trim().is_empty() => {
                    Some(text.clone())
                }
                Some(AttributeValue::Text(_)) | None => None,
                Some(other) => return Err(wrong_kind(attribute::NEW_DEFINITIONS, "text", other)),
            },
            overrides: assignments(attrs, attribute::OVERRIDES)?,
            trace,
            expressions,
            terminal,
        })
    }
}

fn wrong_kind(
    name: &'static str,
    expected: &'static str,
    found: &AttributeValue,
) -> StructuralError {
    StructuralError::WrongKind {
        name,
        expected,
        found: found.kind(),
    }
}

fn required_text<'a>(attrs: &'a AttributeMap, name: &'static str) -> Result<&'a str, StructuralError> {
    match attrs.get(name) {
        Some(AttributeValue::Text(text)) => Ok(text),
        Some(other) => Err(wrong_kind(name, "text", other)),
        None => Err(StructuralError::MissingAttribute(name)),
    }
}

fn flag(attrs: &AttributeMap, name: &'static str) -> Result<bool, StructuralError> {
    match attrs.get(name) {
        Some(AttributeValue::Flag(value)) => Ok(*value),
        Some(other) => Err(wrong_kind(name, "flag", other)),
        None => Ok(false),
    }
}

fn assignments(
    attrs: &AttributeMap,
    name: &'static str,
) -> Result<Vec<Assignment>, StructuralError> {
    match attrs.get(name) {
        Some(AttributeValue::Assignments(list)) => Ok(list.clone()),
        Some(other) => Err(wrong_kind(name, "assignments", other)),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ordinal: usize, pairs: &[(&str, &str)]) -> TraceState {
        TraceState::new(
            ordinal,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn minimal_attrs() -> AttributeMap {
        let mut attrs = AttributeMap::new();
        attrs
            .set(attribute::SPEC_MODULE, AttributeValue::Text("Base".into()))
            .set(
                attribute::MODEL_LOCATION,
                AttributeValue::Text("/tmp/model".into()),
            )
            .set(
                attribute::TRACE_INIT,
                AttributeValue::State(state(1, &[("x", "0")])),
            )
            .set(
                attribute::TRACE_NEXT,
                AttributeValue::States(vec![state(2, &[("x", "1")])]),
            )
            .set(
                attribute::TRACE_EXPRESSIONS,
                AttributeValue::List(vec!["x + 1".into()]),
            )
            .set(
                attribute::FINAL_STATE_CONJUNCTION,
                AttributeValue::Text("x = 1".into()),
            );
        attrs
    }

    #[test]
    fn test_missing_required_attribute() {
        let mut attrs = minimal_attrs();
        attrs.entries.shift_remove(attribute::TRACE_INIT);
        let err = LaunchSpec::from_attributes(&attrs).unwrap_err();
        assert_eq!(
            err,
            StructuralError::MissingAttribute(attribute::TRACE_INIT)
        );
    }

    #[test]
    fn test_wrong_attribute_kind() {
        let mut attrs = minimal_attrs();
        attrs.set(attribute::TRACE_EXPRESSIONS, AttributeValue::Flag(true));
        let err = LaunchSpec::from_attributes(&attrs).unwrap_err();
        assert!(matches!(err, StructuralError::WrongKind { .. }));
    }

    #[test]
    fn test_default_terminal_is_invariant() {
        let spec = LaunchSpec::from_attributes(&minimal_attrs()).unwrap();
        assert_eq!(spec.terminal, TerminalProperty::Invariant("x = 1".into()));
    }

    #[test]
    fn test_stuttering_wins_over_back_to_state() {
        let mut attrs = minimal_attrs();
        attrs
            .set(attribute::IS_STUTTERING, AttributeValue::Flag(true))
            .set(attribute::IS_BACK_TO_STATE, AttributeValue::Flag(true))
            .set(attribute::BACK_TO_STATE_TARGET, AttributeValue::Index(1));
        let spec = LaunchSpec::from_attributes(&attrs).unwrap();
        assert_eq!(spec.terminal.kind(), "stuttering");
    }

    #[test]
    fn test_back_to_state_wins_over_invariant() {
        let mut attrs = minimal_attrs();
        attrs
            .set(attribute::IS_BACK_TO_STATE, AttributeValue::Flag(true))
            .set(attribute::BACK_TO_STATE_TARGET, AttributeValue::Index(1));
        let spec = LaunchSpec::from_attributes(&attrs).unwrap();
        assert_eq!(spec.terminal.kind(), "back-to-state");
    }

    #[test]
    fn test_back_to_state_target_must_be_an_ordinal() {
        let mut attrs = minimal_attrs();
        attrs
            .set(attribute::IS_BACK_TO_STATE, AttributeValue::Flag(true))
            .set(attribute::BACK_TO_STATE_TARGET, AttributeValue::Index(9));
        let err = LaunchSpec::from_attributes(&attrs).unwrap_err();
        assert_eq!(err, StructuralError::BackToStateTarget { target: 9, len: 2 });
    }

    #[test]
    fn test_typed_set_parsing() {
        let set = TypedSet::parse("{a, b, c}");
        assert_eq!(set.type_tag, None);
        assert_eq!(set.values, vec!["a", "b", "c"]);

        let tagged = TypedSet::parse("P{p1, p2}");
        assert_eq!(tagged.type_tag.as_deref(), Some("P"));
        assert_eq!(tagged.values, vec!["p1", "p2"]);

        assert!(TypedSet::parse("  ").is_empty());
    }

    #[test]
    fn test_blank_new_definitions_treated_as_absent() {
        let mut attrs = minimal_attrs();
        attrs.set(attribute::NEW_DEFINITIONS, AttributeValue::Text("  ".into()));
        let spec = LaunchSpec::from_attributes(&attrs).unwrap();
        assert_eq!(spec.new_definitions, None);
    }
}
