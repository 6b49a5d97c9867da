//! JSON launch file read by `tracescope synth`.
//!
//! The file mirrors the attribute map the IDE host would assemble: the base
//! module name, the model directory, the recorded trace as a list of
//! variable/value objects in state order, and the optional model blocks.

use indexmap::IndexMap;
use serde::Deserialize;

use tracescope_ir::{attribute, Assignment, AttributeMap, AttributeValue, TraceState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct LaunchFile {
    pub spec_module: String,
    pub model_location: String,
    #[serde(default)]
    pub constants: Vec<Assignment>,
    #[serde(default)]
    pub model_values: String,
    #[serde(default)]
    pub new_definitions: Option<String>,
    #[serde(default)]
    pub overrides: Vec<Assignment>,
    #[serde(default)]
    pub trace: Vec<IndexMap<String, String>>,
    #[serde(default)]
    pub expressions: Vec<String>,
    #[serde(default)]
    pub final_state: String,
    #[serde(default)]
    pub stuttering: bool,
    #[serde(default)]
    pub back_to_state: Option<usize>,
}

impl LaunchFile {
    /// Lower the file into the attribute map the pipeline validates. An
    /// empty trace simply leaves the trace attributes unset; presence
    /// validation reports it from there.
    pub fn into_attributes(self) -> AttributeMap {
        let mut attrs = AttributeMap::new();
        attrs
            .set(
                attribute::SPEC_MODULE,
                AttributeValue::Text(self.spec_module),
            )
            .set(
                attribute::MODEL_LOCATION,
                AttributeValue::Text(self.model_location),
            )
            .set(
                attribute::TRACE_EXPRESSIONS,
                AttributeValue::List(self.expressions),
            )
            .set(
                attribute::FINAL_STATE_CONJUNCTION,
                AttributeValue::Text(self.final_state),
            );

        let mut states = self
            .trace
            .into_iter()
            .enumerate()
            .map(|(i, values)| TraceState::new(i + 1, values));
        if let Some(first) = states.next() {
            attrs.set(attribute::TRACE_INIT, AttributeValue::State(first));
            attrs.set(attribute::TRACE_NEXT, AttributeValue::States(states.collect()));
        }

        if !self.constants.is_empty() {
            attrs.set(
                attribute::CONSTANTS,
                AttributeValue::Assignments(self.constants),
            );
        }
        if !self.model_values.trim().is_empty() {
            attrs.set(
                attribute::MODEL_VALUES,
                AttributeValue::Text(self.model_values),
            );
        }
        if let Some(definitions) = self.new_definitions {
            attrs.set(
                attribute::NEW_DEFINITIONS,
                AttributeValue::Text(definitions),
            );
        }
        if !self.overrides.is_empty() {
            attrs.set(
                attribute::OVERRIDES,
                AttributeValue::Assignments(self.overrides),
            );
        }
        if self.stuttering {
            attrs.set(attribute::IS_STUTTERING, AttributeValue::Flag(true));
        }
        if let Some(target) = self.back_to_state {
            attrs.set(attribute::IS_BACK_TO_STATE, AttributeValue::Flag(true));
            attrs.set(
                attribute::BACK_TO_STATE_TARGET,
                AttributeValue::Index(target),
            );
        }
        attrs
    }
}
