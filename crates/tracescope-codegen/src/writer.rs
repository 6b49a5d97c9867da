//! Module and config assembly.
//!
//! The module artifact is laid out as a fixed sequence of marked blocks:
//! primer, expression variable declarations, expression operator
//! definitions, constants and model values, new definitions, definition
//! overrides, trace init, trace next, terminal property. Blocks with no
//! content are omitted entirely. Downstream tooling locates generated
//! regions by the marker comments, so the order is a contract and identical
//! in both synthesis phases.

use thiserror::Error;

use tracescope_ir::{
    Assignment, GeneratedArtifact, LaunchSpec, TerminalProperty, TraceExpression, TypedSet,
};

use crate::encoder;
use crate::registry::ExpressionRegistry;

/// Marker comments heading each generated block.
pub mod marker {
    pub const SUMMARY: &str = "\\* TRACE EXPLORER expression summary";
    pub const VARIABLES: &str = "\\* TRACE EXPLORER variable declarations @trace-expressions";
    pub const DEFINITIONS: &str = "\\* TRACE EXPLORER operator definitions @trace-expressions";
    pub const MODEL_VALUES: &str = "\\* MODEL model values @model-values";
    pub const NEW_DEFINITIONS: &str = "\\* MODEL new definitions @new-definitions";
    pub const OVERRIDES: &str = "\\* MODEL definition overrides @overrides";
    pub const TRACE_INIT: &str = "\\* TRACE initial predicate @trace-init";
    pub const TRACE_NEXT: &str = "\\* TRACE transition relation @trace-next";
    pub const TERMINAL: &str = "\\* TRACE terminal property @terminal-property";
}

const SEPARATOR: &str = "----";

/// Which synthesis pass is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisPhase {
    /// First pass: pre-parse trace encodings, no terminal property. Exists
    /// only so the analyzer can check the generated names and resolve
    /// expression levels.
    Speculative,
    /// Second pass: post-parse encodings, expression summary, and the
    /// selected terminal property. This is what the engine executes.
    Final,
}

/// Errors from artifact assembly. These indicate a launch spec that was
/// mutated past its validation, not a user mistake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("back-to-state target {target} is outside the recorded trace")]
    BackToStateTarget { target: usize },
}

/// Accumulates the module text and its companion config text.
#[derive(Debug, Default)]
pub struct ModuleWriter {
    module: String,
    config: String,
}

impl ModuleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One comment line per expression, recording its variable, source text,
    /// and resolved level. Emitted above the module header, which the
    /// analyzer ignores.
    pub fn add_expression_summary(&mut self, expressions: &[TraceExpression]) {
        self.module.push_str(marker::SUMMARY);
        self.module.push('\n');
        for (i, expr) in expressions.iter().enumerate() {
            self.module.push_str(&format!(
                "\\* {}: {} = {} (level: {})\n",
                i + 1,
                expr.variable(),
                expr.source(),
                expr.level()
            ));
        }
    }

    pub fn add_primer(&mut self, module_name: &str, extends: &str) {
        self.module
            .push_str(&format!("---- MODULE {module_name} ----\n"));
        self.module.push_str(&format!("EXTENDS {extends}, TLC\n\n"));
    }

    pub fn add_variable_declarations(&mut self, expressions: &[TraceExpression]) {
        if expressions.is_empty() {
            return;
        }
        let names: Vec<&str> = expressions.iter().map(TraceExpression::variable).collect();
        self.open_block(marker::VARIABLES);
        self.module
            .push_str(&format!("VARIABLES {}\n", names.join(", ")));
        self.close_block();
    }

    /// One operator definition per expression, binding the identifier to the
    /// user's source text verbatim.
    pub fn add_operator_definitions(&mut self, expressions: &[TraceExpression]) {
        if expressions.is_empty() {
            return;
        }
        self.open_block(marker::DEFINITIONS);
        for expr in expressions {
            self.module
                .push_str(&format!("{} == {}\n", expr.identifier(), expr.source()));
        }
        self.close_block();
    }

    /// Constant assignments go to the config; model values are additionally
    /// declared in the module and self-assigned in the config.
    pub fn add_constants(&mut self, constants: &[Assignment], model_values: &TypedSet) {
        for constant in constants {
            self.config
                .push_str(&format!("CONSTANT {} = {}\n", constant.name, constant.value));
        }
        if !model_values.is_empty() {
            self.open_block(marker::MODEL_VALUES);
            self.module
                .push_str(&format!("CONSTANTS {}\n", model_values.values.join(", ")));
            self.close_block();
            for value in &model_values.values {
                self.config.push_str(&format!("CONSTANT {value} = {value}\n"));
            }
        }
    }

    pub fn add_new_definitions(&mut self, text: &str) {
        self.open_block(marker::NEW_DEFINITIONS);
        self.module.push_str(text);
        if !text.ends_with('\n') {
            self.module.push('\n');
        }
        self.close_block();
    }

    /// Each override binds a generated identifier to the replacement text in
    /// the module and redirects the overridden name to it in the config, one
    /// config directive per module definition.
    pub fn add_overrides(&mut self, overrides: &[Assignment], registry: &mut ExpressionRegistry) {
        if overrides.is_empty() {
            return;
        }
        self.open_block(marker::OVERRIDES);
        for ov in overrides {
            let identifier = registry.fresh_identifier("def_ov");
            self.module
                .push_str(&format!("{identifier} == {}\n", ov.value));
            self.config
                .push_str(&format!("CONSTANT {} <- {identifier}\n", ov.name));
        }
        self.close_block();
    }

    /// Bind a formula under a fresh identifier in the module and reference
    /// it from the config under the given keyword.
    pub fn add_formula(&mut self, keyword: &str, block_marker: &str, identifier: &str, content: &str) {
        self.open_block(block_marker);
        self.module.push_str(&format!("{identifier} ==\n{content}\n"));
        self.close_block();
        self.config.push_str(&format!("{keyword}\n{identifier}\n"));
    }

    pub fn finish(mut self) -> GeneratedArtifact {
        self.module.push_str("====\n");
        GeneratedArtifact {
            module: self.module,
            config: self.config,
        }
    }

    fn open_block(&mut self, block_marker: &str) {
        self.module.push_str(block_marker);
        self.module.push('\n');
    }

    fn close_block(&mut self) {
        self.module.push_str(SEPARATOR);
        self.module.push_str("\n\n");
    }
}

/// Assemble the artifact for one phase.
///
/// This is a deterministic function of the launch spec, the registry state,
/// and the phase; the only free choice left to it is the fresh identifiers
/// it draws from the registry for formula names.
pub fn synthesize(
    spec: &LaunchSpec,
    module_name: &str,
    registry: &mut ExpressionRegistry,
    phase: SynthesisPhase,
) -> Result<GeneratedArtifact, SynthesisError> {
    let mut writer = ModuleWriter::new();

    if phase == SynthesisPhase::Final {
        writer.add_expression_summary(registry.expressions());
    }
    writer.add_primer(module_name, &spec.spec_module);
    writer.add_variable_declarations(registry.expressions());
    writer.add_operator_definitions(registry.expressions());
    writer.add_constants(&spec.constants, &spec.model_values);
    if let Some(definitions) = &spec.new_definitions {
        writer.add_new_definitions(definitions);
    }
    writer.add_overrides(&spec.overrides, registry);

    let (init, next) = match phase {
        SynthesisPhase::Speculative => (
            encoder::init_pre_parse(&spec.trace),
            encoder::next_pre_parse(&spec.trace),
        ),
        SynthesisPhase::Final => (
            encoder::init_post_parse(&spec.trace, registry.expressions()),
            encoder::next_post_parse(&spec.trace, registry.expressions()),
        ),
    };
    let init_identifier = registry.fresh_identifier("trace_init");
    writer.add_formula("INIT", marker::TRACE_INIT, &init_identifier, &init);
    let next_identifier = registry.fresh_identifier("trace_next");
    writer.add_formula("NEXT", marker::TRACE_NEXT, &next_identifier, &next);

    if phase == SynthesisPhase::Final {
        add_terminal_property(&mut writer, spec, registry)?;
    }

    Ok(writer.finish())
}

/// The single trailing property. The shapes are fixed per kind: the
/// invariant negates the final-state conjunction so the engine halts at the
/// recorded final state; the stuttering property is violated by a behavior
/// that eventually stutters on that state forever; the back-to-state
/// property is violated by a behavior that reaches the final state and later
/// revisits the target state.
fn add_terminal_property(
    writer: &mut ModuleWriter,
    spec: &LaunchSpec,
    registry: &mut ExpressionRegistry,
) -> Result<(), SynthesisError> {
    let (keyword, prefix, content) = match &spec.terminal {
        TerminalProperty::Invariant(conjunction) => {
            ("INVARIANT", "trace_inv", format!("~({conjunction})"))
        }
        TerminalProperty::Stuttering(conjunction) => {
            ("PROPERTY", "trace_prop", format!("~<>[]({conjunction})"))
        }
        TerminalProperty::BackToState {
            conjunction,
            target,
        } => {
            let state = spec
                .trace
                .state(*target)
                .ok_or(SynthesisError::BackToStateTarget { target: *target })?;
            let revisit = encoder::state_predicate(state);
            (
                "PROPERTY",
                "trace_prop",
                format!("~<>(({conjunction}) /\\ <>({revisit}))"),
            )
        }
    };
    let identifier = registry.fresh_identifier(prefix);
    writer.add_formula(keyword, marker::TERMINAL, &identifier, &content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracescope_ir::{attribute, AttributeMap, AttributeValue, TraceState};

    fn state(ordinal: usize, pairs: &[(&str, &str)]) -> TraceState {
        TraceState::new(
            ordinal,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn launch_attrs() -> AttributeMap {
        let mut attrs = AttributeMap::new();
        attrs
            .set(attribute::SPEC_MODULE, AttributeValue::Text("Base".into()))
            .set(
                attribute::MODEL_LOCATION,
                AttributeValue::Text("/tmp/model".into()),
            )
            .set(
                attribute::TRACE_INIT,
                AttributeValue::State(state(1, &[("x", "0"), ("y", "0")])),
            )
            .set(
                attribute::TRACE_NEXT,
                AttributeValue::States(vec![
                    state(2, &[("x", "1"), ("y", "0")]),
                    state(3, &[("x", "2"), ("y", "1")]),
                    state(4, &[("x", "3"), ("y", "3")]),
                ]),
            )
            .set(
                attribute::TRACE_EXPRESSIONS,
                AttributeValue::List(vec!["x + y".into(), "x' > y'".into()]),
            )
            .set(
                attribute::FINAL_STATE_CONJUNCTION,
                AttributeValue::Text("x = 3 /\\ y = 3".into()),
            );
        attrs
    }

    fn launch_spec(attrs: &AttributeMap) -> LaunchSpec {
        LaunchSpec::from_attributes(attrs).unwrap()
    }

    fn registry_for(spec: &LaunchSpec) -> ExpressionRegistry {
        let mut registry = ExpressionRegistry::new([]);
        registry.register(&spec.expressions);
        registry
    }

    /// Collapse runs of digits so artifacts from different registries can be
    /// compared modulo the uniqueness component of generated names.
    fn normalized(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut in_digits = false;
        for c in text.chars() {
            if c.is_ascii_digit() {
                if !in_digits {
                    out.push('#');
                }
                in_digits = true;
            } else {
                in_digits = false;
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_blocks_appear_in_fixed_order() {
        let mut attrs = launch_attrs();
        attrs
            .set(
                attribute::CONSTANTS,
                AttributeValue::Assignments(vec![Assignment::new("n", "4")]),
            )
            .set(attribute::MODEL_VALUES, AttributeValue::Text("{p1, p2}".into()))
            .set(
                attribute::NEW_DEFINITIONS,
                AttributeValue::Text("Bound == 10".into()),
            )
            .set(
                attribute::OVERRIDES,
                AttributeValue::Assignments(vec![Assignment::new("Op", "TRUE")]),
            );
        let spec = launch_spec(&attrs);
        let mut registry = registry_for(&spec);
        let artifact =
            synthesize(&spec, "Explore", &mut registry, SynthesisPhase::Final).unwrap();

        let markers = [
            marker::SUMMARY,
            marker::VARIABLES,
            marker::DEFINITIONS,
            marker::MODEL_VALUES,
            marker::NEW_DEFINITIONS,
            marker::OVERRIDES,
            marker::TRACE_INIT,
            marker::TRACE_NEXT,
            marker::TERMINAL,
        ];
        let positions: Vec<usize> = markers
            .iter()
            .map(|m| artifact.module.find(m).expect(m))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_blocks_are_omitted() {
        let spec = launch_spec(&launch_attrs());
        let mut registry = registry_for(&spec);
        let artifact =
            synthesize(&spec, "Explore", &mut registry, SynthesisPhase::Final).unwrap();
        assert!(!artifact.module.contains(marker::MODEL_VALUES));
        assert!(!artifact.module.contains(marker::NEW_DEFINITIONS));
        assert!(!artifact.module.contains(marker::OVERRIDES));
    }

    #[test]
    fn test_speculative_phase_has_no_terminal_property() {
        let spec = launch_spec(&launch_attrs());
        let mut registry = registry_for(&spec);
        let artifact =
            synthesize(&spec, "Explore", &mut registry, SynthesisPhase::Speculative).unwrap();
        assert!(!artifact.module.contains(marker::TERMINAL));
        assert!(!artifact.module.contains(marker::SUMMARY));
        assert!(!artifact.config.contains("INVARIANT"));
        assert!(!artifact.config.contains("PROPERTY"));
    }

    #[test]
    fn test_final_artifact_has_exactly_one_terminal_block() {
        for (extra, expected) in [
            (None, "INVARIANT"),
            (Some(attribute::IS_STUTTERING), "PROPERTY"),
            (Some(attribute::IS_BACK_TO_STATE), "PROPERTY"),
        ] {
            let mut attrs = launch_attrs();
            if let Some(flag) = extra {
                attrs.set(flag, AttributeValue::Flag(true));
                attrs.set(attribute::BACK_TO_STATE_TARGET, AttributeValue::Index(2));
            }
            let spec = launch_spec(&attrs);
            let mut registry = registry_for(&spec);
            let artifact =
                synthesize(&spec, "Explore", &mut registry, SynthesisPhase::Final).unwrap();
            assert_eq!(artifact.module.matches(marker::TERMINAL).count(), 1);
            assert!(artifact.config.contains(expected));
            let both = artifact.config.contains("INVARIANT") && artifact.config.contains("PROPERTY");
            assert!(!both, "config must carry a single terminal keyword");
        }
    }

    #[test]
    fn test_back_to_state_property_names_the_target_state() {
        let mut attrs = launch_attrs();
        attrs
            .set(attribute::IS_BACK_TO_STATE, AttributeValue::Flag(true))
            .set(attribute::BACK_TO_STATE_TARGET, AttributeValue::Index(2));
        let spec = launch_spec(&attrs);
        let mut registry = registry_for(&spec);
        let artifact =
            synthesize(&spec, "Explore", &mut registry, SynthesisPhase::Final).unwrap();
        assert!(artifact.module.contains("<>(x = 1 /\\ y = 0)"));
    }

    #[test]
    fn test_overrides_pair_module_and_config_lines() {
        let mut attrs = launch_attrs();
        attrs.set(
            attribute::OVERRIDES,
            AttributeValue::Assignments(vec![
                Assignment::new("Limit", "100"),
                Assignment::new("Op", "TRUE"),
            ]),
        );
        let spec = launch_spec(&attrs);
        let mut registry = registry_for(&spec);
        let artifact =
            synthesize(&spec, "Explore", &mut registry, SynthesisPhase::Final).unwrap();
        assert_eq!(artifact.config.matches(" <- def_ov_").count(), 2);
        assert!(artifact.config.contains("CONSTANT Limit <- def_ov_"));
        assert!(artifact.config.contains("CONSTANT Op <- def_ov_"));
        assert_eq!(artifact.module.matches("def_ov_").count(), 2);
    }

    #[test]
    fn test_concrete_four_state_scenario() {
        let spec = launch_spec(&launch_attrs());
        let mut registry = registry_for(&spec);
        let artifact =
            synthesize(&spec, "Explore", &mut registry, SynthesisPhase::Final).unwrap();

        let disjuncts = artifact
            .module
            .lines()
            .filter(|l| l.starts_with("\\/"))
            .count();
        assert_eq!(disjuncts, 3);

        let declared = artifact
            .module
            .lines()
            .find(|l| l.starts_with("VARIABLES"))
            .unwrap();
        assert_eq!(declared.matches("__trace_var_").count(), 2);

        assert!(artifact.module.contains(" == x + y"));
        assert!(artifact.module.contains(" == x' > y'"));
        assert!(artifact.module.starts_with(marker::SUMMARY));
        assert!(artifact.module.ends_with("====\n"));
    }

    #[test]
    fn test_rebuild_is_identical_modulo_generated_names() {
        let spec = launch_spec(&launch_attrs());
        let mut first = registry_for(&spec);
        let mut second = registry_for(&spec);
        let a = synthesize(&spec, "Explore", &mut first, SynthesisPhase::Speculative).unwrap();
        let b = synthesize(&spec, "Explore", &mut second, SynthesisPhase::Speculative).unwrap();
        assert_ne!(a.module, b.module);
        assert_eq!(normalized(&a.module), normalized(&b.module));
        assert_eq!(normalized(&a.config), normalized(&b.config));
    }
}
