//! Trace encoding: initial predicate and transition relation text.
//!
//! The pre-parse renditions use only the trace's original variables and
//! exist to detect drift between the base specification and the recorded
//! trace (a removed variable fails to parse). The post-parse renditions add
//! one conjunct per expression variable, referencing the expression's
//! declared operator at the unprimed and primed positions. The encoder only
//! names operators; it never computes their values.

use tracescope_ir::{Trace, TraceExpression, TraceState};

/// Rendition of a transition relation over zero transitions.
///
/// A one-state trace records no transitions, so the relation is the empty
/// disjunction. It is rendered as the always-false predicate to keep the
/// module parseable, and the pre- and post-parse renditions agree on it.
pub const EMPTY_NEXT: &str = "FALSE";

/// Initial predicate over the trace's first state, original variables only.
pub fn init_pre_parse(trace: &Trace) -> String {
    init_conjunction(trace.first(), &[])
}

/// Initial predicate including one conjunct per expression variable.
pub fn init_post_parse(trace: &Trace, expressions: &[TraceExpression]) -> String {
    init_conjunction(trace.first(), expressions)
}

/// Transition relation over the original variables: one disjunct per
/// recorded transition, so a trace of N states yields N-1 disjuncts.
pub fn next_pre_parse(trace: &Trace) -> String {
    next_disjunction(trace, &[])
}

/// Transition relation additionally binding each expression variable at the
/// unprimed and primed positions of every transition.
pub fn next_post_parse(trace: &Trace, expressions: &[TraceExpression]) -> String {
    next_disjunction(trace, expressions)
}

/// One-line conjunction of a single state's variable values.
pub fn state_predicate(state: &TraceState) -> String {
    let conjuncts: Vec<String> = state
        .values()
        .map(|(name, value)| format!("{name} = {value}"))
        .collect();
    conjuncts.join(" /\\ ")
}

fn init_conjunction(first: &TraceState, expressions: &[TraceExpression]) -> String {
    let mut out = String::new();
    for (name, value) in first.values() {
        out.push_str(&format!("/\\ {name} = {value}\n"));
    }
    for expr in expressions {
        out.push_str(&format!("/\\ {} = {}\n", expr.variable(), expr.identifier()));
    }
    out.pop();
    out
}

fn next_disjunction(trace: &Trace, expressions: &[TraceExpression]) -> String {
    if trace.len() == 1 {
        return EMPTY_NEXT.to_string();
    }
    let mut disjuncts = Vec::with_capacity(trace.len() - 1);
    for pair in trace.states().windows(2) {
        let mut conjuncts = Vec::new();
        for (name, value) in pair[0].values() {
            conjuncts.push(format!("{name} = {value}"));
        }
        for (name, value) in pair[1].values() {
            conjuncts.push(format!("{name}' = {value}"));
        }
        for expr in expressions {
            conjuncts.push(format!("{} = {}", expr.variable(), expr.identifier()));
            conjuncts.push(format!("{}' = {}'", expr.variable(), expr.identifier()));
        }
        disjuncts.push(format!("\\/ (/\\ {})", conjuncts.join(" /\\ ")));
    }
    disjuncts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use proptest::prelude::*;
    use tracescope_ir::TraceState;

    fn state(ordinal: usize, pairs: &[(&str, &str)]) -> TraceState {
        TraceState::new(
            ordinal,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn four_state_trace() -> Trace {
        Trace::new(vec![
            state(1, &[("x", "0"), ("y", "0")]),
            state(2, &[("x", "1"), ("y", "0")]),
            state(3, &[("x", "2"), ("y", "1")]),
            state(4, &[("x", "3"), ("y", "3")]),
        ])
        .unwrap()
    }

    fn expressions() -> Vec<TraceExpression> {
        vec![
            TraceExpression::new("x + y".into(), "d_1".into(), "v_1".into()),
            TraceExpression::new("x' > y'".into(), "d_2".into(), "v_2".into()),
        ]
    }

    fn disjuncts(text: &str) -> Vec<&str> {
        text.lines().filter(|l| l.starts_with("\\/")).collect()
    }

    #[test]
    fn test_init_pre_parse_uses_original_variables_only() {
        let text = init_pre_parse(&four_state_trace());
        assert_eq!(text, "/\\ x = 0\n/\\ y = 0");
    }

    #[test]
    fn test_init_post_parse_appends_expression_variables() {
        let text = init_post_parse(&four_state_trace(), &expressions());
        assert_eq!(
            text,
            "/\\ x = 0\n/\\ y = 0\n/\\ v_1 = d_1\n/\\ v_2 = d_2"
        );
    }

    #[test]
    fn test_next_has_one_disjunct_per_transition() {
        let text = next_pre_parse(&four_state_trace());
        let lines = disjuncts(&text);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "\\/ (/\\ x = 0 /\\ y = 0 /\\ x' = 1 /\\ y' = 0)");
        assert_eq!(lines[2], "\\/ (/\\ x = 2 /\\ y = 1 /\\ x' = 3 /\\ y' = 3)");
    }

    #[test]
    fn test_next_post_parse_references_operators_both_ways() {
        let text = next_post_parse(&four_state_trace(), &expressions());
        for line in disjuncts(&text) {
            assert!(line.contains("v_1 = d_1"));
            assert!(line.contains("v_1' = d_1'"));
            assert!(line.contains("v_2 = d_2"));
            assert!(line.contains("v_2' = d_2'"));
        }
    }

    #[test]
    fn test_single_state_trace_degenerates_to_false() {
        let trace = Trace::new(vec![state(1, &[("x", "0")])]).unwrap();
        assert_eq!(next_pre_parse(&trace), EMPTY_NEXT);
        assert_eq!(next_post_parse(&trace, &expressions()), EMPTY_NEXT);
    }

    #[test]
    fn test_state_predicate_is_single_line() {
        let text = state_predicate(&state(3, &[("x", "2"), ("y", "1")]));
        assert_eq!(text, "x = 2 /\\ y = 1");
    }

    fn arb_trace() -> impl Strategy<Value = Trace> {
        (
            proptest::collection::vec("[a-z][a-z0-9]{0,4}", 1..5),
            1usize..8,
        )
            .prop_map(|(mut vars, len)| {
                vars.sort_unstable();
                vars.dedup();
                let states = (1..=len)
                    .map(|ordinal| {
                        let values: IndexMap<String, String> = vars
                            .iter()
                            .map(|v| (v.clone(), format!("{ordinal}")))
                            .collect();
                        TraceState::new(ordinal, values)
                    })
                    .collect();
                Trace::new(states).unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_disjunct_count_is_length_minus_one(trace in arb_trace()) {
            let text = next_pre_parse(&trace);
            if trace.len() == 1 {
                prop_assert_eq!(text, EMPTY_NEXT);
            } else {
                prop_assert_eq!(disjuncts(&text).len(), trace.len() - 1);
            }
        }

        #[test]
        fn prop_every_variable_primed_and_unprimed(trace in arb_trace()) {
            prop_assume!(trace.len() > 1);
            let text = next_pre_parse(&trace);
            for line in disjuncts(&text) {
                for var in trace.variables() {
                    let unprimed = format!("{} = ", var);
                    let primed = format!("{}' = ", var);
                    prop_assert!(line.contains(&unprimed));
                    prop_assert!(line.contains(&primed));
                }
            }
        }
    }
}
