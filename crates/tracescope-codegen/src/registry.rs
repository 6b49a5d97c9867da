//! Collision-free identifier and variable-name synthesis.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use thiserror::Error;

use tracescope_ir::{ExpressionLevel, TraceExpression};

/// Prefix of the operator identifier each expression is bound to.
pub const IDENTIFIER_PREFIX: &str = "trace_def";
/// Prefix of the declared variable tracking each expression's value.
pub const VARIABLE_PREFIX: &str = "__trace_var";

/// Per-process sequence mixed into each registry's stamp so that two
/// registries created within one clock tick still issue distinct names.
static INSTANCE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Errors from registry lookups. Both variants indicate an internal defect
/// in the pipeline, never a user mistake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("identifier '{0}' is not registered")]
    UnknownIdentifier(String),
    #[error("level of '{identifier}' was already resolved to {level}")]
    LevelAlreadyResolved {
        identifier: String,
        level: ExpressionLevel,
    },
}

/// Issues identifiers and variable names that are pairwise distinct and
/// disjoint from a caller-supplied reserved set.
///
/// Names have the shape `<prefix>_<stamp>_<n>`: the stamp is a
/// nanosecond-resolution timestamp disambiguated per registry instance, and
/// `n` counts issued names within the instance. Any candidate that collides
/// with a reserved or previously issued name is skipped. The stamp makes
/// names run-dependent by construction; consumers must not compare generated
/// names across runs.
#[derive(Debug)]
pub struct ExpressionRegistry {
    stamp: u128,
    counter: u64,
    reserved: HashSet<String>,
    issued: HashSet<String>,
    expressions: Vec<TraceExpression>,
    by_identifier: IndexMap<String, usize>,
}

impl ExpressionRegistry {
    pub fn new(reserved: impl IntoIterator<Item = String>) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let instance = INSTANCE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self::with_stamp(nanos.wrapping_add(u128::from(instance)), reserved)
    }

    fn with_stamp(stamp: u128, reserved: impl IntoIterator<Item = String>) -> Self {
        Self {
            stamp,
            counter: 0,
            reserved: reserved.into_iter().collect(),
            issued: HashSet::new(),
            expressions: Vec::new(),
            by_identifier: IndexMap::new(),
        }
    }

    /// Fixed-stamp constructor for deterministic tests.
    #[cfg(test)]
    pub(crate) fn seeded(stamp: u128, reserved: impl IntoIterator<Item = String>) -> Self {
        Self::with_stamp(stamp, reserved)
    }

    /// Issue a fresh name under the given prefix, skipping reserved and
    /// already issued names.
    pub fn fresh_identifier(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{prefix}_{}_{}", self.stamp, self.counter);
            self.counter += 1;
            if !self.reserved.contains(&candidate) && !self.issued.contains(&candidate) {
                self.issued.insert(candidate.clone());
                return candidate;
            }
        }
    }

    /// Register the user's expressions in the order given, assigning each an
    /// operator identifier and a variable name. The returned slice preserves
    /// registration order, which later drives comment and declaration order
    /// in the module.
    pub fn register(&mut self, sources: &[String]) -> &[TraceExpression] {
        for source in sources {
            let identifier = self.fresh_identifier(IDENTIFIER_PREFIX);
            let variable = self.fresh_identifier(VARIABLE_PREFIX);
            self.by_identifier
                .insert(identifier.clone(), self.expressions.len());
            self.expressions
                .push(TraceExpression::new(source.clone(), identifier, variable));
        }
        &self.expressions
    }

    /// Record the analyzer-resolved level for one expression. An unknown
    /// identifier or a second resolution is a defect in the pipeline that
    /// produced it.
    pub fn set_level(
        &mut self,
        identifier: &str,
        level: ExpressionLevel,
    ) -> Result<(), RegistryError> {
        let index = *self
            .by_identifier
            .get(identifier)
            .ok_or_else(|| RegistryError::UnknownIdentifier(identifier.to_string()))?;
        match self.expressions[index].resolve_level(level) {
            None => Ok(()),
            Some(previous) => Err(RegistryError::LevelAlreadyResolved {
                identifier: identifier.to_string(),
                level: previous,
            }),
        }
    }

    /// Registered expressions in registration order.
    pub fn expressions(&self) -> &[TraceExpression] {
        &self.expressions
    }

    /// Expressions whose resolved level is temporal.
    pub fn temporal_expressions(&self) -> Vec<&TraceExpression> {
        self.expressions
            .iter()
            .filter(|e| e.level().is_temporal())
            .collect()
    }
}
