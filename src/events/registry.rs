//! Declared ordering metadata for handler types.
//!
//! Stands in for attribute discovery in the host application: whatever
//! mechanism the host uses (reflection, codegen, hand registration)
//! feeds a mapping from implementing type to ordering rules, and the
//! router turns those rules into solver constraints.

use crate::ordering::Constraint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single declared ordering rule for a handler type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingRule {
    /// Run before every handler without a `RunFirst` rule.
    RunFirst,
    /// Run after every handler without a `RunLast` rule.
    RunLast,
    /// Run before the named handler type.
    Before(String),
    /// Run after the named handler type.
    After(String),
}

/// Ordering rules keyed by implementing-type name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HandlerRegistry {
    rules: HashMap<String, Vec<OrderingRule>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) the rules for a handler type.
    pub fn declare(&mut self, type_name: impl Into<String>, rules: Vec<OrderingRule>) {
        self.rules.insert(type_name.into(), rules);
    }

    pub fn rules_for(&self, type_name: &str) -> &[OrderingRule] {
        self.rules
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Translate declared rules into index constraints over `types`.
///
/// `types` lists the participating handler types in registration
/// order; the returned constraints refer to indices into that slice.
/// Rules naming a type that is not participating are ignored, matching
/// how attribute discovery skips types that are not loaded.
pub fn constraints_for(types: &[String], registry: &HandlerRegistry) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    for (index, type_name) in types.iter().enumerate() {
        for rule in registry.rules_for(type_name) {
            match rule {
                OrderingRule::RunFirst => constraints.push(Constraint::First(index)),
                OrderingRule::RunLast => constraints.push(Constraint::Last(index)),
                OrderingRule::Before(other) => {
                    if let Some(other_index) = position_of(types, other, index) {
                        constraints.push(Constraint::Before(index, other_index));
                    }
                }
                OrderingRule::After(other) => {
                    if let Some(other_index) = position_of(types, other, index) {
                        constraints.push(Constraint::After(index, other_index));
                    }
                }
            }
        }
    }

    constraints
}

fn position_of(types: &[String], name: &str, except: usize) -> Option<usize> {
    types
        .iter()
        .position(|candidate| candidate == name)
        .filter(|&found| found != except)
}
