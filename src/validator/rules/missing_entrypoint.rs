//! Rule: Missing Entrypoint
//!
//! The engine starts every run at the entrypoint template, so a workflow
//! without one (or with one naming an undeclared template) cannot be
//! submitted.

use crate::model::Workflow;

use super::super::{Diagnostic, ValidationRule};

pub struct MissingEntrypointRule;

impl ValidationRule for MissingEntrypointRule {
    fn id(&self) -> &'static str {
        "missing-entrypoint"
    }

    fn description(&self) -> &'static str {
        "A workflow must name a declared template as its entrypoint"
    }

    fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic> {
        let location = format!("workflow '{}'", workflow.name);
        if workflow.entrypoint.is_empty() {
            return vec![Diagnostic::error(location, "no entrypoint is set", self.id())];
        }
        if workflow.template(&workflow.entrypoint).is_none() {
            return vec![Diagnostic::error(
                location,
                format!("entrypoint '{}' is not a declared template", workflow.entrypoint),
                self.id(),
            )];
        }
        vec![]
    }
}
