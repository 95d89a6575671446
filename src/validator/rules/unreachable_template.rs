//! Rule: Unreachable Template
//!
//! Warns about templates that no chain of steps/tasks starting at the
//! entrypoint invokes. They still render, and other workflows may reference
//! them by name, so this is only a warning.

use std::collections::BTreeSet;

use crate::model::{TemplateTarget, Workflow};

use super::super::{Diagnostic, ValidationRule};

pub struct UnreachableTemplateRule;

impl ValidationRule for UnreachableTemplateRule {
    fn id(&self) -> &'static str {
        "unreachable-template"
    }

    fn description(&self) -> &'static str {
        "Every template should be reachable from the entrypoint"
    }

    fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic> {
        // Reported by missing-entrypoint
        if workflow.template(&workflow.entrypoint).is_none() {
            return vec![];
        }

        let mut reached = BTreeSet::new();
        let mut pending = vec![workflow.entrypoint.as_str()];
        while let Some(name) = pending.pop() {
            if !reached.insert(name) {
                continue;
            }
            let Some(template) = workflow.template(name) else {
                continue;
            };
            for step in template.body.invocations() {
                if let TemplateTarget::Internal(callee) = &step.template {
                    pending.push(callee.as_str());
                }
            }
        }

        workflow
            .templates
            .keys()
            .filter(|name| !reached.contains(name))
            .map(|name| {
                Diagnostic::warning(
                    format!("template '{}'", name),
                    format!("not reachable from entrypoint '{}'", workflow.entrypoint),
                    self.id(),
                )
            })
            .collect()
    }
}
