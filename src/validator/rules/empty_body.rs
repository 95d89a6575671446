//! Rule: Empty Body
//!
//! A steps or DAG template with no steps/tasks runs nothing. That is legal
//! (and handy while sketching a workflow), so it is only a hint.

use crate::model::Workflow;

use super::super::{Diagnostic, ValidationRule};

pub struct EmptyBodyRule;

impl ValidationRule for EmptyBodyRule {
    fn id(&self) -> &'static str {
        "empty-body"
    }

    fn description(&self) -> &'static str {
        "Steps and DAG templates should invoke at least one template"
    }

    fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic> {
        workflow
            .templates
            .iter()
            .filter(|(_, template)| {
                matches!(template.body.kind(), "steps" | "dag") && template.body.invocations().is_empty()
            })
            .map(|(name, template)| {
                Diagnostic::hint(
                    format!("template '{}'", name),
                    format!("{} body has nothing to run", template.body.kind()),
                    self.id(),
                )
            })
            .collect()
    }
}
