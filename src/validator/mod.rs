//! Whole-workflow validation
//!
//! Builders reject ill-formed declarations one at a time. Some properties are
//! only visible once the whole tree exists (is the entrypoint set, is every
//! template reachable); those are checked here by a set of independent rules
//! when `WorkflowBuilder::get_full_scope` freezes the workflow.
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `validator/rules/`
//! 2. Implement [`ValidationRule`] for your struct
//! 3. Add it to [`Validator::new`]

pub mod rules;

use std::fmt;

use crate::model::Workflow;

/* ===================== Diagnostics ===================== */

/// One finding of a validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where in the workflow the issue sits (e.g. `template 'main'`)
    pub location: String,
    pub message: String,
    pub severity: Severity,
    /// Which rule produced this diagnostic
    pub rule_id: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The workflow cannot be used
    Error,
    /// Probably a mistake
    Warning,
    /// Suggestion
    Hint,
}

impl Diagnostic {
    pub fn error(location: impl Into<String>, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::new(Severity::Error, location, message, rule_id)
    }

    pub fn warning(location: impl Into<String>, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::new(Severity::Warning, location, message, rule_id)
    }

    pub fn hint(location: impl Into<String>, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::new(Severity::Hint, location, message, rule_id)
    }

    fn new(
        severity: Severity,
        location: impl Into<String>,
        message: impl Into<String>,
        rule_id: &'static str,
    ) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            severity,
            rule_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        };
        write!(
            f,
            "{} in {}: {} [{}]",
            severity, self.location, self.message, self.rule_id
        )
    }
}

/* ===================== Rules ===================== */

pub trait ValidationRule: Send + Sync {
    /// Unique identifier (e.g. "missing-entrypoint")
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Empty when the rule finds nothing
    fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic>;
}

/// Runs every registered rule
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::MissingEntrypointRule),
                Box::new(rules::UnreachableTemplateRule),
                Box::new(rules::UnusedInputRule),
                Box::new(rules::EmptyBodyRule),
            ],
        }
    }

    pub fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(workflow))
            .collect()
    }

    /// `(id, description)` of every registered rule
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/* ===================== Public API ===================== */

/// Run all built-in rules against `workflow`
pub fn validate_workflow(workflow: &Workflow) -> Vec<Diagnostic> {
    Validator::new().validate(workflow)
}

/// Whether any rule reports an error (warnings and hints do not count)
pub fn has_errors(workflow: &Workflow) -> bool {
    validate_workflow(workflow).iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests;
