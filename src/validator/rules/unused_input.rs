//! Rule: Unused Input
//!
//! Warns when a template declares an input that nothing in the template reads.
//!
//! # Notes
//!
//! - Inputs starting with `_` are exempt
//! - A string literal that spells out `inputs.parameters.NAME` (as scripts
//!   often do) counts as a use

use std::collections::BTreeSet;

use crate::expression::{Expr, ParamSource};
use crate::model::{LoopSpec, Template, TemplateBody, Workflow};
use crate::params::OutputSource;
use crate::render::embedded_expressions;

use super::super::{Diagnostic, ValidationRule};

pub struct UnusedInputRule;

impl ValidationRule for UnusedInputRule {
    fn id(&self) -> &'static str {
        "unused-input"
    }

    fn description(&self) -> &'static str {
        "Declared inputs should be read by the template"
    }

    fn validate(&self, workflow: &Workflow) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for (name, template) in workflow.templates.iter() {
            let used = used_inputs(template);
            for input in template.signature.inputs.keys() {
                if input.starts_with('_') || used.contains(input) {
                    continue;
                }
                diagnostics.push(Diagnostic::warning(
                    format!("template '{}'", name),
                    format!("input '{}' is declared but never used", input),
                    self.id(),
                ));
            }
        }
        diagnostics
    }
}

fn used_inputs(template: &Template) -> BTreeSet<String> {
    let mut exprs: Vec<Expr> = Vec::new();
    for (_, output) in template.signature.outputs.iter() {
        if let OutputSource::Expression(expr) = &output.source {
            exprs.push(expr.clone());
        }
    }

    match &template.body {
        TemplateBody::Steps(_) | TemplateBody::Dag(_) => {
            for step in template.body.invocations() {
                exprs.extend(step.arguments.iter().map(|(_, value)| value.clone()));
                exprs.extend(step.when.iter().cloned());
                match &step.loop_spec {
                    Some(LoopSpec::Param(expr)) | Some(LoopSpec::Sequence { count: expr }) => {
                        exprs.push(expr.clone())
                    }
                    Some(LoopSpec::Items(_)) | None => {}
                }
            }
        }
        TemplateBody::Container(container) => {
            exprs.extend(container.args.iter().cloned());
            exprs.extend(container.env.iter().map(|(_, value)| value.clone()));
        }
        TemplateBody::Resource(resource) => {
            exprs.extend(embedded_expressions(&resource.manifest));
        }
    }

    let mut used = BTreeSet::new();
    for expr in &exprs {
        collect(expr, &mut used);
    }

    // Textual references inside literal strings
    for name in template.signature.inputs.keys() {
        let needle = format!("inputs.parameters.{}", name);
        if exprs.iter().any(|expr| mentions(expr, &needle)) {
            used.insert(name.to_string());
        }
    }
    used
}

fn collect(expr: &Expr, used: &mut BTreeSet<String>) {
    for source in expr.references() {
        if let ParamSource::Input { name } = source {
            used.insert(name.clone());
        }
    }
}

fn mentions(expr: &Expr, needle: &str) -> bool {
    match expr {
        Expr::Literal { value, .. } => value.as_str().map_or(false, |s| mentions_text(s, needle)),
        other => other.children().into_iter().any(|child| mentions(child, needle)),
    }
}

/// `needle` occurs in `text` and is not the prefix of a longer name
fn mentions_text(text: &str, needle: &str) -> bool {
    text.match_indices(needle).any(|(at, _)| {
        text[at + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '-'))
    })
}
