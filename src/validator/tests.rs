//! Tests for the validation rules

use super::*;
use crate::builder::{InputScope, TemplateRef, WorkflowBuilder};
use crate::error::BuildError;
use crate::model::{Resources, Template, TemplateBody, TemplateSignature};
use crate::scope::{Scope, ScopeKind};
use crate::types::ValueType;

/* ===================== Helpers ===================== */

fn has_rule(diagnostics: &[Diagnostic], rule_id: &str) -> bool {
    diagnostics.iter().any(|d| d.rule_id == rule_id)
}

fn for_rule<'a>(diagnostics: &'a [Diagnostic], rule_id: &str) -> Vec<&'a Diagnostic> {
    diagnostics.iter().filter(|d| d.rule_id == rule_id).collect()
}

/// A workflow with a single empty steps template, assembled by hand
fn bare_workflow(entrypoint: &str) -> Workflow {
    let main = Template {
        name: "main".to_string(),
        signature: TemplateSignature::empty(),
        body: TemplateBody::Steps(vec![]),
    };
    Workflow {
        name: "bare".to_string(),
        service_account: "default".to_string(),
        parallelism: None,
        parameters: Scope::new(ScopeKind::WorkflowParameters),
        templates: Scope::new(ScopeKind::Templates)
            .with("main", main)
            .expect("fresh scope"),
        entrypoint: entrypoint.to_string(),
    }
}

fn echo_builder() -> WorkflowBuilder {
    WorkflowBuilder::new("echo")
        .add_template("echo", |t| {
            Ok(t.add_required_input("message", ValueType::String)?
                .container()
                .image("alpine:3")
                .inline_script("echo {{inputs.parameters.message}}")
                .resources(Resources::guaranteed("50m", "32Mi")))
        })
        .expect("echo template")
}

/* ===================== Missing Entrypoint ===================== */

#[test]
fn test_missing_entrypoint_unset() {
    let diagnostics = validate_workflow(&bare_workflow(""));
    let found = for_rule(&diagnostics, "missing-entrypoint");
    assert_eq!(found.len(), 1);
    assert!(found[0].is_error());
    assert!(found[0].message.contains("no entrypoint"));
}

#[test]
fn test_missing_entrypoint_unknown_template() {
    let diagnostics = validate_workflow(&bare_workflow("nope"));
    let found = for_rule(&diagnostics, "missing-entrypoint");
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("'nope'"));
    assert!(has_errors(&bare_workflow("nope")));
}

#[test]
fn test_get_full_scope_fails_without_entrypoint() {
    let err = echo_builder().get_full_scope().unwrap_err();
    match err {
        BuildError::Validation(diagnostics) => {
            assert!(has_rule(&diagnostics, "missing-entrypoint"));
            assert!(diagnostics.iter().all(Diagnostic::is_error));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

/* ===================== Unreachable Template ===================== */

#[test]
fn test_unreachable_template_warns() {
    let workflow = echo_builder()
        .add_template("main", |t| Ok(t.steps()))
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let diagnostics = validate_workflow(&workflow);
    let found = for_rule(&diagnostics, "unreachable-template");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location, "template 'echo'");
    assert_eq!(found[0].severity, Severity::Warning);
    assert!(!has_errors(&workflow));
}

#[test]
fn test_reachable_through_steps() {
    let workflow = echo_builder()
        .add_template("main", |t| {
            t.steps().add_step("say", TemplateRef::internal("echo"), |b| {
                b.set("message", "hi")?;
                Ok(())
            })
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    assert!(!has_rule(&validate_workflow(&workflow), "unreachable-template"));
}

/* ===================== Unused Input ===================== */

#[test]
fn test_unused_input_warns() {
    let workflow = WorkflowBuilder::new("w")
        .add_template("main", |t| {
            Ok(t.add_required_input("ignored", ValueType::String)?
                .add_required_input("_private", ValueType::String)?
                .steps())
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let diagnostics = validate_workflow(&workflow);
    let found = for_rule(&diagnostics, "unused-input");
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("'ignored'"));
}

#[test]
fn test_input_used_in_script_text() {
    let workflow = echo_builder().entrypoint("echo").unwrap().get_full_scope().unwrap();
    assert!(!has_rule(&validate_workflow(&workflow), "unused-input"));
}

#[test]
fn test_longer_name_in_script_text_is_not_a_use() {
    let workflow = WorkflowBuilder::new("w")
        .add_template("main", |t| {
            Ok(t.add_required_input("a", ValueType::String)?
                .add_required_input("ab", ValueType::String)?
                .container()
                .image("alpine:3")
                .inline_script("echo {{inputs.parameters.ab}}")
                .resources(Resources::guaranteed("50m", "32Mi")))
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let diagnostics = validate_workflow(&workflow);
    let found = for_rule(&diagnostics, "unused-input");
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("input 'a'"));
}

#[test]
fn test_input_used_through_expression() {
    let workflow = WorkflowBuilder::new("w")
        .add_template("run", |t| {
            let t = t
                .add_required_input("cmd", ValueType::String)?
                .container()
                .image("alpine:3")
                .resources(Resources::guaranteed("50m", "32Mi"));
            let cmd = t.input("cmd")?;
            t.add_arg(cmd)
        })
        .unwrap()
        .entrypoint("run")
        .unwrap()
        .get_full_scope()
        .unwrap();

    assert!(!has_rule(&validate_workflow(&workflow), "unused-input"));
}

/* ===================== Empty Body ===================== */

#[test]
fn test_empty_body_hint() {
    let diagnostics = validate_workflow(&bare_workflow("main"));
    let found = for_rule(&diagnostics, "empty-body");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, Severity::Hint);
    assert!(!has_errors(&bare_workflow("main")));
}

/* ===================== Registry ===================== */

#[test]
fn test_rules_listed() {
    let ids: Vec<_> = Validator::new().rules().map(|(id, _)| id).collect();
    assert_eq!(
        ids,
        vec!["missing-entrypoint", "unreachable-template", "unused-input", "empty-body"]
    );
}

#[test]
fn test_display() {
    let diagnostic = Diagnostic::warning("template 'a'", "something", "rule-x");
    assert_eq!(diagnostic.to_string(), "warning in template 'a': something [rule-x]");
}
