//! Error taxonomy
//!
//! - [`ExprError`]: an expression combinator rejected its operands
//! - [`BuildError`]: a declaration was rejected while building a workflow
//! - [`RenderError`]: the renderer met something it cannot turn into plain data
//! - [`CollaboratorError`]: schema validation, file loading or manifest writing failed

use thiserror::Error;

use crate::scope::ScopeKind;
use crate::types::ValueType;
use crate::validator::Diagnostic;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("operator '{op}' needs operands of one scalar type, got {left} and {right}")]
    OperandMismatch {
        op: &'static str,
        left: ValueType,
        right: ValueType,
    },

    #[error("operator '{op}' cannot be applied to {ty}")]
    UnsupportedOperand { op: &'static str, ty: ValueType },

    #[error("condition must be boolean, got {0}")]
    NonBooleanCondition(ValueType),

    #[error("ternary branches must share a type, got {0} and {1}")]
    BranchMismatch(ValueType, ValueType),

    #[error("concat parts must be strings, part {index} is {ty}")]
    NonStringConcatPart { index: usize, ty: ValueType },

    #[error("expected an array, got {0}")]
    NotAnArray(ValueType),

    #[error("array index must be an integer, got {0}")]
    NonIntegerIndex(ValueType),

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("fallback of type {fallback} does not match path type {expected}")]
    FallbackMismatch {
        expected: ValueType,
        fallback: ValueType,
    },

    #[error("config map reference {map}/{key} cannot be composed into another expression")]
    ConfigMapNotComposable { map: String, key: String },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{kind} already declares '{name}'")]
    DuplicateName { kind: ScopeKind, name: String },

    #[error("{kind} has no entry named '{name}'")]
    UnknownName { kind: ScopeKind, name: String },

    #[error("step '{step}' does not register required input '{input}' of template '{template}'")]
    MissingRequiredInput {
        step: String,
        template: String,
        input: String,
    },

    #[error("step '{step}' registers '{input}' but template '{template}' declares no such input")]
    UnknownInput {
        step: String,
        template: String,
        input: String,
    },

    #[error("step '{step}' binds input '{input}' ({expected}) to a value of type {actual}")]
    ArgumentTypeMismatch {
        step: String,
        input: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("'{name}' does not declare output '{output}'")]
    UnknownOutput { name: String, output: String },

    #[error("task '{task}' depends on '{dependency}', which is not declared before it")]
    UnknownDependency { task: String, dependency: String },

    #[error("task '{task}' reads outputs of '{referenced}' without depending on it")]
    UndeclaredDependency { task: String, referenced: String },

    #[error("'{reference}' is not in scope for {context}")]
    OutOfScopeReference { reference: String, context: String },

    #[error("{context} uses the loop item but no loop is declared")]
    NoLoopItem { context: String },

    #[error("default for '{name}' has type {actual}, expected {expected}")]
    DefaultTypeMismatch {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("when condition of '{step}' must be boolean, got {actual}")]
    NonBooleanWhen { step: String, actual: ValueType },

    #[error("template '{template}' declares no resource requests/limits; the engine will not admit it")]
    MissingResources { template: String },

    #[error("template '{template}' cannot declare a {output_kind} output in a {body} body")]
    UnsupportedOutput {
        template: String,
        output_kind: &'static str,
        body: &'static str,
    },

    #[error("output '{output}' of template '{template}' is declared {expected} but its value is {actual}")]
    OutputTypeMismatch {
        template: String,
        output: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("template '{template}' has no {field}")]
    MissingField {
        template: String,
        field: &'static str,
    },

    #[error("workflow failed validation with {} error(s): {}", .0.len(), summarize(.0))]
    Validation(Vec<Diagnostic>),

    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unrecognized node at '{path}': {reason}")]
    UnrecognizedNode { path: String, reason: String },

    #[error("{kind} expression cannot be rendered {position}")]
    UnsupportedPosition {
        kind: &'static str,
        position: &'static str,
    },

    #[error("failed to serialize {what}: {message}")]
    Serialization { what: String, message: String },
}

/// One schema violation, located with a canonical dotted path (`a.b.0.c`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("configuration has {} schema violation(s)", .0.len())]
    InvalidConfig(Vec<ConfigIssue>),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("failed to load resource '{path}': {source}")]
    ResourceLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write manifest: {0}")]
    Write(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}
