//! Typed workflow compiler
//!
//! Workflows are declared with scope-accumulating builders that check every
//! reference and type at declaration time, then rendered into Argo
//! `WorkflowTemplate` manifests.

pub mod builder;
pub mod catalog;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod expression;
pub mod model;
pub mod params;
pub mod render;
pub mod scope;
pub mod types;
pub mod validator;

// Re-export the declaration surface
pub use builder::{
    ContainerBuilder, DagBuilder, InputScope, ResourceBuilder, StepsBuilder, TemplateBuilder,
    TemplateRef, WorkflowBuilder,
};
pub use error::{BuildError, CollaboratorError, ExprError, RenderError};
pub use expression::Expr;
pub use model::Workflow;
pub use render::{render_workflow, render_workflow_with, RenderOptions};
pub use types::ValueType;
