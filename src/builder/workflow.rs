//! Workflow builder: the root of every builder chain

use crate::error::BuildError;
use crate::expression::Expr;
use crate::model::{Template, Workflow};
use crate::params::InputParamDef;
use crate::scope::{Scope, ScopeKind};
use crate::types::ValueType;
use crate::validator::{Severity, Validator};

use super::{check_default, FinishTemplate, TemplateBuilder, WorkflowScope};

/// Service account used when none is given
pub const DEFAULT_SERVICE_ACCOUNT: &str = "argo-workflow-executor";

#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    scope: WorkflowScope,
    templates: Scope<Template>,
    service_account: String,
    parallelism: Option<u32>,
    entrypoint: Option<String>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scope: WorkflowScope::new(name),
            templates: Scope::new(ScopeKind::Templates),
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
            parallelism: None,
            entrypoint: None,
        }
    }

    pub fn service_account(mut self, account: impl Into<String>) -> Self {
        self.service_account = account.into();
        self
    }

    pub fn parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Declare a workflow parameter the submitter must supply
    pub fn add_required_param(self, name: &str, ty: ValueType) -> Result<Self, BuildError> {
        self.add_param(name, InputParamDef::required(ty))
    }

    /// Declare a workflow parameter with a default (a literal or a config map key)
    pub fn add_optional_param(self, name: &str, default: Expr) -> Result<Self, BuildError> {
        self.add_param(name, InputParamDef::optional(default))
    }

    pub fn add_param(mut self, name: &str, def: InputParamDef) -> Result<Self, BuildError> {
        // Workflow parameters cannot see each other
        check_default(name, &def, &WorkflowScope::new(self.scope.name.clone()))?;
        self.scope.parameters = self.scope.parameters.with(name, def)?;
        Ok(self)
    }

    /// `workflow.parameters.NAME`
    pub fn param(&self, name: &str) -> Result<Expr, BuildError> {
        self.scope.param(name)
    }

    /// Declare a template; `build` chooses its body and declarations.
    ///
    /// Templates can only reference templates declared before them.
    pub fn add_template<F, B>(mut self, name: &str, build: F) -> Result<Self, BuildError>
    where
        F: FnOnce(TemplateBuilder) -> Result<B, BuildError>,
        B: FinishTemplate,
    {
        if self.templates.contains(name) {
            return Err(BuildError::DuplicateName {
                kind: ScopeKind::Templates,
                name: name.to_string(),
            });
        }

        let template = build(TemplateBuilder::new(name, self.scope.clone()))?.finish()?;
        tracing::debug!(
            workflow = %self.scope.name,
            template = name,
            body = template.body.kind(),
            inputs = template.signature.inputs.len(),
            outputs = template.signature.outputs.len(),
            "template declared"
        );

        self.scope.templates = self.scope.templates.with(name, template.signature.clone())?;
        self.templates = self.templates.with(name, template)?;
        Ok(self)
    }

    pub fn entrypoint(mut self, name: &str) -> Result<Self, BuildError> {
        self.templates.require(name)?;
        self.entrypoint = Some(name.to_string());
        Ok(self)
    }

    /// Freeze the declarations into a [`Workflow`].
    ///
    /// Runs the whole-tree validation rules; any error-level diagnostic fails
    /// the build, the rest are logged.
    pub fn get_full_scope(self) -> Result<Workflow, BuildError> {
        let workflow = Workflow {
            name: self.scope.name,
            service_account: self.service_account,
            parallelism: self.parallelism,
            parameters: self.scope.parameters,
            templates: self.templates,
            entrypoint: self.entrypoint.unwrap_or_default(),
        };

        let (errors, others): (Vec<_>, Vec<_>) = Validator::new()
            .validate(&workflow)
            .into_iter()
            .partition(|d| d.is_error());
        for diagnostic in &others {
            match diagnostic.severity {
                Severity::Warning => tracing::warn!(workflow = %workflow.name, "{}", diagnostic),
                _ => tracing::debug!(workflow = %workflow.name, "{}", diagnostic),
            }
        }
        if !errors.is_empty() {
            return Err(BuildError::Validation(errors));
        }

        tracing::debug!(
            workflow = %workflow.name,
            templates = workflow.templates.len(),
            "workflow finalized"
        );
        Ok(workflow)
    }
}
