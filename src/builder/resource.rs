//! Kubernetes-resource bodies

use serde_json::Value as JsonValue;

use crate::error::BuildError;
use crate::model::{ResourceAction, ResourceSpec, Resources, Template, TemplateBody, TemplateSignature};
use crate::params::{InputParamDef, OutputParamDef, OutputSource};
use crate::render::embedded_expressions;
use crate::scope::{Scope, ScopeKind};
use crate::types::ValueType;

use super::{FinishTemplate, InputScope, WorkflowScope};

/// Builds a template that acts on a Kubernetes resource.
///
/// The manifest is plain data; expressions are embedded with
/// [`Expr::to_value`](crate::expression::Expr::to_value) and may reference
/// this template's inputs.
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    name: String,
    workflow: WorkflowScope,
    inputs: Scope<InputParamDef>,
    outputs: Scope<OutputParamDef>,
    action: ResourceAction,
    manifest: Option<JsonValue>,
    set_owner_reference: bool,
    success_condition: Option<String>,
    failure_condition: Option<String>,
    merge_strategy: Option<String>,
    resources: Option<Resources>,
}

impl ResourceBuilder {
    pub(crate) fn new(
        name: String,
        workflow: WorkflowScope,
        inputs: Scope<InputParamDef>,
        action: ResourceAction,
    ) -> Self {
        Self {
            name,
            workflow,
            inputs,
            outputs: Scope::new(ScopeKind::Outputs),
            action,
            manifest: None,
            set_owner_reference: false,
            success_condition: None,
            failure_condition: None,
            merge_strategy: None,
            resources: None,
        }
    }

    pub fn manifest(mut self, manifest: JsonValue) -> Result<Self, BuildError> {
        let view = self.view();
        for expr in embedded_expressions(&manifest) {
            view.check(&expr)?;
        }
        self.manifest = Some(manifest);
        Ok(self)
    }

    pub fn set_owner_reference(mut self, set: bool) -> Self {
        self.set_owner_reference = set;
        self
    }

    pub fn success_condition(mut self, condition: impl Into<String>) -> Self {
        self.success_condition = Some(condition.into());
        self
    }

    pub fn failure_condition(mut self, condition: impl Into<String>) -> Self {
        self.failure_condition = Some(condition.into());
        self
    }

    /// `merge`, `json` or `strategic`; only meaningful for `patch`
    pub fn merge_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.merge_strategy = Some(strategy.into());
        self
    }

    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Declare an output read from the resource with a kubectl-style JSON path
    pub fn add_json_path_output(
        self,
        name: &str,
        ty: ValueType,
        json_path: impl Into<String>,
    ) -> Result<Self, BuildError> {
        self.add_output(name, OutputParamDef::new(ty, OutputSource::JsonPath(json_path.into())))
    }

    pub fn add_output(mut self, name: &str, def: OutputParamDef) -> Result<Self, BuildError> {
        if !matches!(def.source, OutputSource::JsonPath(_)) {
            return Err(BuildError::UnsupportedOutput {
                template: self.name.clone(),
                output_kind: def.source.kind(),
                body: "resource",
            });
        }
        let outputs = std::mem::replace(&mut self.outputs, Scope::new(ScopeKind::Outputs));
        self.outputs = outputs.with(name, def)?;
        Ok(self)
    }
}

impl InputScope for ResourceBuilder {
    fn template_name(&self) -> &str {
        &self.name
    }

    fn workflow_scope(&self) -> &WorkflowScope {
        &self.workflow
    }

    fn input_scope(&self) -> &Scope<InputParamDef> {
        &self.inputs
    }

    fn input_scope_mut(&mut self) -> &mut Scope<InputParamDef> {
        &mut self.inputs
    }
}

impl FinishTemplate for ResourceBuilder {
    fn finish(self) -> Result<Template, BuildError> {
        let manifest = self.manifest.ok_or_else(|| BuildError::MissingField {
            template: self.name.clone(),
            field: "resource manifest",
        })?;
        let resources = match self.resources {
            Some(resources) if !resources.is_empty() => resources,
            _ => {
                return Err(BuildError::MissingResources {
                    template: self.name,
                })
            }
        };

        Ok(Template {
            name: self.name,
            signature: TemplateSignature {
                inputs: self.inputs,
                outputs: self.outputs,
            },
            body: TemplateBody::Resource(ResourceSpec {
                action: self.action,
                manifest,
                set_owner_reference: self.set_owner_reference,
                success_condition: self.success_condition,
                failure_condition: self.failure_condition,
                merge_strategy: self.merge_strategy,
                resources,
            }),
        })
    }
}
