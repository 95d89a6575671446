//! Template builder: inputs first, then a one-way choice of body kind

use crate::model::ResourceAction;
use crate::params::InputParamDef;
use crate::scope::{Scope, ScopeKind};

use super::{ContainerBuilder, DagBuilder, InputScope, ResourceBuilder, StepsBuilder, WorkflowScope};

#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    name: String,
    workflow: WorkflowScope,
    inputs: Scope<InputParamDef>,
}

impl TemplateBuilder {
    pub(crate) fn new(name: impl Into<String>, workflow: WorkflowScope) -> Self {
        Self {
            name: name.into(),
            workflow,
            inputs: Scope::new(ScopeKind::Inputs),
        }
    }

    pub fn steps(self) -> StepsBuilder {
        StepsBuilder::new(self.name, self.workflow, self.inputs)
    }

    pub fn dag(self) -> DagBuilder {
        DagBuilder::new(self.name, self.workflow, self.inputs)
    }

    pub fn container(self) -> ContainerBuilder {
        ContainerBuilder::new(self.name, self.workflow, self.inputs)
    }

    pub fn resource(self, action: ResourceAction) -> ResourceBuilder {
        ResourceBuilder::new(self.name, self.workflow, self.inputs, action)
    }
}

impl InputScope for TemplateBuilder {
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
