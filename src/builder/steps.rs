//! Nested-steps bodies

use crate::error::BuildError;
use crate::expression::Expr;
use crate::model::{LoopSpec, StepRecord, Template, TemplateBody, TemplateSignature};
use crate::params::{InputParamDef, OutputParamDef, OutputSource};
use crate::scope::{Scope, ScopeKind};

use super::binding::{bind_invocation, Invocation, StepBinding};
use super::view::{step_outputs, ScopeView, StepOutputs, Visible};
use super::{FinishTemplate, InputScope, TemplateRef, WorkflowScope};

/// Builds a template whose body is a sequence of step groups.
///
/// Each `add_step` appends a group of one; `add_parallel_group` appends a
/// group of steps that run side by side. A step can read the outputs of any
/// step in an earlier group.
#[derive(Debug, Clone)]
pub struct StepsBuilder {
    name: String,
    workflow: WorkflowScope,
    inputs: Scope<InputParamDef>,
    outputs: Scope<OutputParamDef>,
    groups: Vec<Vec<StepRecord>>,
    steps: Scope<StepOutputs>,
}

impl StepsBuilder {
    pub(crate) fn new(name: String, workflow: WorkflowScope, inputs: Scope<InputParamDef>) -> Self {
        Self {
            name,
            workflow,
            inputs,
            outputs: Scope::new(ScopeKind::Outputs),
            groups: Vec::new(),
            steps: Scope::new(ScopeKind::Steps),
        }
    }

    /// Append a sequential step invoking `template`
    pub fn add_step<F>(self, name: &str, template: TemplateRef, bind: F) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        self.add_parallel_group(|group| group.add_step(name, template, bind))
    }

    /// Append a sequential step that runs once per loop element
    pub fn add_looped_step<F>(
        self,
        name: &str,
        template: TemplateRef,
        loop_spec: LoopSpec,
        bind: F,
    ) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        self.add_parallel_group(|group| group.add_looped_step(name, template, loop_spec, bind))
    }

    /// Append a group of steps that run in parallel
    pub fn add_parallel_group<F>(mut self, build: F) -> Result<Self, BuildError>
    where
        F: FnOnce(ParallelGroup<'_>) -> Result<ParallelGroup<'_>, BuildError>,
    {
        let group = ParallelGroup {
            template: &self.name,
            workflow: &self.workflow,
            inputs: &self.inputs,
            visible: &self.steps,
            declared: self.steps.clone(),
            records: Vec::new(),
        };
        let group = build(group)?;
        let (declared, records) = (group.declared, group.records);

        tracing::debug!(template = %self.name, steps = records.len(), "step group added");
        self.steps = declared;
        self.groups.push(records);
        Ok(self)
    }

    /// Declare an output computed from inputs and step outputs
    pub fn add_expression_output(self, name: &str, value: Expr) -> Result<Self, BuildError> {
        let ty = value.ty();
        self.add_output(name, OutputParamDef::new(ty, OutputSource::Expression(value)))
    }

    pub fn add_output(mut self, name: &str, def: OutputParamDef) -> Result<Self, BuildError> {
        match &def.source {
            OutputSource::Expression(expr) => {
                self.scope_view().check(expr)?;
                if !expr.ty().is_assignable_to(&def.ty) {
                    return Err(BuildError::OutputTypeMismatch {
                        template: self.name.clone(),
                        output: name.to_string(),
                        expected: def.ty.clone(),
                        actual: expr.ty(),
                    });
                }
            }
            other => {
                return Err(BuildError::UnsupportedOutput {
                    template: self.name.clone(),
                    output_kind: other.kind(),
                    body: "steps",
                })
            }
        }
        let outputs = std::mem::replace(&mut self.outputs, Scope::new(ScopeKind::Outputs));
        self.outputs = outputs.with(name, def)?;
        Ok(self)
    }

    /// `steps.STEP.outputs.parameters.NAME` for any declared step
    pub fn step_output(&self, step: &str, output: &str) -> Result<Expr, BuildError> {
        self.scope_view().step_output(step, output)
    }

    /// Everything visible to the template's outputs
    pub fn scope_view(&self) -> ScopeView<'_> {
        self.view().with_visible(Visible::Steps(&self.steps))
    }
}

impl InputScope for StepsBuilder {
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

impl FinishTemplate for StepsBuilder {
    fn finish(self) -> Result<Template, BuildError> {
        Ok(Template {
            name: self.name,
            signature: TemplateSignature {
                inputs: self.inputs,
                outputs: self.outputs,
            },
            body: TemplateBody::Steps(self.groups),
        })
    }
}

/// Steps added together; they only see steps of earlier groups
#[derive(Debug)]
pub struct ParallelGroup<'a> {
    template: &'a str,
    workflow: &'a WorkflowScope,
    inputs: &'a Scope<InputParamDef>,
    visible: &'a Scope<StepOutputs>,
    declared: Scope<StepOutputs>,
    records: Vec<StepRecord>,
}

impl<'a> ParallelGroup<'a> {
    pub fn add_step<F>(self, name: &str, template: TemplateRef, bind: F) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        self.push(name, template, None, bind)
    }

    pub fn add_looped_step<F>(
        self,
        name: &str,
        template: TemplateRef,
        loop_spec: LoopSpec,
        bind: F,
    ) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        self.push(name, template, Some(loop_spec), bind)
    }

    fn push<F>(
        mut self,
        name: &str,
        template: TemplateRef,
        loop_spec: Option<LoopSpec>,
        bind: F,
    ) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        if self.declared.contains(name) {
            return Err(BuildError::DuplicateName {
                kind: ScopeKind::Steps,
                name: name.to_string(),
            });
        }

        let view = ScopeView::new(format!("step '{}'", name), self.workflow)
            .with_inputs(self.inputs)
            .with_visible(Visible::Steps(self.visible));
        let looped = loop_spec.is_some();
        let (record, signature) = bind_invocation(
            view,
            Invocation {
                name,
                template: &template,
                loop_spec,
                dependencies: Vec::new(),
                bind,
            },
        )?;

        let outputs = step_outputs(name, &signature.outputs, looped)?;
        tracing::debug!(template = self.template, step = name, "step declared");
        self.declared = self.declared.with(name, outputs)?;
        self.records.push(record);
        Ok(self)
    }
}
