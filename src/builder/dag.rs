//! DAG bodies

use std::collections::{BTreeMap, BTreeSet};

use crate::error::BuildError;
use crate::expression::Expr;
use crate::model::{LoopSpec, StepRecord, Template, TemplateBody, TemplateSignature};
use crate::params::{InputParamDef, OutputParamDef, OutputSource};
use crate::scope::{Scope, ScopeKind};

use super::binding::{bind_invocation, Invocation, StepBinding};
use super::view::{step_outputs, ScopeView, StepOutputs, Visible};
use super::{FinishTemplate, InputScope, TemplateRef, WorkflowScope};

/// Builds a template whose body is a DAG of tasks.
///
/// Dependencies must name tasks declared earlier, so the graph is acyclic by
/// construction. A task may only read outputs of tasks it (transitively)
/// depends on.
#[derive(Debug, Clone)]
pub struct DagBuilder {
    name: String,
    workflow: WorkflowScope,
    inputs: Scope<InputParamDef>,
    outputs: Scope<OutputParamDef>,
    tasks: Scope<StepOutputs>,
    records: Vec<StepRecord>,
    /// Transitive dependencies of every declared task
    ancestors: BTreeMap<String, BTreeSet<String>>,
}

impl DagBuilder {
    pub(crate) fn new(name: String, workflow: WorkflowScope, inputs: Scope<InputParamDef>) -> Self {
        Self {
            name,
            workflow,
            inputs,
            outputs: Scope::new(ScopeKind::Outputs),
            tasks: Scope::new(ScopeKind::Tasks),
            records: Vec::new(),
            ancestors: BTreeMap::new(),
        }
    }

    pub fn add_task<F>(
        self,
        name: &str,
        template: TemplateRef,
        dependencies: &[&str],
        bind: F,
    ) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        self.push(name, template, dependencies, None, bind)
    }

    pub fn add_looped_task<F>(
        self,
        name: &str,
        template: TemplateRef,
        dependencies: &[&str],
        loop_spec: LoopSpec,
        bind: F,
    ) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        self.push(name, template, dependencies, Some(loop_spec), bind)
    }

    fn push<F>(
        mut self,
        name: &str,
        template: TemplateRef,
        dependencies: &[&str],
        loop_spec: Option<LoopSpec>,
        bind: F,
    ) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut StepBinding<'_>) -> Result<(), BuildError>,
    {
        if self.tasks.contains(name) {
            return Err(BuildError::DuplicateName {
                kind: ScopeKind::Tasks,
                name: name.to_string(),
            });
        }

        let mut closure = BTreeSet::new();
        for dependency in dependencies {
            let inherited = self.ancestors.get(*dependency).ok_or_else(|| {
                BuildError::UnknownDependency {
                    task: name.to_string(),
                    dependency: dependency.to_string(),
                }
            })?;
            closure.insert(dependency.to_string());
            closure.extend(inherited.iter().cloned());
        }

        let looped = loop_spec.is_some();
        let view = ScopeView::new(format!("task '{}'", name), &self.workflow)
            .with_inputs(&self.inputs)
            .with_visible(Visible::Tasks {
                tasks: &self.tasks,
                allowed: Some(&closure),
            });
        let (record, signature) = bind_invocation(
            view,
            Invocation {
                name,
                template: &template,
                loop_spec,
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
                bind,
            },
        )?;

        let outputs = step_outputs(name, &signature.outputs, looped)?;
        tracing::debug!(template = %self.name, task = name, dependencies = ?record.dependencies, "task declared");
        self.tasks = self.tasks.with(name, outputs)?;
        self.ancestors.insert(name.to_string(), closure);
        self.records.push(record);
        Ok(self)
    }

    /// Declare an output computed from inputs and task outputs
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
                    body: "dag",
                })
            }
        }
        let outputs = std::mem::replace(&mut self.outputs, Scope::new(ScopeKind::Outputs));
        self.outputs = outputs.with(name, def)?;
        Ok(self)
    }

    /// `tasks.TASK.outputs.parameters.NAME` for any declared task
    pub fn task_output(&self, task: &str, output: &str) -> Result<Expr, BuildError> {
        self.scope_view().task_output(task, output)
    }

    /// Everything visible to the template's outputs
    pub fn scope_view(&self) -> ScopeView<'_> {
        self.view().with_visible(Visible::Tasks {
            tasks: &self.tasks,
            allowed: None,
        })
    }
}

impl InputScope for DagBuilder {
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

impl FinishTemplate for DagBuilder {
    fn finish(self) -> Result<Template, BuildError> {
        Ok(Template {
            name: self.name,
            signature: TemplateSignature {
                inputs: self.inputs,
                outputs: self.outputs,
            },
            body: TemplateBody::Dag(self.records),
        })
    }
}
