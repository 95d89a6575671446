//! What an expression may reference at a given point of a builder chain

use std::collections::BTreeSet;

use crate::error::BuildError;
use crate::expression::{Expr, ParamSource};
use crate::params::InputParamDef;
use crate::scope::{Scope, ScopeKind};
use crate::types::ValueType;

use super::WorkflowScope;

/// Output types of a declared step or task.
///
/// Outputs of a looped invocation are aggregated by the engine, so they are
/// exposed as arrays of the callee's output types.
#[derive(Debug, Clone)]
pub struct StepOutputs {
    pub template: String,
    pub outputs: Scope<ValueType>,
}

/// Steps or tasks visible from the current position
#[derive(Debug, Clone, Copy)]
pub(crate) enum Visible<'a> {
    Nothing,
    Steps(&'a Scope<StepOutputs>),
    Tasks {
        tasks: &'a Scope<StepOutputs>,
        /// `None` means every declared task may be read
        allowed: Option<&'a BTreeSet<String>>,
    },
}

/// A read-only window onto the declarations an expression may use.
///
/// Accessors hand out typed parameter references; [`ScopeView::check`]
/// verifies that an expression built elsewhere only uses what is visible here.
#[derive(Debug, Clone)]
pub struct ScopeView<'a> {
    pub(crate) context: String,
    pub(crate) workflow: &'a WorkflowScope,
    pub(crate) inputs: Option<&'a Scope<InputParamDef>>,
    pub(crate) visible: Visible<'a>,
    pub(crate) item: Option<ValueType>,
}

impl<'a> ScopeView<'a> {
    pub(crate) fn new(context: impl Into<String>, workflow: &'a WorkflowScope) -> Self {
        Self {
            context: context.into(),
            workflow,
            inputs: None,
            visible: Visible::Nothing,
            item: None,
        }
    }

    pub(crate) fn with_inputs(mut self, inputs: &'a Scope<InputParamDef>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub(crate) fn with_visible(mut self, visible: Visible<'a>) -> Self {
        self.visible = visible;
        self
    }

    pub(crate) fn with_item(mut self, item: Option<ValueType>) -> Self {
        self.item = item;
        self
    }

    /// `workflow.parameters.NAME`
    pub fn workflow_param(&self, name: &str) -> Result<Expr, BuildError> {
        self.workflow.param(name)
    }

    /// `inputs.parameters.NAME` of the enclosing template
    pub fn input(&self, name: &str) -> Result<Expr, BuildError> {
        let inputs = self.inputs.ok_or_else(|| self.out_of_scope(format!("inputs.parameters.{}", name)))?;
        let def = inputs.require(name)?;
        Ok(Expr::parameter(
            ParamSource::Input {
                name: name.to_string(),
            },
            def.ty().clone(),
        ))
    }

    /// `steps.STEP.outputs.parameters.NAME`
    pub fn step_output(&self, step: &str, output: &str) -> Result<Expr, BuildError> {
        let steps = match self.visible {
            Visible::Steps(steps) => steps,
            _ => return Err(self.out_of_scope(format!("steps.{}", step))),
        };
        let ty = lookup_output(steps, step, output)?;
        Ok(Expr::parameter(
            ParamSource::StepOutput {
                step: step.to_string(),
                name: output.to_string(),
            },
            ty,
        ))
    }

    /// `tasks.TASK.outputs.parameters.NAME`
    pub fn task_output(&self, task: &str, output: &str) -> Result<Expr, BuildError> {
        let (tasks, allowed) = match self.visible {
            Visible::Tasks { tasks, allowed } => (tasks, allowed),
            _ => return Err(self.out_of_scope(format!("tasks.{}", task))),
        };
        let ty = lookup_output(tasks, task, output)?;
        if let Some(allowed) = allowed {
            if !allowed.contains(task) {
                return Err(BuildError::UndeclaredDependency {
                    task: self.context.clone(),
                    referenced: task.to_string(),
                });
            }
        }
        Ok(Expr::parameter(
            ParamSource::TaskOutput {
                task: task.to_string(),
                name: output.to_string(),
            },
            ty,
        ))
    }

    /// The current loop element
    pub fn item(&self) -> Result<Expr, BuildError> {
        self.item
            .clone()
            .map(Expr::item)
            .ok_or_else(|| BuildError::NoLoopItem {
                context: self.context.clone(),
            })
    }

    /// Verify that every reference inside `expr` resolves, with the same type,
    /// against this view.
    pub fn check(&self, expr: &Expr) -> Result<(), BuildError> {
        let mut items = Vec::new();
        collect_items(expr, &mut items);
        for ty in items {
            match &self.item {
                None => {
                    return Err(BuildError::NoLoopItem {
                        context: self.context.clone(),
                    })
                }
                // An item taken from another loop's binding
                Some(item) if item != ty => {
                    return Err(self.out_of_scope(format!("item of type {}", ty)))
                }
                Some(_) => {}
            }
        }
        let mut parameters = Vec::new();
        collect_parameters(expr, &mut parameters);
        for (source, ty) in parameters {
            let resolved = match source {
                ParamSource::Workflow { name } => self.workflow_param(name),
                ParamSource::Input { name } => self.input(name),
                ParamSource::StepOutput { step, name } => self.step_output(step, name),
                ParamSource::TaskOutput { task, name } => self.task_output(task, name),
            }
            .map_err(|err| match err {
                BuildError::UndeclaredDependency { .. } => err,
                _ => self.out_of_scope(source.describe()),
            })?;
            if resolved.ty() != *ty {
                return Err(self.out_of_scope(source.describe()));
            }
        }
        Ok(())
    }

    fn out_of_scope(&self, reference: String) -> BuildError {
        BuildError::OutOfScopeReference {
            reference,
            context: self.context.clone(),
        }
    }
}

fn lookup_output(
    scope: &Scope<StepOutputs>,
    name: &str,
    output: &str,
) -> Result<ValueType, BuildError> {
    let entry = scope.require(name)?;
    entry
        .outputs
        .get(output)
        .cloned()
        .ok_or_else(|| BuildError::UnknownOutput {
            name: name.to_string(),
            output: output.to_string(),
        })
}

fn collect_parameters<'e>(expr: &'e Expr, out: &mut Vec<(&'e ParamSource, &'e ValueType)>) {
    if let Expr::Parameter { source, ty } = expr {
        out.push((source, ty));
    }
    for child in expr.children() {
        collect_parameters(child, out);
    }
}

fn collect_items<'e>(expr: &'e Expr, out: &mut Vec<&'e ValueType>) {
    if let Expr::Item { ty } = expr {
        out.push(ty);
    }
    for child in expr.children() {
        collect_items(child, out);
    }
}

/// Outputs scope for a step/task calling a template with the given outputs
pub(crate) fn step_outputs(
    template: &str,
    outputs: &Scope<crate::params::OutputParamDef>,
    looped: bool,
) -> Result<StepOutputs, BuildError> {
    let mut scope = Scope::new(ScopeKind::Outputs);
    for (name, def) in outputs.iter() {
        let ty = if looped {
            ValueType::array(def.ty.clone())
        } else {
            def.ty.clone()
        };
        scope = scope.with(name, ty)?;
    }
    Ok(StepOutputs {
        template: template.to_string(),
        outputs: scope,
    })
}
