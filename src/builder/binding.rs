//! Argument registration for steps and tasks

use crate::error::{BuildError, ExprError};
use crate::expression::Expr;
use crate::model::{LoopSpec, StepRecord, TemplateSignature};
use crate::scope::{Scope, ScopeKind};
use crate::types::ValueType;

use super::view::ScopeView;
use super::TemplateRef;

/// Handed to the callback of `add_step` / `add_task`.
///
/// The callback must register a value for every required input of the
/// invoked template. Values may be literals or expressions obtained from the
/// accessors of this binding.
///
/// ```ignore
/// steps.add_step("runCommand", TemplateRef::internal("runCommand"), |b| {
///     b.set("configContents", b.step_output("getConfig", "configContents")?)?;
///     Ok(())
/// })?
/// ```
#[derive(Debug)]
pub struct StepBinding<'a> {
    step: String,
    template: String,
    signature: TemplateSignature,
    view: ScopeView<'a>,
    arguments: Scope<Expr>,
    when: Option<Expr>,
}

impl<'a> StepBinding<'a> {
    /// Register the value of input `name` of the invoked template
    pub fn set(&mut self, name: &str, value: impl Into<Expr>) -> Result<&mut Self, BuildError> {
        let value = value.into();
        let def = self
            .signature
            .inputs
            .get(name)
            .ok_or_else(|| BuildError::UnknownInput {
                step: self.step.clone(),
                template: self.template.clone(),
                input: name.to_string(),
            })?;
        if !value.ty().is_assignable_to(def.ty()) {
            return Err(BuildError::ArgumentTypeMismatch {
                step: self.step.clone(),
                input: name.to_string(),
                expected: def.ty().clone(),
                actual: value.ty(),
            });
        }
        self.view.check(&value)?;

        let arguments = std::mem::replace(&mut self.arguments, Scope::new(ScopeKind::Arguments));
        self.arguments = arguments.with(name, value)?;
        Ok(self)
    }

    /// Only run the step when `condition` holds
    pub fn when(&mut self, condition: Expr) -> Result<&mut Self, BuildError> {
        if condition.ty() != ValueType::Boolean {
            return Err(BuildError::NonBooleanWhen {
                step: self.step.clone(),
                actual: condition.ty(),
            });
        }
        self.view.check(&condition)?;
        self.when = Some(condition);
        Ok(self)
    }

    /// The scope values may be drawn from
    pub fn scope(&self) -> &ScopeView<'a> {
        &self.view
    }

    pub fn input(&self, name: &str) -> Result<Expr, BuildError> {
        self.view.input(name)
    }

    pub fn workflow_param(&self, name: &str) -> Result<Expr, BuildError> {
        self.view.workflow_param(name)
    }

    pub fn step_output(&self, step: &str, output: &str) -> Result<Expr, BuildError> {
        self.view.step_output(step, output)
    }

    pub fn task_output(&self, task: &str, output: &str) -> Result<Expr, BuildError> {
        self.view.task_output(task, output)
    }

    pub fn item(&self) -> Result<Expr, BuildError> {
        self.view.item()
    }
}

/// Everything needed to add one step or task
pub(crate) struct Invocation<'v, F> {
    pub name: &'v str,
    pub template: &'v TemplateRef,
    pub loop_spec: Option<LoopSpec>,
    pub dependencies: Vec<String>,
    pub bind: F,
}

/// Run the binding callback for one invocation and check the result.
///
/// Returns the record plus the callee's signature (for the output scope).
pub(crate) fn bind_invocation<'a, F>(
    view: ScopeView<'a>,
    invocation: Invocation<'_, F>,
) -> Result<(StepRecord, TemplateSignature), BuildError>
where
    F: FnOnce(&mut StepBinding<'a>) -> Result<(), BuildError>,
{
    let (target, template, signature) = invocation.template.resolve(view.workflow)?;

    let item = match &invocation.loop_spec {
        Some(spec) => {
            if let Some(expr) = loop_expr(spec) {
                view.check(expr)?;
            }
            Some(loop_item_type(invocation.name, spec)?)
        }
        None => None,
    };

    let mut binding = StepBinding {
        step: invocation.name.to_string(),
        template,
        signature,
        view: view.with_item(item),
        arguments: Scope::new(ScopeKind::Arguments),
        when: None,
    };
    (invocation.bind)(&mut binding)?;

    // Every required input must be covered
    let mut arguments = Vec::new();
    for (input, def) in binding.signature.inputs.iter() {
        match binding.arguments.get(input) {
            Some(value) => arguments.push((input.to_string(), value.clone())),
            None if def.is_required() => {
                return Err(BuildError::MissingRequiredInput {
                    step: binding.step.clone(),
                    template: binding.template.clone(),
                    input: input.to_string(),
                })
            }
            None => {}
        }
    }

    tracing::debug!(
        step = %binding.step,
        template = %binding.template,
        arguments = arguments.len(),
        "invocation bound"
    );

    let record = StepRecord {
        name: binding.step,
        template: target,
        arguments,
        dependencies: invocation.dependencies,
        loop_spec: invocation.loop_spec,
        when: binding.when,
    };
    Ok((record, binding.signature))
}

fn loop_expr(spec: &LoopSpec) -> Option<&Expr> {
    match spec {
        LoopSpec::Items(_) => None,
        LoopSpec::Param(expr) => Some(expr),
        LoopSpec::Sequence { count } => Some(count),
    }
}

fn loop_item_type(step: &str, spec: &LoopSpec) -> Result<ValueType, BuildError> {
    let ty = match spec {
        LoopSpec::Items(items) => match ValueType::of(&serde_json::Value::Array(items.clone())) {
            ValueType::Array { items } => *items,
            _ => ValueType::Any,
        },
        LoopSpec::Param(expr) => match expr.ty() {
            ValueType::Array { items } => *items,
            ValueType::Any => ValueType::Any,
            other => {
                return Err(BuildError::Expr(ExprError::NotAnArray(other)))
            }
        },
        LoopSpec::Sequence { count } => {
            if count.ty() != ValueType::Integer {
                return Err(BuildError::Expr(ExprError::NonIntegerIndex(count.ty())));
            }
            ValueType::Integer
        }
    };
    tracing::debug!(step, item = %ty, "loop declared");
    Ok(ty)
}
