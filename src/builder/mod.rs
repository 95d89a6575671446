//! Scope-accumulating builder chain
//!
//! A workflow is declared by chaining builder calls. Every call consumes the
//! builder and returns a new one whose scope is the old scope plus exactly one
//! declaration, or a [`BuildError`] saying why the declaration is invalid.
//! Builders are `Clone`, so any prefix of a chain can be reused for several
//! continuations without one leaking into another.
//!
//! ```ignore
//! let workflow = WorkflowBuilder::new("migration")
//!     .add_template("getConfig", |t| {
//!         t.container()
//!             .image("alpine:3")
//!             .inline_script("cat /config/migration.yaml > /tmp/config")
//!             .resources(Resources::guaranteed("100m", "64Mi"))
//!             .add_path_output("configContents", ValueType::String, "/tmp/config")
//!     })?
//!     .add_template("main", |t| {
//!         t.steps()
//!             .add_step("getConfig", TemplateRef::internal("getConfig"), |_| Ok(()))
//!     })?
//!     .entrypoint("main")?
//!     .get_full_scope()?;
//! ```
//!
//! Body selection is a one-way fork: [`TemplateBuilder`] turns into exactly one
//! of [`StepsBuilder`], [`DagBuilder`], [`ContainerBuilder`] or
//! [`ResourceBuilder`], each of which can still take inputs and outputs.

mod binding;
mod container;
mod dag;
mod resource;
mod steps;
mod template;
mod view;
mod workflow;

#[cfg(test)]
mod tests;

pub use binding::StepBinding;
pub use container::ContainerBuilder;
pub use dag::DagBuilder;
pub use resource::ResourceBuilder;
pub use steps::{ParallelGroup, StepsBuilder};
pub use template::TemplateBuilder;
pub use view::{ScopeView, StepOutputs};
pub use workflow::{WorkflowBuilder, DEFAULT_SERVICE_ACCOUNT};

use crate::error::BuildError;
use crate::expression::{Expr, ParamSource};
use crate::model::{Template, TemplateSignature, TemplateTarget, Workflow};
use crate::params::InputParamDef;
use crate::scope::{Scope, ScopeKind};
use crate::types::ValueType;

/// Workflow-level declarations visible to every template
#[derive(Debug, Clone)]
pub struct WorkflowScope {
    pub(crate) name: String,
    pub(crate) parameters: Scope<InputParamDef>,
    pub(crate) templates: Scope<TemplateSignature>,
}

impl WorkflowScope {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Scope::new(ScopeKind::WorkflowParameters),
            templates: Scope::new(ScopeKind::Templates),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `workflow.parameters.NAME`
    pub fn param(&self, name: &str) -> Result<Expr, BuildError> {
        let def = self.parameters.require(name)?;
        Ok(Expr::parameter(
            ParamSource::Workflow {
                name: name.to_string(),
            },
            def.ty().clone(),
        ))
    }
}

/// The template a step or task invokes
#[derive(Debug, Clone)]
pub enum TemplateRef {
    /// A template already declared in the same workflow, by key
    Internal(String),
    /// A template of another finished workflow, carrying its signature
    External {
        workflow: String,
        template: String,
        signature: TemplateSignature,
    },
}

impl TemplateRef {
    pub fn internal(name: impl Into<String>) -> Self {
        TemplateRef::Internal(name.into())
    }

    /// Reference `template` of a finished workflow by object
    pub fn external(workflow: &Workflow, template: &str) -> Result<Self, BuildError> {
        let found = workflow.templates.require(template)?;
        Ok(TemplateRef::External {
            workflow: workflow.name.clone(),
            template: template.to_string(),
            signature: found.signature.clone(),
        })
    }

    pub(crate) fn resolve(
        &self,
        workflow: &WorkflowScope,
    ) -> Result<(TemplateTarget, String, TemplateSignature), BuildError> {
        match self {
            TemplateRef::Internal(name) => {
                let signature = workflow.templates.require(name)?;
                Ok((
                    TemplateTarget::Internal(name.clone()),
                    name.clone(),
                    signature.clone(),
                ))
            }
            TemplateRef::External {
                workflow,
                template,
                signature,
            } => Ok((
                TemplateTarget::External {
                    workflow: workflow.clone(),
                    template: template.clone(),
                },
                format!("{}/{}", workflow, template),
                signature.clone(),
            )),
        }
    }
}

/// A builder holding a template's input scope.
///
/// Inputs can be declared before or after the body kind is chosen.
pub trait InputScope: Sized {
    #[doc(hidden)]
    fn template_name(&self) -> &str;
    #[doc(hidden)]
    fn workflow_scope(&self) -> &WorkflowScope;
    #[doc(hidden)]
    fn input_scope(&self) -> &Scope<InputParamDef>;
    #[doc(hidden)]
    fn input_scope_mut(&mut self) -> &mut Scope<InputParamDef>;

    /// Declare an input the caller must always supply
    fn add_required_input(self, name: &str, ty: ValueType) -> Result<Self, BuildError> {
        self.add_input(name, InputParamDef::required(ty))
    }

    /// Declare an input whose default is computed from the workflow scope.
    ///
    /// Defaults may use literals, workflow parameters and config maps.
    fn add_optional_input<F>(self, name: &str, default: F) -> Result<Self, BuildError>
    where
        F: FnOnce(&ScopeView<'_>) -> Result<Expr, BuildError>,
    {
        let context = format!("default of input '{}'", name);
        let expr = default(&ScopeView::new(context, self.workflow_scope()))?;
        self.add_input(name, InputParamDef::optional(expr))
    }

    /// Declare an input from a full definition
    fn add_input(mut self, name: &str, def: InputParamDef) -> Result<Self, BuildError> {
        check_default(name, &def, self.workflow_scope())?;
        let inputs = std::mem::replace(self.input_scope_mut(), Scope::new(ScopeKind::Inputs));
        *self.input_scope_mut() = inputs.with(name, def)?;
        tracing::debug!(template = %self.template_name(), input = name, "input declared");
        Ok(self)
    }

    /// `inputs.parameters.NAME` of this template
    fn input(&self, name: &str) -> Result<Expr, BuildError> {
        self.view().input(name)
    }

    /// `workflow.parameters.NAME`
    fn workflow_param(&self, name: &str) -> Result<Expr, BuildError> {
        self.workflow_scope().param(name)
    }

    #[doc(hidden)]
    fn view(&self) -> ScopeView<'_> {
        ScopeView::new(
            format!("template '{}'", self.template_name()),
            self.workflow_scope(),
        )
        .with_inputs(self.input_scope())
    }
}

/// Defaults see only the workflow scope, and must fit the declared type
pub(crate) fn check_default(
    name: &str,
    def: &InputParamDef,
    workflow: &WorkflowScope,
) -> Result<(), BuildError> {
    if let Some(default) = def.default_value() {
        ScopeView::new(format!("default of '{}'", name), workflow).check(default)?;
        if !default.ty().is_assignable_to(def.ty()) {
            return Err(BuildError::DefaultTypeMismatch {
                name: name.to_string(),
                expected: def.ty().clone(),
                actual: default.ty(),
            });
        }
    }
    Ok(())
}

/// A body builder that can be turned into a finished [`Template`]
pub trait FinishTemplate {
    fn finish(self) -> Result<Template, BuildError>;
}
