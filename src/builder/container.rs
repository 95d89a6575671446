//! Container bodies

use crate::collaborators::ResourceLoader;
use crate::error::BuildError;
use crate::expression::Expr;
use crate::model::{ContainerSpec, Resources, Template, TemplateBody, TemplateSignature};
use crate::params::{InputParamDef, OutputParamDef, OutputSource};
use crate::scope::{Scope, ScopeKind};
use crate::types::ValueType;

use super::{FinishTemplate, InputScope, WorkflowScope};

/// Builds a template that runs a single container.
///
/// `image` and `resources` must be supplied before the template is finished.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    name: String,
    workflow: WorkflowScope,
    inputs: Scope<InputParamDef>,
    outputs: Scope<OutputParamDef>,
    image: Option<String>,
    image_pull_policy: Option<String>,
    command: Vec<String>,
    args: Vec<Expr>,
    env: Scope<Expr>,
    working_dir: Option<String>,
    resources: Option<Resources>,
}

impl ContainerBuilder {
    pub(crate) fn new(name: String, workflow: WorkflowScope, inputs: Scope<InputParamDef>) -> Self {
        Self {
            name,
            workflow,
            inputs,
            outputs: Scope::new(ScopeKind::Outputs),
            image: None,
            image_pull_policy: None,
            command: Vec::new(),
            args: Vec::new(),
            env: Scope::new(ScopeKind::Arguments),
            working_dir: None,
            resources: None,
        }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn image_pull_policy(mut self, policy: impl Into<String>) -> Self {
        self.image_pull_policy = Some(policy.into());
        self
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Append one argument; it may reference this template's inputs
    pub fn add_arg(mut self, value: impl Into<Expr>) -> Result<Self, BuildError> {
        let value = value.into();
        self.view().check(&value)?;
        self.args.push(value);
        Ok(self)
    }

    /// Set an environment variable; it may reference this template's inputs
    pub fn add_env(mut self, name: &str, value: impl Into<Expr>) -> Result<Self, BuildError> {
        let value = value.into();
        self.view().check(&value)?;
        let env = std::mem::replace(&mut self.env, Scope::new(ScopeKind::Arguments));
        self.env = env.with(name, value)?;
        Ok(self)
    }

    /// Run `script` with `/bin/sh -c`
    pub fn inline_script(mut self, script: impl Into<String>) -> Self {
        self.command = vec!["/bin/sh".to_string(), "-c".to_string()];
        self.args = vec![Expr::string(script)];
        self
    }

    /// Load a script through `loader` and run it with `/bin/sh -c`
    pub fn script_from(self, loader: &dyn ResourceLoader, path: &str) -> Result<Self, BuildError> {
        let script = loader.load(path)?;
        tracing::debug!(template = %self.name, path, bytes = script.len(), "script embedded");
        Ok(self.inline_script(script))
    }

    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Declare an output read from a file the container writes
    pub fn add_path_output(self, name: &str, ty: ValueType, path: impl Into<String>) -> Result<Self, BuildError> {
        self.add_output(name, OutputParamDef::new(ty, OutputSource::Path(path.into())))
    }

    pub fn add_output(mut self, name: &str, def: OutputParamDef) -> Result<Self, BuildError> {
        if !matches!(def.source, OutputSource::Path(_)) {
            return Err(BuildError::UnsupportedOutput {
                template: self.name.clone(),
                output_kind: def.source.kind(),
                body: "container",
            });
        }
        let outputs = std::mem::replace(&mut self.outputs, Scope::new(ScopeKind::Outputs));
        self.outputs = outputs.with(name, def)?;
        Ok(self)
    }
}

impl InputScope for ContainerBuilder {
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

impl FinishTemplate for ContainerBuilder {
    fn finish(self) -> Result<Template, BuildError> {
        let image = self.image.ok_or_else(|| BuildError::MissingField {
            template: self.name.clone(),
            field: "container image",
        })?;
        let resources = match self.resources {
            Some(resources) if !resources.is_empty() => resources,
            _ => {
                return Err(BuildError::MissingResources {
                    template: self.name,
                })
            }
        };
        let env = self
            .env
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();

        Ok(Template {
            name: self.name,
            signature: TemplateSignature {
                inputs: self.inputs,
                outputs: self.outputs,
            },
            body: TemplateBody::Container(ContainerSpec {
                image,
                image_pull_policy: self.image_pull_policy,
                command: self.command,
                args: self.args,
                env,
                working_dir: self.working_dir,
                resources,
            }),
        })
    }
}
