//! The frozen specification tree
//!
//! These are the values the builders produce and the renderer consumes. Once
//! `WorkflowBuilder::get_full_scope` returns a [`Workflow`], nothing in it can
//! change.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::expression::Expr;
use crate::params::{InputParamDef, OutputParamDef};
use crate::scope::{Scope, ScopeKind};

/// Inputs and outputs of a template, as seen by callers
#[derive(Debug, Clone)]
pub struct TemplateSignature {
    pub inputs: Scope<InputParamDef>,
    pub outputs: Scope<OutputParamDef>,
}

impl TemplateSignature {
    pub fn empty() -> Self {
        Self {
            inputs: Scope::new(ScopeKind::Inputs),
            outputs: Scope::new(ScopeKind::Outputs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub signature: TemplateSignature,
    pub body: TemplateBody,
}

#[derive(Debug, Clone)]
pub enum TemplateBody {
    /// Sequential groups of steps; steps inside a group run in parallel
    Steps(Vec<Vec<StepRecord>>),
    Dag(Vec<StepRecord>),
    Container(ContainerSpec),
    Resource(ResourceSpec),
}

impl TemplateBody {
    pub fn kind(&self) -> &'static str {
        match self {
            TemplateBody::Steps(_) => "steps",
            TemplateBody::Dag(_) => "dag",
            TemplateBody::Container(_) => "container",
            TemplateBody::Resource(_) => "resource",
        }
    }

    /// Every step or task of this body, in declaration order
    pub fn invocations(&self) -> Vec<&StepRecord> {
        match self {
            TemplateBody::Steps(groups) => groups.iter().flatten().collect(),
            TemplateBody::Dag(tasks) => tasks.iter().collect(),
            TemplateBody::Container(_) | TemplateBody::Resource(_) => vec![],
        }
    }
}

/// What a step or task invokes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateTarget {
    /// A template of the same workflow
    Internal(String),
    /// A template of another (already deployed) workflow template
    External { workflow: String, template: String },
}

/// How a step or task fans out
#[derive(Debug, Clone, PartialEq)]
pub enum LoopSpec {
    Items(Vec<JsonValue>),
    Param(Expr),
    Sequence { count: Expr },
}

impl LoopSpec {
    pub fn items<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        LoopSpec::Items(items.into_iter().map(Into::into).collect())
    }

    pub fn param(array: Expr) -> Self {
        LoopSpec::Param(array)
    }

    pub fn sequence(count: impl Into<Expr>) -> Self {
        LoopSpec::Sequence {
            count: count.into(),
        }
    }
}

/// One invocation of a template inside a steps or DAG body
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub template: TemplateTarget,
    /// Registered arguments, in the callee's input declaration order
    pub arguments: Vec<(String, Expr)>,
    /// DAG only
    pub dependencies: Vec<String>,
    pub loop_spec: Option<LoopSpec>,
    pub when: Option<Expr>,
}

/// CPU / memory quantities in Kubernetes notation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl ResourceList {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Resource requests and limits for the pod running a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(skip_serializing_if = "ResourceList::is_empty")]
    pub requests: ResourceList,
    #[serde(skip_serializing_if = "ResourceList::is_empty")]
    pub limits: ResourceList,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cpu(mut self, cpu: impl Into<String>) -> Self {
        self.requests.cpu = Some(cpu.into());
        self
    }

    pub fn request_memory(mut self, memory: impl Into<String>) -> Self {
        self.requests.memory = Some(memory.into());
        self
    }

    pub fn limit_cpu(mut self, cpu: impl Into<String>) -> Self {
        self.limits.cpu = Some(cpu.into());
        self
    }

    pub fn limit_memory(mut self, memory: impl Into<String>) -> Self {
        self.limits.memory = Some(memory.into());
        self
    }

    /// Same quantities for requests and limits
    pub fn guaranteed(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        let (cpu, memory) = (cpu.into(), memory.into());
        Self::new()
            .request_cpu(cpu.clone())
            .request_memory(memory.clone())
            .limit_cpu(cpu)
            .limit_memory(memory)
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub image_pull_policy: Option<String>,
    pub command: Vec<String>,
    pub args: Vec<Expr>,
    pub env: Vec<(String, Expr)>,
    pub working_dir: Option<String>,
    pub resources: Resources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceAction {
    Create,
    Apply,
    Delete,
    Patch,
    Get,
}

impl ResourceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAction::Create => "create",
            ResourceAction::Apply => "apply",
            ResourceAction::Delete => "delete",
            ResourceAction::Patch => "patch",
            ResourceAction::Get => "get",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceSpec {
    pub action: ResourceAction,
    /// Plain-data document; expressions are embedded as serialized nodes
    pub manifest: JsonValue,
    pub set_owner_reference: bool,
    pub success_condition: Option<String>,
    pub failure_condition: Option<String>,
    pub merge_strategy: Option<String>,
    pub resources: Resources,
}

/// A finished workflow definition
#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: String,
    pub service_account: String,
    pub parallelism: Option<u32>,
    pub parameters: Scope<InputParamDef>,
    pub templates: Scope<Template>,
    pub entrypoint: String,
}

impl Workflow {
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }
}
