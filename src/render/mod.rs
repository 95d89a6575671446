//! Workflow → target manifest
//!
//! [`render_workflow`] is a pure function from a finished [`Workflow`] to the
//! plain-data manifest the engine consumes. Every expression is replaced by
//! its textual form; nothing else is interpreted. Rendering the same workflow
//! twice yields identical values.

mod expression;


pub use expression::{quote_string, reference, render_inline, render_template};

use serde_json::{json, Map, Value as JsonValue};

use crate::error::RenderError;
use crate::expression::Expr;
use crate::model::{
    ContainerSpec, LoopSpec, ResourceSpec, Resources, StepRecord, Template, TemplateBody,
    TemplateTarget, Workflow,
};
use crate::params::{InputParamDef, OutputParamDef, OutputSource};
use crate::scope::Scope;

pub const API_VERSION: &str = "argoproj.io/v1alpha1";
pub const KIND: &str = "WorkflowTemplate";

/// Name of the container the engine runs a template's main process in
const MAIN_CONTAINER: &str = "main";

/// Key marking a serialized expression node inside a free-form document
const EXPR_TAG: &str = "$expr";

/// Rendering knobs that are not part of the workflow definition itself
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Emitted as `metadata.namespace`
    pub namespace: Option<String>,
}

pub fn render_workflow(workflow: &Workflow) -> Result<JsonValue, RenderError> {
    render_workflow_with(workflow, &RenderOptions::default())
}

pub fn render_workflow_with(
    workflow: &Workflow,
    options: &RenderOptions,
) -> Result<JsonValue, RenderError> {
    let mut metadata = Map::new();
    metadata.insert("name".into(), json!(workflow.name));
    if let Some(namespace) = &options.namespace {
        metadata.insert("namespace".into(), json!(namespace));
    }

    let mut spec = Map::new();
    spec.insert("serviceAccountName".into(), json!(workflow.service_account));
    spec.insert("entrypoint".into(), json!(workflow.entrypoint));
    if let Some(parallelism) = workflow.parallelism {
        spec.insert("parallelism".into(), json!(parallelism));
    }
    if !workflow.parameters.is_empty() {
        spec.insert(
            "arguments".into(),
            json!({ "parameters": render_input_params(&workflow.parameters)? }),
        );
    }
    let templates = workflow
        .templates
        .iter()
        .map(|(_, template)| render_template_def(template))
        .collect::<Result<Vec<_>, _>>()?;
    spec.insert("templates".into(), JsonValue::Array(templates));

    tracing::debug!(workflow = %workflow.name, templates = workflow.templates.len(), "workflow rendered");
    Ok(json!({
        "apiVersion": API_VERSION,
        "kind": KIND,
        "metadata": metadata,
        "spec": spec,
    }))
}

/* ===================== Templates ===================== */

fn render_template_def(template: &Template) -> Result<JsonValue, RenderError> {
    let mut out = Map::new();
    out.insert("name".into(), json!(template.name));
    out.insert(
        "inputs".into(),
        json!({ "parameters": render_input_params(&template.signature.inputs)? }),
    );
    if !template.signature.outputs.is_empty() {
        out.insert(
            "outputs".into(),
            json!({ "parameters": render_output_params(&template.signature.outputs)? }),
        );
    }

    match &template.body {
        TemplateBody::Steps(groups) => {
            let groups = groups
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .map(render_step)
                        .collect::<Result<Vec<_>, _>>()
                        .map(JsonValue::Array)
                })
                .collect::<Result<Vec<_>, _>>()?;
            out.insert("steps".into(), JsonValue::Array(groups));
        }
        TemplateBody::Dag(tasks) => {
            let tasks = tasks.iter().map(render_step).collect::<Result<Vec<_>, _>>()?;
            out.insert("dag".into(), json!({ "tasks": tasks }));
        }
        TemplateBody::Container(container) => {
            out.insert("container".into(), render_container(container)?);
        }
        TemplateBody::Resource(resource) => {
            out.insert("resource".into(), render_resource(resource)?);
            out.insert("podSpecPatch".into(), json!(pod_spec_patch(&resource.resources)?));
        }
    }

    tracing::debug!(template = %template.name, body = template.body.kind(), "template rendered");
    Ok(JsonValue::Object(out))
}

fn render_input_params(inputs: &Scope<InputParamDef>) -> Result<Vec<JsonValue>, RenderError> {
    inputs
        .iter()
        .map(|(name, def)| {
            let mut param = Map::new();
            param.insert("name".into(), json!(name));
            if let Some(default) = def.default_value() {
                insert_value(&mut param, default)?;
            }
            if let Some(description) = def.description() {
                param.insert("description".into(), json!(description));
            }
            Ok(JsonValue::Object(param))
        })
        .collect()
}

fn render_output_params(outputs: &Scope<OutputParamDef>) -> Result<Vec<JsonValue>, RenderError> {
    outputs
        .iter()
        .map(|(name, def)| {
            let value_from = match &def.source {
                OutputSource::Expression(expr @ Expr::Parameter { .. }) => {
                    json!({ "parameter": render_template(expr)? })
                }
                OutputSource::Expression(expr) => json!({ "expression": render_inline(expr)? }),
                OutputSource::Path(path) => json!({ "path": path }),
                OutputSource::JsonPath(path) => json!({ "jsonPath": path }),
            };
            let mut param = Map::new();
            param.insert("name".into(), json!(name));
            param.insert("valueFrom".into(), value_from);
            if let Some(description) = &def.description {
                param.insert("description".into(), json!(description));
            }
            Ok(JsonValue::Object(param))
        })
        .collect()
}

/// `value` for ordinary expressions, `valueFrom.configMapKeyRef` for config maps
fn insert_value(param: &mut Map<String, JsonValue>, value: &Expr) -> Result<(), RenderError> {
    match value {
        Expr::ConfigMap { map, key, .. } => {
            param.insert(
                "valueFrom".into(),
                json!({ "configMapKeyRef": { "name": map, "key": key } }),
            );
        }
        other => {
            param.insert("value".into(), json!(render_template(other)?));
        }
    }
    Ok(())
}

/* ===================== Steps and tasks ===================== */

fn render_step(step: &StepRecord) -> Result<JsonValue, RenderError> {
    let mut out = Map::new();
    out.insert("name".into(), json!(step.name));
    match &step.template {
        TemplateTarget::Internal(name) => {
            out.insert("template".into(), json!(name));
        }
        TemplateTarget::External { workflow, template } => {
            out.insert(
                "templateRef".into(),
                json!({ "name": workflow, "template": template }),
            );
        }
    }
    if !step.dependencies.is_empty() {
        out.insert("dependencies".into(), json!(step.dependencies));
    }
    if !step.arguments.is_empty() {
        let parameters = step
            .arguments
            .iter()
            .map(|(name, value)| {
                let mut param = Map::new();
                param.insert("name".into(), json!(name));
                insert_value(&mut param, value)?;
                Ok(JsonValue::Object(param))
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        out.insert("arguments".into(), json!({ "parameters": parameters }));
    }
    match &step.loop_spec {
        Some(LoopSpec::Items(items)) => {
            out.insert("withItems".into(), json!(items));
        }
        Some(LoopSpec::Param(expr)) => {
            out.insert("withParam".into(), json!(render_template(expr)?));
        }
        Some(LoopSpec::Sequence { count }) => {
            out.insert(
                "withSequence".into(),
                json!({ "count": render_template(count)? }),
            );
        }
        None => {}
    }
    if let Some(condition) = &step.when {
        out.insert("when".into(), json!(render_template(condition)?));
    }
    Ok(JsonValue::Object(out))
}

/* ===================== Containers and resources ===================== */

fn render_container(container: &ContainerSpec) -> Result<JsonValue, RenderError> {
    let mut out = Map::new();
    out.insert("image".into(), json!(container.image));
    if let Some(policy) = &container.image_pull_policy {
        out.insert("imagePullPolicy".into(), json!(policy));
    }
    if !container.command.is_empty() {
        out.insert("command".into(), json!(container.command));
    }
    if !container.args.is_empty() {
        let args = container
            .args
            .iter()
            .map(render_template)
            .collect::<Result<Vec<_>, _>>()?;
        out.insert("args".into(), json!(args));
    }
    if !container.env.is_empty() {
        let env = container
            .env
            .iter()
            .map(|(name, value)| {
                let mut var = Map::new();
                var.insert("name".into(), json!(name));
                insert_value(&mut var, value)?;
                Ok(JsonValue::Object(var))
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        out.insert("env".into(), json!(env));
    }
    if let Some(dir) = &container.working_dir {
        out.insert("workingDir".into(), json!(dir));
    }
    out.insert("resources".into(), resources_value(&container.resources)?);
    Ok(JsonValue::Object(out))
}

fn render_resource(resource: &ResourceSpec) -> Result<JsonValue, RenderError> {
    let manifest = render_document(&resource.manifest)?;
    let manifest = serde_yaml::to_string(&manifest).map_err(|e| RenderError::Serialization {
        what: "resource manifest".to_string(),
        message: e.to_string(),
    })?;

    let mut out = Map::new();
    out.insert("action".into(), json!(resource.action.as_str()));
    out.insert("manifest".into(), json!(manifest));
    if resource.set_owner_reference {
        out.insert("setOwnerReference".into(), json!(true));
    }
    if let Some(condition) = &resource.success_condition {
        out.insert("successCondition".into(), json!(condition));
    }
    if let Some(condition) = &resource.failure_condition {
        out.insert("failureCondition".into(), json!(condition));
    }
    if let Some(strategy) = &resource.merge_strategy {
        out.insert("mergeStrategy".into(), json!(strategy));
    }
    Ok(JsonValue::Object(out))
}

/// Resource templates have no container spec; bounds go through a pod patch
fn pod_spec_patch(resources: &Resources) -> Result<String, RenderError> {
    let patch = json!({
        "containers": [{ "name": MAIN_CONTAINER, "resources": resources_value(resources)? }]
    });
    serde_json::to_string(&patch).map_err(|e| RenderError::Serialization {
        what: "podSpecPatch".to_string(),
        message: e.to_string(),
    })
}

fn resources_value(resources: &Resources) -> Result<JsonValue, RenderError> {
    serde_json::to_value(resources).map_err(|e| RenderError::Serialization {
        what: "resources".to_string(),
        message: e.to_string(),
    })
}

/* ===================== Free-form documents ===================== */

/// Replace every embedded expression node of `document` by its template form.
///
/// Objects carrying the `$expr` tag must deserialize into an [`Expr`];
/// anything else tagged that way is an [`RenderError::UnrecognizedNode`].
pub fn render_document(document: &JsonValue) -> Result<JsonValue, RenderError> {
    render_node(document, &mut Vec::new())
}

fn render_node(node: &JsonValue, path: &mut Vec<String>) -> Result<JsonValue, RenderError> {
    match node {
        JsonValue::Object(map) if map.contains_key(EXPR_TAG) => {
            let expr: Expr = serde_json::from_value(node.clone()).map_err(|e| {
                RenderError::UnrecognizedNode {
                    path: path.join("."),
                    reason: e.to_string(),
                }
            })?;
            Ok(JsonValue::String(render_template(&expr)?))
        }
        JsonValue::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                path.push(key.clone());
                out.insert(key.clone(), render_node(value, path)?);
                path.pop();
            }
            Ok(JsonValue::Object(out))
        }
        JsonValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                out.push(render_node(item, path)?);
                path.pop();
            }
            Ok(JsonValue::Array(out))
        }
        scalar => Ok(scalar.clone()),
    }
}

/// Every well-formed expression node embedded in `document`, in document order
pub fn embedded_expressions(document: &JsonValue) -> Vec<Expr> {
    let mut out = Vec::new();
    collect_expressions(document, &mut out);
    out
}

fn collect_expressions(node: &JsonValue, out: &mut Vec<Expr>) {
    match node {
        JsonValue::Object(map) if map.contains_key(EXPR_TAG) => {
            if let Ok(expr) = serde_json::from_value::<Expr>(node.clone()) {
                out.push(expr);
            }
        }
        JsonValue::Object(map) => map.values().for_each(|value| collect_expressions(value, out)),
        JsonValue::Array(items) => items.iter().for_each(|item| collect_expressions(item, out)),
        _ => {}
    }
}
