//! Bundled migration workflows
//!
//! Each entry is a function from a [`CatalogContext`] to a finished
//! [`Workflow`], written with the builder chain like any author code would be.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::builder::{InputScope, TemplateRef, WorkflowBuilder};
use crate::collaborators::ResourceLoader;
use crate::config::CompilerConfig;
use crate::error::BuildError;
use crate::expression::Expr;
use crate::model::{LoopSpec, ResourceAction, Resources, Workflow};
use crate::params::InputParamDef;
use crate::types::ValueType;

/// Image running the migration tooling
pub const MIGRATION_IMAGE: &str = "migrations/migration_console:latest";

/// Config map operators fill in before submitting a migration
pub const CONFIG_MAP: &str = "migration-config";

/* ===================== Migration configuration ===================== */

/// Operator-supplied description of one migration, checked by `wfc validate-config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MigrationConfig {
    pub source_cluster: ClusterConfig,
    pub target_cluster: ClusterConfig,
    #[serde(default)]
    pub snapshot: Option<SnapshotConfig>,
    /// Index patterns to migrate; empty means all
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub backfill: Option<BackfillConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterConfig {
    pub endpoint: String,
    #[serde(default)]
    pub allow_insecure: bool,
    #[serde(default)]
    pub auth: Option<ClusterAuth>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClusterAuth {
    Basic {
        username: String,
        #[serde(rename = "passwordSecret")]
        password_secret: String,
    },
    Sigv4 {
        region: String,
        service: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SnapshotConfig {
    pub repository: String,
    pub name: String,
    #[serde(default)]
    pub s3_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BackfillConfig {
    pub workers: u32,
}

/* ===================== Registry ===================== */

/// What a catalog entry needs to build its workflow
pub struct CatalogContext<'a> {
    pub config: &'a CompilerConfig,
    pub loader: &'a dyn ResourceLoader,
}

pub struct CatalogEntry {
    pub name: &'static str,
    pub description: &'static str,
    build: fn(&CatalogContext<'_>) -> Result<Workflow, BuildError>,
}

impl CatalogEntry {
    pub fn build(&self, ctx: &CatalogContext<'_>) -> Result<Workflow, BuildError> {
        tracing::debug!(entry = self.name, "building catalog workflow");
        (self.build)(ctx)
    }
}

pub const ENTRIES: &[CatalogEntry] = &[
    CatalogEntry {
        name: "snapshot-migration",
        description: "Snapshot the source cluster, migrate metadata, restore indices on the target",
        build: snapshot_migration,
    },
    CatalogEntry {
        name: "full-migration",
        description: "Deploy proxy configuration, snapshot through snapshot-migration, then backfill",
        build: full_migration,
    },
];

pub fn find(name: &str) -> Option<&'static CatalogEntry> {
    ENTRIES.iter().find(|entry| entry.name == name)
}

/* ===================== Workflows ===================== */

fn base(name: &str, config: &CompilerConfig) -> WorkflowBuilder {
    let builder = WorkflowBuilder::new(name).service_account(config.service_account.clone());
    match config.parallelism {
        Some(parallelism) => builder.parallelism(parallelism),
        None => builder,
    }
}

fn tooling_resources() -> Resources {
    Resources::guaranteed("250m", "256Mi")
}

pub fn snapshot_migration(ctx: &CatalogContext<'_>) -> Result<Workflow, BuildError> {
    base("snapshot-migration", ctx.config)
        .add_required_param("sourceEndpoint", ValueType::String)?
        .add_required_param("targetEndpoint", ValueType::String)?
        .add_param(
            "snapshotName",
            InputParamDef::optional(Expr::config_map(CONFIG_MAP, "snapshotName", ValueType::String))
                .describe("Name of the snapshot to create and restore"),
        )?
        .add_param(
            "indices",
            InputParamDef::optional(Expr::literal(json!(["*"]))).describe("Index patterns to migrate"),
        )?
        .add_template("createSnapshot", |t| {
            let c = t
                .add_required_input("sourceEndpoint", ValueType::String)?
                .add_required_input("snapshotName", ValueType::String)?
                .container()
                .image(MIGRATION_IMAGE)
                .script_from(ctx.loader, "create_snapshot.sh")?
                .resources(tooling_resources())
                .add_path_output("snapshotName", ValueType::String, "/tmp/snapshot-name")?;
            let endpoint = c.input("sourceEndpoint")?;
            let name = c.input("snapshotName")?;
            c.add_env("SOURCE_ENDPOINT", endpoint)?.add_env("SNAPSHOT_NAME", name)
        })?
        .add_template("migrateMetadata", |t| {
            let c = t
                .add_required_input("targetEndpoint", ValueType::String)?
                .add_required_input("snapshotName", ValueType::String)?
                .add_required_input("indices", ValueType::array(ValueType::String))?
                .add_optional_input("dryRun", |_| Ok(Expr::literal(false)))?
                .container()
                .image(MIGRATION_IMAGE)
                .command(["migration-console", "metadata", "migrate"])
                .resources(tooling_resources())
                .add_path_output(
                    "migratedIndices",
                    ValueType::array(ValueType::String),
                    "/tmp/migrated-indices.json",
                )?;
            let target = c.input("targetEndpoint")?;
            let snapshot = c.input("snapshotName")?;
            let indices = c.input("indices")?.as_string()?;
            let dry_run = Expr::ternary(c.input("dryRun")?, Expr::string("--dry-run"), Expr::string(""))?;
            c.add_arg("--target")?
                .add_arg(target)?
                .add_arg("--snapshot-name")?
                .add_arg(snapshot)?
                .add_arg("--index-allowlist")?
                .add_arg(indices)?
                .add_arg(dry_run)
        })?
        .add_template("restoreIndex", |t| {
            let c = t
                .add_required_input("targetEndpoint", ValueType::String)?
                .add_required_input("snapshotName", ValueType::String)?
                .add_required_input("index", ValueType::String)?
                .container()
                .image(MIGRATION_IMAGE)
                .command(["migration-console", "snapshot", "restore"])
                .resources(tooling_resources());
            let target = c.input("targetEndpoint")?;
            let source = Expr::concat_with(vec![c.input("snapshotName")?, c.input("index")?], "/")?;
            c.add_arg("--target")?.add_arg(target)?.add_arg("--source")?.add_arg(source)
        })?
        .add_template("main", |t| {
            let steps = t
                .steps()
                .add_step("createSnapshot", TemplateRef::internal("createSnapshot"), |b| {
                    b.set("sourceEndpoint", b.workflow_param("sourceEndpoint")?)?;
                    b.set("snapshotName", b.workflow_param("snapshotName")?)?;
                    Ok(())
                })?
                .add_step("migrateMetadata", TemplateRef::internal("migrateMetadata"), |b| {
                    b.set("targetEndpoint", b.workflow_param("targetEndpoint")?)?;
                    b.set("snapshotName", b.step_output("createSnapshot", "snapshotName")?)?;
                    b.set("indices", b.workflow_param("indices")?)?;
                    Ok(())
                })?;
            let migrated = steps.step_output("migrateMetadata", "migratedIndices")?;
            let steps = steps.add_looped_step(
                "restoreIndex",
                TemplateRef::internal("restoreIndex"),
                LoopSpec::param(migrated),
                |b| {
                    b.set("targetEndpoint", b.workflow_param("targetEndpoint")?)?;
                    b.set("snapshotName", b.step_output("createSnapshot", "snapshotName")?)?;
                    b.set("index", b.item()?)?;
                    Ok(())
                },
            )?;
            let snapshot = steps.step_output("createSnapshot", "snapshotName")?;
            steps.add_expression_output("snapshotName", snapshot)
        })?
        .entrypoint("main")?
        .get_full_scope()
}

pub fn full_migration(ctx: &CatalogContext<'_>) -> Result<Workflow, BuildError> {
    let snapshot = snapshot_migration(ctx)?;

    base("full-migration", ctx.config)
        .add_required_param("sourceEndpoint", ValueType::String)?
        .add_required_param("targetEndpoint", ValueType::String)?
        .add_optional_param("runBackfill", Expr::literal(true))?
        .add_param(
            "backfillWorkers",
            InputParamDef::optional(Expr::config_map(CONFIG_MAP, "backfillWorkers", ValueType::Integer)),
        )?
        .add_template("deployProxyConfig", |t| {
            let r = t
                .add_required_input("sourceEndpoint", ValueType::String)?
                .add_required_input("targetEndpoint", ValueType::String)?
                .resource(ResourceAction::Apply)
                .set_owner_reference(true)
                .resources(Resources::guaranteed("50m", "32Mi"))
                .add_json_path_output("configName", ValueType::String, "{.metadata.name}")?;
            let source = r.input("sourceEndpoint")?;
            let target = r.input("targetEndpoint")?;
            r.manifest(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {
                    "name": "capture-proxy-config",
                    "labels": { "app.kubernetes.io/part-of": "migration" }
                },
                "data": {
                    "source": source.to_value(),
                    "target": target.to_value()
                }
            }))
        })?
        .add_template("backfill", |t| {
            let c = t
                .add_required_input("targetEndpoint", ValueType::String)?
                .add_required_input("workers", ValueType::Integer)?
                .container()
                .image(MIGRATION_IMAGE)
                .script_from(ctx.loader, "backfill.sh")?
                .resources(tooling_resources());
            let target = c.input("targetEndpoint")?;
            let workers = c.input("workers")?.as_string()?;
            c.add_env("TARGET_ENDPOINT", target)?.add_env("WORKERS", workers)
        })?
        .add_template("main", |t| {
            let dag = t
                .dag()
                .add_task("deployProxyConfig", TemplateRef::internal("deployProxyConfig"), &[], |b| {
                    b.set("sourceEndpoint", b.workflow_param("sourceEndpoint")?)?;
                    b.set("targetEndpoint", b.workflow_param("targetEndpoint")?)?;
                    Ok(())
                })?
                .add_task(
                    "createSnapshot",
                    TemplateRef::external(&snapshot, "createSnapshot")?,
                    &["deployProxyConfig"],
                    |b| {
                        b.set("sourceEndpoint", b.workflow_param("sourceEndpoint")?)?;
                        b.set("snapshotName", "full-migration-snapshot")?;
                        Ok(())
                    },
                )?
                .add_task("backfill", TemplateRef::internal("backfill"), &["createSnapshot"], |b| {
                    b.set("targetEndpoint", b.workflow_param("targetEndpoint")?)?;
                    b.set("workers", b.workflow_param("backfillWorkers")?)?;
                    b.when(b.workflow_param("runBackfill")?)?;
                    Ok(())
                })?;
            let snapshot_name = dag.task_output("createSnapshot", "snapshotName")?;
            dag.add_expression_output("snapshotName", snapshot_name)
        })?
        .entrypoint("main")?
        .get_full_scope()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use maplit::btreemap;
    use serde_json::{json, Value as JsonValue};

    use super::*;
    use crate::collaborators::validate_document;
    use crate::error::CollaboratorError;
    use crate::render::render_workflow;

    struct MapLoader(BTreeMap<&'static str, &'static str>);

    impl ResourceLoader for MapLoader {
        fn load(&self, path: &str) -> Result<String, CollaboratorError> {
            self.0
                .get(path)
                .map(|s| s.to_string())
                .ok_or_else(|| CollaboratorError::ResourceLoad {
                    path: path.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                })
        }
    }

    fn loader() -> MapLoader {
        MapLoader(btreemap! {
            "create_snapshot.sh" => "echo snapshot",
            "backfill.sh" => "echo backfill",
        })
    }

    fn template<'a>(manifest: &'a JsonValue, name: &str) -> &'a JsonValue {
        manifest["spec"]["templates"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == name)
            .unwrap()
    }

    #[test]
    fn test_every_entry_builds() {
        let config = CompilerConfig::default();
        let loader = loader();
        let ctx = CatalogContext {
            config: &config,
            loader: &loader,
        };
        for entry in ENTRIES {
            let workflow = entry.build(&ctx).unwrap();
            assert_eq!(workflow.name, entry.name);
            assert_eq!(workflow.entrypoint, "main");
        }
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_snapshot_migration_wiring() {
        let config = CompilerConfig {
            parallelism: Some(5),
            ..CompilerConfig::default()
        };
        let loader = loader();
        let ctx = CatalogContext {
            config: &config,
            loader: &loader,
        };
        let manifest = render_workflow(&snapshot_migration(&ctx).unwrap()).unwrap();
        assert_eq!(manifest["spec"]["parallelism"], 5);

        let create = template(&manifest, "createSnapshot");
        assert_eq!(create["container"]["args"], json!(["echo snapshot"]));

        let steps = &template(&manifest, "main")["steps"];
        let restore = &steps[2][0];
        assert_eq!(
            restore["withParam"],
            "{{steps.migrateMetadata.outputs.parameters.migratedIndices}}"
        );
        assert_eq!(restore["arguments"]["parameters"][2]["value"], "{{item}}");

        let migrate = template(&manifest, "migrateMetadata");
        assert_eq!(
            migrate["container"]["args"][6],
            "{{=fromJSON(inputs.parameters.dryRun) ? '--dry-run' : ''}}"
        );
    }

    #[test]
    fn test_full_migration_references_snapshot_template() {
        let config = CompilerConfig::default();
        let loader = loader();
        let ctx = CatalogContext {
            config: &config,
            loader: &loader,
        };
        let manifest = render_workflow(&full_migration(&ctx).unwrap()).unwrap();
        let tasks = &template(&manifest, "main")["dag"]["tasks"];
        assert_eq!(
            tasks[1]["templateRef"],
            json!({ "name": "snapshot-migration", "template": "createSnapshot" })
        );
        assert_eq!(tasks[2]["when"], "{{workflow.parameters.runBackfill}}");
        assert_eq!(
            manifest["spec"]["arguments"]["parameters"][3]["valueFrom"],
            json!({ "configMapKeyRef": { "name": CONFIG_MAP, "key": "backfillWorkers" } })
        );
    }

    #[test]
    fn test_missing_script_fails_the_build() {
        let config = CompilerConfig::default();
        let loader = MapLoader(BTreeMap::new());
        let ctx = CatalogContext {
            config: &config,
            loader: &loader,
        };
        assert!(matches!(
            snapshot_migration(&ctx),
            Err(BuildError::Collaborator(CollaboratorError::ResourceLoad { .. }))
        ));
    }

    #[test]
    fn test_migration_config_schema() {
        let config: MigrationConfig = validate_document(&json!({
            "sourceCluster": { "endpoint": "https://source:9200", "auth": { "type": "sigv4", "region": "us-east-1", "service": "es" } },
            "targetCluster": { "endpoint": "https://target:9200" },
            "indices": ["logs-*"]
        }))
        .unwrap();
        assert_eq!(config.indices, vec!["logs-*"]);

        let err = validate_document::<MigrationConfig>(&json!({
            "sourceCluster": { "endpoint": "https://source:9200" },
            "targetCluster": { "endpoint": 9200 }
        }))
        .unwrap_err();
        match err {
            CollaboratorError::InvalidConfig(issues) => {
                assert_eq!(issues[0].path, "targetCluster.endpoint");
            }
            other => panic!("expected invalid config, got {other:?}"),
        }
    }
}
