//! `wfc` command line
//!
//! Renders the bundled catalog workflows and checks migration configuration
//! documents. All library errors surface here as `anyhow` errors with context.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use crate::catalog::{self, CatalogContext, MigrationConfig};
use crate::collaborators::{
    write_manifest, write_manifest_file, FsResourceLoader, OutputFormat, SchemaValidator,
};
use crate::config::CompilerConfig;
use crate::error::CollaboratorError;
use crate::render::{render_workflow_with, RenderOptions};

#[derive(Parser)]
#[command(name = "wfc")]
#[command(about = "Compile typed workflow definitions into Argo WorkflowTemplate manifests", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides WFC_CONFIG_PATH and ./wfc.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the bundled workflows
    List,

    /// Render a bundled workflow to a manifest
    Render {
        /// Catalog entry name
        name: String,

        /// Output format (defaults to the configured one)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Namespace written into the manifest metadata
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Check a migration configuration document (YAML or JSON)
    ValidateConfig {
        /// Document to check
        file: PathBuf,
    },

    /// Print the JSON schema of migration configuration documents
    Schema,

    /// Print the effective compiler configuration
    Config,
}

/// Run a parsed command line against loaded configuration
pub fn run(cli: Cli, config: &CompilerConfig) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::List => {
            for entry in catalog::ENTRIES {
                writeln!(out, "{:<20} {}", entry.name, entry.description)?;
            }
        }

        Commands::Render {
            name,
            format,
            output,
            namespace,
        } => {
            let entry = catalog::find(&name).with_context(|| {
                format!("unknown workflow '{}' (see `wfc list`)", name)
            })?;

            let loader = FsResourceLoader::new(&config.script_root);
            let ctx = CatalogContext {
                config,
                loader: &loader,
            };
            let workflow = entry
                .build(&ctx)
                .with_context(|| format!("failed to build workflow '{}'", name))?;

            let options = RenderOptions {
                namespace: namespace.or_else(|| config.namespace.clone()),
            };
            let manifest = render_workflow_with(&workflow, &options)
                .with_context(|| format!("failed to render workflow '{}'", name))?;

            let format = format.unwrap_or(config.output_format);
            match output {
                Some(path) => {
                    write_manifest_file(&manifest, format, &path)?;
                    tracing::info!(workflow = %name, path = %path.display(), "manifest written");
                }
                None => write_manifest(&manifest, format, &mut out)?,
            }
        }

        Commands::ValidateConfig { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            // YAML is a superset of JSON, so one parser covers both
            let document: JsonValue = serde_yaml::from_str(&text)
                .with_context(|| format!("failed to parse {}", file.display()))?;

            let validator = SchemaValidator::<MigrationConfig>::new()?;
            match validator.validate(&document) {
                Ok(_) => writeln!(out, "{}: ok", file.display())?,
                Err(CollaboratorError::InvalidConfig(issues)) => {
                    for issue in &issues {
                        writeln!(out, "{}", issue)?;
                    }
                    anyhow::bail!(
                        "{} has {} schema violation(s)",
                        file.display(),
                        issues.len()
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Schema => {
            let validator = SchemaValidator::<MigrationConfig>::new()?;
            let text = serde_json::to_string_pretty(validator.schema())?;
            writeln!(out, "{}", text)?;
        }

        Commands::Config => {
            let text = config
                .to_toml()
                .context("failed to serialize configuration")?;
            write!(out, "{}", text)?;
        }
    }

    Ok(())
}
