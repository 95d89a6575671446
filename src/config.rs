//! Compiler configuration
//!
//! Layered with the `config` crate, later sources winning:
//!
//! 1. built-in defaults
//! 2. a TOML file: `--config`, else `WFC_CONFIG_PATH`, else `wfc.toml` in the
//!    working directory (optional)
//! 3. `WFC_*` environment variables (`WFC_OUTPUT_FORMAT=json`)
//!
//! Only the CLI and the bundled catalog read it; builders take every value
//! explicitly.

use serde::{Deserialize, Serialize};

use crate::builder::DEFAULT_SERVICE_ACCOUNT;
use crate::collaborators::OutputFormat;

/// File searched for when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "wfc.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Format of rendered manifests
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Service account the rendered workflows run under
    #[serde(default = "default_service_account")]
    pub service_account: String,

    /// Maximum number of pods a workflow runs at once
    #[serde(default)]
    pub parallelism: Option<u32>,

    /// Emitted as `metadata.namespace` when set
    #[serde(default)]
    pub namespace: Option<String>,

    /// Directory bundled scripts are loaded from
    #[serde(default = "default_script_root")]
    pub script_root: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Yaml,
            service_account: default_service_account(),
            parallelism: None,
            namespace: None,
            script_root: default_script_root(),
            log_level: default_log_level(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration; `path` overrides the default file search
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CompilerConfig::default())?);

        if let Some(path) = resolve_path(path) {
            tracing::debug!(path = %path, "loading configuration file");
            builder = builder.add_source(config::File::with_name(&path).required(false));
        }

        // Field names contain `_`, so nesting uses `__` while the prefix keeps `_`
        builder = builder.add_source(
            config::Environment::with_prefix("WFC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// The effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn resolve_path(explicit: Option<&str>) -> Option<String> {
    if let Some(path) = explicit {
        return Some(path.to_string());
    }
    if let Ok(path) = std::env::var("WFC_CONFIG_PATH") {
        return Some(path);
    }
    std::path::Path::new(DEFAULT_CONFIG_FILE)
        .exists()
        .then(|| DEFAULT_CONFIG_FILE.to_string())
}

fn default_service_account() -> String {
    DEFAULT_SERVICE_ACCOUNT.to_string()
}

fn default_script_root() -> String {
    "scripts".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
