//! Manifest serialization

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::CollaboratorError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Serialize a rendered manifest
pub fn manifest_to_string(manifest: &JsonValue, format: OutputFormat) -> Result<String, CollaboratorError> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(manifest).map_err(|e| CollaboratorError::Write(e.to_string()))
        }
        OutputFormat::Json => serde_json::to_string_pretty(manifest)
            .map(|mut text| {
                text.push('\n');
                text
            })
            .map_err(|e| CollaboratorError::Write(e.to_string())),
    }
}

pub fn write_manifest(
    manifest: &JsonValue,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<(), CollaboratorError> {
    let text = manifest_to_string(manifest, format)?;
    out.write_all(text.as_bytes())
        .map_err(|e| CollaboratorError::Write(e.to_string()))
}

pub fn write_manifest_file(
    manifest: &JsonValue,
    format: OutputFormat,
    path: &Path,
) -> Result<(), CollaboratorError> {
    let text = manifest_to_string(manifest, format)?;
    std::fs::write(path, text)
        .map_err(|e| CollaboratorError::Write(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), ?format, "manifest written");
    Ok(())
}
