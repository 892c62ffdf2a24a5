//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::Configuration;
use crate::config::validation::{validate_config, ValidatedConfiguration, ValidationError};

/// Document encodings the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

impl DocumentFormat {
    /// Pick a decoder from the file extension. Unknown extensions are YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => DocumentFormat::Json,
            Some("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// The document could not be decoded into a [`Configuration`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decode a document without validating it.
pub fn decode_document(
    content: &str,
    format: DocumentFormat,
) -> Result<Configuration, DecodeError> {
    let config = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
        DocumentFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Load and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<ValidatedConfiguration, LoadError> {
    let content = fs::read_to_string(path)?;
    let config = decode_document(&content, DocumentFormat::from_path(path))?;

    let validated = validate_config(&config).map_err(LoadError::Validation)?;

    tracing::debug!(
        path = %path.display(),
        tunnel = %validated.config().tunnel_id,
        rules = validated.config().ingress.len(),
        "Configuration loaded"
    );
    Ok(validated)
}
