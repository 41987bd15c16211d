//! Model file loading and saving, dispatched on file extension.

use std::path::Path;

use crate::migrate::{from_json_str, from_yaml_str};
use crate::schema::ModelFile;
use crate::{ProjectError, ProjectResult};

enum Format {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> ProjectResult<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") | Some("sfm") => Ok(Format::Json),
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        _ => Err(ProjectError::UnknownExtension {
            path: path.display().to_string(),
        }),
    }
}

/// Read a model file, upgrading older schema versions on the way in.
pub fn load_model(path: &Path) -> ProjectResult<ModelFile> {
    let content = std::fs::read_to_string(path)?;
    match format_of(path)? {
        Format::Json => from_json_str(&content),
        Format::Yaml => from_yaml_str(&content),
    }
}

/// Write a model file at the current schema version.
pub fn save_model(path: &Path, file: &ModelFile) -> ProjectResult<()> {
    let content = match format_of(path)? {
        Format::Json => serde_json::to_string_pretty(file)?,
        Format::Yaml => serde_yaml::to_string(file)?,
    };
    std::fs::write(path, content)?;
    Ok(())
}
