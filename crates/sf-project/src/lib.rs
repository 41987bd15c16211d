//! sf-project: model file format, schema migration and snapshots.

pub mod io;
pub mod migrate;
pub mod schema;
pub mod snapshot;

pub use io::{load_model, save_model};
pub use migrate::{from_json_str, from_yaml_str};
pub use schema::{ItemDef, ItemDefKind, ModelFile, SCHEMA_VERSION, SolverDef, WireDef};
pub use snapshot::Snapshot;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Unsupported file extension: {path}")]
    UnknownExtension { path: String },

    #[error("Graph error: {0}")]
    Graph(#[from] sf_graph::GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
