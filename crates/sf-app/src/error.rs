//! Error types for the application service layer.

/// Unified error surface for frontends (CLI and any future GUI).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Save failed: {0}")]
    Save(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("operation refused while a step is in progress")]
    Busy,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<sf_project::ProjectError> for AppError {
    fn from(err: sf_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<sf_graph::GraphError> for AppError {
    fn from(err: sf_graph::GraphError) -> Self {
        AppError::Graph(err.to_string())
    }
}

impl From<sf_sim::SimError> for AppError {
    fn from(err: sf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<sf_compile::CompileError> for AppError {
    fn from(err: sf_compile::CompileError) -> Self {
        AppError::Simulation(err.to_string())
    }
}
