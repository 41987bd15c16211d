//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while resetting or stepping a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite value in {what}")]
    NonFinite { what: String },

    #[error("simulation worker panicked")]
    WorkerPanic,

    #[error("Compilation failed: {0}")]
    Compile(#[from] sf_compile::CompileError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<sf_graph::GraphError> for SimError {
    fn from(e: sf_graph::GraphError) -> Self {
        SimError::Compile(sf_compile::CompileError::Graph(e))
    }
}
