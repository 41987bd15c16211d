//! sf-app: the application service layer.
//!
//! Frontends apply [`Command`]s to an [`App`], which owns the document
//! graph, the simulator, a bounded undo history of serialized snapshots
//! and an optional background autosaver.

pub mod app;
pub mod commands;
pub mod error;
pub mod history;
pub mod saver;

pub use app::App;
pub use commands::Command;
pub use error::{AppError, AppResult};
pub use history::History;
pub use saver::{BackgroundSaver, Saver};
