//! sf-core: stable foundation for stockflow.
//!
//! Contains:
//! - ids (stable compact IDs for graph objects)
//! - numeric (Real + tolerances + float helpers)

pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use ids::*;
pub use numeric::*;
