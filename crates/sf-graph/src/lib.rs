//! sf-graph: the model graph of a stockflow document.
//!
//! Items (operations, variables, integrals, Godley tables, groups) are
//! connected through ports and wires. The graph owns topology and per-item
//! static data only; evaluation lives in sf-compile/sf-sim.

pub mod cycle;
pub mod error;
pub mod godley;
pub mod model;
pub mod values;

pub use cycle::{find_cycle, has_cycle};
pub use error::{GraphError, GraphResult};
pub use godley::{GodleyColumn, GodleyTable};
pub use model::{Bookmark, Graph, Item, ItemKind, OpKind, Port, PortKind, Wire};
pub use values::{ValueId, VarKind, VariableValue, VariableValues, value_id};
