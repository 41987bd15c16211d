use sf_core::{ItemId, PortId, WireId};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("Unknown port: {0}")]
    UnknownPort(PortId),

    #[error("Unknown wire: {0}")]
    UnknownWire(WireId),

    #[error("Wires must run from an output port to an input port")]
    WireDirection { from: PortId, to: PortId },

    #[error("Input port {0} already has a wire")]
    InputOccupied(PortId),

    #[error("Variable '{0}' already has a definition")]
    DuplicateDefinition(String),

    #[error("Unknown variable: '{0}'")]
    UnknownValue(String),

    #[error("Cannot parse initial value '{init}' for '{value}'")]
    BadInit { value: String, init: String },

    #[error("Item {0} is not a group")]
    NotAGroup(ItemId),

    #[error("Duplicate id on restore: {what} {index}")]
    DuplicateId { what: &'static str, index: u32 },

    #[error("Invariant violated: {0}")]
    Invariant(String),
}
