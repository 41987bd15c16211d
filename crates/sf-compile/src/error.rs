use sf_core::ItemId;
use sf_graph::GraphError;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    /// The wiring graph contains a dependency loop; `item` is where the
    /// loop was detected, for highlighting.
    #[error("cyclic network detected")]
    CyclicNetwork { item: ItemId },

    #[error("operation input is not wired")]
    UnwiredInput { item: ItemId },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
