//! sf-compile: turns an acyclic model graph into an executable system.
//!
//! The output is an ordered vector of slot-indexed scalar evaluation
//! operations (the "equations") plus a set of integral definitions mapping
//! stock slots to their time derivatives. Equations are regenerated from
//! scratch on every compile and reference numeric slots only, never graph
//! objects, so they are safe to drop and rebuild at any time.

pub mod compile;
pub mod error;
pub mod eval;
pub mod order;

pub use compile::{CompiledSystem, compile};
pub use error::{CompileError, CompileResult};
pub use eval::{EvalOp, EvalOpKind, Integral, Operand, SlotSource};
pub use order::check_equation_order;
