//! sf-sim: fixed-step simulation of a compiled model.
//!
//! The simulator owns the flow and stock arrays and the compiled equation
//! system, and advances the stocks with a fixed-step integrator (Euler,
//! midpoint or classical RK4). Stepping happens on a worker thread over a
//! private state copy; resets requested mid-step are deferred and run when
//! the step completes.

pub mod error;
pub mod hooks;
pub mod integrator;
pub mod log;
pub mod sim;

pub use error::{SimError, SimResult};
pub use hooks::{DisplayHook, NullHook};
pub use integrator::{Derivatives, IntegratorKind};
pub use log::RunLogger;
pub use sim::{Simulator, SolverParams};
