//! Display callbacks invoked by the simulator.
//!
//! The simulation loop never talks to a UI directly. Frontends implement
//! [`DisplayHook`] and the simulator calls it at the few points where a
//! display needs to react: after a redraw-worthy step, after a reset, on a
//! simulation error, and when an item should be highlighted (e.g. a cycle
//! participant).

use sf_core::ItemId;

/// Callbacks from the simulation loop to a display frontend.
///
/// All methods have no-op defaults so headless callers can implement only
/// what they need.
pub trait DisplayHook: Send {
    /// A step completed and enough time has passed since the last redraw.
    fn request_redraw(&mut self) {}

    /// The simulation was reset; plots and gauges should clear and rescale.
    fn reset_displays(&mut self) {}

    /// The simulation stopped with an error.
    fn simulation_error(&mut self, _message: &str) {}

    /// Draw attention to an item, typically one participating in a cycle.
    fn highlight_item(&mut self, _item: ItemId) {}
}

/// Hook that ignores every callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHook;

impl DisplayHook for NullHook {}
