//! Independent verification of the equation ordering invariant.
//!
//! Replays "is this slot initialized" bits across the equation vector:
//! every consumed flow operand must have been produced by an earlier
//! equation or seeded at reset (parameters, constants, identity defaults
//! for unwired binary operands). Stock operands are always readable. Used
//! by tests and diagnostics, never on the hot path.

use crate::compile::CompiledSystem;
use crate::eval::Operand;

pub fn check_equation_order(sys: &CompiledSystem) -> bool {
    let mut init = vec![false; sys.n_flow];
    for &(slot, _) in &sys.param_inits {
        init[slot] = true;
    }

    let ready = |init: &[bool], op: Option<Operand>| -> bool {
        match op {
            None => true,
            Some(o) if !o.is_flow() => true,
            Some(o) => init[o.slot],
        }
    };

    for eq in &sys.equations {
        if eq.kind.num_args() > 0 && eq.in1.is_none() {
            return false; // incorrectly wired operation
        }
        if eq.kind.num_args() > 1 && eq.in2.is_none() {
            return false;
        }
        if !ready(&init, eq.in1) || !ready(&init, eq.in2) {
            return false;
        }
        init[eq.out] = true;
    }

    init.iter().all(|&b| b)
}
