//! Grow-only numeric invariants.

use crate::error::{ReconcileError, Result};

/// Checks that `plan` only grows from `state`, and by at least `minimum_step`.
///
/// An unchanged value always passes. The caller decides whether a failure
/// aborts the pass or only skips the attribute.
pub fn check_growth(attribute: &str, state: u64, plan: u64, minimum_step: u64) -> Result<()> {
    if plan == state {
        return Ok(());
    }
    if plan < state {
        return Err(ReconcileError::grow_violation(attribute, state, plan));
    }
    let delta = plan - state;
    if delta < minimum_step {
        return Err(ReconcileError::minimum_step(attribute, delta, minimum_step));
    }
    Ok(())
}
