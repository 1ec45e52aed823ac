//! Order lifecycle gate.
//!
//! Runs before any mutating or destructive pass. An order removed outside our
//! control is reported as drift and must not receive further calls; an order
//! that refuses deletion stops a destroy pass with a link an operator can
//! follow.

use ordersync_core::{OrderHandle, ProviderContext, ReconcileError, Warning};
use ordersync_order::{Operation, OrderService};
use tracing::{debug, warn};

use crate::retry::{RetryPolicy, with_backoff};

/// Result of the liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// The order exists and can be worked on. Carries the fresh handle.
    Live(OrderHandle),
    /// The order was deleted or deprovisioned remotely.
    Gone(Warning),
}

/// Fetches the order's current state and classifies it.
///
/// # Errors
///
/// Returns `ReconcileError::Remote` if the order could not be read at all.
pub async fn check_live(
    order: &dyn OrderService,
    retry: &RetryPolicy,
) -> Result<GateVerdict, ReconcileError> {
    let handle = with_backoff(retry, Operation::Describe, move || order.describe())
        .await
        .map_err(|e| e.into_reconcile(Operation::Describe))?;

    if handle.state.is_gone() {
        warn!(
            order_id = %handle.order_id,
            state = %handle.state,
            "order removed outside ordersync, resource needs recreation"
        );
        return Ok(GateVerdict::Gone(Warning {
            attribute: "order".to_string(),
            message: format!(
                "order {} is {} on the remote side; \
                 it was removed outside ordersync and will be recreated",
                handle.order_id, handle.state
            ),
        }));
    }

    debug!(order_id = %handle.order_id, state = %handle.state, "order is live");
    Ok(GateVerdict::Live(handle))
}

/// Refuses to proceed with deletion when the remote side does not allow it.
pub fn check_deletable(
    provider: &ProviderContext,
    handle: &OrderHandle,
) -> Result<(), ReconcileError> {
    if handle.deletable {
        return Ok(());
    }
    let url = provider.order_url(&handle.order_id);
    warn!(order_id = %handle.order_id, %url, "order is not deletable");
    Err(ReconcileError::not_deletable(&handle.order_id, url))
}
