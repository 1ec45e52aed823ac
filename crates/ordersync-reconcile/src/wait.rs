//! Availability wait loop.
//!
//! The only long-running wait in a pass: poll the order on a fixed interval
//! until it reports `active`, up to a bounded timeout. The cancellation token
//! is checked on every iteration and interrupts the sleep between polls.

use std::time::Duration;

use ordersync_core::{LifecycleState, OrderHandle};
use ordersync_order::{OrderError, OrderService};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20 * 60),
            interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("wait for order {order_id} was cancelled")]
    Cancelled { order_id: String },

    #[error("order {order_id} not active after {waited:?}, last state '{last_state}'")]
    TimedOut {
        order_id: String,
        waited: Duration,
        last_state: LifecycleState,
    },

    #[error("order {order_id} became {state} while waiting")]
    Gone {
        order_id: String,
        state: LifecycleState,
    },

    #[error("polling order {order_id} failed: {source}")]
    Remote {
        order_id: String,
        #[source]
        source: OrderError,
    },
}

/// Polls `order` until it is active.
///
/// Transient read failures are logged and polling continues; permanent ones
/// end the wait.
pub async fn wait_until_ready(
    order: &dyn OrderService,
    options: &WaitOptions,
    cancel: &CancellationToken,
) -> Result<OrderHandle, WaitError> {
    let order_id = order.order_id().to_string();
    let started = Instant::now();
    let mut last_state = LifecycleState::Other("unknown".to_string());

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled { order_id });
        }

        match order.describe().await {
            Ok(handle) if handle.state == LifecycleState::Active => {
                info!(
                    order_id = %order_id,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "order is active"
                );
                return Ok(handle);
            }
            Ok(handle) if handle.state.is_gone() => {
                return Err(WaitError::Gone {
                    order_id,
                    state: handle.state,
                });
            }
            Ok(handle) => {
                debug!(order_id = %order_id, state = %handle.state, "order not ready yet");
                last_state = handle.state;
            }
            Err(e) if e.is_transient() => {
                warn!(order_id = %order_id, error = %e, "transient failure while polling order");
            }
            Err(source) => return Err(WaitError::Remote { order_id, source }),
        }

        let waited = started.elapsed();
        if waited >= options.timeout {
            return Err(WaitError::TimedOut {
                order_id,
                waited,
                last_state,
            });
        }

        let nap = options.interval.min(options.timeout - waited);
        tokio::select! {
            _ = cancel.cancelled() => return Err(WaitError::Cancelled { order_id }),
            _ = tokio::time::sleep(nap) => {}
        }
    }
}
