//! Vertical and horizontal capacity changes.

use ordersync_core::{
    FlavorSpec, LayoutCodec, ReconcileError, ReconciliationOutcome, compute_scale_deltas,
};
use ordersync_order::{HorizontalScale, Operation, OrderService, ReferenceService};
use tracing::{error, info, warn};

use crate::retry::{RetryPolicy, with_backoff};

const FLAVOR: &str = "flavor";
const LAYOUT: &str = "layout_id";

/// Changes the flavor in place when it differs structurally.
pub async fn resize(
    order: &dyn OrderService,
    old: Option<&FlavorSpec>,
    new: Option<&FlavorSpec>,
) -> ReconciliationOutcome {
    let mut outcome = ReconciliationOutcome::new();
    let Some(new) = new else {
        return outcome;
    };
    if old == Some(new) {
        return outcome;
    }

    match order.change_flavor(new).await {
        Ok(()) => {
            info!(
                order_id = order.order_id(),
                flavor = %new.name,
                cores = new.cores,
                memory = new.memory,
                "flavor changed"
            );
            outcome.succeeded(FLAVOR, Operation::ChangeFlavor.as_str());
        }
        Err(e) => {
            error!(order_id = order.order_id(), error = %e, "flavor change failed");
            outcome.failed(
                FLAVOR,
                Operation::ChangeFlavor.as_str(),
                e.into_reconcile(Operation::ChangeFlavor),
            );
        }
    }
    outcome
}

/// Scales a cluster from one layout to another.
///
/// Both layout ids are resolved and decoded, then checked against the shrink
/// and cap rules. Only a valid step reaches the remote side, as a single
/// horizontal scaling call. Any failure before that is the sole entry of the
/// returned outcome.
#[allow(clippy::too_many_arguments)]
pub async fn scale(
    order: &dyn OrderService,
    reference: &dyn ReferenceService,
    retry: &RetryPolicy,
    codec: &LayoutCodec,
    cap: u32,
    old_layout_id: &str,
    new_layout_id: &str,
    net_segment: Option<&str>,
) -> ReconciliationOutcome {
    let mut outcome = ReconciliationOutcome::new();
    if old_layout_id == new_layout_id {
        return outcome;
    }

    let planned = plan_scale(reference, retry, codec, cap, old_layout_id, new_layout_id).await;
    let request = match planned {
        Ok((layout, deltas)) => HorizontalScale {
            layout_id: new_layout_id.to_string(),
            layout,
            deltas,
            net_segment: net_segment.map(str::to_string),
        },
        Err((action, err)) => {
            warn!(order_id = order.order_id(), error = %err, "horizontal scaling refused");
            outcome.failed(LAYOUT, action, err);
            return outcome;
        }
    };

    if request.deltas.is_empty() {
        info!(
            order_id = order.order_id(),
            layout_id = new_layout_id,
            "layout change adds no instances"
        );
        return outcome;
    }

    match order.horizontal_scale(&request).await {
        Ok(()) => {
            info!(
                order_id = order.order_id(),
                layout = %request.layout,
                added = request.added_instances(),
                "cluster scaled"
            );
            outcome.succeeded(LAYOUT, Operation::HorizontalScale.as_str());
        }
        Err(e) => {
            error!(order_id = order.order_id(), error = %e, "horizontal scaling failed");
            outcome.failed(
                LAYOUT,
                Operation::HorizontalScale.as_str(),
                e.into_reconcile(Operation::HorizontalScale),
            );
        }
    }
    outcome
}

type ScalePlan = (String, ordersync_core::ScaleDeltas);

/// Resolves and validates a scaling step. On failure returns the action the
/// failure is attributed to.
async fn plan_scale(
    reference: &dyn ReferenceService,
    retry: &RetryPolicy,
    codec: &LayoutCodec,
    cap: u32,
    old_layout_id: &str,
    new_layout_id: &str,
) -> Result<ScalePlan, (&'static str, ReconcileError)> {
    let old_layout = resolve(reference, retry, old_layout_id).await?;
    let new_layout = resolve(reference, retry, new_layout_id).await?;

    let validate = "validate_layout";
    let old_counts = codec.decode(&old_layout).map_err(|e| (validate, e))?;
    let new_counts = codec.decode(&new_layout).map_err(|e| (validate, e))?;
    let deltas = compute_scale_deltas(&old_counts, &new_counts, cap).map_err(|e| (validate, e))?;

    Ok((new_layout, deltas))
}

async fn resolve(
    reference: &dyn ReferenceService,
    retry: &RetryPolicy,
    layout_id: &str,
) -> Result<String, (&'static str, ReconcileError)> {
    with_backoff(retry, Operation::ResolveLayout, || reference.resolve_layout(layout_id))
        .await
        .map_err(|e| {
            (
                Operation::ResolveLayout.as_str(),
                e.into_reconcile(Operation::ResolveLayout),
            )
        })
}
