//! Mount point expansion.
//!
//! Mount sizes only grow. Each path is handled on its own and produces at most
//! one remote call; a refused path does not affect the others.

use std::collections::BTreeMap;

use ordersync_core::{MountPoint, ReconcileError, ReconciliationOutcome, check_growth};
use ordersync_order::{MountExpansion, Operation, OrderService};
use tracing::{debug, error, info, warn};

use crate::policy::{EntryPolicy, ResourcePolicy, SubMinimumPolicy};

const VALIDATE: &str = "validate_mount";

fn attribute(path: &str) -> String {
    format!("mount_points[\"{path}\"]")
}

/// Expands every mount whose planned size exceeds its recorded size.
pub async fn expand(
    order: &dyn OrderService,
    policy: &ResourcePolicy,
    old: &BTreeMap<String, MountPoint>,
    new: &BTreeMap<String, MountPoint>,
) -> ReconciliationOutcome {
    let mut outcome = ReconciliationOutcome::new();

    for (path, planned) in new {
        let attr = attribute(path);
        let Some(recorded) = old.get(path) else {
            unmatched(&mut outcome, policy, &attr, ReconcileError::unexpected_entry(&attr));
            continue;
        };

        if planned.filesystem != recorded.filesystem {
            warn!(
                attribute = %attr,
                from = %recorded.filesystem,
                to = %planned.filesystem,
                "filesystem change refused"
            );
            outcome.failed(
                &attr,
                VALIDATE,
                ReconcileError::replace_required(format!("{attr}.filesystem")),
            );
            continue;
        }

        if planned.size == recorded.size {
            continue;
        }
        if planned.size < recorded.size {
            warn!(
                attribute = %attr,
                state = recorded.size,
                plan = planned.size,
                "mount shrink refused"
            );
            outcome.failed(
                &attr,
                VALIDATE,
                ReconcileError::grow_violation(&attr, recorded.size, planned.size),
            );
            continue;
        }

        let delta = planned.size - recorded.size;
        if delta < policy.mount_min_step_gb {
            match policy.sub_minimum_mount {
                SubMinimumPolicy::Skip => {
                    debug!(
                        attribute = %attr,
                        delta,
                        minimum = policy.mount_min_step_gb,
                        "mount growth below minimum step, skipped"
                    );
                    continue;
                }
                SubMinimumPolicy::Reject => {
                    let checked =
                        check_growth(&attr, recorded.size, planned.size, policy.mount_min_step_gb);
                    if let Err(e) = checked {
                        warn!(attribute = %attr, error = %e, "mount growth refused");
                        outcome.failed(&attr, VALIDATE, e);
                    }
                    continue;
                }
            }
        }

        let expansion = MountExpansion {
            path: path.clone(),
            increment_gb: delta,
            new_size_gb: planned.size,
        };
        match order.expand_mount_point(&expansion).await {
            Ok(()) => {
                info!(
                    order_id = order.order_id(),
                    path = %path,
                    delta,
                    size = planned.size,
                    "mount point expanded"
                );
                outcome.succeeded(&attr, Operation::ExpandMountPoint.as_str());
            }
            Err(e) => {
                error!(
                    order_id = order.order_id(),
                    path = %path,
                    error = %e,
                    "mount point expansion failed"
                );
                outcome.failed(
                    &attr,
                    Operation::ExpandMountPoint.as_str(),
                    e.into_reconcile(Operation::ExpandMountPoint),
                );
            }
        }
    }

    for (path, recorded) in old {
        if new.contains_key(path) {
            continue;
        }
        let attr = attribute(path);
        unmatched(
            &mut outcome,
            policy,
            &attr,
            ReconcileError::grow_violation(&attr, recorded.size, 0),
        );
    }

    outcome
}

fn unmatched(
    outcome: &mut ReconciliationOutcome,
    policy: &ResourcePolicy,
    attr: &str,
    error: ReconcileError,
) {
    match policy.unmatched_mount {
        EntryPolicy::Ignore => {
            debug!(attribute = %attr, "mount present on one side only, ignored");
            outcome.warn(attr, format!("ignored: {error}"));
        }
        EntryPolicy::Reject => {
            warn!(attribute = %attr, error = %error, "mount present on one side only");
            outcome.failed(attr, VALIDATE, error);
        }
    }
}
