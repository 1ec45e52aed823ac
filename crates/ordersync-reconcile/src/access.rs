//! Access group reconciliation.
//!
//! Roles are partitioned with [`diff_grants`] and each bucket maps to one
//! remote operation, issued once per target host. Buckets run in the order
//! delete → change → add so that a role moved between groups never holds both
//! grants at once.

use ordersync_core::{AccessGrant, ReconciliationOutcome, diff_grants};
use ordersync_order::{Operation, OrderService, ReferenceService, RoleGrant, RolePermissions};
use tracing::{debug, error, info};

use crate::retry::{RetryPolicy, with_backoff};

fn attribute(role: &str) -> String {
    format!("access[\"{role}\"]")
}

fn grant_for(grant: &AccessGrant, role: &str) -> RoleGrant {
    RoleGrant {
        role: role.to_string(),
        groups: grant
            .groups(role)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default(),
    }
}

/// Reconciles `old` into `new` on every target.
///
/// Permissions for added roles are looked up under `role_filter` before any
/// add call. A role the reference does not know gets an empty permission set;
/// the remote side decides whether to accept it. If the lookup itself fails,
/// every add is recorded as failed while deletes and changes still run.
pub async fn reconcile(
    order: &dyn OrderService,
    reference: &dyn ReferenceService,
    retry: &RetryPolicy,
    role_filter: &str,
    old: &AccessGrant,
    new: &AccessGrant,
    targets: &[String],
) -> ReconciliationOutcome {
    let mut outcome = ReconciliationOutcome::new();
    let diff = diff_grants(old, new);
    if diff.is_empty() {
        debug!(order_id = order.order_id(), "access grants unchanged");
        return outcome;
    }

    for role in &diff.to_delete {
        let grant = grant_for(old, role);
        for target in targets {
            let result = order.delete_access_group(target, &grant).await;
            record(&mut outcome, order, role, target, Operation::DeleteAccessGroup, result);
        }
    }

    for role in &diff.to_change {
        let grant = grant_for(new, role);
        for target in targets {
            let result = order.change_access_group(target, &grant).await;
            record(&mut outcome, order, role, target, Operation::ChangeAccessGroup, result);
        }
    }

    if diff.to_add.is_empty() {
        return outcome;
    }

    let permissions: RolePermissions = match with_backoff(retry, Operation::RolePermissions, || {
        reference.role_permissions(role_filter)
    })
    .await
    {
        Ok(permissions) => permissions,
        Err(e) => {
            error!(filter = role_filter, error = %e, "role permission lookup failed");
            let err = e.into_reconcile(Operation::RolePermissions);
            for role in &diff.to_add {
                outcome.failed(attribute(role), Operation::AddAccessGroup.as_str(), err.clone());
            }
            return outcome;
        }
    };

    for role in &diff.to_add {
        let grant = grant_for(new, role);
        let allowed = permissions.get(role).map(Vec::as_slice).unwrap_or_default();
        if allowed.is_empty() {
            debug!(role = %role, filter = role_filter, "no permissions known for role");
        }
        for target in targets {
            let result = order.add_access_group(target, &grant, allowed).await;
            record(&mut outcome, order, role, target, Operation::AddAccessGroup, result);
        }
    }

    outcome
}

fn record(
    outcome: &mut ReconciliationOutcome,
    order: &dyn OrderService,
    role: &str,
    target: &str,
    operation: Operation,
    result: Result<(), ordersync_order::OrderError>,
) {
    match result {
        Ok(()) => {
            info!(
                order_id = order.order_id(),
                role,
                target,
                operation = %operation,
                "access group updated"
            );
            outcome.succeeded(attribute(role), operation.as_str());
        }
        Err(e) => {
            error!(
                order_id = order.order_id(),
                role,
                target,
                operation = %operation,
                error = %e,
                "access group call failed"
            );
            outcome.failed(attribute(role), operation.as_str(), e.into_reconcile(operation));
        }
    }
}
