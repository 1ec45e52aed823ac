//! Reconciliation driver.
//!
//! One pass moves through `Loaded → Gated → AttributeGroupsEvaluated →
//! MutationsIssued → Persisted | Aborted`. Changed flags are computed for all
//! groups before the first remote call, and a failing group never stops the
//! ones after it. Only a pass without recorded failures replaces the state of
//! record.

use ordersync_core::{
    OrderHandle, ProviderContext, ReconcileError, ReconciliationOutcome, ResourceSnapshot,
};
use ordersync_order::{Operation, OrderService, ReferenceService};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gate::{self, GateVerdict};
use crate::groups::{AttributeGroup, PassContext, default_groups};
use crate::policy::{ResourceKind, ResourcePolicy};
use crate::retry::{RetryPolicy, with_backoff};
use crate::wait::{WaitError, WaitOptions, wait_until_ready};

/// Changed flag for one attribute group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupChange {
    pub name: &'static str,
    pub changed: bool,
}

/// How a pass ended and what the caller should do with its state of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Replace the state of record with this snapshot.
    Persisted(ResourceSnapshot),
    /// Keep the previous state of record; the next pass retries from it.
    Aborted,
    /// The order was removed remotely. Drop the state so the resource is
    /// recreated.
    Gone,
    /// The order was deleted by this pass.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub outcome: ReconciliationOutcome,
    pub disposition: Disposition,
}

impl PassReport {
    fn new(outcome: ReconciliationOutcome, disposition: Disposition) -> Self {
        Self {
            outcome,
            disposition,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.disposition == Disposition::Aborted
    }

    /// The snapshot to persist, if the pass produced one.
    pub fn persisted(&self) -> Option<&ResourceSnapshot> {
        match &self.disposition {
            Disposition::Persisted(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Parametrized driver for one resource kind.
pub struct Reconciler {
    provider: ProviderContext,
    policy: ResourcePolicy,
    groups: Vec<Box<dyn AttributeGroup>>,
    retry: RetryPolicy,
    wait: Option<WaitOptions>,
    cancel: CancellationToken,
}

impl Reconciler {
    /// Driver with the preset policy and groups of `kind`.
    pub fn new(provider: ProviderContext, kind: ResourceKind) -> Self {
        let policy = kind.policy();
        let wait = policy.wait_ready.then(WaitOptions::default);
        Self {
            provider,
            policy,
            groups: default_groups(kind),
            retry: RetryPolicy::default(),
            wait,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: ResourcePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_groups(mut self, groups: Vec<Box<dyn AttributeGroup>>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the availability wait; `None` disables it.
    pub fn with_wait(mut self, wait: Option<WaitOptions>) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> &ResourcePolicy {
        &self.policy
    }

    /// Evaluates every group's changed flag without any remote call.
    pub fn plan(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> Vec<GroupChange> {
        self.groups
            .iter()
            .map(|group| GroupChange {
                name: group.name(),
                changed: group.changed(old, new),
            })
            .collect()
    }

    /// Runs one update pass from `old` (state of record) to `new` (plan).
    pub async fn update(
        &self,
        order: &dyn OrderService,
        reference: &dyn ReferenceService,
        old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> PassReport {
        let order_id = order.order_id();
        let mut outcome = ReconciliationOutcome::new();
        let mut handle: Option<OrderHandle> = None;

        if self.policy.drift_sensitive {
            match gate::check_live(order, &self.retry).await {
                Ok(GateVerdict::Live(live)) => handle = Some(live),
                Ok(GateVerdict::Gone(warning)) => {
                    outcome.warn(warning.attribute, warning.message);
                    return PassReport::new(outcome, Disposition::Gone);
                }
                Err(e) => {
                    outcome.failed("order", Operation::Describe.as_str(), e);
                    return PassReport::new(outcome, Disposition::Aborted);
                }
            }
        }

        if let Some(options) = &self.wait {
            match wait_until_ready(order, options, &self.cancel).await {
                Ok(ready) => handle = Some(ready),
                Err(WaitError::Gone { state, .. }) => {
                    let message = format!(
                        "order {order_id} became {state} while waiting; \
                         it was removed outside ordersync and will be recreated"
                    );
                    outcome.warn("order", message);
                    return PassReport::new(outcome, Disposition::Gone);
                }
                Err(e) => {
                    warn!(order_id, error = %e, "order did not become ready");
                    outcome.failed(
                        "order",
                        "wait_until_ready",
                        ReconcileError::remote("wait_until_ready", e.to_string()),
                    );
                    return PassReport::new(outcome, Disposition::Aborted);
                }
            }
        }

        let changes = self.plan(old, new);
        let cx = PassContext {
            provider: &self.provider,
            policy: &self.policy,
            order,
            reference,
            retry: &self.retry,
            handle: handle.as_ref(),
        };

        for (group, change) in self.groups.iter().zip(&changes) {
            if !change.changed {
                debug!(order_id, group = change.name, "group unchanged");
                continue;
            }
            info!(order_id, group = change.name, "applying group");
            outcome.merge(group.apply(&cx, old, new).await);
        }

        if outcome.has_errors() {
            warn!(
                order_id,
                failures = outcome.errors().count(),
                "pass aborted, state of record kept"
            );
            return PassReport::new(outcome, Disposition::Aborted);
        }

        let mutated = outcome.attempted() > 0;
        let observed = if mutated { None } else { handle };
        let snapshot = self
            .observe(order, reference, observed, new, &mut outcome)
            .await;
        info!(order_id, steps = outcome.attempted(), "pass persisted");
        PassReport::new(outcome, Disposition::Persisted(snapshot))
    }

    /// Gates and deletes the order.
    pub async fn delete(&self, order: &dyn OrderService) -> PassReport {
        let mut outcome = ReconciliationOutcome::new();

        let handle = match gate::check_live(order, &self.retry).await {
            Ok(GateVerdict::Live(handle)) => handle,
            Ok(GateVerdict::Gone(warning)) => {
                outcome.warn(warning.attribute, warning.message);
                return PassReport::new(outcome, Disposition::Gone);
            }
            Err(e) => {
                outcome.failed("order", Operation::Describe.as_str(), e);
                return PassReport::new(outcome, Disposition::Aborted);
            }
        };

        if let Err(e) = gate::check_deletable(&self.provider, &handle) {
            outcome.failed("order", Operation::Delete.as_str(), e);
            return PassReport::new(outcome, Disposition::Aborted);
        }

        match order.delete().await {
            Ok(()) => {
                info!(order_id = %handle.order_id, "order deleted");
                outcome.succeeded("order", Operation::Delete.as_str());
                PassReport::new(outcome, Disposition::Deleted)
            }
            Err(e) => {
                warn!(order_id = %handle.order_id, error = %e, "order deletion failed");
                outcome.failed(
                    "order",
                    Operation::Delete.as_str(),
                    e.into_reconcile(Operation::Delete),
                );
                PassReport::new(outcome, Disposition::Aborted)
            }
        }
    }

    /// Merges remote-assigned fields into the plan.
    ///
    /// Refresh failures only warn: the plan itself was applied successfully.
    async fn observe(
        &self,
        order: &dyn OrderService,
        reference: &dyn ReferenceService,
        handle: Option<OrderHandle>,
        new: &ResourceSnapshot,
        outcome: &mut ReconciliationOutcome,
    ) -> ResourceSnapshot {
        let mut snapshot = new.clone();

        let handle = match handle {
            Some(handle) => handle,
            None => match with_backoff(&self.retry, Operation::Describe, || order.describe()).await
            {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(
                        order_id = order.order_id(),
                        error = %e,
                        "could not refresh order after pass"
                    );
                    outcome.warn("order", format!("remote fields not refreshed: {e}"));
                    return snapshot;
                }
            },
        };
        let Some(item) = handle.item.as_ref() else {
            return snapshot;
        };

        if !item.target_ids().is_empty() {
            snapshot.targets = item.target_ids().to_vec();
        }
        if let (Some(build), Some(version)) = (snapshot.build.as_mut(), item.build_version()) {
            build.version = version.to_string();
        }
        let unresolved = snapshot.layout_id.is_none().then(|| item.layout_descriptor()).flatten();
        if let Some(descriptor) = unresolved {
            match with_backoff(&self.retry, Operation::ResolveLayoutId, || {
                reference.resolve_layout_id(descriptor)
            })
            .await
            {
                Ok(id) => snapshot.layout_id = Some(id),
                Err(e) => {
                    outcome.warn(
                        "layout_id",
                        format!("observed layout '{descriptor}' not resolved: {e}"),
                    );
                }
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersync_core::{AccessGrant, LifecycleState};
    use ordersync_order::OrderError;
    use ordersync_order::memory::{InMemoryOrder, InMemoryReference};
    use url::Url;

    fn provider() -> ProviderContext {
        ProviderContext::new(
            "test",
            "acme",
            "proj-1",
            Url::parse("https://portal.example.com/").unwrap(),
        )
    }

    fn reconciler(kind: ResourceKind) -> Reconciler {
        Reconciler::new(provider(), kind)
            .with_retry(RetryPolicy::none())
            .with_wait(None)
    }

    fn labelled(label: &str) -> ResourceSnapshot {
        ResourceSnapshot {
            label: label.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_flags_only_changed_groups() {
        let changes =
            reconciler(ResourceKind::ComputeInstance).plan(&labelled("a"), &labelled("b"));
        let changed: Vec<&str> = changes.iter().filter(|c| c.changed).map(|c| c.name).collect();
        assert_eq!(changed, vec!["label"]);
    }

    #[tokio::test]
    async fn test_successful_pass_persists_plan() {
        let order = InMemoryOrder::new("ord-1");
        let report = reconciler(ResourceKind::ComputeInstance)
            .update(&order, &InMemoryReference::new(), &labelled("a"), &labelled("b"))
            .await;

        assert_eq!(report.persisted().map(|s| s.label.as_str()), Some("b"));
        assert_eq!(order.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_group_aborts_but_later_groups_run() {
        let order = InMemoryOrder::new("ord-1")
            .failing(Operation::ChangeLabel, OrderError::status(409, "locked"));
        let old = labelled("a");
        let new = ResourceSnapshot {
            label: "b".into(),
            financial_project: Some("fin-2".into()),
            ..Default::default()
        };

        let report = reconciler(ResourceKind::ComputeInstance)
            .update(&order, &InMemoryReference::new(), &old, &new)
            .await;

        assert!(report.is_aborted());
        assert_eq!(report.outcome.attempted(), 2);
        assert_eq!(order.calls_of(Operation::ChangeFinancialProject).await.len(), 1);
    }

    #[tokio::test]
    async fn test_drifted_order_short_circuits() {
        let order = InMemoryOrder::new("ord-1").with_state(LifecycleState::Deleted);
        let new = ResourceSnapshot {
            label: "b".into(),
            access: AccessGrant::from_pairs([("reader", vec!["ops"])]),
            ..Default::default()
        };

        let report = reconciler(ResourceKind::ManagedCluster)
            .update(&order, &InMemoryReference::new(), &labelled("a"), &new)
            .await;

        assert_eq!(report.disposition, Disposition::Gone);
        assert_eq!(report.outcome.warnings().len(), 1);
        assert_eq!(report.outcome.attempted(), 0);
        assert!(order.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_order_aborts_before_mutations() {
        let order = InMemoryOrder::new("ord-1")
            .failing(Operation::Describe, OrderError::status(500, "down"));
        let report = reconciler(ResourceKind::ComputeInstance)
            .update(&order, &InMemoryReference::new(), &labelled("a"), &labelled("b"))
            .await;

        assert!(report.is_aborted());
        assert!(order.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_refused_with_operator_url() {
        let order = InMemoryOrder::new("ord-7").with_deletable(false);
        let report = reconciler(ResourceKind::ComputeInstance).delete(&order).await;

        assert!(report.is_aborted());
        assert!(report.outcome.has_pass_fatal());
        let message = report.outcome.steps()[0].to_string();
        assert!(
            message.contains("https://portal.example.com/projects/proj-1/orders/ord-7?context=acme")
        );
        assert!(order.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_gone_order_makes_no_call() {
        let order = InMemoryOrder::new("ord-1").with_state(LifecycleState::Deprovisioned);
        let report = reconciler(ResourceKind::ComputeInstance).delete(&order).await;
        assert_eq!(report.disposition, Disposition::Gone);
        assert!(order.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_live_order() {
        let order = InMemoryOrder::new("ord-1");
        let report = reconciler(ResourceKind::ComputeInstance).delete(&order).await;
        assert_eq!(report.disposition, Disposition::Deleted);
        assert!(order.lifecycle_state().await.unwrap().is_gone());
    }
}
