//! Attribute groups: comparator + mutator pairs processed uniformly by the
//! driver.
//!
//! Each group looks at one slice of the resource snapshot. `changed` is pure
//! and evaluated for every group before any remote call; `apply` issues the
//! group's mutations and reports them as a [`ReconciliationOutcome`].

use async_trait::async_trait;
use ordersync_core::{
    LayoutCodec, OrderHandle, ProviderContext, ReconcileError, ReconciliationOutcome,
    ResourceSnapshot, UpgradeMode, diff_grants,
};
use ordersync_order::{Operation, OrderService, ReferenceService};
use tracing::{error, info};

use crate::policy::{FlavorChangePolicy, ResourceKind, ResourcePolicy};
use crate::retry::{RetryPolicy, with_backoff};
use crate::{access, capacity, mounts, upgrade};

/// Everything a group needs to talk to the remote side during one pass.
pub struct PassContext<'a> {
    pub provider: &'a ProviderContext,
    pub policy: &'a ResourcePolicy,
    pub order: &'a dyn OrderService,
    pub reference: &'a dyn ReferenceService,
    pub retry: &'a RetryPolicy,
    /// Fresh handle from the gate or wait loop, when one was fetched.
    pub handle: Option<&'a OrderHandle>,
}

impl PassContext<'_> {
    /// Hosts that per-target calls fan out to.
    ///
    /// Recorded targets win; without them the observed item config is used,
    /// then the item itself.
    pub fn targets(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> Vec<String> {
        if !new.targets.is_empty() {
            return new.targets.clone();
        }
        if !old.targets.is_empty() {
            return old.targets.clone();
        }
        if let Some(handle) = self.handle {
            let observed = handle.item.as_ref().map(|item| item.target_ids()).unwrap_or_default();
            if !observed.is_empty() {
                return observed.to_vec();
            }
            return vec![handle.item_id.clone()];
        }
        vec![self.order.order_id().to_string()]
    }
}

#[async_trait]
pub trait AttributeGroup: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this group differs between `old` and `new`. Must not do I/O.
    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool;

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome;
}

/// Groups for `kind`, in the fixed issuance order.
pub fn default_groups(kind: ResourceKind) -> Vec<Box<dyn AttributeGroup>> {
    let mut groups: Vec<Box<dyn AttributeGroup>> = vec![
        Box::new(LabelGroup),
        Box::new(FinancialProjectGroup),
        Box::new(AccessGroup),
    ];
    match kind {
        ResourceKind::ComputeInstance => {
            groups.push(Box::new(FlavorGroup));
            groups.push(Box::new(MountsGroup));
        }
        ResourceKind::ManagedCluster | ResourceKind::MessageBroker => {
            groups.push(Box::new(CredentialsGroup));
            groups.push(Box::new(FlavorGroup));
            groups.push(Box::new(MountsGroup));
            groups.push(Box::new(LayoutGroup));
            groups.push(Box::new(VersionGroup));
        }
        ResourceKind::KubernetesProject => {}
    }
    groups
}

fn single_call(
    order: &dyn OrderService,
    attribute: &str,
    operation: Operation,
    result: Result<(), ordersync_order::OrderError>,
) -> ReconciliationOutcome {
    let mut outcome = ReconciliationOutcome::new();
    match result {
        Ok(()) => {
            info!(
                order_id = order.order_id(),
                attribute,
                operation = %operation,
                "attribute updated"
            );
            outcome.succeeded(attribute, operation.as_str());
        }
        Err(e) => {
            error!(
                order_id = order.order_id(),
                attribute,
                operation = %operation,
                error = %e,
                "attribute update failed"
            );
            outcome.failed(attribute, operation.as_str(), e.into_reconcile(operation));
        }
    }
    outcome
}

pub struct LabelGroup;

#[async_trait]
impl AttributeGroup for LabelGroup {
    fn name(&self) -> &'static str {
        "label"
    }

    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        old.label != new.label
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        _old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        let result = cx.order.change_label(&new.label).await;
        single_call(cx.order, "label", Operation::ChangeLabel, result)
    }
}

pub struct FinancialProjectGroup;

#[async_trait]
impl AttributeGroup for FinancialProjectGroup {
    fn name(&self) -> &'static str {
        "financial_project"
    }

    /// Clearing the financial project is not a remote operation.
    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        new.financial_project.is_some() && old.financial_project != new.financial_project
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        _old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        let Some(project) = new.financial_project.as_deref() else {
            return ReconciliationOutcome::new();
        };
        let result = cx.order.change_financial_project(project).await;
        single_call(
            cx.order,
            "financial_project",
            Operation::ChangeFinancialProject,
            result,
        )
    }
}

pub struct AccessGroup;

#[async_trait]
impl AttributeGroup for AccessGroup {
    fn name(&self) -> &'static str {
        "access"
    }

    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        !diff_grants(&old.access, &new.access).is_empty()
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        let targets = cx.targets(old, new);
        access::reconcile(
            cx.order,
            cx.reference,
            cx.retry,
            &cx.policy.access_filter,
            &old.access,
            &new.access,
            &targets,
        )
        .await
    }
}

pub struct CredentialsGroup;

#[async_trait]
impl AttributeGroup for CredentialsGroup {
    fn name(&self) -> &'static str {
        "credentials"
    }

    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        new.credentials.is_some() && old.credentials != new.credentials
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        _old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        let Some(credential) = new.credentials.as_ref() else {
            return ReconciliationOutcome::new();
        };
        let result = cx.order.change_password(credential).await;
        single_call(cx.order, "credentials", Operation::ChangePassword, result)
    }
}

pub struct FlavorGroup;

#[async_trait]
impl AttributeGroup for FlavorGroup {
    fn name(&self) -> &'static str {
        "flavor"
    }

    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        new.flavor.is_some() && old.flavor != new.flavor
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        if cx.policy.flavor_change == FlavorChangePolicy::Replace && old.flavor.is_some() {
            let mut outcome = ReconciliationOutcome::new();
            outcome.failed(
                "flavor",
                "validate_flavor",
                ReconcileError::replace_required("flavor"),
            );
            return outcome;
        }
        capacity::resize(cx.order, old.flavor.as_ref(), new.flavor.as_ref()).await
    }
}

pub struct MountsGroup;

#[async_trait]
impl AttributeGroup for MountsGroup {
    fn name(&self) -> &'static str {
        "mount_points"
    }

    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        old.mount_points != new.mount_points
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        mounts::expand(cx.order, cx.policy, &old.mount_points, &new.mount_points).await
    }
}

pub struct LayoutGroup;

#[async_trait]
impl AttributeGroup for LayoutGroup {
    fn name(&self) -> &'static str {
        "layout_id"
    }

    fn changed(&self, old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        new.layout_id.is_some() && old.layout_id != new.layout_id
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        let mut outcome = ReconciliationOutcome::new();
        let Some(new_id) = new.layout_id.as_deref() else {
            return outcome;
        };
        let Some(old_id) = old.layout_id.as_deref() else {
            outcome.failed(
                "layout_id",
                "validate_layout",
                ReconcileError::unexpected_entry("layout_id"),
            );
            return outcome;
        };

        let codec = match LayoutCodec::new(cx.policy.layout_roles.as_slice()) {
            Ok(codec) => cx
                .policy
                .required_roles
                .iter()
                .fold(codec, |codec, role| codec.with_required(role.as_str())),
            Err(e) => {
                outcome.failed("layout_id", "validate_layout", e);
                return outcome;
            }
        };

        capacity::scale(
            cx.order,
            cx.reference,
            cx.retry,
            &codec,
            cx.policy.scale_cap,
            old_id,
            new_id,
            new.net_segment.as_deref(),
        )
        .await
    }
}

pub struct VersionGroup;

#[async_trait]
impl AttributeGroup for VersionGroup {
    fn name(&self) -> &'static str {
        "build"
    }

    /// Opt-in rather than diff driven: every pass in `latest` mode checks.
    fn changed(&self, _old: &ResourceSnapshot, new: &ResourceSnapshot) -> bool {
        new.build
            .as_ref()
            .is_some_and(|build| build.mode == UpgradeMode::Latest)
    }

    async fn apply(
        &self,
        cx: &PassContext<'_>,
        old: &ResourceSnapshot,
        new: &ResourceSnapshot,
    ) -> ReconciliationOutcome {
        let Some(build) = new.build.as_ref() else {
            return ReconciliationOutcome::new();
        };

        let latest = match with_backoff(cx.retry, Operation::LatestProductVersion, || {
            cx.reference.latest_product_version(&build.product)
        })
        .await
        {
            Ok(latest) => latest,
            Err(e) => {
                error!(product = %build.product, error = %e, "latest version lookup failed");
                let mut outcome = ReconciliationOutcome::new();
                outcome.failed(
                    "build.version",
                    Operation::LatestProductVersion.as_str(),
                    e.into_reconcile(Operation::LatestProductVersion),
                );
                return outcome;
            }
        };

        let current = cx
            .handle
            .and_then(|h| h.item.as_ref())
            .and_then(|item| item.build_version())
            .or_else(|| old.build.as_ref().map(|b| b.version.as_str()))
            .unwrap_or(build.version.as_str());

        upgrade::maybe_upgrade(cx.order, current, &latest, build.mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersync_core::{AccessGrant, BuildSpec, ItemConfig, LifecycleState};
    use ordersync_order::memory::{InMemoryOrder, InMemoryReference, OrderCall};
    use url::Url;

    fn provider() -> ProviderContext {
        ProviderContext::new(
            "test",
            "acme",
            "proj-1",
            Url::parse("https://portal.example.com/").unwrap(),
        )
    }

    #[test]
    fn test_default_group_order() {
        let names: Vec<&str> = default_groups(ResourceKind::ManagedCluster)
            .iter()
            .map(|g| g.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "label",
                "financial_project",
                "access",
                "credentials",
                "flavor",
                "mount_points",
                "layout_id",
                "build"
            ]
        );
        assert_eq!(default_groups(ResourceKind::KubernetesProject).len(), 3);
    }

    #[test]
    fn test_version_group_changed_only_in_latest_mode() {
        let mut new = ResourceSnapshot::default();
        assert!(!VersionGroup.changed(&ResourceSnapshot::default(), &new));
        new.build = Some(BuildSpec {
            product: "clickhouse".into(),
            version: "23.3".into(),
            mode: UpgradeMode::Pinned,
        });
        assert!(!VersionGroup.changed(&ResourceSnapshot::default(), &new));
        if let Some(build) = new.build.as_mut() {
            build.mode = UpgradeMode::Latest;
        }
        assert!(VersionGroup.changed(&new.clone(), &new));
    }

    #[tokio::test]
    async fn test_targets_fall_back_to_observed_item() {
        let order = InMemoryOrder::new("ord-1");
        let reference = InMemoryReference::new();
        let policy = ResourcePolicy::default();
        let retry = RetryPolicy::none();
        let provider = provider();
        let handle = OrderHandle {
            order_id: "ord-1".into(),
            item_id: "item-1".into(),
            deletable: true,
            state: LifecycleState::Active,
            item: Some(ItemConfig::Cluster {
                vm_ids: vec!["vm-a".into(), "vm-b".into()],
                layout: None,
                version: None,
            }),
        };
        let mut cx = PassContext {
            provider: &provider,
            policy: &policy,
            order: &order,
            reference: &reference,
            retry: &retry,
            handle: Some(&handle),
        };
        let empty = ResourceSnapshot::default();
        assert_eq!(cx.targets(&empty, &empty), vec!["vm-a", "vm-b"]);

        cx.handle = None;
        assert_eq!(cx.targets(&empty, &empty), vec!["ord-1"]);
    }

    #[tokio::test]
    async fn test_replace_policy_refuses_flavor_change() {
        let order = InMemoryOrder::new("ord-1");
        let reference = InMemoryReference::new();
        let policy = ResourceKind::MessageBroker.policy();
        let retry = RetryPolicy::none();
        let provider = provider();
        let cx = PassContext {
            provider: &provider,
            policy: &policy,
            order: &order,
            reference: &reference,
            retry: &retry,
            handle: None,
        };
        let flavor = |cores| ordersync_core::FlavorSpec {
            cores,
            memory: 8,
            name: format!("c{cores}"),
            uuid: format!("u{cores}"),
        };
        let old = ResourceSnapshot {
            flavor: Some(flavor(2)),
            ..Default::default()
        };
        let new = ResourceSnapshot {
            flavor: Some(flavor(4)),
            ..Default::default()
        };

        let outcome = FlavorGroup.apply(&cx, &old, &new).await;
        assert!(matches!(
            outcome.steps()[0].error(),
            Some(ReconcileError::ReplaceRequired { .. })
        ));
        assert!(order.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_layout_without_baseline_is_rejected() {
        let order = InMemoryOrder::new("ord-1");
        let reference = InMemoryReference::new();
        let policy = ResourceKind::ManagedCluster.policy();
        let retry = RetryPolicy::none();
        let provider = provider();
        let cx = PassContext {
            provider: &provider,
            policy: &policy,
            order: &order,
            reference: &reference,
            retry: &retry,
            handle: None,
        };
        let new = ResourceSnapshot {
            layout_id: Some("lay-1".into()),
            ..Default::default()
        };

        let outcome = LayoutGroup.apply(&cx, &ResourceSnapshot::default(), &new).await;
        assert!(matches!(
            outcome.steps()[0].error(),
            Some(ReconcileError::UnexpectedEntry { .. })
        ));
        assert!(reference.lookups().await.is_empty());
    }

    #[tokio::test]
    async fn test_version_group_prefers_observed_version() {
        let order = InMemoryOrder::new("ord-1");
        let reference = InMemoryReference::new().with_latest("clickhouse", "23.8.4");
        let policy = ResourceKind::ManagedCluster.policy();
        let retry = RetryPolicy::none();
        let provider = provider();
        let handle = OrderHandle {
            order_id: "ord-1".into(),
            item_id: "item-1".into(),
            deletable: true,
            state: LifecycleState::Active,
            item: Some(ItemConfig::Cluster {
                vm_ids: vec![],
                layout: None,
                version: Some("23.8.4".into()),
            }),
        };
        let cx = PassContext {
            provider: &provider,
            policy: &policy,
            order: &order,
            reference: &reference,
            retry: &retry,
            handle: Some(&handle),
        };
        let new = ResourceSnapshot {
            build: Some(BuildSpec {
                product: "clickhouse".into(),
                version: "23.3.1".into(),
                mode: UpgradeMode::Latest,
            }),
            access: AccessGrant::new(),
            ..Default::default()
        };

        let outcome = VersionGroup.apply(&cx, &new.clone(), &new).await;
        assert_eq!(outcome.warnings().len(), 1);
        assert!(order.calls_of(Operation::UpdateProductVersion).await.is_empty());

        let outcome = VersionGroup
            .apply(&PassContext { handle: None, ..cx }, &new.clone(), &new)
            .await;
        assert!(!outcome.has_errors());
        assert_eq!(order.calls().await, vec![OrderCall::UpdateProductVersion]);
    }
}
