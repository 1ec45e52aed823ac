//! End-to-end reconciliation passes against the in-memory backends.

use std::collections::BTreeMap;
use std::time::Duration;

use ordersync_core::{
    AccessGrant, BuildSpec, ItemConfig, LifecycleState, MountPoint, ProviderContext,
    ReconcileError, ResourceSnapshot, UpgradeMode,
};
use ordersync_order::memory::{InMemoryOrder, InMemoryReference, OrderCall};
use ordersync_order::{Operation, OrderError};
use ordersync_reconcile::{Disposition, Reconciler, ResourceKind, RetryPolicy, WaitOptions};
use tokio_util::sync::CancellationToken;
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
        .with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
        .with_wait(None)
}

fn mounts(entries: &[(&str, u64)]) -> BTreeMap<String, MountPoint> {
    entries
        .iter()
        .map(|(path, size)| {
            (
                path.to_string(),
                MountPoint {
                    size: *size,
                    filesystem: "xfs".into(),
                },
            )
        })
        .collect()
}

fn cluster_reference() -> InMemoryReference {
    InMemoryReference::new()
        .with_layout("lay-3-1", "one_dc:worker-3:scheduler-1")
        .with_layout("lay-4-2", "one_dc:worker-4:scheduler-2")
        .with_layout("lay-6-1", "one_dc:worker-6:scheduler-1")
        .with_role_permissions("app:clickhouse", "writer", ["insert"])
        .with_latest("clickhouse", "23.8.4")
}

fn cluster_state() -> ResourceSnapshot {
    ResourceSnapshot {
        label: "analytics".into(),
        access: AccessGrant::from_pairs([("reader", vec!["ops"])]),
        mount_points: mounts(&[("/data", 100)]),
        layout_id: Some("lay-3-1".into()),
        build: Some(BuildSpec {
            product: "clickhouse".into(),
            version: "23.3.1".into(),
            mode: UpgradeMode::Pinned,
        }),
        targets: vec!["vm-1".into(), "vm-2".into()],
        ..Default::default()
    }
}

#[tokio::test]
async fn cluster_pass_issues_groups_in_fixed_order() {
    let order = InMemoryOrder::new("ord-1");
    let reference = cluster_reference();
    let old = cluster_state();
    let mut new = old.clone();
    new.label = "analytics-prod".into();
    new.access = AccessGrant::from_pairs([("writer", vec!["ops"])]);
    new.mount_points = mounts(&[("/data", 120)]);
    new.layout_id = Some("lay-4-2".into());
    if let Some(build) = new.build.as_mut() {
        build.mode = UpgradeMode::Latest;
    }

    let report = reconciler(ResourceKind::ManagedCluster)
        .update(&order, &reference, &old, &new)
        .await;

    assert!(!report.outcome.has_errors(), "{:?}", report.outcome);
    let ops: Vec<Operation> = order.calls().await.iter().map(OrderCall::operation).collect();
    assert_eq!(
        ops,
        vec![
            Operation::ChangeLabel,
            Operation::DeleteAccessGroup,
            Operation::DeleteAccessGroup,
            Operation::AddAccessGroup,
            Operation::AddAccessGroup,
            Operation::ExpandMountPoint,
            Operation::HorizontalScale,
            Operation::UpdateProductVersion,
        ]
    );
    let persisted = report.persisted().unwrap();
    assert_eq!(persisted.label, "analytics-prod");
    assert_eq!(persisted.layout_id.as_deref(), Some("lay-4-2"));
}

#[tokio::test]
async fn rejected_scale_aborts_pass_but_other_groups_still_run() {
    let order = InMemoryOrder::new("ord-1");
    let old = cluster_state();
    let mut new = old.clone();
    new.label = "renamed".into();
    new.layout_id = Some("lay-6-1".into());

    let report = reconciler(ResourceKind::ManagedCluster)
        .update(&order, &cluster_reference(), &old, &new)
        .await;

    assert_eq!(report.disposition, Disposition::Aborted);
    let failure = report.outcome.errors().next().unwrap();
    assert_eq!(failure.attribute, "layout_id");
    assert_eq!(
        failure.error(),
        Some(&ReconcileError::ScaleCapExceeded { total: 3, cap: 2 })
    );
    assert_eq!(order.calls().await, vec![OrderCall::ChangeLabel("renamed".into())]);
}

#[tokio::test]
async fn sub_minimum_mount_growth_is_noise_for_compute_instances() {
    let order = InMemoryOrder::new("ord-1");
    let old = ResourceSnapshot {
        mount_points: mounts(&[("/app", 50)]),
        ..Default::default()
    };
    let new = ResourceSnapshot {
        mount_points: mounts(&[("/app", 55)]),
        ..Default::default()
    };

    let report = reconciler(ResourceKind::ComputeInstance)
        .update(&order, &InMemoryReference::new(), &old, &new)
        .await;

    assert!(report.persisted().is_some());
    assert_eq!(report.outcome.attempted(), 0);
    assert!(order.calls().await.is_empty());
}

#[tokio::test]
async fn drifted_order_gets_one_warning_and_no_mutations() {
    let order = InMemoryOrder::new("ord-1").with_state(LifecycleState::Deleted);
    let old = cluster_state();
    let mut new = old.clone();
    new.label = "renamed".into();
    new.layout_id = Some("lay-4-2".into());

    let report = reconciler(ResourceKind::ManagedCluster)
        .update(&order, &cluster_reference(), &old, &new)
        .await;

    assert_eq!(report.disposition, Disposition::Gone);
    assert_eq!(report.outcome.warnings().len(), 1);
    assert!(order.calls().await.is_empty());
}

#[tokio::test]
async fn wait_then_mutate_and_refresh_observed_fields() {
    let order = InMemoryOrder::new("ord-1")
        .with_state_script([
            LifecycleState::Other("changing".into()),
            LifecycleState::Active,
        ])
        .with_item(ItemConfig::Cluster {
            vm_ids: vec!["vm-a".into(), "vm-b".into(), "vm-c".into()],
            layout: Some("one_dc:worker-3:scheduler-1".into()),
            version: Some("23.3.2".into()),
        });
    let mut old = cluster_state();
    old.targets.clear();
    old.layout_id = None;
    let mut new = old.clone();
    new.label = "renamed".into();

    let report = Reconciler::new(provider(), ResourceKind::ManagedCluster)
        .with_retry(RetryPolicy::none())
        .with_wait(Some(WaitOptions {
            timeout: Duration::from_millis(500),
            interval: Duration::from_millis(5),
        }))
        .update(&order, &cluster_reference(), &old, &new)
        .await;

    let persisted = report.persisted().expect("pass should persist");
    assert_eq!(persisted.targets, vec!["vm-a", "vm-b", "vm-c"]);
    assert_eq!(persisted.layout_id.as_deref(), Some("lay-3-1"));
    assert_eq!(
        persisted.build.as_ref().map(|b| b.version.as_str()),
        Some("23.3.2")
    );
}

#[tokio::test]
async fn cancelled_wait_aborts_without_mutations() {
    let order = InMemoryOrder::new("ord-1").with_state(LifecycleState::Other("changing".into()));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let old = cluster_state();
    let mut new = old.clone();
    new.label = "renamed".into();

    let report = Reconciler::new(provider(), ResourceKind::ManagedCluster)
        .with_retry(RetryPolicy::none())
        .with_cancellation(cancel)
        .update(&order, &cluster_reference(), &old, &new)
        .await;

    assert!(report.is_aborted());
    assert!(order.calls().await.is_empty());
}

#[tokio::test]
async fn transient_describe_is_retried_by_gate() {
    let order = InMemoryOrder::new("ord-1").failing_times(
        Operation::Describe,
        1,
        OrderError::status(503, "unavailable"),
    );
    let report = reconciler(ResourceKind::KubernetesProject)
        .update(
            &order,
            &InMemoryReference::new(),
            &ResourceSnapshot::default(),
            &ResourceSnapshot {
                label: "ns".into(),
                ..Default::default()
            },
        )
        .await;

    assert!(report.persisted().is_some());
    assert_eq!(order.calls_of(Operation::ChangeLabel).await.len(), 1);
}

#[tokio::test]
async fn destroy_non_deletable_order_points_operator_at_portal() {
    let order = InMemoryOrder::new("ord-5").with_deletable(false);
    let report = reconciler(ResourceKind::MessageBroker).delete(&order).await;

    assert!(report.outcome.has_pass_fatal());
    match report.outcome.steps()[0].error() {
        Some(ReconcileError::NotDeletable { url, .. }) => assert_eq!(
            url,
            "https://portal.example.com/projects/proj-1/orders/ord-5?context=acme"
        ),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(order.calls_of(Operation::Delete).await.is_empty());
}
