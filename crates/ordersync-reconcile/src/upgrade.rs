//! Opt-in product upgrade.
//!
//! Unlike every other attribute group this one is not driven by a diff: an
//! order in `latest` mode is moved to the newest published build whenever the
//! deployed one is older.

use ordersync_core::{ReconciliationOutcome, UpgradeMode, is_older};
use ordersync_order::{Operation, OrderService};
use tracing::{error, info, warn};

const BUILD: &str = "build.version";

pub async fn maybe_upgrade(
    order: &dyn OrderService,
    current: &str,
    latest: &str,
    mode: UpgradeMode,
) -> ReconciliationOutcome {
    let mut outcome = ReconciliationOutcome::new();
    if mode != UpgradeMode::Latest {
        return outcome;
    }

    match is_older(current, latest) {
        Err(e) => {
            warn!(order_id = order.order_id(), error = %e, "cannot compare product versions");
            outcome.failed(BUILD, "compare_versions", e);
        }
        Ok(false) => {
            info!(order_id = order.order_id(), current, latest, "product already current");
            outcome.warn(
                BUILD,
                format!("version {current} is not older than latest {latest}, no upgrade needed"),
            );
        }
        Ok(true) => match order.update_product_version().await {
            Ok(()) => {
                info!(order_id = order.order_id(), from = current, to = latest, "product upgraded");
                outcome.succeeded(BUILD, Operation::UpdateProductVersion.as_str());
            }
            Err(e) => {
                error!(order_id = order.order_id(), error = %e, "product upgrade failed");
                outcome.failed(
                    BUILD,
                    Operation::UpdateProductVersion.as_str(),
                    e.into_reconcile(Operation::UpdateProductVersion),
                );
            }
        },
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersync_core::ReconcileError;
    use ordersync_order::memory::{InMemoryOrder, OrderCall};

    #[tokio::test]
    async fn test_pinned_mode_is_noop() {
        let order = InMemoryOrder::new("ord-1");
        let outcome = maybe_upgrade(&order, "1.0.0", "2.0.0", UpgradeMode::Pinned).await;
        assert!(outcome.is_empty());
        assert!(order.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_older_version_upgrades_once() {
        let order = InMemoryOrder::new("ord-1");
        let outcome = maybe_upgrade(&order, "23.3.1", "23.8.4", UpgradeMode::Latest).await;
        assert!(!outcome.has_errors());
        assert_eq!(order.calls().await, vec![OrderCall::UpdateProductVersion]);
    }

    #[tokio::test]
    async fn test_current_version_warns_with_both_versions() {
        let order = InMemoryOrder::new("ord-1");
        let outcome = maybe_upgrade(&order, "3.6.0", "3.6.0", UpgradeMode::Latest).await;
        assert!(!outcome.has_errors());
        let warning = &outcome.warnings()[0];
        assert!(warning.message.contains("3.6.0"));
        assert!(order.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_version_fails_group() {
        let order = InMemoryOrder::new("ord-1");
        let outcome = maybe_upgrade(&order, "banana", "1.0.0", UpgradeMode::Latest).await;
        assert!(matches!(
            outcome.steps()[0].error(),
            Some(ReconcileError::VersionParse { value, .. }) if value == "banana"
        ));
        assert!(order.calls().await.is_empty());
    }
}
