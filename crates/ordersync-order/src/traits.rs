//! Service traits for the order collaborator.

use std::collections::BTreeMap;

use async_trait::async_trait;
use ordersync_core::{Credential, FlavorSpec, LifecycleState, OrderHandle};

use crate::error::OrderError;
use crate::types::{HorizontalScale, MountExpansion, RoleGrant};

/// Role → permissions allowed for it, as returned by a reference lookup.
pub type RolePermissions = BTreeMap<String, Vec<String>>;

/// One provisioned order on the remote service.
///
/// Every mutation is a single remote call. The remote side serializes
/// conflicting operations against the same order; callers issue them one at a
/// time. Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Identifier of the order this handle operates on.
    fn order_id(&self) -> &str;

    // ==================== Observation ====================

    /// Fetches a fresh copy of the order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist at all.
    async fn describe(&self) -> Result<OrderHandle, OrderError>;

    /// Current lifecycle state.
    async fn lifecycle_state(&self) -> Result<LifecycleState, OrderError> {
        Ok(self.describe().await?.state)
    }

    /// Whether the remote side currently accepts deletion.
    async fn is_deletable(&self) -> Result<bool, OrderError> {
        Ok(self.describe().await?.deletable)
    }

    // ==================== Mutations ====================

    async fn change_label(&self, label: &str) -> Result<(), OrderError>;

    async fn change_financial_project(&self, project_id: &str) -> Result<(), OrderError>;

    /// Adds a role on `target_id` with the permissions resolved for it.
    async fn add_access_group(
        &self,
        target_id: &str,
        grant: &RoleGrant,
        permissions: &[String],
    ) -> Result<(), OrderError>;

    async fn change_access_group(&self, target_id: &str, grant: &RoleGrant)
    -> Result<(), OrderError>;

    async fn delete_access_group(&self, target_id: &str, grant: &RoleGrant)
    -> Result<(), OrderError>;

    async fn change_password(&self, credential: &Credential) -> Result<(), OrderError>;

    async fn change_flavor(&self, flavor: &FlavorSpec) -> Result<(), OrderError>;

    async fn expand_mount_point(&self, expansion: &MountExpansion) -> Result<(), OrderError>;

    async fn horizontal_scale(&self, request: &HorizontalScale) -> Result<(), OrderError>;

    /// Moves the deployed product to the latest published build.
    async fn update_product_version(&self) -> Result<(), OrderError>;

    /// Requests deletion of the whole order.
    async fn delete(&self) -> Result<(), OrderError>;
}

/// Read-only reference data.
#[async_trait]
pub trait ReferenceService: Send + Sync {
    /// Layout id → descriptor string.
    async fn resolve_layout(&self, layout_id: &str) -> Result<String, OrderError>;

    /// Descriptor string → layout id.
    async fn resolve_layout_id(&self, descriptor: &str) -> Result<String, OrderError>;

    /// Role permissions for a product filter such as `app:clickhouse`.
    async fn role_permissions(&self, filter: &str) -> Result<RolePermissions, OrderError>;

    /// Latest published build of `product`.
    async fn latest_product_version(&self, product: &str) -> Result<String, OrderError>;
}
