//! In-memory order and reference backends.
//!
//! [`InMemoryOrder`] records every mutation it receives, in order, and can be
//! told to fail specific operations. [`InMemoryReference`] serves reference
//! data from maps. Both are meant for tests and offline planning.
//!
//! # Example
//!
//! ```ignore
//! use ordersync_order::memory::{InMemoryOrder, OrderCall};
//! use ordersync_order::{Operation, OrderError, OrderService};
//!
//! let order = InMemoryOrder::new("ord-1")
//!     .failing(Operation::ChangeLabel, OrderError::status(409, "locked"));
//! assert!(order.change_label("db").await.is_err());
//! assert!(order.calls().await.is_empty());
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ordersync_core::{Credential, FlavorSpec, ItemConfig, LifecycleState, OrderHandle};
use tokio::sync::Mutex;

use crate::error::OrderError;
use crate::traits::{OrderService, ReferenceService, RolePermissions};
use crate::types::{HorizontalScale, MountExpansion, Operation, RoleGrant};

/// A mutation received by [`InMemoryOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCall {
    ChangeLabel(String),
    ChangeFinancialProject(String),
    AddAccessGroup {
        target: String,
        grant: RoleGrant,
        permissions: Vec<String>,
    },
    ChangeAccessGroup {
        target: String,
        grant: RoleGrant,
    },
    DeleteAccessGroup {
        target: String,
        grant: RoleGrant,
    },
    ChangePassword {
        user: String,
    },
    ChangeFlavor(FlavorSpec),
    ExpandMountPoint(MountExpansion),
    HorizontalScale(HorizontalScale),
    UpdateProductVersion,
    Delete,
}

impl OrderCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::ChangeLabel(_) => Operation::ChangeLabel,
            Self::ChangeFinancialProject(_) => Operation::ChangeFinancialProject,
            Self::AddAccessGroup { .. } => Operation::AddAccessGroup,
            Self::ChangeAccessGroup { .. } => Operation::ChangeAccessGroup,
            Self::DeleteAccessGroup { .. } => Operation::DeleteAccessGroup,
            Self::ChangePassword { .. } => Operation::ChangePassword,
            Self::ChangeFlavor(_) => Operation::ChangeFlavor,
            Self::ExpandMountPoint(_) => Operation::ExpandMountPoint,
            Self::HorizontalScale(_) => Operation::HorizontalScale,
            Self::UpdateProductVersion => Operation::UpdateProductVersion,
            Self::Delete => Operation::Delete,
        }
    }
}

/// Injected failure; `remaining == None` fails forever.
#[derive(Debug, Clone)]
struct Failure {
    error: OrderError,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct FailurePlan(HashMap<Operation, Failure>);

impl FailurePlan {
    fn insert(&mut self, operation: Operation, error: OrderError, remaining: Option<usize>) {
        self.0.insert(operation, Failure { error, remaining });
    }

    /// Consumes one injected failure for `operation`, if any.
    fn take(&mut self, operation: Operation) -> Result<(), OrderError> {
        let Some(failure) = self.0.get_mut(&operation) else {
            return Ok(());
        };
        match failure.remaining {
            None => Err(failure.error.clone()),
            Some(0) => Ok(()),
            Some(ref mut n) => {
                *n -= 1;
                Err(failure.error.clone())
            }
        }
    }
}

/// In-memory [`OrderService`] that records mutations.
#[derive(Debug)]
pub struct InMemoryOrder {
    order_id: String,
    handle: Mutex<OrderHandle>,
    scripted_states: Mutex<VecDeque<LifecycleState>>,
    calls: Mutex<Vec<OrderCall>>,
    failures: Mutex<FailurePlan>,
    describes: AtomicUsize,
}

impl InMemoryOrder {
    /// Creates an active, deletable order without item config.
    pub fn new(order_id: impl Into<String>) -> Self {
        let order_id = order_id.into();
        let handle = OrderHandle {
            order_id: order_id.clone(),
            item_id: format!("{order_id}-item"),
            deletable: true,
            state: LifecycleState::Active,
            item: None,
        };
        Self {
            order_id,
            handle: Mutex::new(handle),
            scripted_states: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(FailurePlan::default()),
            describes: AtomicUsize::new(0),
        }
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.handle.get_mut().state = state;
        self
    }

    pub fn with_deletable(mut self, deletable: bool) -> Self {
        self.handle.get_mut().deletable = deletable;
        self
    }

    pub fn with_item(mut self, item: ItemConfig) -> Self {
        self.handle.get_mut().item = Some(item);
        self
    }

    /// Lifecycle states returned by successive `describe` calls. Once the
    /// script runs out the last state sticks.
    pub fn with_state_script(mut self, states: impl IntoIterator<Item = LifecycleState>) -> Self {
        self.scripted_states.get_mut().extend(states);
        self
    }

    /// Makes every call of `operation` fail with `error`.
    pub fn failing(mut self, operation: Operation, error: OrderError) -> Self {
        self.failures.get_mut().insert(operation, error, None);
        self
    }

    /// Makes the next `times` calls of `operation` fail with `error`.
    pub fn failing_times(mut self, operation: Operation, times: usize, error: OrderError) -> Self {
        self.failures.get_mut().insert(operation, error, Some(times));
        self
    }

    /// Mutations received so far, in order. Failed calls are not recorded.
    pub async fn calls(&self) -> Vec<OrderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_of(&self, operation: Operation) -> Vec<OrderCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.operation() == operation)
            .cloned()
            .collect()
    }

    pub fn describe_count(&self) -> usize {
        self.describes.load(Ordering::SeqCst)
    }

    async fn accept(&self, call: OrderCall) -> Result<(), OrderError> {
        self.failures.lock().await.take(call.operation())?;
        tracing::debug!(
            order_id = %self.order_id,
            operation = %call.operation(),
            "in-memory order call"
        );
        self.apply(&call).await;
        self.calls.lock().await.push(call);
        Ok(())
    }

    /// Mirrors the observable effect of a mutation onto the handle.
    async fn apply(&self, call: &OrderCall) {
        let mut guard = self.handle.lock().await;
        let handle = &mut *guard;
        match (call, handle.item.as_mut()) {
            (OrderCall::Delete, _) => handle.state = LifecycleState::Deleted,
            (OrderCall::ChangeFlavor(new), Some(ItemConfig::Vm { flavor, .. })) => {
                *flavor = Some(new.clone());
            }
            (OrderCall::ExpandMountPoint(exp), Some(ItemConfig::Vm { mount_points, .. })) => {
                if let Some(mount) = mount_points.get_mut(&exp.path) {
                    mount.size = exp.new_size_gb;
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl OrderService for InMemoryOrder {
    fn order_id(&self) -> &str {
        &self.order_id
    }

    async fn describe(&self) -> Result<OrderHandle, OrderError> {
        self.describes.fetch_add(1, Ordering::SeqCst);
        self.failures.lock().await.take(Operation::Describe)?;

        let mut handle = self.handle.lock().await;
        if let Some(next) = self.scripted_states.lock().await.pop_front() {
            handle.state = next;
        }
        Ok(handle.clone())
    }

    async fn change_label(&self, label: &str) -> Result<(), OrderError> {
        self.accept(OrderCall::ChangeLabel(label.to_string())).await
    }

    async fn change_financial_project(&self, project_id: &str) -> Result<(), OrderError> {
        self.accept(OrderCall::ChangeFinancialProject(project_id.to_string()))
            .await
    }

    async fn add_access_group(
        &self,
        target_id: &str,
        grant: &RoleGrant,
        permissions: &[String],
    ) -> Result<(), OrderError> {
        self.accept(OrderCall::AddAccessGroup {
            target: target_id.to_string(),
            grant: grant.clone(),
            permissions: permissions.to_vec(),
        })
        .await
    }

    async fn change_access_group(
        &self,
        target_id: &str,
        grant: &RoleGrant,
    ) -> Result<(), OrderError> {
        self.accept(OrderCall::ChangeAccessGroup {
            target: target_id.to_string(),
            grant: grant.clone(),
        })
        .await
    }

    async fn delete_access_group(
        &self,
        target_id: &str,
        grant: &RoleGrant,
    ) -> Result<(), OrderError> {
        self.accept(OrderCall::DeleteAccessGroup {
            target: target_id.to_string(),
            grant: grant.clone(),
        })
        .await
    }

    async fn change_password(&self, credential: &Credential) -> Result<(), OrderError> {
        self.accept(OrderCall::ChangePassword {
            user: credential.user.clone(),
        })
        .await
    }

    async fn change_flavor(&self, flavor: &FlavorSpec) -> Result<(), OrderError> {
        self.accept(OrderCall::ChangeFlavor(flavor.clone())).await
    }

    async fn expand_mount_point(&self, expansion: &MountExpansion) -> Result<(), OrderError> {
        self.accept(OrderCall::ExpandMountPoint(expansion.clone()))
            .await
    }

    async fn horizontal_scale(&self, request: &HorizontalScale) -> Result<(), OrderError> {
        self.accept(OrderCall::HorizontalScale(request.clone())).await
    }

    async fn update_product_version(&self) -> Result<(), OrderError> {
        self.accept(OrderCall::UpdateProductVersion).await
    }

    async fn delete(&self) -> Result<(), OrderError> {
        self.accept(OrderCall::Delete).await
    }
}

/// In-memory [`ReferenceService`] backed by maps.
#[derive(Debug, Default)]
pub struct InMemoryReference {
    layouts: BTreeMap<String, String>,
    permissions: BTreeMap<String, RolePermissions>,
    latest: BTreeMap<String, String>,
    failures: Mutex<FailurePlan>,
    lookups: Mutex<Vec<Operation>>,
}

impl InMemoryReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, id: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.layouts.insert(id.into(), descriptor.into());
        self
    }

    pub fn with_role_permissions<P: Into<String>>(
        mut self,
        filter: impl Into<String>,
        role: impl Into<String>,
        permissions: impl IntoIterator<Item = P>,
    ) -> Self {
        self.permissions
            .entry(filter.into())
            .or_default()
            .insert(role.into(), permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_latest(mut self, product: impl Into<String>, version: impl Into<String>) -> Self {
        self.latest.insert(product.into(), version.into());
        self
    }

    pub fn failing_times(mut self, operation: Operation, times: usize, error: OrderError) -> Self {
        self.failures.get_mut().insert(operation, error, Some(times));
        self
    }

    /// Lookups attempted so far, including failed ones.
    pub async fn lookups(&self) -> Vec<Operation> {
        self.lookups.lock().await.clone()
    }

    async fn begin(&self, operation: Operation) -> Result<(), OrderError> {
        self.lookups.lock().await.push(operation);
        self.failures.lock().await.take(operation)
    }
}

#[async_trait]
impl ReferenceService for InMemoryReference {
    async fn resolve_layout(&self, layout_id: &str) -> Result<String, OrderError> {
        self.begin(Operation::ResolveLayout).await?;
        self.layouts
            .get(layout_id)
            .cloned()
            .ok_or_else(|| OrderError::not_found(format!("layout {layout_id}")))
    }

    async fn resolve_layout_id(&self, descriptor: &str) -> Result<String, OrderError> {
        self.begin(Operation::ResolveLayoutId).await?;
        self.layouts
            .iter()
            .find(|(_, d)| d.as_str() == descriptor)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| OrderError::not_found(format!("layout '{descriptor}'")))
    }

    async fn role_permissions(&self, filter: &str) -> Result<RolePermissions, OrderError> {
        self.begin(Operation::RolePermissions).await?;
        Ok(self.permissions.get(filter).cloned().unwrap_or_default())
    }

    async fn latest_product_version(&self, product: &str) -> Result<String, OrderError> {
        self.begin(Operation::LatestProductVersion).await?;
        self.latest
            .get(product)
            .cloned()
            .ok_or_else(|| OrderError::not_found(format!("product {product}")))
    }
}
