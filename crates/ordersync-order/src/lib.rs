//! # ordersync-order
//!
//! Collaborator seam between the reconciliation engine and the remote order
//! service.
//!
//! The engine only needs a narrow slice of the remote API: read an order's
//! lifecycle, issue one dedicated mutation per attribute group, and look up
//! reference data (layouts, role permissions, latest builds). That slice is
//! expressed as two traits:
//!
//! - [`OrderService`] - one provisioned order and its mutations
//! - [`ReferenceService`] - read-only reference lookups
//!
//! Transport and payload shapes live in implementation crates
//! (`ordersync-http`). The [`memory`] module provides an in-memory backend
//! that records every call, used by tests and dry runs.
//!
//! ## Example
//!
//! ```ignore
//! use ordersync_order::{OrderService, OrderError};
//!
//! async fn relabel(order: &dyn OrderService, label: &str) -> Result<(), OrderError> {
//!     if order.lifecycle_state().await?.is_gone() {
//!         return Ok(());
//!     }
//!     order.change_label(label).await
//! }
//! ```

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::OrderError;
pub use traits::{OrderService, ReferenceService, RolePermissions};
pub use types::{HorizontalScale, MountExpansion, Operation, RoleGrant};
