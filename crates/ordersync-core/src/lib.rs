//! # ordersync-core
//!
//! Domain model and the pure building blocks of the reconciliation engine.
//!
//! Nothing in this crate performs I/O. The async components that talk to the
//! remote order service live in `ordersync-reconcile`; they lean on the
//! functions here to decide *whether* and *what* to call:
//!
//! - [`diff`] - symmetric differences of string sets and role→group grants
//! - [`grow`] - grow-only numeric invariants with a minimum step
//! - [`version`] - semantic version comparison for upgrade gating
//! - [`layout`] - layout descriptor decoding and horizontal scaling deltas
//! - [`outcome`] - best-effort result aggregation for one reconciliation pass

pub mod context;
pub mod diff;
pub mod error;
pub mod grow;
pub mod layout;
pub mod model;
pub mod outcome;
pub mod version;

pub use context::ProviderContext;
pub use diff::{GrantDiff, SetDiff, diff_grants, diff_sets};
pub use error::{ErrorCategory, ReconcileError, Result};
pub use grow::check_growth;
pub use layout::{LayoutCodec, RoleCounts, ScaleDeltas, compute_scale_deltas};
pub use model::{
    AccessGrant, BuildSpec, Credential, FlavorSpec, ItemConfig, LifecycleState, MountPoint,
    OrderHandle, ResourceSnapshot, UpgradeMode,
};
pub use outcome::{ReconciliationOutcome, StepRecord, Warning};
pub use version::{is_older, parse_version};
