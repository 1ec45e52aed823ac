//! Reconciliation engine for ordersync.
//!
//! Turns the delta between a prior state snapshot and a newly declared plan
//! into an ordered, best-effort sequence of remote mutations:
//!
//! ```text
//! Reconciler::update
//!   ├─ gate::check_live          (drift short-circuit)
//!   ├─ wait::wait_until_ready    (optional availability wait)
//!   ├─ changed? per attribute group, computed up front
//!   └─ for each changed group, in fixed order:
//!        label → financial project → access → credentials
//!        → flavor → mounts → layout → version
//! ```
//!
//! Each attribute domain is also callable on its own through [`access`],
//! [`capacity`], [`mounts`] and [`upgrade`].

pub mod access;
pub mod capacity;
pub mod driver;
pub mod gate;
pub mod groups;
pub mod mounts;
pub mod policy;
pub mod retry;
pub mod upgrade;
pub mod wait;

pub use driver::{Disposition, GroupChange, PassReport, Reconciler};
pub use gate::GateVerdict;
pub use groups::{AttributeGroup, PassContext, default_groups};
pub use policy::{EntryPolicy, FlavorChangePolicy, ResourceKind, ResourcePolicy, SubMinimumPolicy};
pub use retry::RetryPolicy;
pub use wait::{WaitError, WaitOptions};
