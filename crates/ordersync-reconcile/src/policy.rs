//! Per-resource reconciliation policy.
//!
//! Several behaviors differ between resource types and cannot be derived from
//! one general rule: how sub-minimum mount growth is treated, whether entries
//! without a prior baseline are ignored or rejected, whether a flavor change
//! happens in place. They are spelled out here as explicit values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do with a mount growth smaller than the minimum step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubMinimumPolicy {
    /// Treat as noise: no call, no error.
    Skip,
    /// Fail the mount with a minimum step violation.
    Reject,
}

/// What to do with a map entry present on only one side of the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPolicy {
    /// Leave it alone and emit a warning.
    Ignore,
    /// Fail the attribute.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlavorChangePolicy {
    /// Resize through the change-flavor action.
    InPlace,
    /// The resource must be recreated; reconciliation refuses the change.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePolicy {
    pub mount_min_step_gb: u64,
    pub sub_minimum_mount: SubMinimumPolicy,
    pub unmatched_mount: EntryPolicy,
    /// Maximum instances added across all roles in one pass.
    pub scale_cap: u32,
    pub layout_roles: Vec<String>,
    pub required_roles: Vec<String>,
    pub flavor_change: FlavorChangePolicy,
    /// Reference filter for role permission lookups, e.g. `app:clickhouse`.
    pub access_filter: String,
    /// Run the lifecycle gate before update passes.
    pub drift_sensitive: bool,
    /// Wait for the order to become active before mutating.
    pub wait_ready: bool,
}

impl Default for ResourcePolicy {
    fn default() -> Self {
        Self {
            mount_min_step_gb: 10,
            sub_minimum_mount: SubMinimumPolicy::Skip,
            unmatched_mount: EntryPolicy::Ignore,
            scale_cap: 2,
            layout_roles: Vec::new(),
            required_roles: Vec::new(),
            flavor_change: FlavorChangePolicy::InPlace,
            access_filter: String::new(),
            drift_sensitive: true,
            wait_ready: false,
        }
    }
}

/// Resource families with preset policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ComputeInstance,
    ManagedCluster,
    KubernetesProject,
    MessageBroker,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        Self::ComputeInstance,
        Self::ManagedCluster,
        Self::KubernetesProject,
        Self::MessageBroker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputeInstance => "compute-instance",
            Self::ManagedCluster => "managed-cluster",
            Self::KubernetesProject => "kubernetes-project",
            Self::MessageBroker => "message-broker",
        }
    }

    pub fn policy(&self) -> ResourcePolicy {
        match self {
            Self::ComputeInstance => ResourcePolicy {
                access_filter: "vm:linux".into(),
                scale_cap: 0,
                ..ResourcePolicy::default()
            },
            Self::ManagedCluster => ResourcePolicy {
                sub_minimum_mount: SubMinimumPolicy::Reject,
                unmatched_mount: EntryPolicy::Reject,
                layout_roles: vec!["worker".into(), "scheduler".into()],
                required_roles: vec!["worker".into()],
                access_filter: "app:clickhouse".into(),
                wait_ready: true,
                ..ResourcePolicy::default()
            },
            Self::KubernetesProject => ResourcePolicy {
                scale_cap: 0,
                access_filter: "app:kubernetes".into(),
                ..ResourcePolicy::default()
            },
            Self::MessageBroker => ResourcePolicy {
                sub_minimum_mount: SubMinimumPolicy::Reject,
                unmatched_mount: EntryPolicy::Reject,
                layout_roles: vec!["broker".into()],
                required_roles: vec!["broker".into()],
                flavor_change: FlavorChangePolicy::Replace,
                access_filter: "app:kafka".into(),
                wait_ready: true,
                ..ResourcePolicy::default()
            },
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(ResourceKind::as_str).collect();
                format!("unknown resource kind '{s}', expected one of {valid:?}")
            })
    }
}
