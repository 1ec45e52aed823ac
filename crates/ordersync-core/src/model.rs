//! Data model shared by the collaborator seam and the reconciliation engine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Compute shape of an instance. Any field change counts as a flavor change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorSpec {
    pub cores: u32,
    pub memory: u32,
    pub name: String,
    pub uuid: String,
}

/// Role name → set of group names.
///
/// Groups are held in a set so duplicates collapse and order is irrelevant
/// for equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessGrant(BTreeMap<String, BTreeSet<String>>);

impl AccessGrant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a grant from `(role, groups)` pairs.
    pub fn from_pairs<R, G, I>(pairs: impl IntoIterator<Item = (R, I)>) -> Self
    where
        R: Into<String>,
        G: Into<String>,
        I: IntoIterator<Item = G>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(role, groups)| (role.into(), groups.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }

    pub fn insert(&mut self, role: impl Into<String>, groups: BTreeSet<String>) {
        self.0.insert(role.into(), groups);
    }

    pub fn groups(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.0.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.0.contains_key(role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }
}

/// Attached storage, keyed by mount path in the owning map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    /// Size in GB. Grow-only.
    pub size: u64,
    #[serde(default = "default_filesystem")]
    pub filesystem: String,
}

fn default_filesystem() -> String {
    "xfs".to_string()
}

/// A user/secret pair subject to rotation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user: String,
    pub secret: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeMode {
    /// Keep whatever build is deployed.
    #[default]
    Pinned,
    /// Follow the latest published build.
    Latest,
}

/// Deployed product build and the operator's upgrade opt-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Product key used to look up the latest published version.
    pub product: String,
    /// Version observed on the remote order.
    pub version: String,
    #[serde(default)]
    pub mode: UpgradeMode,
}

/// Remote lifecycle of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleState {
    Active,
    Deleted,
    Deprovisioned,
    Other(String),
}

impl LifecycleState {
    /// Removed outside our control; mutating it makes no sense.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Deleted | Self::Deprovisioned)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
            Self::Deprovisioned => "deprovisioned",
            Self::Other(state) => state,
        }
    }
}

impl From<String> for LifecycleState {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "deleted" => Self::Deleted,
            "deprovisioned" => Self::Deprovisioned,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for LifecycleState {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<LifecycleState> for String {
    fn from(value: LifecycleState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item configuration as reported by the remote service.
///
/// The shape depends on the item type tag, so it is decoded once at the
/// collaborator boundary into this union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum ItemConfig {
    Vm {
        #[serde(default)]
        flavor: Option<FlavorSpec>,
        #[serde(default)]
        mount_points: BTreeMap<String, MountPoint>,
    },
    Cluster {
        #[serde(default)]
        vm_ids: Vec<String>,
        #[serde(default)]
        layout: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
    App {
        #[serde(default)]
        vm_ids: Vec<String>,
        #[serde(default)]
        version: Option<String>,
    },
    Project {
        namespace: String,
    },
}

impl ItemConfig {
    /// Targets that per-host calls (access groups) fan out to.
    pub fn target_ids(&self) -> &[String] {
        match self {
            Self::Cluster { vm_ids, .. } | Self::App { vm_ids, .. } => vm_ids,
            Self::Vm { .. } | Self::Project { .. } => &[],
        }
    }

    pub fn build_version(&self) -> Option<&str> {
        match self {
            Self::Cluster { version, .. } | Self::App { version, .. } => version.as_deref(),
            Self::Vm { .. } | Self::Project { .. } => None,
        }
    }

    pub fn layout_descriptor(&self) -> Option<&str> {
        match self {
            Self::Cluster { layout, .. } => layout.as_deref(),
            _ => None,
        }
    }
}

/// Remote identity of a provisioned resource.
///
/// Never mutated locally; replaced by a freshly fetched copy instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub order_id: String,
    pub item_id: String,
    pub deletable: bool,
    pub state: LifecycleState,
    #[serde(default)]
    pub item: Option<ItemConfig>,
}

/// One resource's declared or recorded configuration.
///
/// Both the plan and the prior state use this shape; the driver compares the
/// two group by group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub financial_project: Option<String>,
    #[serde(default)]
    pub access: AccessGrant,
    #[serde(default)]
    pub credentials: Option<Credential>,
    #[serde(default)]
    pub flavor: Option<FlavorSpec>,
    #[serde(default)]
    pub mount_points: BTreeMap<String, MountPoint>,
    #[serde(default)]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub net_segment: Option<String>,
    #[serde(default)]
    pub build: Option<BuildSpec>,
    /// Remote-assigned per-host targets (e.g. VM ids of a cluster).
    #[serde(default)]
    pub targets: Vec<String>,
}
