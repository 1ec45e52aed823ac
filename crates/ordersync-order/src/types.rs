//! Wire-neutral request types passed to [`crate::OrderService`].

use std::fmt;

use ordersync_core::ScaleDeltas;
use serde::{Deserialize, Serialize};

/// Remote operations the engine issues or reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Describe,
    ChangeLabel,
    ChangeFinancialProject,
    AddAccessGroup,
    ChangeAccessGroup,
    DeleteAccessGroup,
    ChangePassword,
    ChangeFlavor,
    ExpandMountPoint,
    HorizontalScale,
    UpdateProductVersion,
    Delete,
    ResolveLayout,
    ResolveLayoutId,
    RolePermissions,
    LatestProductVersion,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Describe => "describe",
            Self::ChangeLabel => "change_label",
            Self::ChangeFinancialProject => "change_financial_project",
            Self::AddAccessGroup => "add_access_group",
            Self::ChangeAccessGroup => "change_access_group",
            Self::DeleteAccessGroup => "delete_access_group",
            Self::ChangePassword => "change_password",
            Self::ChangeFlavor => "change_flavor",
            Self::ExpandMountPoint => "expand_mount_point",
            Self::HorizontalScale => "horizontal_scale",
            Self::UpdateProductVersion => "update_product_version",
            Self::Delete => "delete",
            Self::ResolveLayout => "resolve_layout",
            Self::ResolveLayoutId => "resolve_layout_id",
            Self::RolePermissions => "role_permissions",
            Self::LatestProductVersion => "latest_product_version",
        }
    }

    /// Whether the operation changes remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Describe
                | Self::ResolveLayout
                | Self::ResolveLayoutId
                | Self::RolePermissions
                | Self::LatestProductVersion
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role's group assignment on a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub groups: Vec<String>,
}

/// Growth of one mount point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountExpansion {
    pub path: String,
    /// GB to add.
    pub increment_gb: u64,
    /// Resulting size in GB.
    pub new_size_gb: u64,
}

/// Horizontal scaling request carrying per-role additions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalScale {
    pub layout_id: String,
    pub layout: String,
    pub deltas: ScaleDeltas,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_segment: Option<String>,
}

impl HorizontalScale {
    pub fn added_instances(&self) -> u64 {
        self.deltas.values().map(|&delta| u64::from(delta)).sum()
    }
}
