//! Symmetric differences between string sets and role→group grants.
//!
//! Both functions are pure and total: any pair of inputs yields a diff.
//! Output lists are sorted so call order downstream is deterministic.

use std::collections::BTreeSet;

use crate::model::AccessGrant;

/// Members added to and removed from a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SetDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes `(added, removed)` between two string collections.
///
/// Duplicates in either input collapse.
pub fn diff_sets<S: AsRef<str>>(old: &[S], new: &[S]) -> SetDiff {
    let old: BTreeSet<&str> = old.iter().map(AsRef::as_ref).collect();
    let new: BTreeSet<&str> = new.iter().map(AsRef::as_ref).collect();

    SetDiff {
        added: new.difference(&old).map(|s| s.to_string()).collect(),
        removed: old.difference(&new).map(|s| s.to_string()).collect(),
    }
}

/// Per-role partition of two grants.
///
/// Every role of either grant lands in exactly one of the three buckets, or in
/// none when its group set is unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantDiff {
    /// Roles only in the old grant.
    pub to_delete: Vec<String>,
    /// Roles in both grants with different group sets.
    pub to_change: Vec<String>,
    /// Roles only in the new grant.
    pub to_add: Vec<String>,
}

impl GrantDiff {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_change.is_empty() && self.to_add.is_empty()
    }
}

pub fn diff_grants(old: &AccessGrant, new: &AccessGrant) -> GrantDiff {
    let mut diff = GrantDiff::default();

    for (role, old_groups) in old.iter() {
        match new.groups(role) {
            None => diff.to_delete.push(role.clone()),
            Some(new_groups) if !same_groups(old_groups, new_groups) => {
                diff.to_change.push(role.clone())
            }
            Some(_) => {}
        }
    }

    for role in new.roles() {
        if !old.contains_role(role) {
            diff.to_add.push(role.clone());
        }
    }

    diff
}

fn same_groups(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.len() == b.len() && a.iter().all(|group| b.contains(group))
}
