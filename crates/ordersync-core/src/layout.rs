//! Layout descriptor decoding and horizontal scaling deltas.
//!
//! A layout descriptor is a compact topology string such as
//! `one_dc:worker-3:scheduler-1`: a family prefix followed by `role-N`
//! segments. Each role is matched independently; a role that does not appear
//! decodes to a count of zero.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::error::{ReconcileError, Result};

/// Role → instance count.
pub type RoleCounts = BTreeMap<String, u32>;

/// Role → number of instances to add. Only positive entries are present.
pub type ScaleDeltas = BTreeMap<String, u32>;

/// Decoder for one resource family's layout descriptors.
#[derive(Debug, Clone)]
pub struct LayoutCodec {
    roles: Vec<(String, Regex)>,
    required: BTreeSet<String>,
}

impl LayoutCodec {
    /// Builds a codec recognizing `roles`.
    pub fn new<S: AsRef<str>>(roles: &[S]) -> Result<Self> {
        let roles = roles
            .iter()
            .map(|role| {
                let role = role.as_ref();
                let pattern = format!(r"(?:^|:){}-([^:]*)(?::|$)", regex::escape(role));
                Regex::new(&pattern)
                    .map(|re| (role.to_string(), re))
                    .map_err(|e| ReconcileError::layout_parse(role, e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            roles,
            required: BTreeSet::new(),
        })
    }

    /// Marks `role` as mandatory: descriptors without it fail to decode.
    pub fn with_required(mut self, role: impl Into<String>) -> Self {
        self.required.insert(role.into());
        self
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|(role, _)| role.as_str())
    }

    /// Decodes `descriptor` into a count per known role.
    pub fn decode(&self, descriptor: &str) -> Result<RoleCounts> {
        let mut counts = RoleCounts::new();

        for (role, re) in &self.roles {
            let count = match re.captures(descriptor) {
                None => {
                    if self.required.contains(role) {
                        return Err(ReconcileError::MissingRole {
                            role: role.clone(),
                            descriptor: descriptor.to_string(),
                        });
                    }
                    0
                }
                Some(caps) => {
                    let digits = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(ReconcileError::layout_parse(
                            descriptor,
                            format!("role '{role}' is not followed by an instance count"),
                        ));
                    }
                    digits.parse::<u32>().map_err(|e| {
                        ReconcileError::layout_parse(
                            descriptor,
                            format!("role '{role}' count '{digits}': {e}"),
                        )
                    })?
                }
            };
            counts.insert(role.clone(), count);
        }

        Ok(counts)
    }
}

/// Validates a horizontal scaling step and returns the per-role additions.
///
/// Any role whose count drops is rejected before the cap is considered. The
/// sum of additions across roles must not exceed `cap`.
pub fn compute_scale_deltas(old: &RoleCounts, new: &RoleCounts, cap: u32) -> Result<ScaleDeltas> {
    let roles: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    let mut deltas = ScaleDeltas::new();
    for role in roles {
        let before = old.get(role).copied().unwrap_or(0);
        let after = new.get(role).copied().unwrap_or(0);
        if after < before {
            return Err(ReconcileError::shrink(role.as_str(), before, after));
        }
        if after > before {
            deltas.insert(role.clone(), after - before);
        }
    }

    let total: u64 = deltas.values().map(|&delta| u64::from(delta)).sum();
    if total > u64::from(cap) {
        return Err(ReconcileError::ScaleCapExceeded { total, cap });
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> LayoutCodec {
        LayoutCodec::new(&["worker", "scheduler"]).unwrap()
    }

    fn counts(pairs: &[(&str, u32)]) -> RoleCounts {
        pairs.iter().map(|(r, c)| (r.to_string(), *c)).collect()
    }

    #[test]
    fn test_decode_descriptor() {
        let decoded = codec().decode("one_dc:worker-3:scheduler-1").unwrap();
        assert_eq!(decoded, counts(&[("worker", 3), ("scheduler", 1)]));
    }

    #[test]
    fn test_absent_role_is_zero() {
        let decoded = codec().decode("one_dc:worker-5").unwrap();
        assert_eq!(decoded, counts(&[("worker", 5), ("scheduler", 0)]));
    }

    #[test]
    fn test_required_role_missing() {
        let codec = codec().with_required("scheduler");
        let err = codec.decode("one_dc:worker-5").unwrap_err();
        assert!(matches!(err, ReconcileError::MissingRole { ref role, .. } if role == "scheduler"));
    }

    #[test]
    fn test_role_without_digits_is_parse_error() {
        assert!(matches!(
            codec().decode("one_dc:worker-:scheduler-1"),
            Err(ReconcileError::LayoutParse { .. })
        ));
        assert!(matches!(
            codec().decode("one_dc:worker-x3"),
            Err(ReconcileError::LayoutParse { .. })
        ));
        assert!(matches!(
            codec().decode("one_dc:worker-99999999999"),
            Err(ReconcileError::LayoutParse { .. })
        ));
    }

    #[test]
    fn test_role_match_is_segment_anchored() {
        let codec = LayoutCodec::new(&["keeper"]).unwrap();
        assert_eq!(
            codec.decode("two_dc:zookeeper-3").unwrap(),
            counts(&[("keeper", 0)])
        );
    }

    #[test]
    fn test_scale_within_cap() {
        let deltas = compute_scale_deltas(
            &counts(&[("worker", 3), ("scheduler", 1)]),
            &counts(&[("worker", 4), ("scheduler", 2)]),
            2,
        )
        .unwrap();
        assert_eq!(deltas, counts(&[("worker", 1), ("scheduler", 1)]));
        assert_eq!(deltas.values().sum::<u32>(), 2);
    }

    #[test]
    fn test_scale_over_cap_rejected() {
        let err = compute_scale_deltas(
            &counts(&[("worker", 3), ("scheduler", 1)]),
            &counts(&[("worker", 6), ("scheduler", 1)]),
            2,
        )
        .unwrap_err();
        assert_eq!(err, ReconcileError::ScaleCapExceeded { total: 3, cap: 2 });
    }

    #[test]
    fn test_huge_additions_do_not_wrap_past_cap() {
        let huge = codec()
            .decode("one_dc:worker-2147483648:scheduler-2147483648")
            .unwrap();
        let err = compute_scale_deltas(&counts(&[("worker", 0), ("scheduler", 0)]), &huge, 2)
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::ScaleCapExceeded {
                total: 1 << 32,
                cap: 2
            }
        );
    }

    #[test]
    fn test_shrink_rejected_regardless_of_cap() {
        let err = compute_scale_deltas(
            &counts(&[("worker", 3)]),
            &counts(&[("worker", 2)]),
            100,
        )
        .unwrap_err();
        assert_eq!(err, ReconcileError::shrink("worker", 3, 2));
    }

    #[test]
    fn test_unchanged_layout_has_no_deltas() {
        let same = counts(&[("worker", 3), ("scheduler", 1)]);
        assert!(compute_scale_deltas(&same, &same, 2).unwrap().is_empty());
    }
}
