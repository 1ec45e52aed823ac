//! Semantic version comparison for upgrade gating.
//!
//! Product builds are often reported as `v23.8` or `1.27` rather than full
//! `MAJOR.MINOR.PATCH`. Before handing the string to [`semver`], a leading `v`
//! is stripped and missing minor/patch components are filled with zero.
//! More than three numeric components is rejected.

use std::cmp::Ordering;

use semver::Version;

use crate::error::{ReconcileError, Result};

/// Parses a version string, naming it in the error on failure.
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if stripped.is_empty() {
        return Err(ReconcileError::version_parse(raw, "empty version"));
    }

    // Split off pre-release / build metadata so only the core gets padded.
    let core_end = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, suffix) = stripped.split_at(core_end);

    let components = core.split('.').count();
    let normalized = match components {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        3 => stripped.to_string(),
        n => {
            return Err(ReconcileError::version_parse(
                raw,
                format!("expected at most 3 numeric components, found {n}"),
            ));
        }
    };

    Version::parse(&normalized).map_err(|e| ReconcileError::version_parse(raw, e.to_string()))
}

/// Semver precedence; build metadata does not take part.
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// Returns `true` when `current` is strictly older than `latest`.
pub fn is_older(current: &str, latest: &str) -> Result<bool> {
    let current = parse_version(current)?;
    let latest = parse_version(latest)?;
    Ok(precedence(&current, &latest) == Ordering::Less)
}
