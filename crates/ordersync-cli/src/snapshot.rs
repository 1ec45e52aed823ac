//! Snapshot files: the plan an operator declares and the state of record a
//! pass leaves behind. `.toml` files are read and written as TOML, anything
//! else as JSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ordersync_core::ResourceSnapshot;

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

pub fn load(path: &str) -> Result<ResourceSnapshot> {
    let path = Path::new(path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    if is_toml(path) {
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML snapshot: {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON snapshot: {}", path.display()))
    }
}

pub fn save(path: &str, snapshot: &ResourceSnapshot) -> Result<()> {
    let path = Path::new(path);
    let rendered = if is_toml(path) {
        toml::to_string_pretty(snapshot).context("Failed to encode snapshot as TOML")?
    } else {
        serde_json::to_string_pretty(snapshot).context("Failed to encode snapshot as JSON")?
    };
    fs::write(path, rendered)
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))
}
