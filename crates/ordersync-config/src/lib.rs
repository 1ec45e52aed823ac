//! Configuration for ordersync.
//!
//! Values come from an optional TOML file (`--config` or `ordersync.toml` in
//! the working directory) overlaid with environment variables, e.g.
//! `ORDERSYNC__PROVIDER__TOKEN=...` or `ORDERSYNC__RECONCILE__RETRY_ATTEMPTS=5`.
//! The loaded [`AppConfig`] is immutable and handed explicitly to whatever
//! needs it.

use std::time::Duration;

use ordersync_core::ProviderContext;
use ordersync_reconcile::{RetryPolicy, WaitOptions};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Provider validations
        for (key, value) in [
            ("provider.base_url", &self.provider.base_url),
            ("provider.portal_url", &self.provider.portal_url),
            ("provider.environment", &self.provider.environment),
            ("provider.organization", &self.provider.organization),
            ("provider.project", &self.provider.project),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{key} must be set"));
            }
        }
        for (key, raw) in [
            ("provider.base_url", &self.provider.base_url),
            ("provider.portal_url", &self.provider.portal_url),
        ] {
            if parse_url(key, raw)?.cannot_be_a_base() {
                return Err(format!("{key} '{raw}' cannot carry a path"));
            }
        }

        // Reconcile validations
        if self.reconcile.wait_timeout_secs == 0 || self.reconcile.poll_interval_secs == 0 {
            return Err("reconcile wait timeout and poll interval must be > 0".into());
        }
        if self.reconcile.poll_interval_secs > self.reconcile.wait_timeout_secs {
            return Err(
                "reconcile.poll_interval_secs must be <= reconcile.wait_timeout_secs".into(),
            );
        }
        if self.reconcile.retry_attempts == 0 {
            return Err("reconcile.retry_attempts must be > 0".into());
        }

        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// The immutable provider context passed to every component.
    pub fn provider_context(&self) -> Result<ProviderContext, String> {
        Ok(ProviderContext::new(
            self.provider.environment.clone(),
            self.provider.organization.clone(),
            self.provider.project.clone(),
            parse_url("provider.portal_url", &self.provider.portal_url)?,
        ))
    }

    pub fn api_base_url(&self) -> Result<Url, String> {
        parse_url("provider.base_url", &self.provider.base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.reconcile.retry_attempts,
            Duration::from_millis(self.reconcile.retry_delay_ms),
        )
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_secs(self.reconcile.wait_timeout_secs),
            interval: Duration::from_secs(self.reconcile.poll_interval_secs),
        }
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, String> {
    Url::parse(raw).map_err(|e| format!("{key} is not a valid URL: {e}"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Root of the order service API.
    #[serde(default)]
    pub base_url: String,
    /// Operator portal, used in links printed for manual intervention.
    #[serde(default)]
    pub portal_url: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub project: String,
    /// Bearer token. Prefer ORDERSYNC__PROVIDER__TOKEN over the file.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            portal_url: String::new(),
            environment: String::new(),
            organization: String::new(),
            project: String::new(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_wait_timeout_secs() -> u64 {
    20 * 60
}
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_FILE: &str = "ordersync.toml";
    pub const ENV_PREFIX: &str = "ORDERSYNC";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        load_with_env(path, environment())
    }

    /// Environment variable overrides, e.g. ORDERSYNC__PROVIDER__PROJECT=proj-1
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__")
    }

    pub fn load_with_env(path: Option<&str>, env: Environment) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file '{p}' not found"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        builder = builder.add_source(env);
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::loader::{ENV_PREFIX, load_with_env};
    use super::*;
    use config::{Environment, Map};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
[provider]
base_url = "https://api.example.com/"
portal_url = "https://portal.example.com/all/"
environment = "test"
organization = "acme"
project = "proj-1"

[reconcile]
poll_interval_secs = 5

[logging]
level = "debug"
"#;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__")
            .source(Some(source))
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let file = file_with(VALID);
        let cfg = load_with_env(file.path().to_str(), env(&[])).unwrap();
        assert_eq!(cfg.reconcile.wait_timeout_secs, 1200);
        assert_eq!(cfg.reconcile.poll_interval_secs, 5);
        assert_eq!(cfg.reconcile.retry_attempts, 3);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.provider.token, None);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = file_with(VALID);
        let cfg = load_with_env(
            file.path().to_str(),
            env(&[
                ("ORDERSYNC__PROVIDER__TOKEN", "t0k3n"),
                ("ORDERSYNC__RECONCILE__RETRY_ATTEMPTS", "5"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.provider.token.as_deref(), Some("t0k3n"));
        assert_eq!(cfg.retry_policy().attempts, 5);
    }

    #[test]
    fn test_missing_provider_fields_rejected() {
        let file = file_with("[logging]\nlevel = \"info\"\n");
        let err = load_with_env(file.path().to_str(), env(&[])).unwrap_err();
        assert!(err.contains("provider.base_url"), "{err}");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = load_with_env(Some("/nonexistent/ordersync.toml"), env(&[])).unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_poll_interval_longer_than_timeout_rejected() {
        let mut cfg: AppConfig = toml::from_str(VALID).unwrap();
        cfg.reconcile.poll_interval_secs = 3600;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut cfg: AppConfig = toml::from_str(VALID).unwrap();
        cfg.logging.level = "chatty".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_portal_url_without_path_rejected() {
        let mut cfg: AppConfig = toml::from_str(VALID).unwrap();
        cfg.provider.portal_url = "mailto:ops@example.com".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("provider.portal_url"), "{err}");
    }

    #[test]
    fn test_derived_values() {
        let cfg: AppConfig = toml::from_str(VALID).unwrap();
        let provider = cfg.provider_context().unwrap();
        assert_eq!(
            provider.order_url("ord-42"),
            "https://portal.example.com/all/projects/proj-1/orders/ord-42?context=acme"
        );
        assert_eq!(cfg.wait_options().timeout, Duration::from_secs(1200));
        assert_eq!(cfg.wait_options().interval, Duration::from_secs(5));
        assert_eq!(cfg.retry_policy().base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let cfg: AppConfig = toml::from_str(VALID).unwrap();
        let rendered = toml::to_string(&cfg).unwrap();
        let file = file_with(&rendered);
        let reloaded = load_with_env(file.path().to_str(), env(&[])).unwrap();
        assert_eq!(reloaded.provider.project, "proj-1");
    }
}
