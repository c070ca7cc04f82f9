//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_CONFLICT_REQUEUE_SECS,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_METRICS_PORT, DEFAULT_RESYNC_INTERVAL_SECS,
    DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// AWS region for ACM calls
    /// When unset the SDK default chain decides (`AWS_DEFAULT_REGION`, profile, IMDS)
    pub aws_region: Option<String>,
    /// Namespace to watch
    /// When unset, `ACMCertificateImport` resources are watched across all namespaces
    pub watch_namespace: Option<String>,
    /// HTTP port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// How long to wait for the HTTP server to come up (seconds)
    pub server_startup_timeout_secs: u64,
    /// Poll interval while waiting for the HTTP server (milliseconds)
    pub server_poll_interval_ms: u64,
    /// Maximum concurrent reconciliations
    /// Limits how many resources can be reconciled simultaneously
    pub max_concurrent_reconciliations: u16,
    /// Requeue interval after a successful reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Requeue interval after an optimistic concurrency conflict (seconds)
    pub conflict_requeue_secs: u64,
    /// Fibonacci backoff starting value for failed reconciliations (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff maximum value for failed reconciliations (seconds)
    pub backoff_max_secs: u64,
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            aws_region: None,
            watch_namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// `from_env` is this over the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let backoff_min_secs = parse_or(&lookup, "BACKOFF_MIN_SECS", defaults.backoff_min_secs);
        Self {
            aws_region: non_empty(lookup("AWS_REGION")),
            watch_namespace: non_empty(lookup("WATCH_NAMESPACE")),
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            server_startup_timeout_secs: parse_or(
                &lookup,
                "SERVER_STARTUP_TIMEOUT_SECS",
                defaults.server_startup_timeout_secs,
            ),
            server_poll_interval_ms: parse_or(
                &lookup,
                "SERVER_POLL_INTERVAL_MS",
                defaults.server_poll_interval_ms,
            ),
            max_concurrent_reconciliations: parse_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            resync_interval_secs: parse_or(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                defaults.resync_interval_secs,
            ),
            conflict_requeue_secs: parse_or(
                &lookup,
                "CONFLICT_REQUEUE_SECS",
                defaults.conflict_requeue_secs,
            ),
            backoff_min_secs,
            // A maximum below the minimum would make the sequence shrink
            backoff_max_secs: parse_or(&lookup, "BACKOFF_MAX_SECS", defaults.backoff_max_secs)
                .max(backoff_min_secs),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_format),
        }
    }

    /// Get resync requeue duration
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Get conflict requeue duration
    #[must_use]
    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_secs)
    }

    /// Get server startup timeout duration
    #[must_use]
    pub fn server_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    /// Get server readiness poll interval
    #[must_use]
    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.log_format != "text"
    }
}

/// Read a value and parse it, falling back to the default on absence or parse failure
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ControllerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = config_from(&[]);
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.resync_interval_secs, DEFAULT_RESYNC_INTERVAL_SECS);
        assert_eq!(config.backoff_min_secs, DEFAULT_BACKOFF_MIN_SECS);
        assert_eq!(config.backoff_max_secs, DEFAULT_BACKOFF_MAX_SECS);
        assert!(config.aws_region.is_none());
        assert!(config.watch_namespace.is_none());
        assert!(config.json_logs());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = config_from(&[
            ("AWS_REGION", "eu-west-1"),
            ("WATCH_NAMESPACE", "ingress"),
            ("METRICS_PORT", "9090"),
            ("MAX_CONCURRENT_RECONCILIATIONS", "4"),
            ("LOG_FORMAT", "TEXT"),
        ]);
        assert_eq!(config.aws_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.watch_namespace.as_deref(), Some("ingress"));
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.max_concurrent_reconciliations, 4);
        assert!(!config.json_logs());
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[("METRICS_PORT", "not-a-port"), ("RESYNC_INTERVAL_SECS", "")]);
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.resync_interval_secs, DEFAULT_RESYNC_INTERVAL_SECS);
    }

    #[test]
    fn test_backoff_max_never_below_min() {
        let config = config_from(&[("BACKOFF_MIN_SECS", "30"), ("BACKOFF_MAX_SECS", "10")]);
        assert_eq!(config.backoff_min_secs, 30);
        assert_eq!(config.backoff_max_secs, 30);
    }

    #[test]
    fn test_blank_region_is_ignored() {
        let config = config_from(&[("AWS_REGION", "  ")]);
        assert!(config.aws_region.is_none());
    }
}
