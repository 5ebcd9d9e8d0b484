//! TOML configuration types for OrgSentry.
//!
//! The top-level [`AppConfig`] is deserialized from `orgsentry.toml` and
//! contains sections for the HTTP server, guard tunables, and the audit
//! log. The override-detection check has no configuration surface on
//! purpose; it cannot be tuned or disabled.
//!
//! # Example `orgsentry.toml`
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:8090"
//!
//! [guard]
//! fallback = "fail_closed"
//! lookup_timeout_ms = 2000
//!
//! [audit]
//! db_path = "$HOME/.orgsentry/orgsentry.db"
//! ```

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OrgSentryError, Result};
use crate::guard::SessionPolicy;

/// Posture when a directory lookup fails or times out.
///
/// Fail-closed is the safe default: the guard exists specifically to
/// prevent harm from unauthorized or malicious actions. Fail-open must be
/// opted into explicitly and every fail-open allow is logged loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPosture {
    FailClosed,
    FailOpen,
}

impl Default for FallbackPosture {
    fn default() -> Self {
        FallbackPosture::FailClosed
    }
}

/// HTTP server configuration (`[server]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., `"127.0.0.1:8090"`).
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8090".to_string(),
        }
    }
}

/// Guard engine tunables (`[guard]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Posture on infrastructure failure.
    pub fallback: FallbackPosture,
    /// Cap on a single directory-backed check, in milliseconds.
    pub lookup_timeout_ms: u64,
    /// Lookback window for the multi-login heuristic, in seconds.
    pub multi_login_window_secs: i64,
    /// Distinct-IP count at which multi-login escalates.
    pub multi_login_ip_threshold: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        let policy = SessionPolicy::default();
        Self {
            fallback: FallbackPosture::default(),
            lookup_timeout_ms: 2000,
            multi_login_window_secs: policy.multi_login_window_secs,
            multi_login_ip_threshold: policy.multi_login_ip_threshold,
        }
    }
}

impl GuardConfig {
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            multi_login_window_secs: self.multi_login_window_secs,
            multi_login_ip_threshold: self.multi_login_ip_threshold,
        }
    }
}

/// Audit log configuration (`[audit]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// SQLite database path for the `guard_log` table.
    pub db_path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            db_path: "orgsentry.db".to_string(),
        }
    }
}

/// Top-level application configuration deserialized from `orgsentry.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub guard: GuardConfig,
    pub audit: AuditConfig,
}

impl AppConfig {
    /// Load and parse the configuration from a TOML file at the given path.
    ///
    /// Before parsing, `${VAR}` and `$VAR` placeholders in the TOML text
    /// are replaced with the corresponding environment variable values. An
    /// error is returned if a referenced variable is not set.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let content = substitute_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Replace `${VAR_NAME}` and `$VAR_NAME` placeholders with environment
/// variable values.
///
/// Returns an error containing the variable name if the variable is not
/// set.
fn substitute_env_vars(input: &str) -> Result<String> {
    // Match ${VAR_NAME} (braces form)
    let re_braces = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    // Match $VAR_NAME (no braces, uppercase + underscore only to avoid false positives)
    let re_bare = Regex::new(r"\$([A-Z_][A-Z0-9_]*)").unwrap();

    let mut result = input.to_string();

    for cap in re_braces.captures_iter(input) {
        let var_name = &cap[1];
        let value = std::env::var(var_name)
            .map_err(|_| OrgSentryError::ConfigEnvVar(var_name.to_string()))?;
        result = result.replace(&cap[0], &value);
    }

    let intermediate = result.clone();
    for cap in re_bare.captures_iter(&intermediate) {
        let var_name = &cap[1];
        let value = std::env::var(var_name)
            .map_err(|_| OrgSentryError::ConfigEnvVar(var_name.to_string()))?;
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}
