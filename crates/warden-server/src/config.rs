//! Server configuration
//!
//! Loaded in layers: built-in defaults, then an optional TOML or JSON file,
//! then `WARDEN_*` environment variables, then command-line flags. The
//! result is validated before the server starts.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use warden_core::{Result, WardenError};
use warden_recovery::RecoveryPolicy;

/// Environment variable overriding [`ServerConfig::bind_address`]
pub const ENV_BIND_ADDRESS: &str = "WARDEN_BIND_ADDRESS";
/// Environment variable overriding [`ServerConfig::log_level`]
pub const ENV_LOG_LEVEL: &str = "WARDEN_LOG_LEVEL";
/// Environment variable overriding the session lifetime
pub const ENV_SESSION_TTL_SECS: &str = "WARDEN_SESSION_TTL_SECS";
/// Environment variable overriding the completed-session lifetime
pub const ENV_COMPLETED_TTL_SECS: &str = "WARDEN_COMPLETED_TTL_SECS";
/// Environment variable overriding the signature freshness window
pub const ENV_MAX_CLOCK_SKEW_SECS: &str = "WARDEN_MAX_CLOCK_SKEW_SECS";

/// Top-level server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_address: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Protocol timing
    pub recovery: RecoverySettings,
}

/// Recovery timing in whole seconds, as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    /// Lifetime of a pending or ready session
    pub session_ttl_secs: u64,
    /// Grace period after completion
    pub completed_ttl_secs: u64,
    /// Signature freshness window
    pub max_clock_skew_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            log_level: "info".to_string(),
            recovery: RecoverySettings::default(),
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        let policy = RecoveryPolicy::default();
        Self {
            session_ttl_secs: policy.session_ttl.as_secs(),
            completed_ttl_secs: policy.completed_ttl.as_secs(),
            max_clock_skew_secs: policy.max_clock_skew.as_secs(),
        }
    }
}

impl ServerConfig {
    /// Read a configuration file, choosing the format by extension
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WardenError::validation(format!("failed to read {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| WardenError::validation(format!("invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| WardenError::validation(format!("invalid JSON: {e}"))),
            _ => Err(WardenError::validation(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Apply `WARDEN_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn merge_with_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup(ENV_BIND_ADDRESS) {
            self.bind_address = bind;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(raw) = lookup(ENV_SESSION_TTL_SECS) {
            self.recovery.session_ttl_secs = parse_secs(ENV_SESSION_TTL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_COMPLETED_TTL_SECS) {
            self.recovery.completed_ttl_secs = parse_secs(ENV_COMPLETED_TTL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CLOCK_SKEW_SECS) {
            self.recovery.max_clock_skew_secs = parse_secs(ENV_MAX_CLOCK_SKEW_SECS, &raw)?;
        }
        Ok(())
    }

    /// Recovery policy described by this configuration
    pub fn to_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy {
            session_ttl: Duration::from_secs(self.recovery.session_ttl_secs),
            completed_ttl: Duration::from_secs(self.recovery.completed_ttl_secs),
            max_clock_skew: Duration::from_secs(self.recovery.max_clock_skew_secs),
            ..RecoveryPolicy::default()
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(WardenError::validation(format!(
                "bind_address is not a socket address: {}",
                self.bind_address
            )));
        }
        if self.log_level.trim().is_empty() {
            return Err(WardenError::validation("log_level cannot be empty"));
        }
        self.to_policy().validate()
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| WardenError::validation(format!("invalid number of seconds in {name}")))
}
