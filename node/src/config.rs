//! Arbiter configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use poi_types::{EngineParams, Principal};

use crate::logging::LogFormat;
use crate::ArbiterError;

/// Where the arbiter keeps its checkpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Nothing survives the process. Tests and dry runs.
    #[default]
    Memory,
    /// LMDB environment under `data_dir`.
    Lmdb,
}

/// Configuration for an arbiter.
///
/// Can be loaded from a TOML file via [`ArbiterConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// Principal allowed to register models, pause and withdraw.
    #[serde(default = "default_admin")]
    pub admin: String,

    /// Principals holding the arbitration role for challenges.
    #[serde(default)]
    pub arbitrators: Vec<String>,

    /// Quorum, staking, slashing, challenge and trust tuning.
    #[serde(default)]
    pub params: EngineParams,

    /// Data directory for the LMDB backend.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub store: StoreBackend,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to dump Prometheus metrics when the daemon exits.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_admin() -> String {
    "admin".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./poi_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ArbiterConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ArbiterError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ArbiterError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ArbiterError> {
        toml::from_str(s).map_err(|e| ArbiterError::Config(e.to_string()))
    }

    /// Check the configuration is usable before building an arbiter.
    pub fn validate(&self) -> Result<(), ArbiterError> {
        self.params.validate().map_err(ArbiterError::Config)?;
        if !Principal::new(self.admin.as_str()).is_valid() {
            return Err(ArbiterError::Config("admin principal must not be empty".into()));
        }
        if let Some(bad) = self
            .arbitrators
            .iter()
            .find(|a| !Principal::new(a.as_str()).is_valid())
        {
            return Err(ArbiterError::Config(format!("invalid arbitrator principal {bad:?}")));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn admin_principal(&self) -> Principal {
        Principal::new(self.admin.as_str())
    }

    pub fn arbitrator_principals(&self) -> Vec<Principal> {
        self.arbitrators.iter().map(|a| Principal::new(a.as_str())).collect()
    }

    pub fn log_format(&self) -> Result<LogFormat, ArbiterError> {
        self.log_format.parse().map_err(ArbiterError::Config)
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            arbitrators: Vec::new(),
            params: EngineParams::default(),
            data_dir: default_data_dir(),
            store: StoreBackend::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ArbiterConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.admin, "admin");
        assert_eq!(config.params, EngineParams::defaults());
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.log_format, "human");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            admin = "0xadmin"
            arbitrators = ["0xarb1", "0xarb2"]
            store = "lmdb"

            [params]
            quorum = 5
            minimum_stake = 2500
        "#;
        let config = ArbiterConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.admin_principal(), Principal::new("0xadmin"));
        assert_eq!(config.arbitrator_principals().len(), 2);
        assert_eq!(config.store, StoreBackend::Lmdb);
        assert_eq!(config.params.quorum, 5);
        assert_eq!(config.params.minimum_stake, 2500);
        assert_eq!(config.params.slash_bps, 1000); // default
    }

    #[test]
    fn invalid_quorum_fails_validation() {
        let config = ArbiterConfig::from_toml_str("[params]\nquorum = 2").unwrap();
        assert!(matches!(config.validate(), Err(ArbiterError::Config(_))));
    }

    #[test]
    fn unknown_log_format_fails_validation() {
        let config = ArbiterConfig::from_toml_str("log_format = \"xml\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ArbiterConfig::from_toml_file("/nonexistent/poi.toml");
        assert!(matches!(result, Err(ArbiterError::Config(_))));
    }
}
