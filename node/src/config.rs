//! Protocol configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use agora_types::{FeeSchedule, GovernanceParams, WalletAddress};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for an Agora deployment.
///
/// Can be loaded from a TOML file via [`ProtocolConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so
/// an empty file is a valid development configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Token every asset pool settles in.
    #[serde(default = "default_settlement_token")]
    pub settlement_token: String,

    /// Ledger account holding pooled investor funds.
    #[serde(default = "default_pool_account")]
    pub pool_account: String,

    /// Ledger account the protocol invests from when executing proposals.
    #[serde(default = "default_treasury_account")]
    pub treasury_account: String,

    /// Identities holding the admin capability at start.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Settlement tokens the whitelist registry starts with.
    #[serde(default = "default_whitelisted_tokens")]
    pub whitelisted_tokens: Vec<String>,

    /// Largest page returned by list accessors.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Initial governance parameters.
    #[serde(default)]
    pub governance: GovernanceParams,

    /// Fee rates of the default fee gateway.
    #[serde(default)]
    pub fees: FeeSchedule,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_settlement_token() -> String {
    "USDC".to_string()
}

fn default_pool_account() -> String {
    "agr_pool".to_string()
}

fn default_treasury_account() -> String {
    "agr_treasury".to_string()
}

fn default_whitelisted_tokens() -> Vec<String> {
    vec![default_settlement_token()]
}

fn default_max_batch() -> usize {
    100
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ProtocolConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NodeError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Check every value the protocol relies on at start.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.governance.validate().map_err(NodeError::Config)?;
        self.fees.validate().map_err(NodeError::Config)?;
        if self.settlement_token.trim().is_empty() {
            return Err(NodeError::Config("settlement_token is empty".to_string()));
        }
        let pool = self.pool();
        let treasury = self.treasury();
        for (name, account) in [("pool_account", &pool), ("treasury_account", &treasury)] {
            if !account.is_valid() {
                return Err(NodeError::Config(format!(
                    "{name} {account} is not a usable address"
                )));
            }
        }
        if pool == treasury {
            return Err(NodeError::Config(
                "pool_account and treasury_account must differ".to_string(),
            ));
        }
        if let Some(bad) = self.admin_addresses().find(|a| !a.is_valid()) {
            return Err(NodeError::Config(format!("admin {bad} is not a usable address")));
        }
        if self.max_batch == 0 {
            return Err(NodeError::Config("max_batch must be greater than zero".to_string()));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn pool(&self) -> WalletAddress {
        WalletAddress::new(self.pool_account.as_str())
    }

    pub fn treasury(&self) -> WalletAddress {
        WalletAddress::new(self.treasury_account.as_str())
    }

    pub fn admin_addresses(&self) -> impl Iterator<Item = WalletAddress> + '_ {
        self.admins.iter().map(|a| WalletAddress::new(a.as_str()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            settlement_token: default_settlement_token(),
            pool_account: default_pool_account(),
            treasury_account: default_treasury_account(),
            admins: Vec::new(),
            whitelisted_tokens: default_whitelisted_tokens(),
            max_batch: default_max_batch(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            governance: GovernanceParams::default(),
            fees: FeeSchedule::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::VoteWeightPolicy;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ProtocolConfig {
            admins: vec!["agr_root".to_string()],
            ..ProtocolConfig::default()
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = ProtocolConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ProtocolConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.settlement_token, "USDC");
        assert_eq!(config.max_batch, 100);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.governance.quorum_bps, 5000);
        assert_eq!(config.fees.rage_quit_bps, 500);
        assert_eq!(config.whitelisted_tokens, vec!["USDC".to_string()]);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            admins = ["agr_root"]
            max_batch = 25

            [governance]
            quorum_bps = 6000
            vote_weight = "live"

            [fees]
            invest_bps = 1000
        "#;
        let config = ProtocolConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.max_batch, 25);
        assert_eq!(config.governance.quorum_bps, 6000);
        assert_eq!(config.governance.vote_weight, VoteWeightPolicy::Live);
        // untouched fields keep their defaults
        assert_eq!(config.governance.timelock_secs, 2 * 24 * 3600);
        assert_eq!(config.fees.invest_bps, 1000);
        assert_eq!(config.fees.divest_bps, 50);
        assert_eq!(
            config.admin_addresses().collect::<Vec<_>>(),
            vec![WalletAddress::new("agr_root")]
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for toml in [
            "[governance]\nquorum_bps = 0",
            "[governance]\nvoting_period_secs = 0",
            "[fees]\nrage_quit_bps = 10001",
            "[fees]\ndivest_bps = 600\nrage_quit_bps = 300",
            "max_batch = 0",
            "pool_account = \"agr_000\"",
            "treasury_account = \"agr_pool\"",
            "admins = [\"root\"]",
            "log_format = \"xml\"",
        ] {
            assert!(
                matches!(ProtocolConfig::from_toml_str(toml), Err(NodeError::Config(_))),
                "accepted: {toml}"
            );
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "settlement_token = \"DAI\"\nwhitelisted_tokens = [\"DAI\"]").unwrap();
        let config = ProtocolConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.settlement_token, "DAI");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ProtocolConfig::from_toml_file("/nonexistent/agora.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
