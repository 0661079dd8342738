//! Runtime configuration.
//!
//! Loaded from TOML; every field has a default so partial files are accepted.

use crate::errors::{DropsError, Result};
use crate::identifiers::AccountId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Drops runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropsConfig {
    /// Account of the system itself; holds administrative authority.
    pub contract: AccountId,
    /// Funds transfers sent by the market account are never treated as purchases.
    pub market_account: AccountId,
    /// Length of each epoch's commit phase.
    pub epoch_phase_secs: u64,
    /// Minimum seed length, in characters.
    pub min_seed_len: usize,
    /// Capacity units consumed by one token record.
    pub token_record_units: u64,
    /// Extra units bought per token on top of the record size.
    pub purchase_buffer_units: u64,
    /// Surcharge for a payer's first account row.
    pub account_row_units: u64,
    /// Surcharge for a payer's first row in an epoch.
    pub epoch_stat_row_units: u64,
    /// Memo that makes an incoming transfer skip issuance.
    pub bypass_memo: String,
}

impl Default for DropsConfig {
    fn default() -> Self {
        Self {
            contract: AccountId::from("drops"),
            market_account: AccountId::from("eosio.ram"),
            epoch_phase_secs: 60,
            min_seed_len: 32,
            token_record_units: 146,
            purchase_buffer_units: 8,
            account_row_units: 124,
            epoch_stat_row_units: 160,
            bypass_memo: "bypass".to_string(),
        }
    }
}

impl DropsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DropsConfig = toml::from_str(content)
            .map_err(|e| DropsError::invalid(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DropsError::invalid(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            path = %path.display(),
            contract = %config.contract,
            epoch_phase_secs = config.epoch_phase_secs,
            "Parsed drops config"
        );
        Ok(config)
    }

    /// Reject configurations no runtime can operate under.
    pub fn validate(&self) -> Result<()> {
        if self.epoch_phase_secs == 0 {
            return Err(DropsError::invalid("epoch_phase_secs must be positive"));
        }
        if self.token_record_units == 0 {
            return Err(DropsError::invalid("token_record_units must be positive"));
        }
        if self.contract == self.market_account {
            return Err(DropsError::invalid(
                "contract and market_account must be different accounts",
            ));
        }
        if self.bypass_memo.is_empty() {
            return Err(DropsError::invalid("bypass_memo must not be empty"));
        }
        self.units_per_token()?;
        Ok(())
    }

    /// Epoch phase as a duration.
    pub fn epoch_phase(&self) -> Duration {
        Duration::from_secs(self.epoch_phase_secs)
    }

    /// Units bought per issued token, buffer included.
    pub fn units_per_token(&self) -> Result<u64> {
        self.token_record_units
            .checked_add(self.purchase_buffer_units)
            .ok_or_else(|| DropsError::invalid("token_record_units + purchase_buffer_units overflows"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = DropsConfig::from_toml_str("epoch_phase_secs = 300\n").unwrap();
        assert_eq!(config.epoch_phase_secs, 300);
        assert_eq!(config.min_seed_len, 32);
        assert_eq!(config.contract, AccountId::from("drops"));
    }

    #[test]
    fn zero_phase_is_rejected() {
        assert_matches!(
            DropsConfig::from_toml_str("epoch_phase_secs = 0"),
            Err(DropsError::Invalid { .. })
        );
    }

    #[test]
    fn contract_and_market_must_differ() {
        let toml = "contract = \"drops\"\nmarket_account = \"drops\"\n";
        assert_matches!(
            DropsConfig::from_toml_str(toml),
            Err(DropsError::Invalid { .. })
        );
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "contract = \"drops.test\"").unwrap();
        writeln!(file, "token_record_units = 200").unwrap();
        let config = DropsConfig::load(file.path()).unwrap();
        assert_eq!(config.contract.as_str(), "drops.test");
        assert_eq!(config.units_per_token().unwrap(), 208);
    }

    #[test]
    fn overflowing_unit_sizes_are_rejected() {
        let config = DropsConfig {
            token_record_units: u64::MAX - 1,
            purchase_buffer_units: 2,
            ..DropsConfig::default()
        };
        assert_matches!(config.units_per_token(), Err(DropsError::Invalid { .. }));
        assert_matches!(config.validate(), Err(DropsError::Invalid { .. }));
    }
}
