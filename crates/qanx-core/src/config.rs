//! Token deployment configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! chain_id = 1
//! contract_address = "0xAAf93cb9C5A5c7A0d2D5C1b1F1F4b1d2b5A2Ee01"
//! cheque_signer = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
//! # optional
//! name = "QANX Token"
//! symbol = "QANX"
//! decimals = 18
//! total_supply = "3333333000000000000000000000"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{amount_string, Address, Amount, MAX_DECIMALS};
use crate::{DECIMALS, TOKEN_NAME, TOKEN_SYMBOL, TOTAL_SUPPLY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Supply minted to the contract pool at genesis, in base units
    #[serde(default = "default_total_supply", with = "amount_string")]
    pub total_supply: Amount,

    pub chain_id: u64,

    /// Address of the token itself; holds the cheque pool
    pub contract_address: Address,

    /// Initial cheque signer
    pub cheque_signer: Address,
}

fn default_name() -> String {
    TOKEN_NAME.to_string()
}

fn default_symbol() -> String {
    TOKEN_SYMBOL.to_string()
}

fn default_decimals() -> u8 {
    DECIMALS
}

fn default_total_supply() -> Amount {
    TOTAL_SUPPLY
}

impl TokenConfig {
    /// Config with default metadata and supply
    pub fn new(chain_id: u64, contract_address: Address, cheque_signer: Address) -> Self {
        Self {
            name: default_name(),
            symbol: default_symbol(),
            decimals: default_decimals(),
            total_supply: default_total_supply(),
            chain_id,
            contract_address,
            cheque_signer,
        }
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TokenConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.contract_address.is_zero() {
            return Err(Error::Config("contract_address must not be zero".into()));
        }
        if self.cheque_signer.is_zero() {
            return Err(Error::Config("cheque_signer must not be zero".into()));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(Error::Config(format!(
                "decimals must be at most {}, got {}",
                MAX_DECIMALS, self.decimals
            )));
        }
        if self.symbol.is_empty() {
            return Err(Error::Config("symbol must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
chain_id = 5
contract_address = "0xcccccccccccccccccccccccccccccccccccccccc"
cheque_signer = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
"#
        )
        .unwrap();

        let config = TokenConfig::load(file.path()).unwrap();
        assert_eq!(config.chain_id, 5);
        assert_eq!(config.name, "QANX Token");
        assert_eq!(config.symbol, "QANX");
        assert_eq!(config.decimals, 18);
        assert_eq!(config.total_supply, TOTAL_SUPPLY);
        assert_eq!(config.contract_address, Address::new([0xcc; 20]));
    }

    #[test]
    fn test_explicit_supply() {
        let config: TokenConfig = toml::from_str(
            r#"
chain_id = 1
contract_address = "0xcccccccccccccccccccccccccccccccccccccccc"
cheque_signer = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
total_supply = "1000"
symbol = "TST"
"#,
        )
        .unwrap();
        assert_eq!(config.total_supply, 1_000);
        assert_eq!(config.symbol, "TST");
    }

    #[test]
    fn test_validate_rejects_zero_addresses() {
        let config = TokenConfig::new(1, Address::ZERO, Address::new([1; 20]));
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = TokenConfig::new(1, Address::new([1; 20]), Address::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = TokenConfig::new(1, Address::new([1; 20]), Address::new([2; 20]));
        assert!(config.validate().is_ok());
        config.decimals = 39;
        assert!(config.validate().is_err());
    }
}
