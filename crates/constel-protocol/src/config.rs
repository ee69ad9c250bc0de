//! Protocol configuration.
//!
//! TOML keeps integers in 64 bits, so fee and reserve rates are written in
//! basis points, the bond in gwei and the collateral price in billionths of
//! a base unit. Conversions to on-ledger units happen in the accessors.

use std::path::Path;

use serde::{Deserialize, Serialize};

use constel_types::{Amount, Rate, RATE_SCALE};

use crate::Result;

/// Basis points in 1.0.
pub const BPS_SCALE: u64 = 10_000;

const GWEI: Amount = 1_000_000_000;

/// Fixed-point steps per configured price unit.
const NANO_TO_RATE: Rate = RATE_SCALE / 1_000_000_000;

/// Convert basis points to a fixed-point rate.
pub fn bps_to_rate(bps: u64) -> Rate {
    Rate::from(bps) * (RATE_SCALE / Rate::from(BPS_SCALE))
}

/// Complete protocol configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub vaults: VaultsConfig,
    #[serde(default)]
    pub distributor: DistributorConfig,
    #[serde(default)]
    pub streamer: StreamerConfig,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Signing domain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain identifier bound into every signature.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Label the contract identity is derived from.
    #[serde(default = "default_contract_label")]
    pub contract_label: String,
}

/// Vault settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultsConfig {
    #[serde(default)]
    pub base_mint_fee_bps: u64,
    #[serde(default = "default_reserve_bps")]
    pub base_liquidity_reserve_bps: u64,
    #[serde(default)]
    pub collateral_mint_fee_bps: u64,
    #[serde(default = "default_reserve_bps")]
    pub collateral_liquidity_reserve_bps: u64,
    /// Maximum base/collateral ratio. Absent = no limit.
    #[serde(default)]
    pub max_coverage_ratio_bps: Option<u64>,
    /// Minimum base/collateral ratio.
    #[serde(default)]
    pub min_coverage_ratio_bps: u64,
}

/// Distributor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// Bond funded into each new minipool.
    #[serde(default = "default_bond_gwei")]
    pub bond_gwei: u64,
    #[serde(default = "default_fee_bps")]
    pub treasury_fee_bps: u64,
    #[serde(default = "default_fee_bps")]
    pub operator_fee_bps: u64,
}

/// Claim streamer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

/// Initial collateral price for the stub feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    /// Base units per collateral unit, in billionths.
    #[serde(default = "default_collateral_price_nano")]
    pub collateral_price_nano: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_chain_id() -> u64 {
    1
}

fn default_contract_label() -> String {
    "constellation".to_string()
}

fn default_reserve_bps() -> u64 {
    1_000
}

fn default_bond_gwei() -> u64 {
    8_000_000_000
}

fn default_fee_bps() -> u64 {
    1_000
}

fn default_interval_secs() -> u64 {
    24 * 3600
}

fn default_collateral_price_nano() -> u64 {
    10_000_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            contract_label: default_contract_label(),
        }
    }
}

impl Default for VaultsConfig {
    fn default() -> Self {
        Self {
            base_mint_fee_bps: 0,
            base_liquidity_reserve_bps: default_reserve_bps(),
            collateral_mint_fee_bps: 0,
            collateral_liquidity_reserve_bps: default_reserve_bps(),
            max_coverage_ratio_bps: None,
            min_coverage_ratio_bps: 0,
        }
    }
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            bond_gwei: default_bond_gwei(),
            treasury_fee_bps: default_fee_bps(),
            operator_fee_bps: default_fee_bps(),
        }
    }
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            collateral_price_nano: default_collateral_price_nano(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DistributorConfig {
    pub fn bond(&self) -> Amount {
        Amount::from(self.bond_gwei) * GWEI
    }
}

impl PriceConfig {
    /// Collateral price as a fixed-point rate.
    pub fn collateral_price(&self) -> Rate {
        Rate::from(self.collateral_price_nano) * NANO_TO_RATE
    }
}

impl VaultsConfig {
    /// Maximum ratio as a fixed-point rate; `Rate::MAX` when unset.
    pub fn max_coverage_ratio(&self) -> Rate {
        self.max_coverage_ratio_bps.map(bps_to_rate).unwrap_or(Rate::MAX)
    }
}

impl ProtocolConfig {
    /// Load configuration from `path`.
    ///
    /// Falls back to defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// - [`crate::ProtocolError::Io`] if the file cannot be read
    /// - [`crate::ProtocolError::Config`] if it is not valid TOML
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// - [`crate::ProtocolError::Config`] if it is not valid TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
