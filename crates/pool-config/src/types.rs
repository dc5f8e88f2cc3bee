//! Configuration model.

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
	pub network: NetworkConfig,
	#[serde(default)]
	pub contracts: ContractsConfig,
	#[serde(default)]
	pub orchestrator: OrchestratorConfig,
	#[serde(default)]
	pub cache: CacheConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub chain_id: u64,
	pub rpc_url: String,
}

/// Deployed contract addresses.
///
/// Every entry is optional. A missing address makes the operations that
/// need it unavailable rather than invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractsConfig {
	#[serde(default)]
	pub pool: Option<Address>,
	#[serde(default)]
	pub wrapped_token_gateway: Option<Address>,
	#[serde(default)]
	pub l2_pool: Option<Address>,
	#[serde(default)]
	pub swap_collateral_adapter: Option<Address>,
	#[serde(default)]
	pub repay_with_collateral_adapter: Option<Address>,
	#[serde(default)]
	pub flash_liquidation_adapter: Option<Address>,
	#[serde(default)]
	pub ens_registry: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
	/// Markup applied to flash-loaned amounts, in percent.
	#[serde(default = "default_surplus_percent")]
	pub surplus_percent: Decimal,
	/// Flash-loan premium in basis points, added to exact adapter approvals.
	#[serde(default = "default_flash_premium_bps")]
	pub flash_premium_bps: u32,
	/// Gas limit overrides keyed by action name (e.g. `supply`, `approval`).
	#[serde(default)]
	pub gas_limits: BTreeMap<String, u64>,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			surplus_percent: default_surplus_percent(),
			flash_premium_bps: default_flash_premium_bps(),
			gas_limits: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
	#[serde(default = "default_metadata_ttl_secs")]
	pub metadata_ttl_secs: u64,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			metadata_ttl_secs: default_metadata_ttl_secs(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
	#[serde(default = "default_log_level")]
	pub level: String,
	#[serde(default)]
	pub json: bool,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_log_level(),
			json: false,
		}
	}
}

fn default_surplus_percent() -> Decimal {
	Decimal::from(5)
}

fn default_flash_premium_bps() -> u32 {
	5
}

fn default_metadata_ttl_secs() -> u64 {
	3600
}

fn default_log_level() -> String {
	"info".to_string()
}
