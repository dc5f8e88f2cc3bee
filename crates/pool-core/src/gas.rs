//! Gas limits and descriptor construction.

use crate::PoolError;
use alloy_primitives::{Address, Bytes, U256};
use futures::FutureExt;
use pool_types::{
	GasEstimate, GasEstimator, NetworkService, ServiceError, Transaction, TransactionDescriptor,
	TransactionType, TxProducer,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Protocol actions with a recommended gas limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolAction {
	Approval,
	DelegationApproval,
	Supply,
	Withdraw,
	Borrow,
	Repay,
	LiquidationCall,
	LiquidationFlash,
	SwapCollateral,
	RepayCollateral,
	WithdrawEth,
	BorrowEth,
	SetUsageAsCollateral,
	SwapBorrowRateMode,
	SetUserEMode,
}

impl PartialOrd for ProtocolAction {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ProtocolAction {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.as_str().cmp(other.as_str())
	}
}

pub const DEFAULT_GAS_LIMIT: u64 = 210_000;

impl ProtocolAction {
	pub const ALL: [ProtocolAction; 15] = [
		ProtocolAction::Approval,
		ProtocolAction::DelegationApproval,
		ProtocolAction::Supply,
		ProtocolAction::Withdraw,
		ProtocolAction::Borrow,
		ProtocolAction::Repay,
		ProtocolAction::LiquidationCall,
		ProtocolAction::LiquidationFlash,
		ProtocolAction::SwapCollateral,
		ProtocolAction::RepayCollateral,
		ProtocolAction::WithdrawEth,
		ProtocolAction::BorrowEth,
		ProtocolAction::SetUsageAsCollateral,
		ProtocolAction::SwapBorrowRateMode,
		ProtocolAction::SetUserEMode,
	];

	/// Key used for overrides in the `gas_limits` config table.
	pub fn as_str(&self) -> &'static str {
		match self {
			ProtocolAction::Approval => "approval",
			ProtocolAction::DelegationApproval => "delegation_approval",
			ProtocolAction::Supply => "supply",
			ProtocolAction::Withdraw => "withdraw",
			ProtocolAction::Borrow => "borrow",
			ProtocolAction::Repay => "repay",
			ProtocolAction::LiquidationCall => "liquidation_call",
			ProtocolAction::LiquidationFlash => "liquidation_flash",
			ProtocolAction::SwapCollateral => "swap_collateral",
			ProtocolAction::RepayCollateral => "repay_collateral",
			ProtocolAction::WithdrawEth => "withdraw_eth",
			ProtocolAction::BorrowEth => "borrow_eth",
			ProtocolAction::SetUsageAsCollateral => "set_usage_as_collateral",
			ProtocolAction::SwapBorrowRateMode => "swap_borrow_rate_mode",
			ProtocolAction::SetUserEMode => "set_user_e_mode",
		}
	}

	pub fn default_gas_limit(&self) -> u64 {
		match self {
			ProtocolAction::Approval => 65_000,
			ProtocolAction::DelegationApproval => 55_000,
			ProtocolAction::Supply => 300_000,
			ProtocolAction::Withdraw => 230_000,
			ProtocolAction::Borrow => 450_000,
			ProtocolAction::Repay => 300_000,
			ProtocolAction::LiquidationCall => 700_000,
			ProtocolAction::LiquidationFlash => 995_000,
			ProtocolAction::SwapCollateral => 1_000_000,
			ProtocolAction::RepayCollateral => 700_000,
			ProtocolAction::WithdrawEth => 640_000,
			ProtocolAction::BorrowEth => 450_000,
			ProtocolAction::SetUsageAsCollateral
			| ProtocolAction::SwapBorrowRateMode
			| ProtocolAction::SetUserEMode => DEFAULT_GAS_LIMIT,
		}
	}
}

/// Default gas limits with per-action overrides.
#[derive(Debug, Clone, Default)]
pub struct GasLimits {
	overrides: BTreeMap<ProtocolAction, u64>,
}

impl GasLimits {
	/// Builds the table from config overrides, rejecting unknown action names.
	pub fn from_overrides(overrides: &BTreeMap<String, u64>) -> Result<Self, PoolError> {
		let mut limits = Self::default();
		for (name, limit) in overrides {
			let action = ProtocolAction::ALL
				.iter()
				.find(|a| a.as_str() == name.as_str())
				.ok_or_else(|| {
					PoolError::Configuration(format!("unknown gas limit action '{}'", name))
				})?;
			limits.overrides.insert(*action, *limit);
		}
		Ok(limits)
	}

	pub fn limit(&self, action: ProtocolAction) -> u64 {
		self.overrides
			.get(&action)
			.copied()
			.unwrap_or_else(|| action.default_gas_limit())
	}
}

/// A call ready to be wrapped in a descriptor.
#[derive(Debug, Clone)]
pub struct CallSpec {
	pub from: Address,
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	pub action: ProtocolAction,
}

impl CallSpec {
	pub fn new(from: Address, to: Address, data: impl Into<Bytes>, action: ProtocolAction) -> Self {
		Self {
			from,
			to,
			data: data.into(),
			value: U256::ZERO,
			action,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}

/// Wraps calls into descriptors whose thunks read the network lazily.
#[derive(Clone)]
pub struct DescriptorFactory {
	network: Arc<dyn NetworkService>,
	gas_limits: Arc<GasLimits>,
}

impl DescriptorFactory {
	pub fn new(network: Arc<dyn NetworkService>, gas_limits: GasLimits) -> Self {
		Self {
			network,
			gas_limits: Arc::new(gas_limits),
		}
	}

	pub fn gas_limit(&self, action: ProtocolAction) -> u64 {
		self.gas_limits.limit(action)
	}

	pub fn build(&self, tx_type: TransactionType, call: CallSpec) -> TransactionDescriptor {
		let gas_limit = self.gas_limit(call.action);

		let network = self.network.clone();
		let tx: TxProducer = Arc::new(move || {
			let network = network.clone();
			let call = call.clone();
			async move {
				let chain_id = network.chain_id().await?;
				Ok::<_, ServiceError>(Transaction {
					from: call.from,
					to: call.to,
					data: call.data,
					value: call.value,
					chain_id,
					gas_limit: Some(gas_limit),
				})
			}
			.boxed()
		});

		let network = self.network.clone();
		let gas: GasEstimator = Arc::new(move || {
			let network = network.clone();
			async move {
				let gas_price = network.gas_price().await?;
				Ok::<_, ServiceError>(GasEstimate {
					gas_limit,
					gas_price,
				})
			}
			.boxed()
		});

		TransactionDescriptor::new(tx_type, tx, gas)
	}

	pub fn action(&self, call: CallSpec) -> TransactionDescriptor {
		self.build(TransactionType::PoolAction, call)
	}
}
