//! Caller intents.
//!
//! An intent is the caller's high-level request ("supply 100 DAI on behalf of
//! X"). Addresses and amounts are carried exactly as the caller typed them;
//! the orchestrator's validation pipeline turns them into typed values before
//! any encoding work begins.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Debt type of a borrow position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestRateMode {
	/// Only valid where the action does not distinguish debt types.
	#[default]
	None,
	Stable,
	Variable,
}

impl InterestRateMode {
	/// Integer tag understood by the pool contracts.
	pub fn as_u8(&self) -> u8 {
		match self {
			InterestRateMode::None => 0,
			InterestRateMode::Stable => 1,
			InterestRateMode::Variable => 2,
		}
	}

	pub fn as_u256(&self) -> U256 {
		U256::from(self.as_u8())
	}

	/// Rejects [`InterestRateMode::None`] for actions that act on a debt position.
	pub fn require_debt_mode(self, field: &str) -> Result<Self, ValidationError> {
		match self {
			InterestRateMode::None => Err(ValidationError::invalid(
				field,
				"interest rate mode must be stable or variable",
			)),
			mode => Ok(mode),
		}
	}
}

/// Size of the allowance requested when an approval is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPolicy {
	/// Approve exactly the amount the action needs.
	#[default]
	Exact,
	/// Approve the maximum unsigned integer.
	Max,
}

/// An off-chain signed permit delivered with an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitAuthorization {
	/// Hex-encoded signature blob (65-byte `r‖s‖v` or 64-byte compact form).
	pub signature: String,
	/// Unix timestamp after which the permit is void.
	pub deadline: u64,
	/// Amount covered by the permit, when it differs from the action amount.
	#[serde(default)]
	pub value: Option<String>,
}

/// The three components of a split permit signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
	/// Recovery id, normalised to 27 or 28.
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

/// Deposit `amount` of `reserve` into the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyIntent {
	pub user: String,
	pub reserve: String,
	pub amount: String,
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	#[serde(default)]
	pub referral_code: u16,
	#[serde(default)]
	pub approval: ApprovalPolicy,
	#[serde(default)]
	pub use_optimized_path: bool,
	/// Pre-encoded compact arguments, used verbatim on the optimized path.
	#[serde(default)]
	pub encoded_params: Option<String>,
}

/// Deposit using a signed permit instead of an on-chain approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyWithPermitIntent {
	pub user: String,
	pub reserve: String,
	pub amount: String,
	pub permit: PermitAuthorization,
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	#[serde(default)]
	pub referral_code: u16,
	#[serde(default)]
	pub use_optimized_path: bool,
	#[serde(default)]
	pub encoded_params: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawIntent {
	pub user: String,
	pub reserve: String,
	pub amount: String,
	/// Recipient of the withdrawn funds; defaults to `user`.
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	/// Interest-bearing token of the reserve, required for native withdrawals.
	#[serde(default)]
	pub a_token: Option<String>,
	#[serde(default)]
	pub use_optimized_path: bool,
	#[serde(default)]
	pub encoded_params: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowIntent {
	pub user: String,
	pub reserve: String,
	pub amount: String,
	pub interest_rate_mode: InterestRateMode,
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	#[serde(default)]
	pub referral_code: u16,
	/// Debt token receiving the credit delegation, required for native borrows.
	#[serde(default)]
	pub debt_token: Option<String>,
	#[serde(default)]
	pub use_optimized_path: bool,
	#[serde(default)]
	pub encoded_params: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayIntent {
	pub user: String,
	pub reserve: String,
	pub amount: String,
	pub interest_rate_mode: InterestRateMode,
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	#[serde(default)]
	pub approval: ApprovalPolicy,
	#[serde(default)]
	pub use_optimized_path: bool,
	#[serde(default)]
	pub encoded_params: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayWithPermitIntent {
	pub user: String,
	pub reserve: String,
	pub amount: String,
	pub interest_rate_mode: InterestRateMode,
	pub permit: PermitAuthorization,
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	#[serde(default)]
	pub use_optimized_path: bool,
	#[serde(default)]
	pub encoded_params: Option<String>,
}

/// Swap one collateral for another through an aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCollateralIntent {
	pub user: String,
	pub from_asset: String,
	pub from_a_token: String,
	pub to_asset: String,
	pub from_amount: String,
	/// Minimum amount of `to_asset` to receive; never buffered.
	pub min_to_amount: String,
	pub augustus: String,
	pub swap_calldata: String,
	#[serde(default)]
	pub swap_all: bool,
	/// Route through a flash loan rather than swapping the collateral directly.
	#[serde(default)]
	pub flash: bool,
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	#[serde(default)]
	pub referral_code: u16,
	#[serde(default)]
	pub permit: Option<PermitAuthorization>,
	#[serde(default)]
	pub approval: ApprovalPolicy,
}

/// Repay debt by selling collateral through an aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayWithCollateralIntent {
	pub user: String,
	pub from_asset: String,
	pub from_a_token: String,
	pub asset_to_repay: String,
	/// Maximum amount of collateral to sell.
	pub repay_with_amount: String,
	/// Amount of debt to repay.
	pub repay_amount: String,
	pub interest_rate_mode: InterestRateMode,
	pub augustus: String,
	pub swap_calldata: String,
	#[serde(default)]
	pub repay_all_debt: bool,
	#[serde(default)]
	pub flash: bool,
	#[serde(default)]
	pub on_behalf_of: Option<String>,
	#[serde(default)]
	pub referral_code: u16,
	#[serde(default)]
	pub permit: Option<PermitAuthorization>,
	#[serde(default)]
	pub approval: ApprovalPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCallIntent {
	pub liquidator: String,
	pub liquidated_user: String,
	pub debt_reserve: String,
	pub collateral_reserve: String,
	/// Debt to cover, or the sentinel to cover as much as allowed.
	pub debt_to_cover: String,
	#[serde(default)]
	pub get_a_tokens: bool,
	#[serde(default)]
	pub approval: ApprovalPolicy,
	#[serde(default)]
	pub use_optimized_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashLiquidationIntent {
	pub user: String,
	pub collateral_reserve: String,
	pub borrowed_reserve: String,
	pub debt_to_cover: String,
	pub initiator: String,
	#[serde(default)]
	pub liquidate_all: bool,
	#[serde(default)]
	pub use_eth_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUsageAsCollateralIntent {
	pub user: String,
	pub reserve: String,
	pub use_as_collateral: bool,
	#[serde(default)]
	pub use_optimized_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUserEModeIntent {
	pub user: String,
	pub category_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapBorrowRateModeIntent {
	pub user: String,
	pub reserve: String,
	/// The rate mode the debt currently accrues at.
	pub interest_rate_mode: InterestRateMode,
	#[serde(default)]
	pub use_optimized_path: bool,
}

/// Request for an EIP-2612 typed-data payload to sign off-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignApprovalIntent {
	pub user: String,
	pub reserve: String,
	pub amount: String,
	pub deadline: u64,
}

/// Every operation the orchestrator accepts, as a tagged union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Intent {
	Supply(SupplyIntent),
	SupplyWithPermit(SupplyWithPermitIntent),
	Withdraw(WithdrawIntent),
	Borrow(BorrowIntent),
	Repay(RepayIntent),
	RepayWithPermit(RepayWithPermitIntent),
	SwapCollateral(SwapCollateralIntent),
	RepayWithCollateral(RepayWithCollateralIntent),
	LiquidationCall(LiquidationCallIntent),
	FlashLiquidation(FlashLiquidationIntent),
	SetUsageAsCollateral(SetUsageAsCollateralIntent),
	SetUserEMode(SetUserEModeIntent),
	SwapBorrowRateMode(SwapBorrowRateModeIntent),
}

impl Intent {
	/// Name of the operation, as used in logs.
	pub fn action(&self) -> &'static str {
		match self {
			Intent::Supply(_) => "supply",
			Intent::SupplyWithPermit(_) => "supply_with_permit",
			Intent::Withdraw(_) => "withdraw",
			Intent::Borrow(_) => "borrow",
			Intent::Repay(_) => "repay",
			Intent::RepayWithPermit(_) => "repay_with_permit",
			Intent::SwapCollateral(_) => "swap_collateral",
			Intent::RepayWithCollateral(_) => "repay_with_collateral",
			Intent::LiquidationCall(_) => "liquidation_call",
			Intent::FlashLiquidation(_) => "flash_liquidation",
			Intent::SetUsageAsCollateral(_) => "set_usage_as_collateral",
			Intent::SetUserEMode(_) => "set_user_e_mode",
			Intent::SwapBorrowRateMode(_) => "swap_borrow_rate_mode",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rate_mode_tags() {
		assert_eq!(InterestRateMode::None.as_u8(), 0);
		assert_eq!(InterestRateMode::Stable.as_u8(), 1);
		assert_eq!(InterestRateMode::Variable.as_u8(), 2);
	}

	#[test]
	fn test_none_rate_mode_rejected_for_debt_actions() {
		let err = InterestRateMode::None
			.require_debt_mode("interest_rate_mode")
			.unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { .. }));
		assert!(InterestRateMode::Stable
			.require_debt_mode("interest_rate_mode")
			.is_ok());
	}

	#[test]
	fn test_intent_json_tagging() {
		let json = r#"{
			"action": "repay",
			"user": "0x0000000000000000000000000000000000000001",
			"reserve": "0x0000000000000000000000000000000000000002",
			"amount": "-1",
			"interest_rate_mode": "stable"
		}"#;

		let intent: Intent = serde_json::from_str(json).unwrap();
		assert_eq!(intent.action(), "repay");
		match intent {
			Intent::Repay(repay) => {
				assert_eq!(repay.amount, "-1");
				assert_eq!(repay.interest_rate_mode, InterestRateMode::Stable);
				assert_eq!(repay.approval, ApprovalPolicy::Exact);
				assert!(!repay.use_optimized_path);
				assert!(repay.on_behalf_of.is_none());
			}
			other => panic!("unexpected intent: {:?}", other),
		}
	}
}
