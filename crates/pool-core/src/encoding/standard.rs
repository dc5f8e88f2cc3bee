//! ABI encoding against the primary pool.

use super::LogicalCall;
use crate::contracts::IPool;
use crate::PoolError;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface};
use pool_types::{InterestRateMode, PermitSignature};

pub fn supply(asset: Address, amount: U256, on_behalf_of: Address, referral_code: u16) -> Bytes {
	IPool::supplyCall {
		asset,
		amount,
		onBehalfOf: on_behalf_of,
		referralCode: referral_code,
	}
	.abi_encode()
	.into()
}

pub fn supply_with_permit(
	asset: Address,
	amount: U256,
	on_behalf_of: Address,
	referral_code: u16,
	deadline: u64,
	signature: &PermitSignature,
) -> Bytes {
	IPool::supplyWithPermitCall {
		asset,
		amount,
		onBehalfOf: on_behalf_of,
		referralCode: referral_code,
		deadline: U256::from(deadline),
		permitV: signature.v,
		permitR: signature.r,
		permitS: signature.s,
	}
	.abi_encode()
	.into()
}

pub fn withdraw(asset: Address, amount: U256, to: Address) -> Bytes {
	IPool::withdrawCall { asset, amount, to }.abi_encode().into()
}

pub fn borrow(
	asset: Address,
	amount: U256,
	rate_mode: InterestRateMode,
	referral_code: u16,
	on_behalf_of: Address,
) -> Bytes {
	IPool::borrowCall {
		asset,
		amount,
		interestRateMode: rate_mode.as_u256(),
		referralCode: referral_code,
		onBehalfOf: on_behalf_of,
	}
	.abi_encode()
	.into()
}

pub fn repay(
	asset: Address,
	amount: U256,
	rate_mode: InterestRateMode,
	on_behalf_of: Address,
) -> Bytes {
	IPool::repayCall {
		asset,
		amount,
		interestRateMode: rate_mode.as_u256(),
		onBehalfOf: on_behalf_of,
	}
	.abi_encode()
	.into()
}

pub fn repay_with_permit(
	asset: Address,
	amount: U256,
	rate_mode: InterestRateMode,
	on_behalf_of: Address,
	deadline: u64,
	signature: &PermitSignature,
) -> Bytes {
	IPool::repayWithPermitCall {
		asset,
		amount,
		interestRateMode: rate_mode.as_u256(),
		onBehalfOf: on_behalf_of,
		deadline: U256::from(deadline),
		permitV: signature.v,
		permitR: signature.r,
		permitS: signature.s,
	}
	.abi_encode()
	.into()
}

pub fn swap_borrow_rate_mode(asset: Address, rate_mode: InterestRateMode) -> Bytes {
	IPool::swapBorrowRateModeCall {
		asset,
		interestRateMode: rate_mode.as_u256(),
	}
	.abi_encode()
	.into()
}

pub fn set_usage_as_collateral(asset: Address, use_as_collateral: bool) -> Bytes {
	IPool::setUserUseReserveAsCollateralCall {
		asset,
		useAsCollateral: use_as_collateral,
	}
	.abi_encode()
	.into()
}

pub fn liquidation_call(
	collateral_asset: Address,
	debt_asset: Address,
	user: Address,
	debt_to_cover: U256,
	receive_a_token: bool,
) -> Bytes {
	IPool::liquidationCallCall {
		collateralAsset: collateral_asset,
		debtAsset: debt_asset,
		user,
		debtToCover: debt_to_cover,
		receiveAToken: receive_a_token,
	}
	.abi_encode()
	.into()
}

/// Single-asset flash loan with no debt opened (mode 0).
pub fn flash_loan(
	receiver: Address,
	asset: Address,
	amount: U256,
	on_behalf_of: Address,
	params: Bytes,
	referral_code: u16,
) -> Bytes {
	IPool::flashLoanCall {
		receiverAddress: receiver,
		assets: vec![asset],
		amounts: vec![amount],
		interestRateModes: vec![U256::ZERO],
		onBehalfOf: on_behalf_of,
		params,
		referralCode: referral_code,
	}
	.abi_encode()
	.into()
}

pub fn set_user_e_mode(category_id: u8) -> Bytes {
	IPool::setUserEModeCall {
		categoryId: category_id,
	}
	.abi_encode()
	.into()
}

/// Decodes supply, withdraw, borrow and repay calls (and their permit
/// variants) back into their logical fields. For `withdraw` the recipient
/// fills `on_behalf_of`.
pub fn decode(data: &[u8]) -> Result<LogicalCall, PoolError> {
	let call = IPool::IPoolCalls::abi_decode(data, true)
		.map_err(|e| PoolError::Encoding(format!("undecodable pool call: {}", e)))?;

	let logical = match call {
		IPool::IPoolCalls::supply(c) => LogicalCall {
			asset: c.asset,
			amount: c.amount,
			rate_mode: 0,
			referral_code: c.referralCode,
			on_behalf_of: c.onBehalfOf,
		},
		IPool::IPoolCalls::supplyWithPermit(c) => LogicalCall {
			asset: c.asset,
			amount: c.amount,
			rate_mode: 0,
			referral_code: c.referralCode,
			on_behalf_of: c.onBehalfOf,
		},
		IPool::IPoolCalls::withdraw(c) => LogicalCall {
			asset: c.asset,
			amount: c.amount,
			rate_mode: 0,
			referral_code: 0,
			on_behalf_of: c.to,
		},
		IPool::IPoolCalls::borrow(c) => LogicalCall {
			asset: c.asset,
			amount: c.amount,
			rate_mode: rate_mode_u8(c.interestRateMode)?,
			referral_code: c.referralCode,
			on_behalf_of: c.onBehalfOf,
		},
		IPool::IPoolCalls::repay(c) => LogicalCall {
			asset: c.asset,
			amount: c.amount,
			rate_mode: rate_mode_u8(c.interestRateMode)?,
			referral_code: 0,
			on_behalf_of: c.onBehalfOf,
		},
		IPool::IPoolCalls::repayWithPermit(c) => LogicalCall {
			asset: c.asset,
			amount: c.amount,
			rate_mode: rate_mode_u8(c.interestRateMode)?,
			referral_code: 0,
			on_behalf_of: c.onBehalfOf,
		},
		other => {
			return Err(PoolError::Encoding(format!(
				"call with selector 0x{} has no logical form",
				hex::encode(other.selector())
			)))
		}
	};
	Ok(logical)
}

fn rate_mode_u8(mode: U256) -> Result<u8, PoolError> {
	u8::try_from(mode).map_err(|_| PoolError::Encoding(format!("rate mode {} out of range", mode)))
}
