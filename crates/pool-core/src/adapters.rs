//! Encoders for the flash-loan adapters.
//!
//! The adapters receive their instructions as an opaque `params` blob,
//! either inside a pool `flashLoan` call or as arguments to a direct
//! swap-and-deposit / swap-and-repay call.

use crate::contracts::{ILiquiditySwapAdapter, IRepayAdapter, PermitSignature as AdapterPermit};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use pool_types::{PermitSignature, ValidationError};

/// Offset of the amount argument inside aggregator calldata, keyed by the
/// aggregator function selector. The adapter overwrites the word at this
/// offset with its full balance when the whole position is swapped.
const SELL_OFFSETS: &[([u8; 4], u64)] = &[
	([0x58, 0xb9, 0xd1, 0x79], 4),
	([0x54, 0x84, 0x0d, 0x1a], 4),
	([0x0b, 0x86, 0xa4, 0xc1], 36),
	([0x08, 0x63, 0xb7, 0xac], 68),
	([0x8f, 0x00, 0xec, 0xcb], 68),
	([0xec, 0x1d, 0x21, 0xdd], 68),
	([0xf5, 0x66, 0x10, 0x34], 68),
	([0x64, 0x46, 0x68, 0x05], 68),
	([0xa9, 0x4e, 0x78, 0xef], 68),
	([0x46, 0xc6, 0x7b, 0x6d], 68),
	([0xa6, 0x88, 0x6d, 0xa9], 68),
	([0x98, 0x7e, 0x7d, 0x8e], 68),
	([0x38, 0x65, 0xbd, 0xe6], 68),
	([0x58, 0xf1, 0x51, 0x00], 68),
	([0x9d, 0x4b, 0xf5, 0xde], 68),
	([0xda, 0x85, 0x67, 0xc8], 100),
];

const BUY_OFFSETS: &[([u8; 4], u64)] = &[
	([0x93, 0x5f, 0xb8, 0x4b], 36),
	([0xb2, 0xf1, 0xe6, 0xdb], 68),
	([0x87, 0xa6, 0x39, 0x26], 68),
	([0xc0, 0x37, 0x86, 0xb0], 100),
	([0xb6, 0x6b, 0xcb, 0xac], 164),
	([0x35, 0x32, 0x69, 0x10], 164),
];

/// Offset of the sell amount, or zero when a fixed amount is swapped.
pub fn swap_all_offset(calldata: &[u8], swap_all: bool) -> Result<U256, ValidationError> {
	if !swap_all {
		return Ok(U256::ZERO);
	}
	lookup_offset(SELL_OFFSETS, calldata)
}

/// Offset of the buy amount, or zero when a fixed debt amount is repaid.
pub fn buy_all_offset(calldata: &[u8], repay_all: bool) -> Result<U256, ValidationError> {
	if !repay_all {
		return Ok(U256::ZERO);
	}
	lookup_offset(BUY_OFFSETS, calldata)
}

fn lookup_offset(table: &[([u8; 4], u64)], calldata: &[u8]) -> Result<U256, ValidationError> {
	let selector = calldata
		.get(..4)
		.ok_or_else(|| ValidationError::invalid("swap_calldata", "shorter than a selector"))?;
	table
		.iter()
		.find(|(known, _)| known.as_slice() == selector)
		.map(|(_, offset)| U256::from(*offset))
		.ok_or_else(|| {
			ValidationError::invalid(
				"swap_calldata",
				format!("unsupported aggregator selector 0x{}", hex::encode(selector)),
			)
		})
}

/// A permit forwarded to an adapter, or the all-zero struct when unused.
pub fn adapter_permit(permit: Option<(U256, u64, &PermitSignature)>) -> AdapterPermit {
	match permit {
		Some((amount, deadline, signature)) => AdapterPermit {
			amount,
			deadline: U256::from(deadline),
			v: signature.v,
			r: signature.r,
			s: signature.s,
		},
		None => AdapterPermit::default(),
	}
}

/// Arguments shared by the collateral-swap encoders.
#[derive(Debug, Clone)]
pub struct CollateralSwap {
	pub from_asset: Address,
	pub to_asset: Address,
	pub amount: U256,
	pub min_to_amount: U256,
	pub swap_all_offset: U256,
	pub swap_calldata: Bytes,
	pub augustus: Address,
	pub permit: AdapterPermit,
}

impl CollateralSwap {
	/// `params` for a flash loan routed to the swap adapter.
	pub fn flash_params(&self) -> Bytes {
		(
			self.to_asset,
			self.min_to_amount,
			self.swap_all_offset,
			self.swap_calldata.clone(),
			self.augustus,
			self.permit.clone(),
		)
			.abi_encode_params()
			.into()
	}

	/// Direct `swapAndDeposit` without a flash loan.
	pub fn direct_call(&self) -> Bytes {
		ILiquiditySwapAdapter::swapAndDepositCall {
			assetToSwapFrom: self.from_asset,
			assetToSwapTo: self.to_asset,
			amountToSwap: self.amount,
			minAmountToReceive: self.min_to_amount,
			swapAllBalanceOffset: self.swap_all_offset,
			swapCalldata: self.swap_calldata.clone(),
			augustus: self.augustus,
			permitParams: self.permit.clone(),
		}
		.abi_encode()
		.into()
	}
}

/// Arguments shared by the repay-with-collateral encoders.
#[derive(Debug, Clone)]
pub struct CollateralRepay {
	pub collateral_asset: Address,
	pub debt_asset: Address,
	pub collateral_amount: U256,
	pub debt_amount: U256,
	pub rate_mode: U256,
	pub buy_all_offset: U256,
	pub swap_calldata: Bytes,
	pub augustus: Address,
	pub permit: AdapterPermit,
}

impl CollateralRepay {
	fn paraswap_data(&self) -> Bytes {
		(self.swap_calldata.clone(), self.augustus)
			.abi_encode_params()
			.into()
	}

	/// `params` for a flash loan of the collateral asset routed to the
	/// repay adapter. The loaned amount itself travels in `amounts[0]`.
	pub fn flash_params(&self) -> Bytes {
		(
			self.debt_asset,
			self.debt_amount,
			self.buy_all_offset,
			self.rate_mode,
			self.paraswap_data(),
			self.permit.clone(),
		)
			.abi_encode_params()
			.into()
	}

	/// Direct `swapAndRepay` without a flash loan.
	pub fn direct_call(&self) -> Bytes {
		IRepayAdapter::swapAndRepayCall {
			collateralAsset: self.collateral_asset,
			debtAsset: self.debt_asset,
			collateralAmount: self.collateral_amount,
			debtRepayAmount: self.debt_amount,
			debtRateMode: self.rate_mode,
			buyAllBalanceOffset: self.buy_all_offset,
			paraswapData: self.paraswap_data(),
			permitSignature: self.permit.clone(),
		}
		.abi_encode()
		.into()
	}
}

/// `params` for a flash loan routed to the liquidation adapter.
///
/// `debt_to_cover` is the maximum integer when the whole position is
/// liquidated.
pub fn flash_liquidation_params(
	collateral_asset: Address,
	borrowed_asset: Address,
	user: Address,
	debt_to_cover: U256,
	use_eth_path: bool,
) -> Bytes {
	(
		collateral_asset,
		borrowed_asset,
		user,
		debt_to_cover,
		use_eth_path,
	)
		.abi_encode_params()
		.into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, B256};

	const AUGUSTUS: Address = address!("DEF171Fe48CF0115B1d80b88dc8eAB59176FEe57");
	const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
	const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

	fn calldata(selector: [u8; 4]) -> Vec<u8> {
		let mut data = selector.to_vec();
		data.extend_from_slice(&[0u8; 64]);
		data
	}

	#[test]
	fn test_offsets_by_selector() {
		let simple_swap = calldata([0xa9, 0x4e, 0x78, 0xef]);
		assert_eq!(swap_all_offset(&simple_swap, true).unwrap(), U256::from(68u8));
		assert_eq!(swap_all_offset(&simple_swap, false).unwrap(), U256::ZERO);

		let simple_buy = calldata([0x35, 0x32, 0x69, 0x10]);
		assert_eq!(buy_all_offset(&simple_buy, true).unwrap(), U256::from(164u8));

		// a sell selector is not a buy selector
		assert!(buy_all_offset(&simple_swap, true).is_err());
	}

	#[test]
	fn test_unknown_or_short_calldata_rejected() {
		for data in [vec![0xff, 0xff, 0xff, 0xff], vec![0x01]] {
			assert!(matches!(
				swap_all_offset(&data, true),
				Err(ValidationError::InvalidValue { .. })
			));
		}
		// offsets are not consulted for fixed amounts
		assert_eq!(swap_all_offset(&[0x01], false).unwrap(), U256::ZERO);
	}

	#[test]
	fn test_swap_flash_params_decode() {
		let swap = CollateralSwap {
			from_asset: WETH,
			to_asset: DAI,
			amount: U256::from(105u64),
			min_to_amount: U256::from(90u64),
			swap_all_offset: U256::from(68u8),
			swap_calldata: Bytes::from(calldata([0xa9, 0x4e, 0x78, 0xef])),
			augustus: AUGUSTUS,
			permit: AdapterPermit::default(),
		};

		type Params = (Address, U256, U256, Bytes, Address, AdapterPermit);
		let decoded = Params::abi_decode_params(&swap.flash_params(), true).unwrap();
		assert_eq!(decoded.0, DAI);
		assert_eq!(decoded.1, U256::from(90u64));
		assert_eq!(decoded.2, U256::from(68u8));
		assert_eq!(decoded.3, swap.swap_calldata);
		assert_eq!(decoded.4, AUGUSTUS);
		assert_eq!(decoded.5, AdapterPermit::default());

		let call =
			ILiquiditySwapAdapter::swapAndDepositCall::abi_decode(&swap.direct_call(), true)
				.unwrap();
		assert_eq!(call.amountToSwap, U256::from(105u64));
		assert_eq!(call.minAmountToReceive, U256::from(90u64));
	}

	#[test]
	fn test_repay_params_nest_aggregator_data() {
		let signature = PermitSignature {
			v: 27,
			r: B256::repeat_byte(1),
			s: B256::repeat_byte(2),
		};
		let repay = CollateralRepay {
			collateral_asset: WETH,
			debt_asset: DAI,
			collateral_amount: U256::from(10u8),
			debt_amount: U256::from(20u8),
			rate_mode: U256::from(2u8),
			buy_all_offset: U256::ZERO,
			swap_calldata: Bytes::from(vec![0xb2, 0xf1, 0xe6, 0xdb]),
			augustus: AUGUSTUS,
			permit: adapter_permit(Some((U256::from(10u8), 99, &signature))),
		};

		type Params = (Address, U256, U256, U256, Bytes, AdapterPermit);
		let decoded = Params::abi_decode_params(&repay.flash_params(), true).unwrap();
		assert_eq!(decoded.0, DAI);
		assert_eq!(decoded.1, U256::from(20u8));
		assert_eq!(decoded.2, U256::ZERO);
		assert_eq!(decoded.3, U256::from(2u8));
		let (inner, augustus) =
			<(Bytes, Address)>::abi_decode_params(&decoded.4, true).unwrap();
		assert_eq!(inner, repay.swap_calldata);
		assert_eq!(augustus, AUGUSTUS);
		assert_eq!(decoded.5.v, 27);
		assert_eq!(decoded.5.deadline, U256::from(99u8));
	}

	#[test]
	fn test_flash_liquidation_params() {
		let user = Address::repeat_byte(0x33);
		let data = flash_liquidation_params(WETH, DAI, user, U256::MAX, true);
		let decoded =
			<(Address, Address, Address, U256, bool)>::abi_decode_params(&data, true).unwrap();
		assert_eq!(decoded, (WETH, DAI, user, U256::MAX, true));
	}
}
