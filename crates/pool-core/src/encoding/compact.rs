//! Packed `bytes32` encoding for the calldata-optimized pool.
//!
//! Each call packs its arguments into one word (two for liquidations),
//! least-significant bits first:
//!
//! | call                         | layout (bit offsets)                                            |
//! |------------------------------|-----------------------------------------------------------------|
//! | supply                       | id `[0,16)`, amount `[16,144)`, referral `[144,160)`            |
//! | supplyWithPermit             | supply + deadline `[160,192)`, v `[192,200)`                    |
//! | withdraw                     | id `[0,16)`, amount `[16,144)`                                  |
//! | borrow                       | id, amount, mode `[144,152)`, referral `[152,168)`              |
//! | repay                        | id, amount, mode `[144,152)`                                    |
//! | repayWithPermit              | repay + deadline `[152,184)`, v `[184,192)`                     |
//! | swapBorrowRateMode           | id `[0,16)`, mode `[16,24)`                                     |
//! | setUserUseReserveAsCollateral| id `[0,16)`, flag at bit 16                                     |
//! | liquidationCall              | collateral id `[0,16)`, debt id `[16,32)`, user `[32,192)`; second word: amount `[0,128)`, receive-aToken at bit 128 |
//!
//! Amounts are 128 bits wide. For withdraw, repay and liquidation the
//! maximum `u128` stands for the maximum `u256`, so the entire-balance
//! sentinel survives packing.

use super::LogicalCall;
use crate::contracts::IL2Pool;
use crate::PoolError;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolInterface};
use pool_types::{PermitSignature, ValidationError};

const AMOUNT_OFFSET: usize = 16;
const AMOUNT_BITS: usize = 128;

/// A call against the optimized pool, with reserves referred to by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactCall {
	Supply {
		asset_id: u16,
		amount: U256,
		referral_code: u16,
	},
	SupplyWithPermit {
		asset_id: u16,
		amount: U256,
		referral_code: u16,
		deadline: u64,
		signature: PermitSignature,
	},
	Withdraw {
		asset_id: u16,
		amount: U256,
	},
	Borrow {
		asset_id: u16,
		amount: U256,
		rate_mode: u8,
		referral_code: u16,
	},
	Repay {
		asset_id: u16,
		amount: U256,
		rate_mode: u8,
	},
	RepayWithPermit {
		asset_id: u16,
		amount: U256,
		rate_mode: u8,
		deadline: u64,
		signature: PermitSignature,
	},
	SwapBorrowRateMode {
		asset_id: u16,
		rate_mode: u8,
	},
	SetUserUseReserveAsCollateral {
		asset_id: u16,
		use_as_collateral: bool,
	},
	LiquidationCall {
		collateral_id: u16,
		debt_id: u16,
		user: Address,
		debt_to_cover: U256,
		receive_a_token: bool,
	},
}

impl CompactCall {
	/// Packs the first argument word.
	pub fn args(&self) -> Result<B256, ValidationError> {
		let word = match *self {
			CompactCall::Supply {
				asset_id,
				amount,
				referral_code,
			} => {
				U256::from(asset_id)
					| shifted(compact_amount(amount, false)?, AMOUNT_OFFSET)
					| shifted(referral_code, 144)
			}
			CompactCall::SupplyWithPermit {
				asset_id,
				amount,
				referral_code,
				deadline,
				signature,
			} => {
				U256::from(asset_id)
					| shifted(compact_amount(amount, false)?, AMOUNT_OFFSET)
					| shifted(referral_code, 144)
					| shifted(compact_deadline(deadline)?, 160)
					| shifted(signature.v, 192)
			}
			CompactCall::Withdraw { asset_id, amount } => {
				U256::from(asset_id) | shifted(compact_amount(amount, true)?, AMOUNT_OFFSET)
			}
			CompactCall::Borrow {
				asset_id,
				amount,
				rate_mode,
				referral_code,
			} => {
				U256::from(asset_id)
					| shifted(compact_amount(amount, false)?, AMOUNT_OFFSET)
					| shifted(rate_mode, 144)
					| shifted(referral_code, 152)
			}
			CompactCall::Repay {
				asset_id,
				amount,
				rate_mode,
			} => {
				U256::from(asset_id)
					| shifted(compact_amount(amount, true)?, AMOUNT_OFFSET)
					| shifted(rate_mode, 144)
			}
			CompactCall::RepayWithPermit {
				asset_id,
				amount,
				rate_mode,
				deadline,
				signature,
			} => {
				U256::from(asset_id)
					| shifted(compact_amount(amount, true)?, AMOUNT_OFFSET)
					| shifted(rate_mode, 144)
					| shifted(compact_deadline(deadline)?, 152)
					| shifted(signature.v, 184)
			}
			CompactCall::SwapBorrowRateMode {
				asset_id,
				rate_mode,
			} => U256::from(asset_id) | shifted(rate_mode, 16),
			CompactCall::SetUserUseReserveAsCollateral {
				asset_id,
				use_as_collateral,
			} => U256::from(asset_id) | shifted(u8::from(use_as_collateral), 16),
			CompactCall::LiquidationCall {
				collateral_id,
				debt_id,
				user,
				..
			} => {
				U256::from(collateral_id)
					| shifted(debt_id, 16)
					| (U256::from_be_slice(user.as_slice()) << 32)
			}
		};
		Ok(to_word(word))
	}

	/// Full calldata. `pre_encoded`, when given, replaces the packed first
	/// word verbatim.
	pub fn calldata(&self, pre_encoded: Option<B256>) -> Result<Bytes, ValidationError> {
		let args = match pre_encoded {
			Some(word) => word,
			None => self.args()?,
		};

		let data = match *self {
			CompactCall::Supply { .. } => IL2Pool::supplyCall { args }.abi_encode(),
			CompactCall::SupplyWithPermit { signature, .. } => IL2Pool::supplyWithPermitCall {
				args,
				r: signature.r,
				s: signature.s,
			}
			.abi_encode(),
			CompactCall::Withdraw { .. } => IL2Pool::withdrawCall { args }.abi_encode(),
			CompactCall::Borrow { .. } => IL2Pool::borrowCall { args }.abi_encode(),
			CompactCall::Repay { .. } => IL2Pool::repayCall { args }.abi_encode(),
			CompactCall::RepayWithPermit { signature, .. } => IL2Pool::repayWithPermitCall {
				args,
				r: signature.r,
				s: signature.s,
			}
			.abi_encode(),
			CompactCall::SwapBorrowRateMode { .. } => {
				IL2Pool::swapBorrowRateModeCall { args }.abi_encode()
			}
			CompactCall::SetUserUseReserveAsCollateral { .. } => {
				IL2Pool::setUserUseReserveAsCollateralCall { args }.abi_encode()
			}
			CompactCall::LiquidationCall {
				debt_to_cover,
				receive_a_token,
				..
			} => {
				let args2 = to_word(
					U256::from(compact_amount(debt_to_cover, true)?)
						| shifted(u8::from(receive_a_token), 128),
				);
				IL2Pool::liquidationCallCall { args1: args, args2 }.abi_encode()
			}
		};
		Ok(data.into())
	}

	/// Unpacks optimized-pool calldata.
	pub fn from_calldata(data: &[u8]) -> Result<Self, PoolError> {
		let call = IL2Pool::IL2PoolCalls::abi_decode(data, true)
			.map_err(|e| PoolError::Encoding(format!("undecodable compact call: {}", e)))?;

		let call = match call {
			IL2Pool::IL2PoolCalls::supply(c) => {
				let w = from_word(c.args);
				CompactCall::Supply {
					asset_id: field(w, 0, 16).to(),
					amount: expand_amount(w, false),
					referral_code: field(w, 144, 16).to(),
				}
			}
			IL2Pool::IL2PoolCalls::supplyWithPermit(c) => {
				let w = from_word(c.args);
				CompactCall::SupplyWithPermit {
					asset_id: field(w, 0, 16).to(),
					amount: expand_amount(w, false),
					referral_code: field(w, 144, 16).to(),
					deadline: field(w, 160, 32).to(),
					signature: PermitSignature {
						v: field(w, 192, 8).to(),
						r: c.r,
						s: c.s,
					},
				}
			}
			IL2Pool::IL2PoolCalls::withdraw(c) => {
				let w = from_word(c.args);
				CompactCall::Withdraw {
					asset_id: field(w, 0, 16).to(),
					amount: expand_amount(w, true),
				}
			}
			IL2Pool::IL2PoolCalls::borrow(c) => {
				let w = from_word(c.args);
				CompactCall::Borrow {
					asset_id: field(w, 0, 16).to(),
					amount: expand_amount(w, false),
					rate_mode: field(w, 144, 8).to(),
					referral_code: field(w, 152, 16).to(),
				}
			}
			IL2Pool::IL2PoolCalls::repay(c) => {
				let w = from_word(c.args);
				CompactCall::Repay {
					asset_id: field(w, 0, 16).to(),
					amount: expand_amount(w, true),
					rate_mode: field(w, 144, 8).to(),
				}
			}
			IL2Pool::IL2PoolCalls::repayWithPermit(c) => {
				let w = from_word(c.args);
				CompactCall::RepayWithPermit {
					asset_id: field(w, 0, 16).to(),
					amount: expand_amount(w, true),
					rate_mode: field(w, 144, 8).to(),
					deadline: field(w, 152, 32).to(),
					signature: PermitSignature {
						v: field(w, 184, 8).to(),
						r: c.r,
						s: c.s,
					},
				}
			}
			IL2Pool::IL2PoolCalls::swapBorrowRateMode(c) => {
				let w = from_word(c.args);
				CompactCall::SwapBorrowRateMode {
					asset_id: field(w, 0, 16).to(),
					rate_mode: field(w, 16, 8).to(),
				}
			}
			IL2Pool::IL2PoolCalls::setUserUseReserveAsCollateral(c) => {
				let w = from_word(c.args);
				CompactCall::SetUserUseReserveAsCollateral {
					asset_id: field(w, 0, 16).to(),
					use_as_collateral: !field(w, 16, 1).is_zero(),
				}
			}
			IL2Pool::IL2PoolCalls::liquidationCall(c) => {
				let w1 = from_word(c.args1);
				let w2 = from_word(c.args2);
				let user_bytes = field(w1, 32, 160).to_be_bytes::<32>();
				CompactCall::LiquidationCall {
					collateral_id: field(w1, 0, 16).to(),
					debt_id: field(w1, 16, 16).to(),
					user: Address::from_slice(&user_bytes[12..]),
					debt_to_cover: widen(field(w2, 0, AMOUNT_BITS), true),
					receive_a_token: !field(w2, 128, 1).is_zero(),
				}
			}
		};
		Ok(call)
	}
}

/// Decodes supply, withdraw, borrow and repay calls into their logical
/// fields. The optimized pool acts for `msg.sender`, so `sender` fills
/// `on_behalf_of`; `lookup` maps reserve ids back to asset addresses.
pub fn decode(
	data: &[u8],
	sender: Address,
	lookup: impl Fn(u16) -> Option<Address>,
) -> Result<LogicalCall, PoolError> {
	let (asset_id, amount, rate_mode, referral_code) = match CompactCall::from_calldata(data)? {
		CompactCall::Supply {
			asset_id,
			amount,
			referral_code,
		}
		| CompactCall::SupplyWithPermit {
			asset_id,
			amount,
			referral_code,
			..
		} => (asset_id, amount, 0, referral_code),
		CompactCall::Withdraw { asset_id, amount } => (asset_id, amount, 0, 0),
		CompactCall::Borrow {
			asset_id,
			amount,
			rate_mode,
			referral_code,
		} => (asset_id, amount, rate_mode, referral_code),
		CompactCall::Repay {
			asset_id,
			amount,
			rate_mode,
		}
		| CompactCall::RepayWithPermit {
			asset_id,
			amount,
			rate_mode,
			..
		} => (asset_id, amount, rate_mode, 0),
		other => {
			return Err(PoolError::Encoding(format!(
				"compact call {:?} has no logical form",
				other
			)))
		}
	};

	let asset = lookup(asset_id)
		.ok_or_else(|| PoolError::Encoding(format!("unknown reserve id {}", asset_id)))?;

	Ok(LogicalCall {
		asset,
		amount,
		rate_mode,
		referral_code,
		on_behalf_of: sender,
	})
}

/// Parses a caller-supplied pre-encoded argument word.
pub fn parse_pre_encoded(raw: &str) -> Result<B256, ValidationError> {
	let invalid = || {
		ValidationError::invalid("encoded_params", format!("{} is not a bytes32 hex word", raw))
	};
	let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw)).map_err(|_| invalid())?;
	if bytes.len() != 32 {
		return Err(invalid());
	}
	Ok(B256::from_slice(&bytes))
}

fn compact_amount(amount: U256, maps_max: bool) -> Result<u128, ValidationError> {
	if maps_max && amount == U256::MAX {
		return Ok(u128::MAX);
	}
	u128::try_from(amount).map_err(|_| ValidationError::AmountOverflow(amount.to_string()))
}

fn compact_deadline(deadline: u64) -> Result<u32, ValidationError> {
	u32::try_from(deadline)
		.map_err(|_| {
			ValidationError::invalid("deadline", format!("{} does not fit 32 bits", deadline))
		})
}

fn expand_amount(word: U256, maps_max: bool) -> U256 {
	widen(field(word, AMOUNT_OFFSET, AMOUNT_BITS), maps_max)
}

fn widen(amount: U256, maps_max: bool) -> U256 {
	if maps_max && amount == U256::from(u128::MAX) {
		U256::MAX
	} else {
		amount
	}
}

fn shifted(value: impl Into<u128>, offset: usize) -> U256 {
	U256::from(value.into()) << offset
}

fn field(word: U256, offset: usize, bits: usize) -> U256 {
	let mask = (U256::from(1u8) << bits) - U256::from(1u8);
	(word >> offset) & mask
}

fn to_word(value: U256) -> B256 {
	B256::from(value.to_be_bytes::<32>())
}

fn from_word(word: B256) -> U256 {
	U256::from_be_bytes(word.0)
}
