//! Calldata-optimized execution path.

use crate::encoding::compact::CompactCall;
use crate::gas::{CallSpec, DescriptorFactory, ProtocolAction};
use crate::PoolError;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use pool_types::{InterestRateMode, PermitSignature, ReserveIndex, TransactionDescriptor};
use std::sync::Arc;
use tracing::debug;

/// A pool action addressed by asset, before reserve ids are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactAction {
	Supply {
		asset: Address,
		amount: U256,
		referral_code: u16,
	},
	SupplyWithPermit {
		asset: Address,
		amount: U256,
		referral_code: u16,
		deadline: u64,
		signature: PermitSignature,
	},
	Withdraw {
		asset: Address,
		amount: U256,
	},
	Borrow {
		asset: Address,
		amount: U256,
		rate_mode: InterestRateMode,
		referral_code: u16,
	},
	Repay {
		asset: Address,
		amount: U256,
		rate_mode: InterestRateMode,
	},
	RepayWithPermit {
		asset: Address,
		amount: U256,
		rate_mode: InterestRateMode,
		deadline: u64,
		signature: PermitSignature,
	},
	SwapBorrowRateMode {
		asset: Address,
		rate_mode: InterestRateMode,
	},
	SetUsageAsCollateral {
		asset: Address,
		use_as_collateral: bool,
	},
	LiquidationCall {
		collateral_asset: Address,
		debt_asset: Address,
		user: Address,
		debt_to_cover: U256,
		receive_a_token: bool,
	},
}

impl CompactAction {
	fn protocol_action(&self) -> ProtocolAction {
		match self {
			CompactAction::Supply { .. } | CompactAction::SupplyWithPermit { .. } => {
				ProtocolAction::Supply
			}
			CompactAction::Withdraw { .. } => ProtocolAction::Withdraw,
			CompactAction::Borrow { .. } => ProtocolAction::Borrow,
			CompactAction::Repay { .. } | CompactAction::RepayWithPermit { .. } => {
				ProtocolAction::Repay
			}
			CompactAction::SwapBorrowRateMode { .. } => ProtocolAction::SwapBorrowRateMode,
			CompactAction::SetUsageAsCollateral { .. } => ProtocolAction::SetUsageAsCollateral,
			CompactAction::LiquidationCall { .. } => ProtocolAction::LiquidationCall,
		}
	}
}

/// Executes pool actions on the optimized path. The caller acts for
/// itself: there is no `on_behalf_of`.
#[async_trait]
pub trait OptimizedPathService: Send + Sync {
	/// `pre_encoded` replaces the packed argument word verbatim.
	async fn execute(
		&self,
		user: Address,
		action: CompactAction,
		pre_encoded: Option<B256>,
	) -> Result<Vec<TransactionDescriptor>, PoolError>;
}

/// Optimized path backed by a deployed compact-calldata pool.
pub struct CompactPoolService {
	pool: Address,
	reserves: Arc<dyn ReserveIndex>,
	descriptors: DescriptorFactory,
}

impl CompactPoolService {
	pub fn new(
		pool: Address,
		reserves: Arc<dyn ReserveIndex>,
		descriptors: DescriptorFactory,
	) -> Self {
		Self {
			pool,
			reserves,
			descriptors,
		}
	}

	async fn reserve_id(&self, asset: Address, pre_encoded: bool) -> Result<u16, PoolError> {
		// A pre-encoded word already carries the id.
		if pre_encoded {
			return Ok(0);
		}
		Ok(self.reserves.reserve_id(asset).await?)
	}

	async fn to_compact(
		&self,
		action: CompactAction,
		pre_encoded: bool,
	) -> Result<CompactCall, PoolError> {
		let call = match action {
			CompactAction::Supply {
				asset,
				amount,
				referral_code,
			} => CompactCall::Supply {
				asset_id: self.reserve_id(asset, pre_encoded).await?,
				amount,
				referral_code,
			},
			CompactAction::SupplyWithPermit {
				asset,
				amount,
				referral_code,
				deadline,
				signature,
			} => CompactCall::SupplyWithPermit {
				asset_id: self.reserve_id(asset, pre_encoded).await?,
				amount,
				referral_code,
				deadline,
				signature,
			},
			CompactAction::Withdraw { asset, amount } => CompactCall::Withdraw {
				asset_id: self.reserve_id(asset, pre_encoded).await?,
				amount,
			},
			CompactAction::Borrow {
				asset,
				amount,
				rate_mode,
				referral_code,
			} => CompactCall::Borrow {
				asset_id: self.reserve_id(asset, pre_encoded).await?,
				amount,
				rate_mode: rate_mode.as_u8(),
				referral_code,
			},
			CompactAction::Repay {
				asset,
				amount,
				rate_mode,
			} => CompactCall::Repay {
				asset_id: self.reserve_id(asset, pre_encoded).await?,
				amount,
				rate_mode: rate_mode.as_u8(),
			},
			CompactAction::RepayWithPermit {
				asset,
				amount,
				rate_mode,
				deadline,
				signature,
			} => CompactCall::RepayWithPermit {
				asset_id: self.reserve_id(asset, pre_encoded).await?,
				amount,
				rate_mode: rate_mode.as_u8(),
				deadline,
				signature,
			},
			CompactAction::SwapBorrowRateMode { asset, rate_mode } => {
				CompactCall::SwapBorrowRateMode {
					asset_id: self.reserve_id(asset, pre_encoded).await?,
					rate_mode: rate_mode.as_u8(),
				}
			}
			CompactAction::SetUsageAsCollateral {
				asset,
				use_as_collateral,
			} => CompactCall::SetUserUseReserveAsCollateral {
				asset_id: self.reserve_id(asset, pre_encoded).await?,
				use_as_collateral,
			},
			CompactAction::LiquidationCall {
				collateral_asset,
				debt_asset,
				user,
				debt_to_cover,
				receive_a_token,
			} => CompactCall::LiquidationCall {
				collateral_id: self.reserve_id(collateral_asset, pre_encoded).await?,
				debt_id: self.reserve_id(debt_asset, pre_encoded).await?,
				user,
				debt_to_cover,
				receive_a_token,
			},
		};
		Ok(call)
	}
}

#[async_trait]
impl OptimizedPathService for CompactPoolService {
	async fn execute(
		&self,
		user: Address,
		action: CompactAction,
		pre_encoded: Option<B256>,
	) -> Result<Vec<TransactionDescriptor>, PoolError> {
		let call = self.to_compact(action, pre_encoded.is_some()).await?;
		let data = call.calldata(pre_encoded)?;

		debug!(
			user = %user,
			pool = %self.pool,
			pre_encoded = pre_encoded.is_some(),
			"Compact call encoded"
		);
		Ok(vec![self.descriptors.action(CallSpec::new(
			user,
			self.pool,
			data,
			action.protocol_action(),
		))])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contracts::IL2Pool;
	use crate::encoding::compact;
	use crate::gas::GasLimits;
	use crate::test_utils::MockChain;
	use alloy_primitives::address;
	use alloy_sol_types::SolCall;

	const L2_POOL: Address = address!("794a61358D6845594F94dc1DB02A252b5b4814aD");
	const USDC: Address = address!("af88d065e77c8cC2239327C5EDb3A432268e5831");
	const USER: Address = address!("00000000000000000000000000000000000000a1");

	fn service(chain: &Arc<MockChain>) -> CompactPoolService {
		CompactPoolService::new(
			L2_POOL,
			chain.clone(),
			DescriptorFactory::new(chain.clone(), GasLimits::default()),
		)
	}

	#[tokio::test]
	async fn test_execute_packs_reserve_id() {
		let chain = Arc::new(MockChain::new().with_reserve(USDC, 12));
		let txs = service(&chain)
			.execute(
				USER,
				CompactAction::Borrow {
					asset: USDC,
					amount: U256::from(250u64),
					rate_mode: InterestRateMode::Variable,
					referral_code: 0,
				},
				None,
			)
			.await
			.unwrap();

		assert_eq!(txs.len(), 1);
		let tx = txs[0].transaction().await.unwrap();
		assert_eq!(tx.to, L2_POOL);
		assert_eq!(tx.from, USER);
		assert_eq!(tx.gas_limit, Some(450_000));

		let logical = compact::decode(&tx.data, USER, |id| (id == 12).then_some(USDC)).unwrap();
		assert_eq!(logical.asset, USDC);
		assert_eq!(logical.amount, U256::from(250u64));
		assert_eq!(logical.rate_mode, 2);
	}

	#[tokio::test]
	async fn test_pre_encoded_word_bypasses_reserve_lookup() {
		// no reserve registered: a lookup would fail
		let chain = Arc::new(MockChain::new());
		let word = B256::repeat_byte(0x42);
		let txs = service(&chain)
			.execute(
				USER,
				CompactAction::Supply {
					asset: USDC,
					amount: U256::from(1u8),
					referral_code: 0,
				},
				Some(word),
			)
			.await
			.unwrap();

		let tx = txs[0].transaction().await.unwrap();
		assert_eq!(IL2Pool::supplyCall::abi_decode(&tx.data, true).unwrap().args, word);
	}

	#[tokio::test]
	async fn test_unknown_reserve_propagates() {
		let chain = Arc::new(MockChain::new());
		let err = service(&chain)
			.execute(
				USER,
				CompactAction::Withdraw {
					asset: USDC,
					amount: U256::MAX,
				},
				None,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, PoolError::Service(_)));
	}
}
