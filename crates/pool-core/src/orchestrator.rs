//! The action orchestrator.
//!
//! Turns a caller intent into an ordered list of deferred transaction
//! descriptors. Every operation follows the same sequence:
//!
//! 1. validate addresses and parse amounts (errors abort here);
//! 2. select a branch: native gateway, flash adapter, optimized path, or the
//!    standard pool;
//! 3. look up the contracts the branch needs, returning an empty list when
//!    any of them is not configured;
//! 4. read decimals and allowances, then encode.
//!
//! Approvals are always placed before the action they unblock.

use crate::adapters::{self, CollateralRepay, CollateralSwap};
use crate::amount::{
	parse_amount, parse_decimal, to_amount, to_base_units, AmountRule, HumanAmount, ParsedAmount,
};
use crate::approval::ApprovalGate;
use crate::cache::CachedTokenService;
use crate::contracts::PermitSignature as AdapterPermit;
use crate::encoding::{compact, standard};
use crate::gas::{CallSpec, DescriptorFactory, GasLimits, ProtocolAction};
use crate::gateway::{NativeGatewayService, WrappedTokenGatewayService};
use crate::optimized::{CompactAction, CompactPoolService, OptimizedPathService};
use crate::permit::{split_signature, PermitAssembler, PermitRequest};
use crate::surplus::with_surplus;
use crate::validation::AddressValidator;
use crate::{PoolError, NATIVE_CURRENCY};
use alloy_primitives::{Address, Bytes, B256, U256};
use pool_cache::CacheService;
use pool_config::{Config, ContractsConfig};
use pool_types::{
	Amount, AmountUnits, ApprovalPolicy, BorrowIntent, FlashLiquidationIntent, Intent,
	LiquidationCallIntent, NameResolver, NetworkService, NonceService, PermitAuthorization,
	PermitSignature, RepayIntent, RepayWithCollateralIntent, RepayWithPermitIntent, ReserveIndex,
	SetUsageAsCollateralIntent, SetUserEModeIntent, SignApprovalIntent, SupplyIntent,
	SupplyWithPermitIntent, SwapBorrowRateModeIntent, SwapCollateralIntent, TokenService,
	TransactionDescriptor, ValidationError, WithdrawIntent,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const NATIVE_DECIMALS: u8 = 18;

type Descriptors = Result<Vec<TransactionDescriptor>, PoolError>;

/// Builds transaction descriptors for lending-pool intents.
///
/// Stateless apart from its read-only collaborators, so one instance can
/// serve concurrent calls.
pub struct Orchestrator {
	contracts: ContractsConfig,
	surplus_percent: Decimal,
	flash_premium_bps: u32,
	addresses: AddressValidator,
	tokens: Arc<dyn TokenService>,
	approvals: ApprovalGate,
	permits: PermitAssembler,
	descriptors: DescriptorFactory,
	gateway: Option<Arc<dyn NativeGatewayService>>,
	optimized: Option<Arc<dyn OptimizedPathService>>,
}

impl Orchestrator {
	/// Dispatches a tagged intent to its operation.
	pub async fn execute(&self, intent: &Intent) -> Descriptors {
		info!(action = intent.action(), "Building transactions");
		match intent {
			Intent::Supply(i) => self.supply(i).await,
			Intent::SupplyWithPermit(i) => self.supply_with_permit(i).await,
			Intent::Withdraw(i) => self.withdraw(i).await,
			Intent::Borrow(i) => self.borrow(i).await,
			Intent::Repay(i) => self.repay(i).await,
			Intent::RepayWithPermit(i) => self.repay_with_permit(i).await,
			Intent::SwapCollateral(i) => self.swap_collateral(i).await,
			Intent::RepayWithCollateral(i) => self.repay_with_collateral(i).await,
			Intent::LiquidationCall(i) => self.liquidation_call(i).await,
			Intent::FlashLiquidation(i) => self.flash_liquidation(i).await,
			Intent::SetUsageAsCollateral(i) => self.set_usage_as_collateral(i).await,
			Intent::SetUserEMode(i) => self.set_user_e_mode(i).await,
			Intent::SwapBorrowRateMode(i) => self.swap_borrow_rate_mode(i).await,
		}
	}

	pub async fn supply(&self, intent: &SupplyIntent) -> Descriptors {
		const OP: &str = "supply";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let on_behalf_of = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let amount = parse_decimal(&intent.amount)?;
		let pre_encoded = parse_pre_encoded(intent.encoded_params.as_deref())?;

		if reserve == NATIVE_CURRENCY {
			let Some(gateway) = self.gateway(OP) else {
				return Ok(Vec::new());
			};
			let value = to_base_units(&amount, NATIVE_DECIMALS)?.value();
			return gateway
				.supply(user, value, on_behalf_of, intent.referral_code)
				.await;
		}

		if intent.use_optimized_path {
			require_self(user, on_behalf_of)?;
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let amount = self.base_units(reserve, &amount).await?.value();
			let action = CompactAction::Supply {
				asset: reserve,
				amount,
				referral_code: intent.referral_code,
			};
			return optimized.execute(user, action, pre_encoded).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let amount = Amount::Exact(self.base_units(reserve, &amount).await?);

		let mut txs = Vec::new();
		txs.extend(
			self.approvals
				.gate(user, reserve, pool, &amount, intent.approval)
				.await?,
		);
		let data = standard::supply(reserve, amount.value(), on_behalf_of, intent.referral_code);
		txs.push(self.pool_action(user, pool, data, ProtocolAction::Supply));
		Ok(txs)
	}

	pub async fn supply_with_permit(&self, intent: &SupplyWithPermitIntent) -> Descriptors {
		const OP: &str = "supply_with_permit";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let on_behalf_of = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let amount = parse_decimal(&intent.amount)?;
		let signature = split_signature(&intent.permit.signature)?;
		let pre_encoded = parse_pre_encoded(intent.encoded_params.as_deref())?;
		reject_native("reserve", reserve)?;
		if intent.use_optimized_path {
			require_self(user, on_behalf_of)?;
		}

		if intent.use_optimized_path {
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let amount = Amount::Exact(self.base_units(reserve, &amount).await?);
			self.check_permit_value(&intent.permit, reserve, &amount).await?;
			let action = CompactAction::SupplyWithPermit {
				asset: reserve,
				amount: amount.value(),
				referral_code: intent.referral_code,
				deadline: intent.permit.deadline,
				signature,
			};
			return optimized.execute(user, action, pre_encoded).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let amount = Amount::Exact(self.base_units(reserve, &amount).await?);
		self.check_permit_value(&intent.permit, reserve, &amount).await?;

		debug!(user = %user, reserve = %reserve, "Permit supplied, skipping approval");
		let data = standard::supply_with_permit(
			reserve,
			amount.value(),
			on_behalf_of,
			intent.referral_code,
			intent.permit.deadline,
			&signature,
		);
		Ok(vec![self.pool_action(user, pool, data, ProtocolAction::Supply)])
	}

	pub async fn withdraw(&self, intent: &WithdrawIntent) -> Descriptors {
		const OP: &str = "withdraw";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let to = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let amount = parse_amount(&intent.amount, AmountRule::PositiveOrEntireBalance)?;
		let pre_encoded = parse_pre_encoded(intent.encoded_params.as_deref())?;

		if reserve == NATIVE_CURRENCY {
			let a_token = intent
				.a_token
				.as_deref()
				.ok_or_else(|| ValidationError::MissingField("a_token".into()))?;
			let a_token = self.addresses.validate(a_token).await?;
			let Some(gateway) = self.gateway(OP) else {
				return Ok(Vec::new());
			};
			let amount = native_amount(&amount)?;
			return gateway.withdraw(user, amount, to, a_token).await;
		}

		if intent.use_optimized_path {
			require_self(user, to)?;
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let amount = self.amount(reserve, &amount).await?;
			let action = CompactAction::Withdraw {
				asset: reserve,
				amount: amount.value(),
			};
			return optimized.execute(user, action, pre_encoded).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let amount = self.amount(reserve, &amount).await?;
		let data = standard::withdraw(reserve, amount.value(), to);
		Ok(vec![self.pool_action(user, pool, data, ProtocolAction::Withdraw)])
	}

	pub async fn borrow(&self, intent: &BorrowIntent) -> Descriptors {
		const OP: &str = "borrow";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let on_behalf_of = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let amount = parse_decimal(&intent.amount)?;
		let rate_mode = intent
			.interest_rate_mode
			.require_debt_mode("interest_rate_mode")?;
		let pre_encoded = parse_pre_encoded(intent.encoded_params.as_deref())?;

		if reserve == NATIVE_CURRENCY {
			let debt_token = intent
				.debt_token
				.as_deref()
				.ok_or_else(|| ValidationError::MissingField("debt_token".into()))?;
			let debt_token = self.addresses.validate(debt_token).await?;
			// the gateway always borrows for the caller
			require_self(user, on_behalf_of)?;
			let Some(gateway) = self.gateway(OP) else {
				return Ok(Vec::new());
			};
			let value = to_base_units(&amount, NATIVE_DECIMALS)?.value();
			return gateway
				.borrow(user, value, rate_mode, intent.referral_code, debt_token)
				.await;
		}

		if intent.use_optimized_path {
			require_self(user, on_behalf_of)?;
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let amount = self.base_units(reserve, &amount).await?.value();
			let action = CompactAction::Borrow {
				asset: reserve,
				amount,
				rate_mode,
				referral_code: intent.referral_code,
			};
			return optimized.execute(user, action, pre_encoded).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let amount = self.base_units(reserve, &amount).await?.value();
		let data = standard::borrow(reserve, amount, rate_mode, intent.referral_code, on_behalf_of);
		Ok(vec![self.pool_action(user, pool, data, ProtocolAction::Borrow)])
	}

	pub async fn repay(&self, intent: &RepayIntent) -> Descriptors {
		const OP: &str = "repay";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let on_behalf_of = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let amount = parse_amount(&intent.amount, AmountRule::PositiveOrEntireBalance)?;
		let rate_mode = intent
			.interest_rate_mode
			.require_debt_mode("interest_rate_mode")?;
		let pre_encoded = parse_pre_encoded(intent.encoded_params.as_deref())?;

		if reserve == NATIVE_CURRENCY {
			let ParsedAmount::Value(amount) = amount else {
				return Err(ValidationError::invalid(
					"amount",
					"native repayments must name an exact amount",
				)
				.into());
			};
			let Some(gateway) = self.gateway(OP) else {
				return Ok(Vec::new());
			};
			let value = to_base_units(&amount, NATIVE_DECIMALS)?.value();
			return gateway.repay(user, value, rate_mode, on_behalf_of).await;
		}

		if intent.use_optimized_path {
			require_self(user, on_behalf_of)?;
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let amount = self.amount(reserve, &amount).await?;
			let action = CompactAction::Repay {
				asset: reserve,
				amount: amount.value(),
				rate_mode,
			};
			return optimized.execute(user, action, pre_encoded).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let amount = self.amount(reserve, &amount).await?;

		let mut txs = Vec::new();
		txs.extend(
			self.approvals
				.gate(user, reserve, pool, &amount, intent.approval)
				.await?,
		);
		let data = standard::repay(reserve, amount.value(), rate_mode, on_behalf_of);
		txs.push(self.pool_action(user, pool, data, ProtocolAction::Repay));
		Ok(txs)
	}

	pub async fn repay_with_permit(&self, intent: &RepayWithPermitIntent) -> Descriptors {
		const OP: &str = "repay_with_permit";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let on_behalf_of = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let amount = parse_amount(&intent.amount, AmountRule::PositiveOrEntireBalance)?;
		let rate_mode = intent
			.interest_rate_mode
			.require_debt_mode("interest_rate_mode")?;
		let signature = split_signature(&intent.permit.signature)?;
		let pre_encoded = parse_pre_encoded(intent.encoded_params.as_deref())?;
		reject_native("reserve", reserve)?;
		if intent.use_optimized_path {
			require_self(user, on_behalf_of)?;
		}

		if intent.use_optimized_path {
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let amount = self.amount(reserve, &amount).await?;
			self.check_permit_value(&intent.permit, reserve, &amount).await?;
			let action = CompactAction::RepayWithPermit {
				asset: reserve,
				amount: amount.value(),
				rate_mode,
				deadline: intent.permit.deadline,
				signature,
			};
			return optimized.execute(user, action, pre_encoded).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let amount = self.amount(reserve, &amount).await?;
		self.check_permit_value(&intent.permit, reserve, &amount).await?;

		let data = standard::repay_with_permit(
			reserve,
			amount.value(),
			rate_mode,
			on_behalf_of,
			intent.permit.deadline,
			&signature,
		);
		Ok(vec![self.pool_action(user, pool, data, ProtocolAction::Repay)])
	}

	/// Swaps one collateral for another through the swap adapter.
	///
	/// With `flash` the pool lends the source asset (buffered by the surplus
	/// percentage) to the adapter, which swaps it, deposits the proceeds and
	/// repays the loan plus premium from the user's aTokens. Without `flash`
	/// the adapter swaps the aTokens directly.
	pub async fn swap_collateral(&self, intent: &SwapCollateralIntent) -> Descriptors {
		const OP: &str = "swap_collateral";
		let user = self.addresses.validate(&intent.user).await?;
		let from_asset = self.addresses.validate(&intent.from_asset).await?;
		let from_a_token = self.addresses.validate(&intent.from_a_token).await?;
		let to_asset = self.addresses.validate(&intent.to_asset).await?;
		let augustus = self.addresses.validate(&intent.augustus).await?;
		let on_behalf_of = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let from_amount = parse_decimal(&intent.from_amount)?;
		let min_to_amount = parse_decimal(&intent.min_to_amount)?;
		let swap_calldata = parse_hex("swap_calldata", &intent.swap_calldata)?;
		let swap_all_offset = adapters::swap_all_offset(&swap_calldata, intent.swap_all)?;
		let permit = adapter_signature(intent.permit.as_ref())?;
		reject_native("from_asset", from_asset)?;
		reject_native("to_asset", to_asset)?;
		if !intent.flash {
			require_self(user, on_behalf_of)?;
		}

		let Some(adapter) = self.contract(
			OP,
			"swap_collateral_adapter",
			self.contracts.swap_collateral_adapter,
		) else {
			return Ok(Vec::new());
		};
		let flash_pool = if intent.flash {
			let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
				return Ok(Vec::new());
			};
			Some(pool)
		} else {
			None
		};

		let from_decimals = self.tokens.decimals(from_asset).await?;
		let min_to_amount = self.base_units(to_asset, &min_to_amount).await?.value();
		let (amount, required) = match flash_pool {
			Some(_) => {
				let buffered = with_surplus(&from_amount, self.surplus_percent)?;
				let amount = to_base_units(&buffered, from_decimals)?.value();
				(amount, self.with_premium(amount))
			}
			None => {
				let amount = to_base_units(&from_amount, from_decimals)?.value();
				(amount, amount)
			}
		};

		let mut txs = Vec::new();
		let permit = self
			.authorize_adapter(
				&mut txs,
				user,
				from_a_token,
				adapter,
				required,
				intent.approval,
				permit,
			)
			.await?;

		let swap = CollateralSwap {
			from_asset,
			to_asset,
			amount,
			min_to_amount,
			swap_all_offset,
			swap_calldata,
			augustus,
			permit,
		};
		let call = match flash_pool {
			Some(pool) => {
				debug!(user = %user, amount = %amount, "Flash-loaned collateral swap");
				let data = standard::flash_loan(
					adapter,
					from_asset,
					amount,
					on_behalf_of,
					swap.flash_params(),
					intent.referral_code,
				);
				CallSpec::new(user, pool, data, ProtocolAction::SwapCollateral)
			}
			None => CallSpec::new(
				user,
				adapter,
				swap.direct_call(),
				ProtocolAction::SwapCollateral,
			),
		};
		txs.push(self.descriptors.action(call));
		Ok(txs)
	}

	/// Repays debt by selling collateral through the repay adapter.
	///
	/// With `flash` the pool lends the collateral to the adapter, which buys
	/// the debt asset with it, repays, and settles the loan plus premium from
	/// the user's aTokens. When the whole debt is repaid the loaned
	/// collateral is buffered by the surplus percentage.
	pub async fn repay_with_collateral(&self, intent: &RepayWithCollateralIntent) -> Descriptors {
		const OP: &str = "repay_with_collateral";
		let user = self.addresses.validate(&intent.user).await?;
		let from_asset = self.addresses.validate(&intent.from_asset).await?;
		let from_a_token = self.addresses.validate(&intent.from_a_token).await?;
		let asset_to_repay = self.addresses.validate(&intent.asset_to_repay).await?;
		let augustus = self.addresses.validate(&intent.augustus).await?;
		let on_behalf_of = self
			.addresses
			.validate_or(intent.on_behalf_of.as_deref(), user)
			.await?;
		let repay_with_amount = parse_decimal(&intent.repay_with_amount)?;
		let repay_amount = parse_decimal(&intent.repay_amount)?;
		let rate_mode = intent
			.interest_rate_mode
			.require_debt_mode("interest_rate_mode")?;
		let swap_calldata = parse_hex("swap_calldata", &intent.swap_calldata)?;
		let buy_all_offset = adapters::buy_all_offset(&swap_calldata, intent.repay_all_debt)?;
		let permit = adapter_signature(intent.permit.as_ref())?;
		reject_native("from_asset", from_asset)?;
		reject_native("asset_to_repay", asset_to_repay)?;
		if !intent.flash {
			require_self(user, on_behalf_of)?;
		}

		let Some(adapter) = self.contract(
			OP,
			"repay_with_collateral_adapter",
			self.contracts.repay_with_collateral_adapter,
		) else {
			return Ok(Vec::new());
		};
		let flash_pool = if intent.flash {
			let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
				return Ok(Vec::new());
			};
			Some(pool)
		} else {
			None
		};

		let from_decimals = self.tokens.decimals(from_asset).await?;
		let debt_amount = self.base_units(asset_to_repay, &repay_amount).await?.value();
		let (collateral_amount, required) = match flash_pool {
			Some(_) => {
				let collateral = if intent.repay_all_debt {
					with_surplus(&repay_with_amount, self.surplus_percent)?
				} else {
					repay_with_amount
				};
				let amount = to_base_units(&collateral, from_decimals)?.value();
				(amount, self.with_premium(amount))
			}
			None => {
				let amount = to_base_units(&repay_with_amount, from_decimals)?.value();
				(amount, amount)
			}
		};

		let mut txs = Vec::new();
		let permit = self
			.authorize_adapter(
				&mut txs,
				user,
				from_a_token,
				adapter,
				required,
				intent.approval,
				permit,
			)
			.await?;

		let repay = CollateralRepay {
			collateral_asset: from_asset,
			debt_asset: asset_to_repay,
			collateral_amount,
			debt_amount,
			rate_mode: rate_mode.as_u256(),
			buy_all_offset,
			swap_calldata,
			augustus,
			permit,
		};
		let call = match flash_pool {
			Some(pool) => {
				debug!(user = %user, amount = %collateral_amount, "Flash-loaned collateral repay");
				let data = standard::flash_loan(
					adapter,
					from_asset,
					collateral_amount,
					on_behalf_of,
					repay.flash_params(),
					intent.referral_code,
				);
				CallSpec::new(user, pool, data, ProtocolAction::RepayCollateral)
			}
			None => CallSpec::new(
				user,
				adapter,
				repay.direct_call(),
				ProtocolAction::RepayCollateral,
			),
		};
		txs.push(self.descriptors.action(call));
		Ok(txs)
	}

	pub async fn liquidation_call(&self, intent: &LiquidationCallIntent) -> Descriptors {
		const OP: &str = "liquidation_call";
		let liquidator = self.addresses.validate(&intent.liquidator).await?;
		let liquidated_user = self.addresses.validate(&intent.liquidated_user).await?;
		let debt_reserve = self.addresses.validate(&intent.debt_reserve).await?;
		let collateral_reserve = self.addresses.validate(&intent.collateral_reserve).await?;
		let debt_to_cover =
			parse_amount(&intent.debt_to_cover, AmountRule::PositiveOrEntireBalance)?;
		reject_native("debt_reserve", debt_reserve)?;
		reject_native("collateral_reserve", collateral_reserve)?;

		if intent.use_optimized_path {
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let amount = self.amount(debt_reserve, &debt_to_cover).await?;
			let action = CompactAction::LiquidationCall {
				collateral_asset: collateral_reserve,
				debt_asset: debt_reserve,
				user: liquidated_user,
				debt_to_cover: amount.value(),
				receive_a_token: intent.get_a_tokens,
			};
			return optimized.execute(liquidator, action, None).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let amount = self.amount(debt_reserve, &debt_to_cover).await?;

		let mut txs = Vec::new();
		txs.extend(
			self.approvals
				.gate(liquidator, debt_reserve, pool, &amount, intent.approval)
				.await?,
		);
		let data = standard::liquidation_call(
			collateral_reserve,
			debt_reserve,
			liquidated_user,
			amount.value(),
			intent.get_a_tokens,
		);
		txs.push(self.pool_action(liquidator, pool, data, ProtocolAction::LiquidationCall));
		Ok(txs)
	}

	/// Liquidates through the flash-liquidation adapter, which borrows the
	/// debt asset, liquidates, and swaps the seized collateral back to repay
	/// the loan. Sent by `initiator`; no approval is involved.
	pub async fn flash_liquidation(&self, intent: &FlashLiquidationIntent) -> Descriptors {
		const OP: &str = "flash_liquidation";
		let user = self.addresses.validate(&intent.user).await?;
		let collateral_reserve = self.addresses.validate(&intent.collateral_reserve).await?;
		let borrowed_reserve = self.addresses.validate(&intent.borrowed_reserve).await?;
		let initiator = self.addresses.validate(&intent.initiator).await?;
		let debt_to_cover = parse_decimal(&intent.debt_to_cover)?;
		reject_native("collateral_reserve", collateral_reserve)?;
		reject_native("borrowed_reserve", borrowed_reserve)?;

		let Some(adapter) = self.contract(
			OP,
			"flash_liquidation_adapter",
			self.contracts.flash_liquidation_adapter,
		) else {
			return Ok(Vec::new());
		};
		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};

		let (flash_amount, covered) = if intent.liquidate_all {
			let buffered = with_surplus(&debt_to_cover, self.surplus_percent)?;
			(self.base_units(borrowed_reserve, &buffered).await?.value(), U256::MAX)
		} else {
			let amount = self.base_units(borrowed_reserve, &debt_to_cover).await?.value();
			(amount, amount)
		};

		let params = adapters::flash_liquidation_params(
			collateral_reserve,
			borrowed_reserve,
			user,
			covered,
			intent.use_eth_path,
		);
		let data =
			standard::flash_loan(adapter, borrowed_reserve, flash_amount, initiator, params, 0);
		Ok(vec![self.pool_action(
			initiator,
			pool,
			data,
			ProtocolAction::LiquidationFlash,
		)])
	}

	pub async fn set_usage_as_collateral(
		&self,
		intent: &SetUsageAsCollateralIntent,
	) -> Descriptors {
		const OP: &str = "set_usage_as_collateral";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		reject_native("reserve", reserve)?;

		if intent.use_optimized_path {
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let action = CompactAction::SetUsageAsCollateral {
				asset: reserve,
				use_as_collateral: intent.use_as_collateral,
			};
			return optimized.execute(user, action, None).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let data = standard::set_usage_as_collateral(reserve, intent.use_as_collateral);
		Ok(vec![self.pool_action(
			user,
			pool,
			data,
			ProtocolAction::SetUsageAsCollateral,
		)])
	}

	pub async fn set_user_e_mode(&self, intent: &SetUserEModeIntent) -> Descriptors {
		let user = self.addresses.validate(&intent.user).await?;
		let Some(pool) = self.contract("set_user_e_mode", "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let data = standard::set_user_e_mode(intent.category_id);
		Ok(vec![self.pool_action(user, pool, data, ProtocolAction::SetUserEMode)])
	}

	pub async fn swap_borrow_rate_mode(&self, intent: &SwapBorrowRateModeIntent) -> Descriptors {
		const OP: &str = "swap_borrow_rate_mode";
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let rate_mode = intent
			.interest_rate_mode
			.require_debt_mode("interest_rate_mode")?;
		reject_native("reserve", reserve)?;

		if intent.use_optimized_path {
			let Some(optimized) = self.optimized(OP) else {
				return Ok(Vec::new());
			};
			let action = CompactAction::SwapBorrowRateMode {
				asset: reserve,
				rate_mode,
			};
			return optimized.execute(user, action, None).await;
		}

		let Some(pool) = self.contract(OP, "pool", self.contracts.pool) else {
			return Ok(Vec::new());
		};
		let data = standard::swap_borrow_rate_mode(reserve, rate_mode);
		Ok(vec![self.pool_action(
			user,
			pool,
			data,
			ProtocolAction::SwapBorrowRateMode,
		)])
	}

	/// Builds the EIP-2612 typed data authorizing the pool to pull `amount`.
	pub async fn sign_erc20_approval(
		&self,
		intent: &SignApprovalIntent,
	) -> Result<PermitRequest, PoolError> {
		let user = self.addresses.validate(&intent.user).await?;
		let reserve = self.addresses.validate(&intent.reserve).await?;
		let amount = parse_amount(&intent.amount, AmountRule::PositiveOrEntireBalance)?;
		reject_native("reserve", reserve)?;

		let Some(pool) = self.contract("sign_erc20_approval", "pool", self.contracts.pool) else {
			return Ok(PermitRequest::Unavailable);
		};
		let amount = self.amount(reserve, &amount).await?;
		Ok(self
			.permits
			.request(reserve, user, pool, &amount, intent.deadline)
			.await?)
	}

	fn contract(&self, operation: &str, name: &str, address: Option<Address>) -> Option<Address> {
		if address.is_none() {
			warn!(operation, contract = name, "Contract not configured, operation unavailable");
		}
		address
	}

	fn gateway(&self, operation: &str) -> Option<&Arc<dyn NativeGatewayService>> {
		if self.gateway.is_none() {
			warn!(operation, "Native gateway not configured, operation unavailable");
		}
		self.gateway.as_ref()
	}

	fn optimized(&self, operation: &str) -> Option<&Arc<dyn OptimizedPathService>> {
		if self.optimized.is_none() {
			warn!(operation, "Optimized path not configured, operation unavailable");
		}
		self.optimized.as_ref()
	}

	fn pool_action(
		&self,
		from: Address,
		to: Address,
		data: Bytes,
		action: ProtocolAction,
	) -> TransactionDescriptor {
		self.descriptors.action(CallSpec::new(from, to, data, action))
	}

	async fn base_units(
		&self,
		token: Address,
		amount: &HumanAmount,
	) -> Result<AmountUnits, PoolError> {
		let decimals = self.tokens.decimals(token).await?;
		Ok(to_base_units(amount, decimals)?)
	}

	/// Converts a parsed amount. The sentinel needs no decimals read.
	async fn amount(&self, token: Address, parsed: &ParsedAmount) -> Result<Amount, PoolError> {
		let decimals = match parsed {
			ParsedAmount::EntireBalance => 0,
			ParsedAmount::Value(_) => self.tokens.decimals(token).await?,
		};
		Ok(to_amount(parsed, decimals)?)
	}

	async fn check_permit_value(
		&self,
		permit: &PermitAuthorization,
		token: Address,
		amount: &Amount,
	) -> Result<(), PoolError> {
		let Some(raw) = permit.value.as_deref() else {
			return Ok(());
		};
		let parsed = parse_amount(raw, AmountRule::PositiveOrEntireBalance)?;
		if self.amount(token, &parsed).await? != *amount {
			return Err(ValidationError::invalid(
				"permit.value",
				format!("{} does not match the action amount", raw),
			)
			.into());
		}
		Ok(())
	}

	/// Amount plus the flash-loan premium, rounded up.
	fn with_premium(&self, amount: U256) -> U256 {
		let premium = amount
			.saturating_mul(U256::from(self.flash_premium_bps))
			.saturating_add(U256::from(9_999u16))
			/ U256::from(10_000u16);
		amount.saturating_add(premium)
	}

	/// Authorizes an adapter to pull `required` aTokens: the signed permit
	/// when one was supplied, otherwise an approval when the allowance is
	/// short (pushed onto `txs`).
	#[allow(clippy::too_many_arguments)]
	async fn authorize_adapter(
		&self,
		txs: &mut Vec<TransactionDescriptor>,
		user: Address,
		a_token: Address,
		adapter: Address,
		required: U256,
		policy: ApprovalPolicy,
		permit: Option<(PermitSignature, u64)>,
	) -> Result<AdapterPermit, PoolError> {
		if let Some((signature, deadline)) = permit {
			return Ok(adapters::adapter_permit(Some((required, deadline, &signature))));
		}

		let approve = match policy {
			ApprovalPolicy::Exact => required,
			ApprovalPolicy::Max => U256::MAX,
		};
		txs.extend(
			self.approvals
				.gate_for(user, a_token, adapter, required, approve)
				.await?,
		);
		Ok(adapters::adapter_permit(None))
	}
}

fn reject_native(field: &str, asset: Address) -> Result<(), ValidationError> {
	if asset == NATIVE_CURRENCY {
		return Err(ValidationError::invalid(
			field,
			"native currency is not supported for this action",
		));
	}
	Ok(())
}

fn require_self(user: Address, on_behalf_of: Address) -> Result<(), ValidationError> {
	if user != on_behalf_of {
		return Err(ValidationError::invalid(
			"on_behalf_of",
			format!("{} must equal the sender {} on this path", on_behalf_of, user),
		));
	}
	Ok(())
}

fn native_amount(parsed: &ParsedAmount) -> Result<Amount, ValidationError> {
	to_amount(parsed, NATIVE_DECIMALS)
}

fn parse_pre_encoded(raw: Option<&str>) -> Result<Option<B256>, ValidationError> {
	raw.map(compact::parse_pre_encoded).transpose()
}

fn parse_hex(field: &str, raw: &str) -> Result<Bytes, ValidationError> {
	hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
		.map(Bytes::from)
		.map_err(|_| ValidationError::invalid(field, format!("{} is not hex", raw)))
}

fn adapter_signature(
	permit: Option<&PermitAuthorization>,
) -> Result<Option<(PermitSignature, u64)>, ValidationError> {
	permit
		.map(|p| split_signature(&p.signature).map(|signature| (signature, p.deadline)))
		.transpose()
}

/// Assembles an [`Orchestrator`] from configuration and collaborators.
///
/// The native gateway and optimized path default to the built-in
/// implementations when their contracts are configured; either can be
/// replaced with [`OrchestratorBuilder::with_gateway`] or
/// [`OrchestratorBuilder::with_optimized_path`].
#[derive(Default)]
pub struct OrchestratorBuilder {
	config: Option<Config>,
	tokens: Option<Arc<dyn TokenService>>,
	nonces: Option<Arc<dyn NonceService>>,
	network: Option<Arc<dyn NetworkService>>,
	resolver: Option<Arc<dyn NameResolver>>,
	reserves: Option<Arc<dyn ReserveIndex>>,
	cache: Option<CacheService>,
	gateway: Option<Arc<dyn NativeGatewayService>>,
	optimized: Option<Arc<dyn OptimizedPathService>>,
}

impl OrchestratorBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(mut self, config: Config) -> Self {
		self.config = Some(config);
		self
	}

	/// Uses one object for every read-only collaborator.
	pub fn with_chain<C>(self, chain: Arc<C>) -> Self
	where
		C: TokenService + NonceService + NetworkService + NameResolver + ReserveIndex + 'static,
	{
		self.with_token_service(chain.clone())
			.with_nonce_service(chain.clone())
			.with_network_service(chain.clone())
			.with_name_resolver(chain.clone())
			.with_reserve_index(chain)
	}

	pub fn with_token_service(mut self, tokens: Arc<dyn TokenService>) -> Self {
		self.tokens = Some(tokens);
		self
	}

	pub fn with_nonce_service(mut self, nonces: Arc<dyn NonceService>) -> Self {
		self.nonces = Some(nonces);
		self
	}

	pub fn with_network_service(mut self, network: Arc<dyn NetworkService>) -> Self {
		self.network = Some(network);
		self
	}

	pub fn with_name_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
		self.resolver = Some(resolver);
		self
	}

	pub fn with_reserve_index(mut self, reserves: Arc<dyn ReserveIndex>) -> Self {
		self.reserves = Some(reserves);
		self
	}

	/// Caches token metadata for the configured TTL.
	pub fn with_cache(mut self, cache: CacheService) -> Self {
		self.cache = Some(cache);
		self
	}

	pub fn with_gateway(mut self, gateway: Arc<dyn NativeGatewayService>) -> Self {
		self.gateway = Some(gateway);
		self
	}

	pub fn with_optimized_path(mut self, optimized: Arc<dyn OptimizedPathService>) -> Self {
		self.optimized = Some(optimized);
		self
	}

	pub fn build(self) -> Result<Orchestrator, PoolError> {
		let config = self
			.config
			.ok_or_else(|| PoolError::Configuration("Configuration not provided".into()))?;
		let tokens = self
			.tokens
			.ok_or_else(|| PoolError::Configuration("Token service not provided".into()))?;
		let nonces = self
			.nonces
			.ok_or_else(|| PoolError::Configuration("Nonce service not provided".into()))?;
		let network = self
			.network
			.ok_or_else(|| PoolError::Configuration("Network service not provided".into()))?;

		let cached = self.cache.is_some();
		let tokens: Arc<dyn TokenService> = match self.cache {
			Some(cache) => Arc::new(CachedTokenService::new(
				tokens,
				cache,
				Duration::from_secs(config.cache.metadata_ttl_secs),
			)),
			None => tokens,
		};

		let gas_limits = GasLimits::from_overrides(&config.orchestrator.gas_limits)?;
		let descriptors = DescriptorFactory::new(network.clone(), gas_limits);
		let approvals = ApprovalGate::new(tokens.clone(), descriptors.clone());
		let contracts = config.contracts.clone();

		let gateway = self.gateway.or_else(|| {
			let gateway = contracts.wrapped_token_gateway?;
			let pool = contracts.pool?;
			let service: Arc<dyn NativeGatewayService> = Arc::new(WrappedTokenGatewayService::new(
				gateway,
				pool,
				approvals.clone(),
				descriptors.clone(),
			));
			Some(service)
		});

		let optimized = self.optimized.or_else(|| {
			let l2_pool = contracts.l2_pool?;
			let reserves = self.reserves.clone()?;
			let service: Arc<dyn OptimizedPathService> = Arc::new(CompactPoolService::new(
				l2_pool,
				reserves,
				descriptors.clone(),
			));
			Some(service)
		});

		info!(
			chain_id = config.network.chain_id,
			gateway = gateway.is_some(),
			optimized = optimized.is_some(),
			cached,
			"Orchestrator ready"
		);

		Ok(Orchestrator {
			surplus_percent: config.orchestrator.surplus_percent,
			flash_premium_bps: config.orchestrator.flash_premium_bps,
			addresses: AddressValidator::new(self.resolver),
			permits: PermitAssembler::new(tokens.clone(), nonces, network),
			tokens,
			approvals,
			descriptors,
			gateway,
			optimized,
			contracts,
		})
	}
}
