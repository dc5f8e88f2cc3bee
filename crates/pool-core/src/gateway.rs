//! Native-currency gateway.
//!
//! The pool only holds ERC-20 reserves. Native currency goes through a
//! gateway contract that wraps it on the way in and unwraps it on the way
//! out, acting on the pool for the user.

use crate::approval::ApprovalGate;
use crate::contracts::IWrappedTokenGateway;
use crate::gas::{CallSpec, DescriptorFactory, ProtocolAction};
use crate::PoolError;
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use pool_types::{Amount, ApprovalPolicy, InterestRateMode, TransactionDescriptor};
use tracing::debug;

/// Native-currency counterpart of the pool's supply, withdraw, borrow and
/// repay actions. Results are forwarded by the orchestrator unchanged.
#[async_trait]
pub trait NativeGatewayService: Send + Sync {
	async fn supply(
		&self,
		user: Address,
		amount: U256,
		on_behalf_of: Address,
		referral_code: u16,
	) -> Result<Vec<TransactionDescriptor>, PoolError>;

	/// `a_token` is the interest-bearing token the gateway pulls and burns.
	async fn withdraw(
		&self,
		user: Address,
		amount: Amount,
		to: Address,
		a_token: Address,
	) -> Result<Vec<TransactionDescriptor>, PoolError>;

	/// `debt_token` is the debt token the gateway borrows against by
	/// credit delegation.
	async fn borrow(
		&self,
		user: Address,
		amount: U256,
		rate_mode: InterestRateMode,
		referral_code: u16,
		debt_token: Address,
	) -> Result<Vec<TransactionDescriptor>, PoolError>;

	async fn repay(
		&self,
		user: Address,
		amount: U256,
		rate_mode: InterestRateMode,
		on_behalf_of: Address,
	) -> Result<Vec<TransactionDescriptor>, PoolError>;
}

/// Gateway backed by a deployed wrapped-token gateway contract.
pub struct WrappedTokenGatewayService {
	gateway: Address,
	pool: Address,
	approvals: ApprovalGate,
	descriptors: DescriptorFactory,
}

impl WrappedTokenGatewayService {
	pub fn new(
		gateway: Address,
		pool: Address,
		approvals: ApprovalGate,
		descriptors: DescriptorFactory,
	) -> Self {
		Self {
			gateway,
			pool,
			approvals,
			descriptors,
		}
	}
}

#[async_trait]
impl NativeGatewayService for WrappedTokenGatewayService {
	async fn supply(
		&self,
		user: Address,
		amount: U256,
		on_behalf_of: Address,
		referral_code: u16,
	) -> Result<Vec<TransactionDescriptor>, PoolError> {
		let data = IWrappedTokenGateway::depositETHCall {
			pool: self.pool,
			onBehalfOf: on_behalf_of,
			referralCode: referral_code,
		}
		.abi_encode();

		debug!(user = %user, amount = %amount, "Native supply through gateway");
		Ok(vec![self.descriptors.action(
			CallSpec::new(user, self.gateway, data, ProtocolAction::Supply).with_value(amount),
		)])
	}

	async fn withdraw(
		&self,
		user: Address,
		amount: Amount,
		to: Address,
		a_token: Address,
	) -> Result<Vec<TransactionDescriptor>, PoolError> {
		let mut txs = Vec::new();
		if let Some(approval) = self
			.approvals
			.gate(user, a_token, self.gateway, &amount, ApprovalPolicy::Exact)
			.await?
		{
			txs.push(approval);
		}

		let data = IWrappedTokenGateway::withdrawETHCall {
			pool: self.pool,
			amount: amount.value(),
			to,
		}
		.abi_encode();
		txs.push(self.descriptors.action(CallSpec::new(
			user,
			self.gateway,
			data,
			ProtocolAction::WithdrawEth,
		)));
		Ok(txs)
	}

	async fn borrow(
		&self,
		user: Address,
		amount: U256,
		rate_mode: InterestRateMode,
		referral_code: u16,
		debt_token: Address,
	) -> Result<Vec<TransactionDescriptor>, PoolError> {
		let mut txs = Vec::new();
		if let Some(delegation) = self
			.approvals
			.gate_delegation(user, debt_token, self.gateway, amount)
			.await?
		{
			txs.push(delegation);
		}

		let data = IWrappedTokenGateway::borrowETHCall {
			pool: self.pool,
			amount,
			interestRateMode: rate_mode.as_u256(),
			referralCode: referral_code,
		}
		.abi_encode();
		txs.push(self.descriptors.action(CallSpec::new(
			user,
			self.gateway,
			data,
			ProtocolAction::BorrowEth,
		)));
		Ok(txs)
	}

	async fn repay(
		&self,
		user: Address,
		amount: U256,
		rate_mode: InterestRateMode,
		on_behalf_of: Address,
	) -> Result<Vec<TransactionDescriptor>, PoolError> {
		let data = IWrappedTokenGateway::repayETHCall {
			pool: self.pool,
			amount,
			rateMode: rate_mode.as_u256(),
			onBehalfOf: on_behalf_of,
		}
		.abi_encode();
		Ok(vec![self.descriptors.action(
			CallSpec::new(user, self.gateway, data, ProtocolAction::Repay).with_value(amount),
		)])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contracts::{ICreditDelegationToken, IERC20};
	use crate::gas::GasLimits;
	use crate::test_utils::MockChain;
	use alloy_primitives::address;
	use pool_types::{AmountUnits, TransactionType};
	use std::sync::Arc;

	const GATEWAY: Address = address!("D322A49006FC828F9B5B37Ab215F99B4E5caB19C");
	const POOL: Address = address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2");
	const USER: Address = address!("00000000000000000000000000000000000000a1");
	const A_WETH: Address = address!("4d5F47FA6A74757f35C14fD3a6Ef8E3C9BC514E8");
	const DEBT_WETH: Address = address!("eA51d7853EEFb32b6ee06b1C12E6dcCA88Be0fFE");

	fn service(chain: &Arc<MockChain>) -> WrappedTokenGatewayService {
		let descriptors = DescriptorFactory::new(chain.clone(), GasLimits::default());
		WrappedTokenGatewayService::new(
			GATEWAY,
			POOL,
			ApprovalGate::new(chain.clone(), descriptors.clone()),
			descriptors,
		)
	}

	#[tokio::test]
	async fn test_supply_carries_value() {
		let chain = Arc::new(MockChain::new());
		let one = U256::from(1_000_000_000_000_000_000u128);
		let txs = service(&chain).supply(USER, one, USER, 0).await.unwrap();

		assert_eq!(txs.len(), 1);
		let tx = txs[0].transaction().await.unwrap();
		assert_eq!(tx.to, GATEWAY);
		assert_eq!(tx.value, one);
		let call = IWrappedTokenGateway::depositETHCall::abi_decode(&tx.data, true).unwrap();
		assert_eq!(call.pool, POOL);
		assert_eq!(call.onBehalfOf, USER);
	}

	#[tokio::test]
	async fn test_withdraw_all_approves_a_token_first() {
		let chain = Arc::new(MockChain::new());
		let txs = service(&chain)
			.withdraw(USER, Amount::EntireBalance, USER, A_WETH)
			.await
			.unwrap();

		assert_eq!(txs.len(), 2);
		assert_eq!(txs[0].tx_type, TransactionType::Erc20Approval);
		let approval = txs[0].transaction().await.unwrap();
		assert_eq!(approval.to, A_WETH);
		let call = IERC20::approveCall::abi_decode(&approval.data, true).unwrap();
		assert_eq!(call.spender, GATEWAY);
		assert_eq!(call.amount, U256::MAX);

		let withdraw = txs[1].transaction().await.unwrap();
		let call = IWrappedTokenGateway::withdrawETHCall::abi_decode(&withdraw.data, true).unwrap();
		assert_eq!(call.amount, U256::MAX);
		assert_eq!(withdraw.gas_limit, Some(640_000));
	}

	#[tokio::test]
	async fn test_withdraw_skips_approval_with_allowance() {
		let amount = U256::from(5u8);
		let chain = Arc::new(MockChain::new().with_allowance(A_WETH, USER, GATEWAY, amount));
		let txs = service(&chain)
			.withdraw(
				USER,
				Amount::Exact(AmountUnits::new(amount, 18)),
				USER,
				A_WETH,
			)
			.await
			.unwrap();
		assert_eq!(txs.len(), 1);
		assert_eq!(txs[0].tx_type, TransactionType::PoolAction);
	}

	#[tokio::test]
	async fn test_borrow_delegates_credit_when_short() {
		let chain = Arc::new(MockChain::new());
		let amount = U256::from(7u8);
		let txs = service(&chain)
			.borrow(USER, amount, InterestRateMode::Variable, 0, DEBT_WETH)
			.await
			.unwrap();

		assert_eq!(txs.len(), 2);
		assert_eq!(txs[0].tx_type, TransactionType::DelegationApproval);
		let delegation = txs[0].transaction().await.unwrap();
		assert_eq!(delegation.to, DEBT_WETH);
		let call =
			ICreditDelegationToken::approveDelegationCall::abi_decode(&delegation.data, true)
				.unwrap();
		assert_eq!(call.delegatee, GATEWAY);

		let borrow = txs[1].transaction().await.unwrap();
		let call = IWrappedTokenGateway::borrowETHCall::abi_decode(&borrow.data, true).unwrap();
		assert_eq!(call.interestRateMode, U256::from(2u8));

		let chain =
			Arc::new(MockChain::new().with_borrow_allowance(DEBT_WETH, USER, GATEWAY, amount));
		let txs = service(&chain)
			.borrow(USER, amount, InterestRateMode::Variable, 0, DEBT_WETH)
			.await
			.unwrap();
		assert_eq!(txs.len(), 1);
	}

	#[tokio::test]
	async fn test_repay_sends_value() {
		let chain = Arc::new(MockChain::new());
		let txs = service(&chain)
			.repay(USER, U256::from(3u8), InterestRateMode::Stable, USER)
			.await
			.unwrap();
		let tx = txs[0].transaction().await.unwrap();
		assert_eq!(tx.value, U256::from(3u8));
		let call = IWrappedTokenGateway::repayETHCall::abi_decode(&tx.data, true).unwrap();
		assert_eq!(call.rateMode, U256::from(1u8));
	}
}
