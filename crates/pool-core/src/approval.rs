//! Allowance gating.
//!
//! Before an action that pulls tokens from the user, the gate reads the
//! current allowance and, when it is short, produces the approval descriptor
//! that must be sent first.

use crate::contracts::{ICreditDelegationToken, IERC20};
use crate::gas::{CallSpec, DescriptorFactory, ProtocolAction};
use alloy_primitives::{uint, Address, U256};
use alloy_sol_types::SolCall;
use pool_types::{
	Amount, ApprovalPolicy, ServiceError, TokenService, TransactionDescriptor, TransactionType,
};
use std::sync::Arc;
use tracing::debug;

/// Allowance treated as "already unlimited" when the entire balance is
/// requested. Anything at or above this value needs no new approval.
pub const SUPER_BIG_ALLOWANCE: U256 =
	uint!(11579208923731619542357098500868790785326998466564056403945758400791_U256);

/// Allowance the action needs: the exact value, or the threshold above.
pub fn required_allowance(amount: &Amount) -> U256 {
	match amount {
		Amount::Exact(units) => units.value(),
		Amount::EntireBalance => SUPER_BIG_ALLOWANCE,
	}
}

/// Size of a new approval under `policy`.
pub fn approval_amount(amount: &Amount, policy: ApprovalPolicy) -> U256 {
	match (policy, amount) {
		(ApprovalPolicy::Max, _) | (_, Amount::EntireBalance) => U256::MAX,
		(ApprovalPolicy::Exact, Amount::Exact(units)) => units.value(),
	}
}

#[derive(Clone)]
pub struct ApprovalGate {
	tokens: Arc<dyn TokenService>,
	descriptors: DescriptorFactory,
}

impl ApprovalGate {
	pub fn new(tokens: Arc<dyn TokenService>, descriptors: DescriptorFactory) -> Self {
		Self {
			tokens,
			descriptors,
		}
	}

	pub async fn needs_approval(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
		required: U256,
	) -> Result<bool, ServiceError> {
		let allowance = self.tokens.allowance(token, owner, spender).await?;
		Ok(allowance < required)
	}

	pub fn build_approval(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
		amount: U256,
	) -> TransactionDescriptor {
		let data = IERC20::approveCall { spender, amount }.abi_encode();
		self.descriptors.build(
			TransactionType::Erc20Approval,
			CallSpec::new(owner, token, data, ProtocolAction::Approval),
		)
	}

	/// Returns the approval to prepend, if the current allowance is short.
	pub async fn gate(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
		amount: &Amount,
		policy: ApprovalPolicy,
	) -> Result<Option<TransactionDescriptor>, ServiceError> {
		self.gate_for(
			owner,
			token,
			spender,
			required_allowance(amount),
			approval_amount(amount, policy),
		)
		.await
	}

	/// Like [`ApprovalGate::gate`] with explicit threshold and approval size.
	pub async fn gate_for(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
		required: U256,
		approve: U256,
	) -> Result<Option<TransactionDescriptor>, ServiceError> {
		if !self.needs_approval(owner, token, spender, required).await? {
			debug!(owner = %owner, token = %token, spender = %spender, "Allowance sufficient");
			return Ok(None);
		}

		debug!(
			owner = %owner,
			token = %token,
			spender = %spender,
			amount = %approve,
			"Approval required"
		);
		Ok(Some(self.build_approval(owner, token, spender, approve)))
	}

	/// Credit-delegation counterpart of [`ApprovalGate::gate`].
	pub async fn gate_delegation(
		&self,
		delegator: Address,
		debt_token: Address,
		delegatee: Address,
		amount: U256,
	) -> Result<Option<TransactionDescriptor>, ServiceError> {
		let allowance = self
			.tokens
			.borrow_allowance(debt_token, delegator, delegatee)
			.await?;
		if allowance >= amount {
			return Ok(None);
		}

		debug!(
			delegator = %delegator,
			debt_token = %debt_token,
			delegatee = %delegatee,
			"Delegation required"
		);
		let data = ICreditDelegationToken::approveDelegationCall { delegatee, amount }.abi_encode();
		Ok(Some(self.descriptors.build(
			TransactionType::DelegationApproval,
			CallSpec::new(delegator, debt_token, data, ProtocolAction::DelegationApproval),
		)))
	}
}
