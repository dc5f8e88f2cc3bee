//! Populated transactions and their deferred descriptors.
//!
//! The orchestrator never talks to the network when it builds a result.
//! Instead it returns [`TransactionDescriptor`]s holding two thunks: one that
//! produces the populated transaction and one that estimates gas. Nothing is
//! read until the caller invokes them.

use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::ServiceError;

/// A populated, unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
	/// Sender of the transaction.
	pub from: Address,
	/// Contract the call is addressed to.
	pub to: Address,
	/// ABI or packed calldata.
	pub data: Bytes,
	/// Native currency attached to the call.
	pub value: U256,
	/// Chain ID for replay protection.
	pub chain_id: u64,
	/// Recommended gas limit for the action.
	pub gas_limit: Option<u64>,
}

/// Conversion from our Transaction type to Alloy's TransactionRequest.
impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		TransactionRequest {
			from: Some(tx.from),
			to: Some(TxKind::Call(tx.to)),
			chain_id: Some(tx.chain_id),
			value: Some(tx.value),
			gas: tx.gas_limit,
			input: TransactionInput::new(tx.data),
			..Default::default()
		}
	}
}

/// Category tag of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
	/// ERC-20 allowance increase.
	Erc20Approval,
	/// Credit-delegation allowance increase on a debt token.
	DelegationApproval,
	/// The protocol action itself.
	PoolAction,
}

impl TransactionType {
	pub fn is_approval(&self) -> bool {
		matches!(
			self,
			TransactionType::Erc20Approval | TransactionType::DelegationApproval
		)
	}
}

/// Gas figures produced by a descriptor's estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasEstimate {
	pub gas_limit: u64,
	pub gas_price: u128,
}

/// Deferred producer of a populated transaction.
pub type TxProducer =
	Arc<dyn Fn() -> BoxFuture<'static, Result<Transaction, ServiceError>> + Send + Sync>;

/// Deferred gas estimator.
pub type GasEstimator =
	Arc<dyn Fn() -> BoxFuture<'static, Result<GasEstimate, ServiceError>> + Send + Sync>;

/// One entry of an orchestrator result.
///
/// Descriptors are ordered: approvals always precede the action they
/// unblock. Cloning a descriptor clones the thunks, not their results.
#[derive(Clone)]
pub struct TransactionDescriptor {
	pub tx_type: TransactionType,
	pub tx: TxProducer,
	pub gas: GasEstimator,
}

impl TransactionDescriptor {
	pub fn new(tx_type: TransactionType, tx: TxProducer, gas: GasEstimator) -> Self {
		Self { tx_type, tx, gas }
	}

	/// Runs the transaction producer.
	pub async fn transaction(&self) -> Result<Transaction, ServiceError> {
		(self.tx)().await
	}

	/// Runs the gas estimator.
	pub async fn gas_estimate(&self) -> Result<GasEstimate, ServiceError> {
		(self.gas)().await
	}
}

impl fmt::Debug for TransactionDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransactionDescriptor")
			.field("tx_type", &self.tx_type)
			.finish_non_exhaustive()
	}
}
