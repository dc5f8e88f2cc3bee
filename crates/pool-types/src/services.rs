//! Read-only collaborators the orchestrator depends on.
//!
//! These traits are the narrow contracts between the orchestrator and the
//! chain. Implementations backed by an RPC provider live in `pool-rpc`; the
//! orchestrator only ever sees the trait objects.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::ServiceError;

/// Token metadata and allowance reads.
#[async_trait]
pub trait TokenService: Send + Sync {
	/// Decimal precision of an ERC-20 token.
	async fn decimals(&self, token: Address) -> Result<u8, ServiceError>;

	/// Token name, used as the EIP-712 domain name.
	async fn name(&self, token: Address) -> Result<String, ServiceError>;

	/// Current ERC-20 allowance granted by `owner` to `spender`.
	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ServiceError>;

	/// Current credit-delegation allowance on a debt token.
	async fn borrow_allowance(
		&self,
		debt_token: Address,
		delegator: Address,
		delegatee: Address,
	) -> Result<U256, ServiceError>;
}

/// EIP-2612 nonce lookups.
#[async_trait]
pub trait NonceService: Send + Sync {
	/// Returns `None` when the token exposes no retrievable permit nonce.
	async fn nonce(&self, token: Address, owner: Address) -> Result<Option<U256>, ServiceError>;
}

#[async_trait]
pub trait NetworkService: Send + Sync {
	async fn chain_id(&self) -> Result<u64, ServiceError>;

	async fn gas_price(&self) -> Result<u128, ServiceError>;
}

/// Resolves human-readable names (ENS style) to addresses.
#[async_trait]
pub trait NameResolver: Send + Sync {
	async fn resolve(&self, name: &str) -> Result<Option<Address>, ServiceError>;
}

/// Maps reserve assets to the compact identifiers used by the optimized pool.
#[async_trait]
pub trait ReserveIndex: Send + Sync {
	async fn reserve_id(&self, asset: Address) -> Result<u16, ServiceError>;
}
