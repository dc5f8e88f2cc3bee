//! Alloy-based chain reader.

use crate::contracts::{
	ICreditDelegationToken, IENSRegistry, IENSResolver, IERC20Metadata, IERC20Permit,
	IPoolReserves,
};
use crate::{namehash, RpcError};
use alloy_primitives::{Address, TxKind, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use pool_types::{
	NameResolver, NetworkService, NonceService, ReserveIndex, ServiceError, TokenService,
};
use std::sync::Arc;
use tracing::debug;

/// Implements every read-only collaborator over a single HTTP provider.
pub struct AlloyChainReader {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	pool: Option<Address>,
	ens_registry: Option<Address>,
}

impl AlloyChainReader {
	pub fn new(rpc_url: &str) -> Result<Self, RpcError> {
		let url = rpc_url
			.parse()
			.map_err(|e| RpcError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;

		let provider = ProviderBuilder::new().on_http(url);

		Ok(Self {
			provider: Arc::new(provider),
			pool: None,
			ens_registry: None,
		})
	}

	/// Pool used for reserve id lookups.
	pub fn with_pool(mut self, pool: Option<Address>) -> Self {
		self.pool = pool;
		self
	}

	/// ENS registry used for name resolution.
	pub fn with_ens_registry(mut self, registry: Option<Address>) -> Self {
		self.ens_registry = registry;
		self
	}

	async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, ServiceError> {
		let request = TransactionRequest {
			to: Some(TxKind::Call(to)),
			input: TransactionInput::new(call.abi_encode().into()),
			..Default::default()
		};

		let output = self
			.provider
			.call(&request)
			.await
			.map_err(|e| call_error(C::SIGNATURE, to, e))?;

		C::abi_decode_returns(&output, true)
			.map_err(|e| ServiceError::Decode(format!("{} on {}: {}", C::SIGNATURE, to, e)))
	}

	fn pool(&self) -> Result<Address, ServiceError> {
		self.pool
			.ok_or_else(|| ServiceError::Contract("no pool configured for reserve lookups".into()))
	}
}

/// Transport failures are network errors; anything the node answered
/// (reverts, null or malformed responses) is a contract error.
fn call_error(signature: &str, to: Address, error: TransportError) -> ServiceError {
	let message = format!("{} on {} failed: {}", signature, to, error);
	if matches!(error, TransportError::Transport(_)) {
		ServiceError::Network(message)
	} else {
		ServiceError::Contract(message)
	}
}

/// A call the token rejected means it has no such counter. Network errors
/// are returned as-is.
fn missing_counter<T>(result: Result<T, ServiceError>) -> Result<Option<T>, ServiceError> {
	match result {
		Ok(value) => Ok(Some(value)),
		Err(ServiceError::Contract(_) | ServiceError::Decode(_)) => Ok(None),
		Err(e) => Err(e),
	}
}

#[async_trait]
impl TokenService for AlloyChainReader {
	async fn decimals(&self, token: Address) -> Result<u8, ServiceError> {
		Ok(self.call(token, IERC20Metadata::decimalsCall {}).await?._0)
	}

	async fn name(&self, token: Address) -> Result<String, ServiceError> {
		Ok(self.call(token, IERC20Metadata::nameCall {}).await?._0)
	}

	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ServiceError> {
		Ok(self
			.call(token, IERC20Metadata::allowanceCall { owner, spender })
			.await?
			._0)
	}

	async fn borrow_allowance(
		&self,
		debt_token: Address,
		delegator: Address,
		delegatee: Address,
	) -> Result<U256, ServiceError> {
		Ok(self
			.call(
				debt_token,
				ICreditDelegationToken::borrowAllowanceCall {
					fromUser: delegator,
					toUser: delegatee,
				},
			)
			.await?
			._0)
	}
}

#[async_trait]
impl NonceService for AlloyChainReader {
	async fn nonce(&self, token: Address, owner: Address) -> Result<Option<U256>, ServiceError> {
		let nonces = self.call(token, IERC20Permit::noncesCall { owner }).await;
		if let Some(ret) = missing_counter(nonces)? {
			return Ok(Some(ret._0));
		}

		// Some deployments expose the counter as `_nonces`.
		let legacy = self.call(token, IERC20Permit::_noncesCall { owner }).await;
		match missing_counter(legacy)? {
			Some(ret) => Ok(Some(ret._0)),
			None => {
				debug!(token = %token, "Token exposes no permit nonce");
				Ok(None)
			}
		}
	}
}

#[async_trait]
impl NetworkService for AlloyChainReader {
	async fn chain_id(&self) -> Result<u64, ServiceError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| ServiceError::Network(format!("Failed to get chain id: {}", e)))
	}

	async fn gas_price(&self) -> Result<u128, ServiceError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| ServiceError::Network(format!("Failed to get gas price: {}", e)))
	}
}

#[async_trait]
impl NameResolver for AlloyChainReader {
	async fn resolve(&self, name: &str) -> Result<Option<Address>, ServiceError> {
		let Some(registry) = self.ens_registry else {
			debug!(name, "No ENS registry configured");
			return Ok(None);
		};

		let node = namehash(name);
		let resolver = self
			.call(registry, IENSRegistry::resolverCall { node })
			.await?
			._0;
		if resolver.is_zero() {
			return Ok(None);
		}

		let address = self.call(resolver, IENSResolver::addrCall { node }).await?._0;
		Ok((!address.is_zero()).then_some(address))
	}
}

#[async_trait]
impl ReserveIndex for AlloyChainReader {
	async fn reserve_id(&self, asset: Address) -> Result<u16, ServiceError> {
		let data = self
			.call(self.pool()?, IPoolReserves::getReserveDataCall { asset })
			.await?;
		Ok(data.id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rejects_malformed_url() {
		assert!(matches!(
			AlloyChainReader::new("not a url"),
			Err(RpcError::InvalidUrl(_))
		));
	}

	#[tokio::test]
	async fn test_reserve_lookup_requires_pool() {
		let reader = AlloyChainReader::new("http://localhost:8545").unwrap();
		let err = reader.reserve_id(Address::ZERO).await.unwrap_err();
		assert!(matches!(err, ServiceError::Contract(_)));
	}

	#[test]
	fn test_call_errors_split_transport_from_contract() {
		let err = call_error(
			"nonces(address)",
			Address::ZERO,
			alloy_transport::TransportErrorKind::custom_str("connection refused"),
		);
		assert!(matches!(err, ServiceError::Network(ref m) if m.contains("connection refused")));

		let err = call_error("nonces(address)", Address::ZERO, TransportError::NullResp);
		assert!(matches!(err, ServiceError::Contract(_)));
	}

	#[test]
	fn test_missing_counter_keeps_network_errors() {
		assert_eq!(missing_counter(Ok(7u8)).unwrap(), Some(7));
		assert_eq!(
			missing_counter::<u8>(Err(ServiceError::Contract("reverted".into()))).unwrap(),
			None
		);
		assert_eq!(
			missing_counter::<u8>(Err(ServiceError::Decode("short return".into()))).unwrap(),
			None
		);
		assert!(matches!(
			missing_counter::<u8>(Err(ServiceError::Network("timed out".into()))),
			Err(ServiceError::Network(_))
		));
	}

	#[tokio::test]
	async fn test_nonce_propagates_unreachable_provider() {
		let reader = AlloyChainReader::new("http://127.0.0.1:1").unwrap();
		let err = reader.nonce(Address::ZERO, Address::ZERO).await.unwrap_err();
		assert!(matches!(err, ServiceError::Network(_)));
	}

	#[tokio::test]
	async fn test_resolution_without_registry_is_none() {
		let reader = AlloyChainReader::new("http://localhost:8545")
			.unwrap()
			.with_ens_registry(None);
		assert_eq!(reader.resolve("vitalik.eth").await.unwrap(), None);
	}
}
