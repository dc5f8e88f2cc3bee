//! Token metadata caching.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use pool_cache::{CacheError, CacheService};
use pool_types::{ServiceError, TokenService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DECIMALS: &str = "decimals";
const NAME: &str = "name";

/// [`TokenService`] decorator that caches decimals and names.
///
/// Allowances pass straight through: they change with every approval.
pub struct CachedTokenService {
	inner: Arc<dyn TokenService>,
	cache: CacheService,
	ttl: Duration,
}

impl CachedTokenService {
	pub fn new(inner: Arc<dyn TokenService>, cache: CacheService, ttl: Duration) -> Self {
		Self { inner, cache, ttl }
	}

	async fn cached<T>(&self, namespace: &str, token: Address) -> Option<T>
	where
		T: serde::de::DeserializeOwned,
	{
		match self.cache.lookup(namespace, &token.to_string()).await {
			Ok(hit) => hit,
			Err(e) => {
				warn!(
					token = %token,
					namespace,
					error = %e,
					"Cache read failed, falling back to chain"
				);
				None
			}
		}
	}

	async fn remember<T>(
		&self,
		namespace: &str,
		token: Address,
		value: &T,
	) -> Result<(), ServiceError>
	where
		T: serde::Serialize,
	{
		self.cache
			.store_with_ttl(namespace, &token.to_string(), value, Some(self.ttl))
			.await
			.map_err(cache_error)
	}
}

fn cache_error(e: CacheError) -> ServiceError {
	ServiceError::Cache(e.to_string())
}

#[async_trait]
impl TokenService for CachedTokenService {
	async fn decimals(&self, token: Address) -> Result<u8, ServiceError> {
		if let Some(decimals) = self.cached::<u8>(DECIMALS, token).await {
			return Ok(decimals);
		}
		let decimals = self.inner.decimals(token).await?;
		debug!(token = %token, decimals, "Caching token decimals");
		self.remember(DECIMALS, token, &decimals).await?;
		Ok(decimals)
	}

	async fn name(&self, token: Address) -> Result<String, ServiceError> {
		if let Some(name) = self.cached::<String>(NAME, token).await {
			return Ok(name);
		}
		let name = self.inner.name(token).await?;
		self.remember(NAME, token, &name).await?;
		Ok(name)
	}

	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ServiceError> {
		self.inner.allowance(token, owner, spender).await
	}

	async fn borrow_allowance(
		&self,
		debt_token: Address,
		delegator: Address,
		delegatee: Address,
	) -> Result<U256, ServiceError> {
		self.inner
			.borrow_allowance(debt_token, delegator, delegatee)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::MockChain;
	use pool_cache::implementations::memory::MemoryCache;
	use std::sync::atomic::Ordering;

	const TOKEN: Address = Address::ZERO;

	fn cached(chain: &Arc<MockChain>) -> CachedTokenService {
		CachedTokenService::new(
			chain.clone(),
			CacheService::new(Arc::new(MemoryCache::new())),
			Duration::from_secs(60),
		)
	}

	#[tokio::test(start_paused = true)]
	async fn test_decimals_read_once_until_expiry() {
		let chain = Arc::new(MockChain::new().with_token(TOKEN, "USD Coin", 6));
		let tokens = cached(&chain);

		assert_eq!(tokens.decimals(TOKEN).await.unwrap(), 6);
		assert_eq!(tokens.decimals(TOKEN).await.unwrap(), 6);
		assert_eq!(chain.decimals_reads.load(Ordering::SeqCst), 1);

		tokio::time::advance(Duration::from_secs(61)).await;
		assert_eq!(tokens.decimals(TOKEN).await.unwrap(), 6);
		assert_eq!(chain.decimals_reads.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_name_cached_and_allowance_not() {
		let owner = Address::repeat_byte(1);
		let spender = Address::repeat_byte(2);
		let chain = Arc::new(
			MockChain::new()
				.with_token(TOKEN, "USD Coin", 6)
				.with_allowance(TOKEN, owner, spender, U256::from(9u8)),
		);
		let tokens = cached(&chain);

		assert_eq!(tokens.name(TOKEN).await.unwrap(), "USD Coin");
		assert_eq!(tokens.name(TOKEN).await.unwrap(), "USD Coin");
		assert_eq!(
			tokens.allowance(TOKEN, owner, spender).await.unwrap(),
			U256::from(9u8)
		);
	}

	#[tokio::test]
	async fn test_upstream_error_not_cached() {
		let chain = Arc::new(MockChain::new());
		let tokens = cached(&chain);
		assert!(tokens.decimals(TOKEN).await.is_err());
		assert!(tokens.decimals(TOKEN).await.is_err());
		assert_eq!(chain.decimals_reads.load(Ordering::SeqCst), 2);
	}
}
