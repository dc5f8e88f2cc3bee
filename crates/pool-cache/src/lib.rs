//! Injected metadata cache.
//!
//! Token metadata such as decimals and names never changes once a token is
//! deployed, so it is worth caching across orchestrator calls. The cache is an
//! explicit object owned by the caller: backends implement the byte-level
//! [`CacheInterface`], and [`CacheService`] adds typed, namespaced access on
//! top with JSON serialisation.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
	/// Error that occurs when a requested item is absent or expired.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the cache backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Low-level key-value interface for cache backends.
#[async_trait]
pub trait CacheInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, CacheError>;

	/// Stores raw bytes with optional time-to-live.
	async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
		-> Result<(), CacheError>;

	async fn delete(&self, key: &str) -> Result<(), CacheError>;

	async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}

/// Typed cache operations over a backend.
///
/// Cloning the service shares the backend.
#[derive(Clone)]
pub struct CacheService {
	backend: Arc<dyn CacheInterface>,
}

impl CacheService {
	pub fn new(backend: Arc<dyn CacheInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value with optional time-to-live.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), CacheError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| CacheError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes, ttl)
			.await
	}

	/// Retrieves and deserializes a value, failing with [`CacheError::NotFound`] on a miss.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, CacheError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization(e.to_string()))
	}

	/// Like [`CacheService::retrieve`] but maps a miss to `None`.
	pub async fn lookup<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, CacheError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(CacheError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), CacheError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	pub async fn contains(&self, namespace: &str, id: &str) -> Result<bool, CacheError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryCache;
	use super::*;

	#[tokio::test]
	async fn test_typed_round_trip_and_miss() {
		let cache = CacheService::new(Arc::new(MemoryCache::new()));

		cache
			.store_with_ttl("decimals", "0xabc", &18u8, None)
			.await
			.unwrap();
		assert_eq!(cache.lookup::<u8>("decimals", "0xabc").await.unwrap(), Some(18));
		assert_eq!(cache.lookup::<u8>("decimals", "0xdef").await.unwrap(), None);
		assert!(matches!(
			cache.retrieve::<u8>("name", "0xabc").await,
			Err(CacheError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_namespaces_are_disjoint() {
		let cache = CacheService::new(Arc::new(MemoryCache::new()));

		cache
			.store_with_ttl("name", "0xabc", &"Dai Stablecoin".to_string(), None)
			.await
			.unwrap();
		assert!(cache.contains("name", "0xabc").await.unwrap());
		assert!(!cache.contains("decimals", "0xabc").await.unwrap());

		cache.remove("name", "0xabc").await.unwrap();
		assert!(!cache.contains("name", "0xabc").await.unwrap());
	}

	#[tokio::test]
	async fn test_type_mismatch_is_serialization_error() {
		let cache = CacheService::new(Arc::new(MemoryCache::new()));

		cache
			.store_with_ttl("name", "0xabc", &"Dai".to_string(), None)
			.await
			.unwrap();
		assert!(matches!(
			cache.lookup::<u8>("name", "0xabc").await,
			Err(CacheError::Serialization(_))
		));
	}
}
