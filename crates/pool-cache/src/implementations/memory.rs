//! In-memory cache backend.

use crate::{CacheError, CacheInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::trace;

struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_live(&self, now: Instant) -> bool {
		self.expires_at.map_or(true, |deadline| now < deadline)
	}
}

/// Process-local cache with per-entry expiry.
///
/// Expired entries are treated as absent and dropped lazily on access.
#[derive(Default)]
pub struct MemoryCache {
	entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl CacheInterface for MemoryCache {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, CacheError> {
		let now = Instant::now();
		{
			let entries = self.entries.read().await;
			match entries.get(key) {
				Some(entry) if entry.is_live(now) => return Ok(entry.value.clone()),
				Some(_) => {}
				None => return Err(CacheError::NotFound),
			}
		}

		trace!(key, "Evicting expired cache entry");
		let mut entries = self.entries.write().await;
		if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
			entries.remove(key);
		}
		Err(CacheError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), CacheError> {
		let expires_at = ttl.map(|ttl| Instant::now() + ttl);
		self.entries
			.write()
			.await
			.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), CacheError> {
		self.entries.write().await.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, CacheError> {
		let now = Instant::now();
		Ok(self
			.entries
			.read()
			.await
			.get(key)
			.is_some_and(|entry| entry.is_live(now)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn test_entries_expire_after_ttl() {
		let cache = MemoryCache::new();
		cache
			.set_bytes("k", vec![1, 2, 3], Some(Duration::from_secs(60)))
			.await
			.unwrap();

		tokio::time::advance(Duration::from_secs(59)).await;
		assert_eq!(cache.get_bytes("k").await.unwrap(), vec![1, 2, 3]);

		tokio::time::advance(Duration::from_secs(2)).await;
		assert!(!cache.exists("k").await.unwrap());
		assert!(matches!(cache.get_bytes("k").await, Err(CacheError::NotFound)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_entries_without_ttl_persist() {
		let cache = MemoryCache::new();
		cache.set_bytes("k", vec![9], None).await.unwrap();

		tokio::time::advance(Duration::from_secs(86_400)).await;
		assert!(cache.exists("k").await.unwrap());
	}

	#[tokio::test]
	async fn test_overwrite_and_delete() {
		let cache = MemoryCache::new();
		cache.set_bytes("k", vec![1], None).await.unwrap();
		cache.set_bytes("k", vec![2], None).await.unwrap();
		assert_eq!(cache.get_bytes("k").await.unwrap(), vec![2]);

		cache.delete("k").await.unwrap();
		cache.delete("k").await.unwrap();
		assert!(!cache.exists("k").await.unwrap());
	}
}
