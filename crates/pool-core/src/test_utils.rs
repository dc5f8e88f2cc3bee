//! In-memory collaborators for tests.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use pool_types::{
	NameResolver, NetworkService, NonceService, ReserveIndex, ServiceError, TokenService,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const CHAIN_ID: u64 = 31337;
const GAS_PRICE: u128 = 2_000_000_000;

/// A chain snapshot implementing every read-only collaborator.
///
/// Unknown allowances read as zero, unknown nonces as "no permit support",
/// and unknown tokens or reserve ids as contract errors.
#[derive(Default)]
pub struct MockChain {
	tokens: HashMap<Address, (String, u8)>,
	allowances: HashMap<(Address, Address, Address), U256>,
	borrow_allowances: HashMap<(Address, Address, Address), U256>,
	nonces: HashMap<(Address, Address), U256>,
	names: HashMap<String, Address>,
	reserves: HashMap<Address, u16>,
	fail_allowance: bool,
	fail_nonce: bool,
	pub network_reads: AtomicUsize,
	pub decimals_reads: AtomicUsize,
}

impl MockChain {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_token(mut self, token: Address, name: &str, decimals: u8) -> Self {
		self.tokens.insert(token, (name.to_string(), decimals));
		self
	}

	pub fn with_allowance(
		mut self,
		token: Address,
		owner: Address,
		spender: Address,
		value: U256,
	) -> Self {
		self.allowances.insert((token, owner, spender), value);
		self
	}

	pub fn with_borrow_allowance(
		mut self,
		debt_token: Address,
		delegator: Address,
		delegatee: Address,
		value: U256,
	) -> Self {
		self.borrow_allowances
			.insert((debt_token, delegator, delegatee), value);
		self
	}

	pub fn with_nonce(mut self, token: Address, owner: Address, nonce: U256) -> Self {
		self.nonces.insert((token, owner), nonce);
		self
	}

	pub fn with_name(mut self, name: &str, address: Address) -> Self {
		self.names.insert(name.to_string(), address);
		self
	}

	pub fn with_reserve(mut self, asset: Address, id: u16) -> Self {
		self.reserves.insert(asset, id);
		self
	}

	/// Makes every allowance read fail with a network error.
	pub fn failing_allowance(mut self) -> Self {
		self.fail_allowance = true;
		self
	}

	/// Makes every nonce read fail with a network error.
	pub fn failing_nonce(mut self) -> Self {
		self.fail_nonce = true;
		self
	}

	pub fn chain_id_value(&self) -> u64 {
		CHAIN_ID
	}

	fn token(&self, token: Address) -> Result<&(String, u8), ServiceError> {
		self.tokens
			.get(&token)
			.ok_or_else(|| ServiceError::Contract(format!("{} is not a token", token)))
	}
}

#[async_trait]
impl TokenService for MockChain {
	async fn decimals(&self, token: Address) -> Result<u8, ServiceError> {
		self.decimals_reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.token(token)?.1)
	}

	async fn name(&self, token: Address) -> Result<String, ServiceError> {
		Ok(self.token(token)?.0.clone())
	}

	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ServiceError> {
		if self.fail_allowance {
			return Err(ServiceError::Network("connection refused".into()));
		}
		Ok(self
			.allowances
			.get(&(token, owner, spender))
			.copied()
			.unwrap_or_default())
	}

	async fn borrow_allowance(
		&self,
		debt_token: Address,
		delegator: Address,
		delegatee: Address,
	) -> Result<U256, ServiceError> {
		Ok(self
			.borrow_allowances
			.get(&(debt_token, delegator, delegatee))
			.copied()
			.unwrap_or_default())
	}
}

#[async_trait]
impl NonceService for MockChain {
	async fn nonce(&self, token: Address, owner: Address) -> Result<Option<U256>, ServiceError> {
		if self.fail_nonce {
			return Err(ServiceError::Network("connection reset".into()));
		}
		Ok(self.nonces.get(&(token, owner)).copied())
	}
}

#[async_trait]
impl NetworkService for MockChain {
	async fn chain_id(&self) -> Result<u64, ServiceError> {
		self.network_reads.fetch_add(1, Ordering::SeqCst);
		Ok(CHAIN_ID)
	}

	async fn gas_price(&self) -> Result<u128, ServiceError> {
		self.network_reads.fetch_add(1, Ordering::SeqCst);
		Ok(GAS_PRICE)
	}
}

#[async_trait]
impl NameResolver for MockChain {
	async fn resolve(&self, name: &str) -> Result<Option<Address>, ServiceError> {
		Ok(self.names.get(name).copied())
	}
}

#[async_trait]
impl ReserveIndex for MockChain {
	async fn reserve_id(&self, asset: Address) -> Result<u16, ServiceError> {
		self.reserves
			.get(&asset)
			.copied()
			.ok_or_else(|| ServiceError::Contract(format!("{} is not a reserve", asset)))
	}
}
