//! Address validation pipeline.
//!
//! Every orchestrator operation validates its address fields here before any
//! amount conversion or encoding happens. Plain addresses must be `0x`
//! followed by 40 hex digits, and mixed-case input must carry a valid
//! EIP-55 checksum. Dotted names are resolved through the injected
//! [`NameResolver`].

use crate::PoolError;
use alloy_primitives::Address;
use pool_types::{NameResolver, ValidationError};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Default)]
pub struct AddressValidator {
	resolver: Option<Arc<dyn NameResolver>>,
}

impl AddressValidator {
	pub fn new(resolver: Option<Arc<dyn NameResolver>>) -> Self {
		Self { resolver }
	}

	/// Validates (and if necessary resolves) a single address.
	pub async fn validate(&self, value: &str) -> Result<Address, PoolError> {
		if is_name(value) {
			return self.resolve(value).await;
		}
		parse_address(value).map_err(PoolError::from)
	}

	/// Validates an optional field, falling back to `default` when absent.
	pub async fn validate_or(
		&self,
		value: Option<&str>,
		default: Address,
	) -> Result<Address, PoolError> {
		match value {
			Some(v) => self.validate(v).await,
			None => Ok(default),
		}
	}

	/// Validates a list that must contain at least one address.
	///
	/// Fails on the first invalid entry.
	pub async fn validate_all(
		&self,
		field: &str,
		values: &[String],
	) -> Result<Vec<Address>, PoolError> {
		if values.is_empty() {
			return Err(ValidationError::EmptyList(field.to_string()).into());
		}
		let mut addresses = Vec::with_capacity(values.len());
		for value in values {
			addresses.push(self.validate(value).await?);
		}
		Ok(addresses)
	}

	async fn resolve(&self, name: &str) -> Result<Address, PoolError> {
		let resolver = self
			.resolver
			.as_ref()
			.ok_or_else(|| ValidationError::UnresolvableName(name.to_string()))?;

		match resolver.resolve(name).await? {
			Some(address) => {
				debug!(name, address = %address, "Resolved name");
				Ok(address)
			}
			None => Err(ValidationError::UnresolvableName(name.to_string()).into()),
		}
	}
}

fn is_name(value: &str) -> bool {
	!value.starts_with("0x") && value.contains('.')
}

/// Parses a hex address, enforcing the checksum on mixed-case input.
pub fn parse_address(value: &str) -> Result<Address, ValidationError> {
	let invalid = || ValidationError::InvalidAddress(value.to_string());

	let hex = value.strip_prefix("0x").ok_or_else(invalid)?;
	if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Err(invalid());
	}

	let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
	let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
	if has_lower && has_upper {
		Address::parse_checksummed(value, None).map_err(|_| invalid())
	} else {
		value.parse().map_err(|_| invalid())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::MockChain;
	use alloy_primitives::address;

	const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

	#[test]
	fn test_parse_address_accepts_valid_forms() {
		let expected = address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
		assert_eq!(parse_address(CHECKSUMMED).unwrap(), expected);
		assert_eq!(parse_address(&CHECKSUMMED.to_lowercase()).unwrap(), expected);
		assert_eq!(
			parse_address(&format!("0x{}", CHECKSUMMED[2..].to_uppercase())).unwrap(),
			expected
		);
	}

	#[test]
	fn test_parse_address_rejects_bad_input() {
		let bad_checksum = CHECKSUMMED.replace("aA", "Aa");
		for value in [
			"",
			"0x",
			"0x1234",
			"5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
			"0xZZAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
			bad_checksum.as_str(),
		] {
			let err = parse_address(value).unwrap_err();
			assert_eq!(err, ValidationError::InvalidAddress(value.to_string()));
		}
	}

	#[tokio::test]
	async fn test_names_resolve_through_resolver() {
		let target = address!("00000000000000000000000000000000000000aa");
		let chain = Arc::new(MockChain::new().with_name("alice.eth", target));
		let validator = AddressValidator::new(Some(chain));

		assert_eq!(validator.validate("alice.eth").await.unwrap(), target);
		let err = validator.validate("bob.eth").await.unwrap_err();
		assert!(matches!(
			err,
			PoolError::Validation(ValidationError::UnresolvableName(n)) if n == "bob.eth"
		));
	}

	#[tokio::test]
	async fn test_names_without_resolver_are_unresolvable() {
		let err = AddressValidator::default()
			.validate("alice.eth")
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			PoolError::Validation(ValidationError::UnresolvableName(_))
		));
	}

	#[tokio::test]
	async fn test_validate_all() {
		let validator = AddressValidator::default();

		let err = validator.validate_all("assets", &[]).await.unwrap_err();
		assert!(matches!(
			err,
			PoolError::Validation(ValidationError::EmptyList(f)) if f == "assets"
		));

		let values = vec![
			CHECKSUMMED.to_string(),
			"0xnope".to_string(),
			"also-bad".to_string(),
		];
		let err = validator.validate_all("assets", &values).await.unwrap_err();
		assert!(matches!(
			err,
			PoolError::Validation(ValidationError::InvalidAddress(v)) if v == "0xnope"
		));

		let ok = validator
			.validate_all("assets", &[CHECKSUMMED.to_string()])
			.await
			.unwrap();
		assert_eq!(ok.len(), 1);
	}
}
