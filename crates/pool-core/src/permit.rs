//! EIP-2612 permits.
//!
//! A permit lets the pool pull tokens on the strength of an off-chain
//! signature instead of a prior approval transaction. This module builds the
//! typed-data payload the user signs and splits the returned signature into
//! the `v`, `r`, `s` triple the pool expects in calldata.

use crate::contracts::Permit;
use alloy_primitives::{Address, PrimitiveSignature, B256, U256};
use alloy_sol_types::{eip712_domain, SolStruct};
use pool_types::{
	Amount, NetworkService, NonceService, PermitSignature, ServiceError, TokenService,
	ValidationError,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a permit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermitRequest {
	/// Serialized typed-data payload to sign.
	TypedData(String),
	/// The token has no retrievable permit nonce; fall back to an approval.
	NotApplicable,
	/// Required configuration is missing.
	Unavailable,
}

impl PermitRequest {
	/// Wire form: the JSON payload, `""`, or `"[]"`.
	pub fn to_wire_string(&self) -> String {
		match self {
			PermitRequest::TypedData(payload) => payload.clone(),
			PermitRequest::NotApplicable => String::new(),
			PermitRequest::Unavailable => "[]".to_string(),
		}
	}
}

/// Everything that goes into a permit message and its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitParams {
	pub token: Address,
	pub token_name: String,
	pub chain_id: u64,
	pub owner: Address,
	pub spender: Address,
	pub value: U256,
	pub nonce: U256,
	pub deadline: u64,
}

impl PermitParams {
	/// Typed-data payload in the `eth_signTypedData_v4` shape.
	pub fn typed_data(&self) -> serde_json::Value {
		json!({
			"types": {
				"EIP712Domain": [
					{ "name": "name", "type": "string" },
					{ "name": "version", "type": "string" },
					{ "name": "chainId", "type": "uint256" },
					{ "name": "verifyingContract", "type": "address" },
				],
				"Permit": [
					{ "name": "owner", "type": "address" },
					{ "name": "spender", "type": "address" },
					{ "name": "value", "type": "uint256" },
					{ "name": "nonce", "type": "uint256" },
					{ "name": "deadline", "type": "uint256" },
				],
			},
			"primaryType": "Permit",
			"domain": {
				"name": self.token_name,
				"version": "1",
				"chainId": self.chain_id,
				"verifyingContract": self.token.to_string(),
			},
			"message": {
				"owner": self.owner.to_string(),
				"spender": self.spender.to_string(),
				"value": self.value.to_string(),
				"nonce": self.nonce.to_string(),
				"deadline": self.deadline.to_string(),
			},
		})
	}

	/// The EIP-712 digest a wallet signs for this payload.
	pub fn signing_hash(&self) -> B256 {
		let domain = eip712_domain! {
			name: self.token_name.clone(),
			version: "1",
			chain_id: self.chain_id,
			verifying_contract: self.token,
		};
		Permit {
			owner: self.owner,
			spender: self.spender,
			value: self.value,
			nonce: self.nonce,
			deadline: U256::from(self.deadline),
		}
		.eip712_signing_hash(&domain)
	}
}

/// Splits a hex signature blob into `{v, r, s}`.
///
/// Accepts the 65-byte `r ‖ s ‖ v` form and the 64-byte EIP-2098 compact
/// form. `v` is always returned as 27 or 28.
pub fn split_signature(blob: &str) -> Result<PermitSignature, ValidationError> {
	let invalid = |reason: &str| ValidationError::InvalidSignature(format!("{}: {}", blob, reason));

	let bytes = hex::decode(blob.strip_prefix("0x").unwrap_or(blob))
		.map_err(|_| invalid("not hex"))?;

	let signature = match bytes.len() {
		65 => PrimitiveSignature::try_from(bytes.as_slice())
			.map_err(|e| invalid(&e.to_string()))?,
		64 => PrimitiveSignature::from_erc2098(&bytes),
		_ => return Err(invalid("expected 64 or 65 bytes")),
	};

	Ok(PermitSignature {
		v: 27 + u8::from(signature.v()),
		r: B256::from(signature.r().to_be_bytes::<32>()),
		s: B256::from(signature.s().to_be_bytes::<32>()),
	})
}

/// Builds permit requests from live token state.
#[derive(Clone)]
pub struct PermitAssembler {
	tokens: Arc<dyn TokenService>,
	nonces: Arc<dyn NonceService>,
	network: Arc<dyn NetworkService>,
}

impl PermitAssembler {
	pub fn new(
		tokens: Arc<dyn TokenService>,
		nonces: Arc<dyn NonceService>,
		network: Arc<dyn NetworkService>,
	) -> Self {
		Self {
			tokens,
			nonces,
			network,
		}
	}

	/// Reads nonce, name and chain id, then builds the typed-data request.
	///
	/// The entire-balance amount signs over the maximum integer, which is what
	/// the pool will check against.
	pub async fn request(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
		amount: &Amount,
		deadline: u64,
	) -> Result<PermitRequest, ServiceError> {
		let Some(nonce) = self.nonces.nonce(token, owner).await? else {
			debug!(token = %token, "Permit not applicable, no nonce available");
			return Ok(PermitRequest::NotApplicable);
		};

		let params = PermitParams {
			token,
			token_name: self.tokens.name(token).await?,
			chain_id: self.network.chain_id().await?,
			owner,
			spender,
			value: amount.value(),
			nonce,
			deadline,
		};

		Ok(PermitRequest::TypedData(params.typed_data().to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::MockChain;
	use alloy_primitives::address;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use pool_types::AmountUnits;

	const TOKEN: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
	const SPENDER: Address = address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2");

	fn params(owner: Address) -> PermitParams {
		PermitParams {
			token: TOKEN,
			token_name: "Dai Stablecoin".to_string(),
			chain_id: 1,
			owner,
			spender: SPENDER,
			value: U256::from(1_000u64),
			nonce: U256::from(3u8),
			deadline: 1_700_000_000,
		}
	}

	#[test]
	fn test_typed_data_shape() {
		let data = params(Address::repeat_byte(0x11)).typed_data();
		assert_eq!(data["primaryType"], "Permit");
		assert_eq!(data["domain"]["name"], "Dai Stablecoin");
		assert_eq!(data["domain"]["version"], "1");
		assert_eq!(data["domain"]["chainId"], 1);
		assert_eq!(data["domain"]["verifyingContract"], TOKEN.to_string());
		assert_eq!(data["message"]["value"], "1000");
		assert_eq!(data["message"]["nonce"], "3");
		assert_eq!(data["message"]["deadline"], "1700000000");
		assert_eq!(data["types"]["Permit"].as_array().unwrap().len(), 5);
	}

	#[test]
	fn test_split_signature_recovers_signer() {
		let signer = PrivateKeySigner::random();
		let params = params(signer.address());
		let hash = params.signing_hash();
		let signature = signer.sign_hash_sync(&hash).unwrap();

		let blob = format!("0x{}", hex::encode(signature.as_bytes()));
		let split = split_signature(&blob).unwrap();
		assert!(split.v == 27 || split.v == 28);

		let rebuilt = PrimitiveSignature::new(
			U256::from_be_bytes(split.r.0),
			U256::from_be_bytes(split.s.0),
			split.v == 28,
		);
		let recovered = rebuilt.recover_address_from_prehash(&hash).unwrap();
		assert_eq!(recovered, signer.address());
	}

	#[test]
	fn test_split_normalizes_zero_one_recovery_id() {
		let mut bytes = vec![0x11u8; 64];
		bytes.push(1);
		let split = split_signature(&hex::encode(&bytes)).unwrap();
		assert_eq!(split.v, 28);
		assert_eq!(split.r, B256::repeat_byte(0x11));
	}

	#[test]
	fn test_split_compact_signature() {
		let mut bytes = vec![0x22u8; 32];
		let mut vs = vec![0x33u8; 32];
		vs[0] |= 0x80;
		bytes.extend_from_slice(&vs);

		let split = split_signature(&hex::encode(&bytes)).unwrap();
		assert_eq!(split.v, 28);
		assert_eq!(split.r, B256::repeat_byte(0x22));
		assert_eq!(split.s, B256::repeat_byte(0x33));
	}

	#[test]
	fn test_split_rejects_malformed_blobs() {
		let mut bad_v = vec![0u8; 64];
		bad_v.push(5);
		for blob in ["0x1234".to_string(), "zz".to_string(), hex::encode(bad_v)] {
			assert!(matches!(
				split_signature(&blob),
				Err(ValidationError::InvalidSignature(_))
			));
		}
	}

	#[tokio::test]
	async fn test_request_without_nonce_is_not_applicable() {
		let chain = Arc::new(MockChain::new());
		let assembler = PermitAssembler::new(chain.clone(), chain.clone(), chain.clone());
		let owner = Address::repeat_byte(0x44);

		let request = assembler
			.request(TOKEN, owner, SPENDER, &Amount::EntireBalance, 1)
			.await
			.unwrap();
		assert_eq!(request, PermitRequest::NotApplicable);
		assert_eq!(request.to_wire_string(), "");
		assert_eq!(PermitRequest::Unavailable.to_wire_string(), "[]");
	}

	#[tokio::test]
	async fn test_request_encodes_max_for_entire_balance() {
		let owner = Address::repeat_byte(0x44);
		let chain = Arc::new(
			MockChain::new()
				.with_token(TOKEN, "Dai Stablecoin", 18)
				.with_nonce(TOKEN, owner, U256::from(7u8)),
		);
		let assembler = PermitAssembler::new(chain.clone(), chain.clone(), chain.clone());

		let request = assembler
			.request(TOKEN, owner, SPENDER, &Amount::EntireBalance, 99)
			.await
			.unwrap();
		let PermitRequest::TypedData(payload) = request else {
			panic!("expected typed data");
		};
		let data: serde_json::Value = serde_json::from_str(&payload).unwrap();
		assert_eq!(data["message"]["value"], U256::MAX.to_string());
		assert_eq!(data["message"]["nonce"], "7");
		assert_eq!(data["domain"]["chainId"], chain.chain_id_value());

		let exact = Amount::Exact(AmountUnits::new(U256::from(5u8), 18));
		let PermitRequest::TypedData(payload) = assembler
			.request(TOKEN, owner, SPENDER, &exact, 99)
			.await
			.unwrap()
		else {
			panic!("expected typed data");
		};
		assert!(payload.contains("\"value\":\"5\""));
	}
}
