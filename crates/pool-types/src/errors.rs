//! Error taxonomy shared across the workspace.
//!
//! Validation errors describe malformed caller input and always carry the
//! offending value. Service errors describe failures of the external
//! collaborators (RPC reads, cache backends) and are propagated unchanged.

use thiserror::Error;

/// Errors raised synchronously when a caller intent is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	/// The value is not a well-formed (or correctly checksummed) address.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// A human-readable name could not be resolved to an address.
	#[error("Unresolvable name: {0}")]
	UnresolvableName(String),
	/// The amount is zero, negative (other than the sentinel) or unparsable.
	#[error("Amount must be a positive decimal: {0}")]
	NonPositiveAmount(String),
	/// The amount does not fit the target integer width.
	#[error("Amount out of range: {0}")]
	AmountOverflow(String),
	/// A list that must contain at least one element was empty.
	#[error("List must not be empty: {0}")]
	EmptyList(String),
	/// A field required by the selected branch was not supplied.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A permit signature blob could not be split.
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
	/// A field holds a value the operation does not accept.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
}

impl ValidationError {
	/// Shorthand for [`ValidationError::InvalidValue`].
	pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}

/// Errors reported by external collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
	/// Error that occurs when the provider cannot be reached.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a contract call reverts or is rejected.
	#[error("Contract call failed: {0}")]
	Contract(String),
	/// Error that occurs when a return value cannot be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
	/// Error that occurs in the metadata cache backend.
	#[error("Cache error: {0}")]
	Cache(String),
}
