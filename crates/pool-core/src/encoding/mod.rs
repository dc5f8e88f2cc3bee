//! Calldata encoders.
//!
//! Two encodings of the same pool actions: [`standard`] ABI-encodes calls
//! against the primary pool, [`compact`] packs the arguments into `bytes32`
//! words for the calldata-optimized pool. Both decode back to a
//! [`LogicalCall`], which is how their equivalence is checked.

use alloy_primitives::{Address, U256};

pub mod compact;
pub mod standard;

/// The protocol-level meaning of a pool call, independent of its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalCall {
	pub asset: Address,
	pub amount: U256,
	pub rate_mode: u8,
	pub referral_code: u16,
	pub on_behalf_of: Address,
}
