//! Amount value objects.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved caller literal meaning "use the entire balance or debt".
pub const ENTIRE_BALANCE_SENTINEL: &str = "-1";

/// An integer amount in a token's base units, together with the precision
/// used to produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountUnits {
	value: U256,
	decimals: u8,
}

impl AmountUnits {
	pub fn new(value: U256, decimals: u8) -> Self {
		Self { value, decimals }
	}

	pub fn value(&self) -> U256 {
		self.value
	}

	pub fn decimals(&self) -> u8 {
		self.decimals
	}
}

impl fmt::Display for AmountUnits {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.value)
	}
}

/// A converted amount as it will be placed in calldata.
///
/// The entire-balance sentinel never goes through unit conversion; it is
/// encoded as the maximum unsigned integer so the receiving contract resolves
/// the real balance at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
	Exact(AmountUnits),
	EntireBalance,
}

impl Amount {
	/// The on-chain value for this amount.
	pub fn value(&self) -> U256 {
		match self {
			Amount::Exact(units) => units.value(),
			Amount::EntireBalance => U256::MAX,
		}
	}

	pub fn is_entire_balance(&self) -> bool {
		matches!(self, Amount::EntireBalance)
	}
}

impl From<AmountUnits> for Amount {
	fn from(units: AmountUnits) -> Self {
		Amount::Exact(units)
	}
}
