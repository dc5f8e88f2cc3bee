//! Conversion of human decimal amounts into token base units.
//!
//! Amounts are handled as exact decimal digit strings throughout. A value is
//! parsed into a mantissa and a scale (`"123.45"` is `12345 × 10^-2`) and only
//! ever multiplied or divided by powers of ten, so no precision is lost before
//! the final truncation to base units. The mantissa is 512 bits wide so a
//! `U256` integer part can carry a full fraction.

use alloy_primitives::{aliases::U512, U256};
use pool_types::{Amount, AmountUnits, ValidationError, ENTIRE_BALANCE_SENTINEL};
use std::fmt;

/// Fractional digits kept by the parser. Anything past this cannot change
/// a base-unit value for tokens with up to this many decimals.
const MAX_FRACTION_DIGITS: usize = 77;

/// Largest power of ten a `U512` can hold.
const MAX_POW10: u32 = 154;

/// Whether an operation accepts the entire-balance sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountRule {
	Positive,
	PositiveOrEntireBalance,
}

/// An exact, strictly positive decimal value: `digits × 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanAmount {
	digits: U512,
	scale: u32,
}

impl HumanAmount {
	pub(crate) fn from_parts(digits: U512, scale: u32) -> Self {
		Self { digits, scale }.normalized()
	}

	pub fn digits(&self) -> U512 {
		self.digits
	}

	pub fn scale(&self) -> u32 {
		self.scale
	}

	fn normalized(mut self) -> Self {
		let ten = U512::from(10u8);
		while self.scale > 0 && !self.digits.is_zero() && (self.digits % ten).is_zero() {
			self.digits /= ten;
			self.scale -= 1;
		}
		self
	}
}

impl fmt::Display for HumanAmount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let digits = self.digits.to_string();
		let scale = self.scale as usize;
		if scale == 0 {
			return write!(f, "{}", digits);
		}
		if digits.len() > scale {
			let (int, frac) = digits.split_at(digits.len() - scale);
			write!(f, "{}.{}", int, frac)
		} else {
			write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
		}
	}
}

/// A caller amount after parsing, before unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedAmount {
	Value(HumanAmount),
	EntireBalance,
}

impl ParsedAmount {
	pub fn is_entire_balance(&self) -> bool {
		matches!(self, ParsedAmount::EntireBalance)
	}
}

/// True only for the exact reserved literal.
pub fn is_entire_balance_sentinel(raw: &str) -> bool {
	raw == ENTIRE_BALANCE_SENTINEL
}

/// Parses a caller amount, accepting the sentinel only where `rule` allows it.
pub fn parse_amount(raw: &str, rule: AmountRule) -> Result<ParsedAmount, ValidationError> {
	if is_entire_balance_sentinel(raw) {
		return match rule {
			AmountRule::PositiveOrEntireBalance => Ok(ParsedAmount::EntireBalance),
			AmountRule::Positive => Err(ValidationError::NonPositiveAmount(raw.to_string())),
		};
	}
	parse_decimal(raw).map(ParsedAmount::Value)
}

/// Parses a strictly positive plain decimal (`"1"`, `"0.5"`, `".5"`, `"10."`).
///
/// The integer part must fit a `U256`; the fraction is truncated to
/// [`MAX_FRACTION_DIGITS`] digits.
pub fn parse_decimal(raw: &str) -> Result<HumanAmount, ValidationError> {
	let invalid = || ValidationError::NonPositiveAmount(raw.to_string());

	let (int_part, frac_part) = match raw.split_once('.') {
		Some((int, frac)) => (int, frac),
		None => (raw, ""),
	};
	if int_part.is_empty() && frac_part.is_empty() {
		return Err(invalid());
	}
	if !int_part.bytes().all(|b| b.is_ascii_digit())
		|| !frac_part.bytes().all(|b| b.is_ascii_digit())
	{
		return Err(invalid());
	}

	let overflow = || ValidationError::AmountOverflow(raw.to_string());
	let int_part = int_part.trim_start_matches('0');
	if !int_part.is_empty() {
		U256::from_str_radix(int_part, 10).map_err(|_| overflow())?;
	}

	let kept = frac_part.len().min(MAX_FRACTION_DIGITS);
	let frac_part = frac_part[..kept].trim_end_matches('0');
	let combined = format!("{}{}", int_part, frac_part);
	let significant = combined.trim_start_matches('0');
	if significant.is_empty() {
		return Err(invalid());
	}

	let digits = U512::from_str_radix(significant, 10).map_err(|_| overflow())?;
	Ok(HumanAmount::from_parts(digits, frac_part.len() as u32))
}

/// `floor(amount × 10^decimals)`.
///
/// Fails with `NonPositiveAmount` when the result truncates to zero, so a
/// dust amount can never become an "approve nothing" call.
pub fn to_base_units(amount: &HumanAmount, decimals: u8) -> Result<AmountUnits, ValidationError> {
	let decimals_u32 = u32::from(decimals);
	let value = if decimals_u32 >= amount.scale {
		let factor = pow10(decimals_u32 - amount.scale)
			.ok_or_else(|| ValidationError::AmountOverflow(amount.to_string()))?;
		amount
			.digits
			.checked_mul(factor)
			.ok_or_else(|| ValidationError::AmountOverflow(amount.to_string()))?
	} else {
		match pow10(amount.scale - decimals_u32) {
			Some(divisor) => amount.digits / divisor,
			None => U512::ZERO,
		}
	};

	if value.is_zero() {
		return Err(ValidationError::NonPositiveAmount(amount.to_string()));
	}
	let value = U256::checked_from_uint(value)
		.ok_or_else(|| ValidationError::AmountOverflow(amount.to_string()))?;
	Ok(AmountUnits::new(value, decimals))
}

/// Converts a parsed amount, mapping the sentinel straight to [`Amount::EntireBalance`].
pub fn to_amount(parsed: &ParsedAmount, decimals: u8) -> Result<Amount, ValidationError> {
	match parsed {
		ParsedAmount::EntireBalance => Ok(Amount::EntireBalance),
		ParsedAmount::Value(human) => to_base_units(human, decimals).map(Amount::Exact),
	}
}

pub(crate) fn pow10(exp: u32) -> Option<U512> {
	if exp > MAX_POW10 {
		return None;
	}
	U512::from(10u8).checked_pow(U512::from(exp))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn units(raw: &str, decimals: u8) -> U256 {
		to_base_units(&parse_decimal(raw).unwrap(), decimals)
			.unwrap()
			.value()
	}

	#[test]
	fn test_exact_conversion() {
		assert_eq!(
			units("123.456", 18),
			U256::from(123_456_000_000_000_000_000u128)
		);
		assert_eq!(units("1", 6), U256::from(1_000_000u64));
		assert_eq!(units(".5", 6), U256::from(500_000u64));
		assert_eq!(units("10.", 0), U256::from(10u64));
		assert_eq!(units("0001.2300", 2), U256::from(123u64));
	}

	#[test]
	fn test_conversion_truncates() {
		assert_eq!(units("1.999999", 2), U256::from(199u64));
		assert_eq!(units("0.0000019", 6), U256::from(1u64));
	}

	#[test]
	fn test_dust_that_truncates_to_zero_is_rejected() {
		let err = to_base_units(&parse_decimal("0.0000001").unwrap(), 6).unwrap_err();
		assert!(matches!(err, ValidationError::NonPositiveAmount(_)));
	}

	#[test]
	fn test_rejects_non_positive_and_malformed() {
		for raw in ["0", "0.000", "-5", "-1.0", "abc", "", ".", "1e18", "1.2.3", " 1", "+1"] {
			let err = parse_amount(raw, AmountRule::PositiveOrEntireBalance).unwrap_err();
			assert!(
				matches!(err, ValidationError::NonPositiveAmount(ref v) if v == raw),
				"{:?} -> {:?}",
				raw,
				err
			);
		}
	}

	#[test]
	fn test_sentinel_is_exact_literal() {
		assert!(is_entire_balance_sentinel("-1"));
		assert!(!is_entire_balance_sentinel("-1.0"));
		assert!(!is_entire_balance_sentinel("-01"));

		let parsed = parse_amount("-1", AmountRule::PositiveOrEntireBalance).unwrap();
		assert!(parsed.is_entire_balance());
		assert_eq!(to_amount(&parsed, 6).unwrap().value(), U256::MAX);
		assert_eq!(to_amount(&parsed, 18).unwrap().value(), U256::MAX);

		let err = parse_amount("-1", AmountRule::Positive).unwrap_err();
		assert!(matches!(err, ValidationError::NonPositiveAmount(_)));
	}

	#[test]
	fn test_overflow() {
		let too_many_digits = "9".repeat(79);
		assert!(matches!(
			parse_decimal(&too_many_digits),
			Err(ValidationError::AmountOverflow(_))
		));

		let fits = "1".repeat(70);
		assert!(matches!(
			to_base_units(&parse_decimal(&fits).unwrap(), 18),
			Err(ValidationError::AmountOverflow(_))
		));
	}

	#[test]
	fn test_long_fraction_is_floored() {
		let repeating = format!("1.{}", "1".repeat(80));
		assert_eq!(
			units(&repeating, 18),
			U256::from(1_111_111_111_111_111_111u128)
		);

		let just_over_one_wei = format!("0.{}1{}", "0".repeat(17), "9".repeat(70));
		assert_eq!(units(&just_over_one_wei, 18), U256::from(1u8));

		let max_with_fraction = format!("{}.{}", U256::MAX, "9".repeat(90));
		assert_eq!(units(&max_with_fraction, 0), U256::MAX);
	}

	#[test]
	fn test_fraction_past_kept_digits_is_zero() {
		let raw = format!("0.{}1", "0".repeat(100));
		let err = parse_decimal(&raw).unwrap_err();
		assert!(matches!(err, ValidationError::NonPositiveAmount(ref v) if *v == raw));
	}

	#[test]
	fn test_display_round_trips_normalized_form() {
		assert_eq!(parse_decimal("0001.2300").unwrap().to_string(), "1.23");
		assert_eq!(parse_decimal("0.005").unwrap().to_string(), "0.005");
		assert_eq!(parse_decimal("1500").unwrap().to_string(), "1500");
	}
}
