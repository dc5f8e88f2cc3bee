//! Percentage buffer for flash-loaned amounts.

use crate::amount::HumanAmount;
use alloy_primitives::aliases::U512;
use pool_types::ValidationError;
use rust_decimal::Decimal;

/// Returns `amount × (1 + percent / 100)`, computed exactly.
///
/// With `percent = m × 10^-p` the result is
/// `digits × (100 × 10^p + m) × 10^-(scale + p + 2)`.
pub fn with_surplus(
	amount: &HumanAmount,
	percent: Decimal,
) -> Result<HumanAmount, ValidationError> {
	if percent.is_sign_negative() {
		return Err(ValidationError::invalid(
			"surplus_percent",
			format!("{} is negative", percent),
		));
	}

	let overflow = || ValidationError::AmountOverflow(amount.to_string());

	let mantissa = U512::from(percent.mantissa().unsigned_abs());
	let percent_scale = percent.scale();
	let hundred = U512::from(100u8)
		.checked_mul(crate::amount::pow10(percent_scale).ok_or_else(overflow)?)
		.ok_or_else(overflow)?;
	let factor = hundred.checked_add(mantissa).ok_or_else(overflow)?;
	let digits = amount.digits().checked_mul(factor).ok_or_else(overflow)?;

	Ok(HumanAmount::from_parts(
		digits,
		amount.scale() + percent_scale + 2,
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::amount::{parse_decimal, to_base_units};
	use alloy_primitives::U256;

	fn surplus(raw: &str, percent: Decimal) -> String {
		with_surplus(&parse_decimal(raw).unwrap(), percent)
			.unwrap()
			.to_string()
	}

	#[test]
	fn test_five_percent_is_exact() {
		assert_eq!(surplus("100", Decimal::from(5)), "105");
		assert_eq!(surplus("1", Decimal::from(5)), "1.05");
		assert_eq!(surplus("123.456", Decimal::from(5)), "129.6288");
	}

	#[test]
	fn test_fractional_percent() {
		assert_eq!(surplus("200", Decimal::new(25, 1)), "205");
		assert_eq!(surplus("1", Decimal::new(125, 3)), "1.00125");
	}

	#[test]
	fn test_zero_percent_is_identity() {
		assert_eq!(surplus("42.5", Decimal::ZERO), "42.5");
	}

	#[test]
	fn test_buffered_amount_in_base_units() {
		let buffered = with_surplus(&parse_decimal("10").unwrap(), Decimal::from(5)).unwrap();
		assert_eq!(
			to_base_units(&buffered, 6).unwrap().value(),
			U256::from(10_500_000u64)
		);

		// 1 wei × 1.05 still floors to 1 wei.
		let dust = with_surplus(&parse_decimal("0.000000000000000001").unwrap(), Decimal::from(5))
			.unwrap();
		assert_eq!(to_base_units(&dust, 18).unwrap().value(), U256::from(1u8));
	}

	#[test]
	fn test_negative_percent_rejected() {
		let err = with_surplus(&parse_decimal("1").unwrap(), Decimal::from(-5)).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { .. }));
	}
}
