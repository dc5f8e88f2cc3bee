//! Schema validation of the raw TOML document.
//!
//! Validation runs on the `toml::Value` before deserialisation so that errors
//! name the offending field path (`contracts.pool`) instead of surfacing as a
//! generic serde message.

use thiserror::Error;

/// Errors that can occur during schema validation.
#[derive(Debug, Error)]
pub enum SchemaError {
	/// Error that occurs when a required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// Error that occurs when a field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// Error that occurs when field type is incorrect.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	/// An integer, float, or numeric string.
	Decimal,
	Boolean,
	/// A table whose keys are free-form and whose values share one type.
	Map(Box<FieldType>),
	Table(Schema),
}

/// Type alias for field validator functions.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A field definition with name and type.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Schema definition with required and optional fields.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		let table = config
			.as_table()
			.ok_or_else(|| SchemaError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| SchemaError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

impl Field {
	fn check(&self, value: &toml::Value) -> Result<(), SchemaError> {
		validate_field_type(&self.name, value, &self.field_type)?;

		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| SchemaError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}

		Ok(())
	}
}

fn type_mismatch(field: &str, expected: &str, value: &toml::Value) -> SchemaError {
	SchemaError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), SchemaError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(type_mismatch(field_name, "string", value));
			}
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| type_mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(SchemaError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}

			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(SchemaError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		}
		FieldType::Decimal => match value {
			toml::Value::Integer(_) | toml::Value::Float(_) => {}
			toml::Value::String(s) => {
				if s.parse::<rust_decimal::Decimal>().is_err() {
					return Err(SchemaError::InvalidValue {
						field: field_name.to_string(),
						message: format!("'{}' is not a decimal number", s),
					});
				}
			}
			other => return Err(type_mismatch(field_name, "decimal", other)),
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(type_mismatch(field_name, "boolean", value));
			}
		}
		FieldType::Map(inner_type) => {
			let table = value
				.as_table()
				.ok_or_else(|| type_mismatch(field_name, "table", value))?;

			for (key, item) in table {
				validate_field_type(&format!("{}.{}", field_name, key), item, inner_type)?;
			}
		}
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| match e {
				SchemaError::MissingField(f) => {
					SchemaError::MissingField(format!("{}.{}", field_name, f))
				}
				SchemaError::InvalidValue { field, message } => SchemaError::InvalidValue {
					field: format!("{}.{}", field_name, field),
					message,
				},
				SchemaError::TypeMismatch {
					field,
					expected,
					actual,
				} => SchemaError::TypeMismatch {
					field: format!("{}.{}", field_name, field),
					expected,
					actual,
				},
			})?;
		}
	}

	Ok(())
}

/// Accepts `0x` followed by exactly 40 hex digits.
pub fn validate_address(value: &toml::Value) -> Result<(), String> {
	let s = value.as_str().ok_or("expected a string")?;
	let hex = s
		.strip_prefix("0x")
		.ok_or_else(|| format!("'{}' must start with 0x", s))?;
	if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(format!("'{}' is not a 20-byte hex address", s));
	}
	Ok(())
}

/// Schema of the complete configuration file.
pub fn config_schema() -> Schema {
	let address = |name: &str| Field::new(name, FieldType::String).with_validator(validate_address);

	Schema::new(
		vec![Field::new(
			"network",
			FieldType::Table(Schema::new(
				vec![
					Field::new(
						"chain_id",
						FieldType::Integer {
							min: Some(1),
							max: None,
						},
					),
					Field::new("rpc_url", FieldType::String).with_validator(|v| {
						match v.as_str() {
							Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
								Ok(())
							}
							_ => Err("rpc_url must be an http(s) URL".to_string()),
						}
					}),
				],
				vec![],
			)),
		)],
		vec![
			Field::new(
				"contracts",
				FieldType::Table(Schema::new(
					vec![],
					vec![
						address("pool"),
						address("wrapped_token_gateway"),
						address("l2_pool"),
						address("swap_collateral_adapter"),
						address("repay_with_collateral_adapter"),
						address("flash_liquidation_adapter"),
						address("ens_registry"),
					],
				)),
			),
			Field::new(
				"orchestrator",
				FieldType::Table(Schema::new(
					vec![],
					vec![
						Field::new("surplus_percent", FieldType::Decimal),
						Field::new(
							"flash_premium_bps",
							FieldType::Integer {
								min: Some(0),
								max: Some(10_000),
							},
						),
						Field::new(
							"gas_limits",
							FieldType::Map(Box::new(FieldType::Integer {
								min: Some(21_000),
								max: None,
							})),
						),
					],
				)),
			),
			Field::new(
				"cache",
				FieldType::Table(Schema::new(
					vec![],
					vec![Field::new(
						"metadata_ttl_secs",
						FieldType::Integer {
							min: Some(0),
							max: None,
						},
					)],
				)),
			),
			Field::new(
				"logging",
				FieldType::Table(Schema::new(
					vec![],
					vec![
						Field::new("level", FieldType::String),
						Field::new("json", FieldType::Boolean),
					],
				)),
			),
		],
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	#[test]
	fn test_missing_network_section() {
		let err = config_schema().validate(&parse("[logging]\nlevel = \"debug\"")).unwrap_err();
		assert!(matches!(err, SchemaError::MissingField(f) if f == "network"));
	}

	#[test]
	fn test_nested_field_paths() {
		let doc = parse(
			r#"
[network]
chain_id = 1
rpc_url = "http://localhost:8545"

[contracts]
pool = "0x1234"
"#,
		);
		let err = config_schema().validate(&doc).unwrap_err();
		match err {
			SchemaError::InvalidValue { field, .. } => assert_eq!(field, "contracts.pool"),
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[test]
	fn test_gas_limit_map_types() {
		let doc = parse(
			r#"
[network]
chain_id = 1
rpc_url = "http://localhost:8545"

[orchestrator]
gas_limits = { supply = "lots" }
"#,
		);
		let err = config_schema().validate(&doc).unwrap_err();
		assert!(matches!(
			err,
			SchemaError::TypeMismatch { field, .. } if field == "orchestrator.gas_limits.supply"
		));
	}

	#[test]
	fn test_decimal_field_accepts_numbers_and_strings() {
		for value in ["5", "2.5", "\"7.25\""] {
			let doc = parse(&format!(
				"[network]\nchain_id = 1\nrpc_url = \"https://rpc\"\n[orchestrator]\nsurplus_percent = {}",
				value
			));
			assert!(config_schema().validate(&doc).is_ok(), "value {}", value);
		}
	}

	#[test]
	fn test_validate_address() {
		let good = toml::Value::String(format!("0x{}", "ab".repeat(20)));
		assert!(validate_address(&good).is_ok());
		let short = toml::Value::String("0xabc".to_string());
		assert!(validate_address(&short).is_err());
		let no_prefix = toml::Value::String("ab".repeat(20));
		assert!(validate_address(&no_prefix).is_err());
	}
}
