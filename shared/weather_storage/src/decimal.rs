//! Conversion between JSON payloads and Dynamo DB attribute values
//!
//! Dynamo DB numbers are decimal strings. Every JSON number is written through an
//! exact `Decimal` where it fits: floats use their shortest round-trip rendering, so
//! reading the stored string back yields the same `f64`. Floats beyond `Decimal`'s
//! 28 fractional digits are written in scientific notation instead. On read, numbers
//! without a fractional part come back as integers and everything else as `f64`.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Dynamo DB item
pub type Item = HashMap<String, AttributeValue>;

/// Errors converting between JSON values and attribute values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// The number is outside the range Dynamo DB numbers cover
    #[error("Number {0} is outside the range of Dynamo DB numbers")]
    Unrepresentable(String),

    /// A stored number could not be parsed
    #[error("Invalid stored number: {0}")]
    InvalidNumber(String),

    /// The attribute type has no JSON counterpart
    #[error("Unsupported attribute type: {0}")]
    UnsupportedAttribute(&'static str),
}

/// Smallest non-zero magnitude of a Dynamo DB number
pub const MIN_NUMBER_MAGNITUDE: f64 = 1e-130;
/// Dynamo DB numbers must stay below this magnitude
pub const MAX_NUMBER_MAGNITUDE: f64 = 1e126;

/// Converts a JSON number into an exact decimal
///
/// # Errors
///
/// Returns `DecimalError::Unrepresentable` if the float needs more precision or
/// range than `Decimal` offers
pub fn number_to_decimal(number: &Number) -> Result<Decimal, DecimalError> {
    if let Some(value) = number.as_i64() {
        return Ok(Decimal::from(value));
    }
    if let Some(value) = number.as_u64() {
        return Ok(Decimal::from(value));
    }

    let rendered = number.to_string();
    number
        .as_f64()
        .map(|value| value.to_string())
        .and_then(|shortest| Decimal::from_str_exact(&shortest).ok())
        .map(|decimal| decimal.normalize())
        .ok_or(DecimalError::Unrepresentable(rendered))
}

/// Renders a JSON number as a Dynamo DB number string
///
/// # Errors
///
/// Returns `DecimalError::Unrepresentable` if the number is outside the Dynamo DB range
pub fn number_to_attribute(number: &Number) -> Result<String, DecimalError> {
    if let Ok(decimal) = number_to_decimal(number) {
        return Ok(decimal.to_string());
    }

    // Shortest round-trip digits in scientific notation
    number
        .as_f64()
        .filter(|value| {
            let magnitude = value.abs();
            (MIN_NUMBER_MAGNITUDE..MAX_NUMBER_MAGNITUDE).contains(&magnitude)
        })
        .map(|value| format!("{value:e}"))
        .ok_or_else(|| DecimalError::Unrepresentable(number.to_string()))
}

/// Parses a stored Dynamo DB number back into a native JSON number
///
/// # Errors
///
/// Returns `DecimalError::InvalidNumber` if the string is not a number
pub fn number_from_attribute(raw: &str) -> Result<Number, DecimalError> {
    let trimmed = raw.trim();
    let decimal =
        Decimal::from_str_exact(trimmed).or_else(|_| Decimal::from_scientific(trimmed));

    if let Ok(decimal) = decimal {
        if decimal.fract().is_zero() {
            let integer = decimal
                .to_i64()
                .map(Number::from)
                .or_else(|| decimal.to_u64().map(Number::from));
            if let Some(integer) = integer {
                return Ok(integer);
            }
        }
    }

    // Fractional values, and integers beyond 64 bits, come back as floats
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| DecimalError::InvalidNumber(raw.to_string()))
}

/// Normalises a JSON value into an attribute value
///
/// # Errors
///
/// Returns `DecimalError` if any number is outside the Dynamo DB range
pub fn to_attribute_value(value: &Value) -> Result<AttributeValue, DecimalError> {
    Ok(match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => AttributeValue::N(number_to_attribute(number)?),
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Array(items) => AttributeValue::L(
            items
                .iter()
                .map(to_attribute_value)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => AttributeValue::M(to_item(map)?),
    })
}

/// Normalises a JSON object into a Dynamo DB item
///
/// # Errors
///
/// Returns `DecimalError` if any number is outside the Dynamo DB range
pub fn to_item(map: &Map<String, Value>) -> Result<Item, DecimalError> {
    map.iter()
        .map(|(key, value)| to_attribute_value(value).map(|attribute| (key.clone(), attribute)))
        .collect()
}

/// Converts an attribute value back into native JSON
///
/// String and number sets become arrays.
///
/// # Errors
///
/// Returns `DecimalError` for binary attributes and unparsable numbers
pub fn from_attribute_value(attribute: &AttributeValue) -> Result<Value, DecimalError> {
    match attribute {
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Bool(flag) => Ok(Value::Bool(*flag)),
        AttributeValue::N(raw) => number_from_attribute(raw).map(Value::Number),
        AttributeValue::S(text) => Ok(Value::String(text.clone())),
        AttributeValue::Ss(values) => Ok(Value::Array(
            values.iter().cloned().map(Value::String).collect(),
        )),
        AttributeValue::Ns(values) => values
            .iter()
            .map(|raw| number_from_attribute(raw).map(Value::Number))
            .collect::<Result<_, _>>()
            .map(Value::Array),
        AttributeValue::L(items) => items
            .iter()
            .map(from_attribute_value)
            .collect::<Result<_, _>>()
            .map(Value::Array),
        AttributeValue::M(map) => from_item(map).map(Value::Object),
        AttributeValue::B(_) | AttributeValue::Bs(_) => {
            Err(DecimalError::UnsupportedAttribute("binary"))
        }
        _ => Err(DecimalError::UnsupportedAttribute("unknown")),
    }
}

/// Converts a Dynamo DB item back into a JSON object
///
/// # Errors
///
/// Returns `DecimalError` if any attribute cannot be converted
pub fn from_item(item: &Item) -> Result<Map<String, Value>, DecimalError> {
    item.iter()
        .map(|(key, value)| from_attribute_value(value).map(|json| (key.clone(), json)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(value: &Value) -> Value {
        let attribute = to_attribute_value(value).expect("normalise");
        from_attribute_value(&attribute).expect("denormalise")
    }

    #[test]
    fn test_floats_are_written_as_shortest_decimal() {
        let attribute = to_attribute_value(&json!(0.1)).unwrap();
        assert_eq!(attribute, AttributeValue::N("0.1".to_string()));

        let attribute = to_attribute_value(&json!(0.1 + 0.2)).unwrap();
        assert_eq!(attribute, AttributeValue::N("0.30000000000000004".to_string()));

        let attribute = to_attribute_value(&json!(-273.15)).unwrap();
        assert_eq!(attribute, AttributeValue::N("-273.15".to_string()));
    }

    #[test]
    fn test_integers_are_written_verbatim() {
        assert_eq!(
            to_attribute_value(&json!(1_700_000_000)).unwrap(),
            AttributeValue::N("1700000000".to_string())
        );
        assert_eq!(
            to_attribute_value(&json!(u64::MAX)).unwrap(),
            AttributeValue::N(u64::MAX.to_string())
        );
    }

    #[test]
    fn test_round_trip_nested_payload() {
        let payload = json!({
            "coord": { "lon": -0.1257, "lat": 51.5085 },
            "weather": [
                { "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }
            ],
            "main": {
                "temp": 12.34,
                "feels_like": 11.8,
                "pressure": 1012,
                "humidity": 81
            },
            "wind": { "speed": 4.63, "deg": 230, "gust": null },
            "rain": { "1h": 0.25 },
            "series": [[1.5, 2], [3, [4.25, -7]]],
            "dt": 1_700_000_000,
            "visible": true
        });

        assert_eq!(round_trip(&payload), payload);
    }

    #[test]
    fn test_integral_float_reads_back_as_integer() {
        assert_eq!(round_trip(&json!(20.0)), json!(20));
        assert!(round_trip(&json!(20.0)).is_i64());
        assert!(round_trip(&json!(20.5)).is_f64());
    }

    #[test]
    fn test_small_floats_use_scientific_notation() {
        assert_eq!(
            to_attribute_value(&json!(1e-30)).unwrap(),
            AttributeValue::N("1e-30".to_string())
        );

        let rate = 1.0 / 3.0 * 1e-15;
        assert_eq!(
            to_attribute_value(&json!(rate)).unwrap(),
            AttributeValue::N("3.3333333333333336e-16".to_string())
        );
        assert_eq!(round_trip(&json!({ "rate": rate })), json!({ "rate": rate }));
        assert_eq!(round_trip(&json!([1e-30, -2.5e-40])), json!([1e-30, -2.5e-40]));
    }

    #[test]
    fn test_large_floats_beyond_decimal_round_trip() {
        assert_eq!(
            to_attribute_value(&json!(1.5e30)).unwrap(),
            AttributeValue::N("1.5e30".to_string())
        );
        assert_eq!(round_trip(&json!(1.5e30)), json!(1.5e30));
    }

    #[test]
    fn test_out_of_range_numbers_are_rejected() {
        assert!(matches!(
            to_attribute_value(&json!({ "tiny": 1e-200 })),
            Err(DecimalError::Unrepresentable(_))
        ));
        assert!(matches!(
            to_attribute_value(&json!([1e300])),
            Err(DecimalError::Unrepresentable(_))
        ));
    }

    #[test]
    fn test_stored_numbers_from_other_writers() {
        assert_eq!(number_from_attribute("1e3").unwrap(), Number::from(1000));
        assert_eq!(number_from_attribute("15.000").unwrap(), Number::from(15));
        assert_eq!(
            number_from_attribute("123456789012345678901234567890").unwrap(),
            Number::from_f64("123456789012345678901234567890".parse::<f64>().unwrap()).unwrap()
        );
        assert!(matches!(
            number_from_attribute("abc"),
            Err(DecimalError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_sets_and_binary() {
        let strings = AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(from_attribute_value(&strings).unwrap(), json!(["a", "b"]));

        let numbers = AttributeValue::Ns(vec!["1".to_string(), "2.5".to_string()]);
        assert_eq!(from_attribute_value(&numbers).unwrap(), json!([1, 2.5]));

        let binary = AttributeValue::B(aws_sdk_dynamodb::primitives::Blob::new(vec![1, 2]));
        assert_eq!(
            from_attribute_value(&binary),
            Err(DecimalError::UnsupportedAttribute("binary"))
        );
    }
}
