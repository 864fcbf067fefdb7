//! Scalar conversion from a trimmed text token to a typed [`Value`].

use chrono::{NaiveDate, NaiveDateTime};
use transformat_data::FieldType;
use transformat_errors::{Error, Result};

use crate::record::Value;

/// Timestamp formats tried, in order, by [`convert`].
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%Y%m%d", "%Y%m%d%H%M%S"];

/// Convert `raw` to the scalar type declared by `field_type`.
///
/// Empty or whitespace-only tokens become [`Value::Null`] regardless of
/// declared type. Timestamps are tried against [`TIMESTAMP_FORMATS`] in
/// order; date-only formats are taken to mean midnight.
///
/// # Errors
///
/// Returns [`Error::TypeConversionFailed`] if the trimmed token is
/// non-empty but cannot be converted.
pub fn convert(
    raw: &str,
    field_type: FieldType,
    field_name: &str,
    line_number: usize,
) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let conversion_failed = || Error::TypeConversionFailed {
        line_number,
        field_name: field_name.to_string(),
        raw_value: trimmed.to_string(),
    };

    match field_type {
        FieldType::String => Ok(Value::String(trimmed.to_string())),
        FieldType::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| conversion_failed()),
        FieldType::Double => trimmed
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| conversion_failed()),
        FieldType::Timestamp => parse_timestamp(trimmed)
            .map(Value::Timestamp)
            .ok_or_else(conversion_failed),
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime);
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_converts_to_null_for_every_type() {
        for field_type in [
            FieldType::String,
            FieldType::Int,
            FieldType::Double,
            FieldType::Timestamp,
        ] {
            assert_eq!(convert("   ", field_type, "field", 1).unwrap(), Value::Null);
        }
    }

    #[test]
    fn int_and_double_parse_and_reject_garbage() {
        assert_eq!(convert(" 42 ", FieldType::Int, "n", 1).unwrap(), Value::Int(42));
        assert!(convert("abc", FieldType::Int, "n", 1).is_err());
        assert_eq!(
            convert("3.5", FieldType::Double, "n", 1).unwrap(),
            Value::Double(3.5)
        );
    }

    #[test]
    fn timestamp_tries_each_format_in_order() {
        let expected = NaiveDate::from_ymd_opt(2025, 12, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(
            convert("2025-12-06 10:00:00", FieldType::Timestamp, "t", 1).unwrap(),
            Value::Timestamp(expected)
        );

        let midnight = NaiveDate::from_ymd_opt(2025, 12, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            convert("2025-12-06", FieldType::Timestamp, "t", 1).unwrap(),
            Value::Timestamp(midnight)
        );
        assert_eq!(
            convert("20251206", FieldType::Timestamp, "t", 1).unwrap(),
            Value::Timestamp(midnight)
        );
    }

    #[test]
    fn unparseable_timestamp_is_a_conversion_error() {
        let err = convert("not-a-date", FieldType::Timestamp, "t", 7).unwrap_err();
        assert_eq!(err.code(), "TYPE_CONVERSION_FAILED");
    }
}
