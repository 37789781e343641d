//! Decoding of PostgreSQL result columns into [`Value`]s.
//!
//! Only SQL NULL becomes [`Value::Null`]. A non-NULL value whose type has no
//! mapping, or that fails to decode, is rendered as a bracketed marker naming
//! the type.

use sqlx::error::BoxDynError;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{JsonValue, Uuid};
use sqlx::{Column as SqlxColumn, Decode, Postgres, Row as SqlxRow, Type, TypeInfo, ValueRef};
use tracing::warn;

use super::{Row, Value};

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// A NUMERIC value kept in its exact decimal text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericText(pub String);

impl Type<Postgres> for NumericText {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("NUMERIC")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        ty.name().eq_ignore_ascii_case("NUMERIC")
    }
}

impl<'r> Decode<'r, Postgres> for NumericText {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(Self(value.as_str()?.to_string())),
            PgValueFormat::Binary => Ok(Self(numeric_to_string(value.as_bytes()?)?)),
        }
    }
}

/// Renders the binary NUMERIC wire format as decimal text.
///
/// Layout: `ndigits`, `weight`, `sign`, `dscale` (all 16-bit big endian),
/// followed by `ndigits` base-10000 digits, most significant first.
pub fn numeric_to_string(bytes: &[u8]) -> Result<String, BoxDynError> {
    if bytes.len() < 8 {
        return Err(format!("NUMERIC value too short: {} bytes", bytes.len()).into());
    }
    let word = |i: usize| [bytes[i], bytes[i + 1]];

    let ndigits = i16::from_be_bytes(word(0));
    let weight = i16::from_be_bytes(word(2));
    let sign = u16::from_be_bytes(word(4));
    let dscale = u16::from_be_bytes(word(6));

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("Invalid NUMERIC sign: {other:#06x}").into()),
    }

    let ndigits = usize::try_from(ndigits).map_err(|_| "Negative NUMERIC digit count")?;
    if bytes.len() != 8 + 2 * ndigits {
        return Err(format!(
            "NUMERIC length mismatch: {} digits in {} bytes",
            ndigits,
            bytes.len()
        )
        .into());
    }
    let digits: Vec<i16> = (0..ndigits)
        .map(|i| i16::from_be_bytes(word(8 + 2 * i)))
        .collect();
    let digit_at = |position: i32| -> i16 {
        usize::try_from(position)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let weight = i32::from(weight);
    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit_at(0).to_string());
        for position in 1..=weight {
            out.push_str(&format!("{:04}", digit_at(position)));
        }
    }

    if dscale > 0 {
        let scale = usize::from(dscale);
        let mut fraction = String::with_capacity(scale + 4);
        let mut position = weight + 1;
        while fraction.len() < scale {
            fraction.push_str(&format!("{:04}", digit_at(position)));
            position += 1;
        }
        fraction.truncate(scale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

/// Converts every column of a row.
pub fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes one column by its PostgreSQL type name.
pub fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(e) => return unreadable(type_name, &e),
    }

    let decoded = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::from),
        "INT2" | "SMALLINT" => row.try_get::<i16, _>(index).map(|v| Value::Int(i64::from(v))),
        "INT4" | "INT" | "INTEGER" => row.try_get::<i32, _>(index).map(Value::from),
        "INT8" | "BIGINT" => row.try_get::<i64, _>(index).map(Value::from),
        "FLOAT4" | "REAL" => row.try_get::<f32, _>(index).map(|v| Value::Float(f64::from(v))),
        "FLOAT8" | "DOUBLE PRECISION" => row.try_get::<f64, _>(index).map(Value::from),
        "NUMERIC" => row.try_get::<NumericText, _>(index).map(|v| Value::String(v.0)),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S%.f+00").to_string())),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|v| Value::String(v.to_string())),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(index)
            .map(|v| Value::String(v.to_string())),
        "UUID" => row
            .try_get::<Uuid, _>(index)
            .map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => row
            .try_get::<JsonValue, _>(index)
            .map(|v| Value::String(v.to_string())),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(Value::from),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    decoded.unwrap_or_else(|e| unreadable(type_name, &e))
}

fn unreadable(type_name: &str, error: &sqlx::Error) -> Value {
    warn!(type_name, error = %error, "Could not decode column value");
    Value::String(format!("<{} value>", type_name.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numeric(ndigits: i16, weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&ndigits.to_be_bytes());
        bytes.extend_from_slice(&weight.to_be_bytes());
        bytes.extend_from_slice(&sign.to_be_bytes());
        bytes.extend_from_slice(&dscale.to_be_bytes());
        for digit in digits {
            bytes.extend_from_slice(&digit.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_numeric_with_fraction() {
        let bytes = numeric(2, 0, NUMERIC_POS, 2, &[120, 5000]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "120.50");
    }

    #[test]
    fn test_numeric_trailing_zero_groups_are_padded() {
        let bytes = numeric(1, 0, NUMERIC_POS, 2, &[35]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "35.00");
    }

    #[test]
    fn test_numeric_sum_of_fixture_totals() {
        let bytes = numeric(2, 0, NUMERIC_POS, 2, &[255, 4900]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "255.49");
    }

    #[test]
    fn test_numeric_below_one() {
        let bytes = numeric(1, -1, NUMERIC_POS, 2, &[500]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "0.05");
    }

    #[test]
    fn test_numeric_large_integer() {
        let bytes = numeric(1, 2, NUMERIC_POS, 0, &[1]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "100000000");

        let bytes = numeric(3, 1, NUMERIC_NEG, 1, &[1234, 5678, 9000]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "-12345678.9");
    }

    #[test]
    fn test_numeric_zero() {
        let bytes = numeric(0, 0, NUMERIC_POS, 0, &[]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "0");

        let bytes = numeric(0, 0, NUMERIC_POS, 3, &[]);
        assert_eq!(numeric_to_string(&bytes).unwrap(), "0.000");
    }

    #[test]
    fn test_numeric_special_values() {
        assert_eq!(numeric_to_string(&numeric(0, 0, NUMERIC_NAN, 0, &[])).unwrap(), "NaN");
        assert_eq!(
            numeric_to_string(&numeric(0, 0, NUMERIC_NINF, 0, &[])).unwrap(),
            "-Infinity"
        );
    }

    #[test]
    fn test_numeric_malformed_input() {
        assert!(numeric_to_string(&[0, 1]).is_err());
        assert!(numeric_to_string(&numeric(2, 0, NUMERIC_POS, 0, &[1])).is_err());
        assert!(numeric_to_string(&numeric(0, 0, 0x1234, 0, &[])).is_err());
    }
}
