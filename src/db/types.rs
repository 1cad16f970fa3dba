//! Type mappings from SQL Server column values to JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Number, Value};
use tiberius::{ColumnData, FromSql};

/// A result row keyed by column name.
pub type Row = Map<String, Value>;

/// Convert a tiberius row into a JSON row.
///
/// When a result set repeats a column name the last value wins.
pub fn row_to_json(row: tiberius::Row) -> Row {
    let names: Vec<String> = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    names
        .into_iter()
        .zip(row)
        .map(|(name, data)| (name, column_to_json(data)))
        .collect()
}

/// Convert a single column value to JSON.
///
/// Decimals become JSON numbers, binary data is base64 encoded and
/// temporal values are rendered as ISO-8601 strings.
pub fn column_to_json(data: ColumnData<'static>) -> Value {
    let value = match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v.map(|f| float_to_json(f64::from(f))),
        ColumnData::F64(v) => v.map(float_to_json),
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Binary(v) => v.map(|b| Value::String(BASE64_STANDARD.encode(b.as_ref()))),
        ColumnData::Numeric(v) => {
            v.map(|n| float_to_json(n.value() as f64 / 10f64.powi(i32::from(n.scale()))))
        }
        ColumnData::Xml(v) => v.map(|x| Value::String(x.into_owned().into_string())),
        other => temporal_to_json(&other),
    };

    value.unwrap_or(Value::Null)
}

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn temporal_to_json(data: &ColumnData<'static>) -> Option<Value> {
    let text = match data {
        ColumnData::Date(_) => NaiveDate::from_sql(data).ok().flatten().map(|d| d.to_string()),
        ColumnData::Time(_) => NaiveTime::from_sql(data).ok().flatten().map(|t| t.to_string()),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)
                .ok()
                .flatten()
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)
            .ok()
            .flatten()
            .map(|dt| dt.to_rfc3339()),
        _ => None,
    };

    text.map(Value::String)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_integers() {
        assert_eq!(column_to_json(ColumnData::I32(Some(7))), Value::from(7));
        assert_eq!(column_to_json(ColumnData::I64(Some(-3))), Value::from(-3));
        assert_eq!(column_to_json(ColumnData::U8(Some(255))), Value::from(255));
    }

    #[test]
    fn test_nulls() {
        assert_eq!(column_to_json(ColumnData::I32(None)), Value::Null);
        assert_eq!(column_to_json(ColumnData::String(None)), Value::Null);
    }

    #[test]
    fn test_strings_and_bits() {
        assert_eq!(
            column_to_json(ColumnData::String(Some(Cow::Owned("hello".to_string())))),
            Value::from("hello")
        );
        assert_eq!(column_to_json(ColumnData::Bit(Some(true))), Value::Bool(true));
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(column_to_json(ColumnData::F64(Some(f64::NAN))), Value::Null);
        assert_eq!(column_to_json(ColumnData::F64(Some(2.5))), Value::from(2.5));
    }

    #[test]
    fn test_binary_is_base64() {
        let data = ColumnData::Binary(Some(Cow::Owned(vec![1, 2, 3])));
        assert_eq!(column_to_json(data), Value::from("AQID"));
    }
}
