//! Scalar values carried by payloads, filters and identifiers

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Token PostgreSQL accepts for an open-ended timestamp.
pub const INFINITY_TOKEN: &str = "infinity";

/// A single column value.
///
/// `Infinity` marks an open-ended timestamp (`validTo = infinity`). A positive
/// infinite `Float` is treated the same way once it passes through the codec.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact NUMERIC value
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Infinity,
    /// JSON/JSONB column value
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Apply the write/filter coercions: `""` becomes null and positive
    /// infinity becomes the infinity timestamp marker.
    pub fn coerce(self) -> Value {
        match self {
            Value::Text(s) if s.is_empty() => Value::Null,
            Value::Float(f) if f.is_infinite() && f.is_sign_positive() => Value::Infinity,
            other => other,
        }
    }

    /// Parse a loosely typed literal (command line input, query strings).
    ///
    /// `null`, `true`/`false`, integers, floats and `infinity` are recognised,
    /// and so is everything [`Value::infer_text`] recognises. Anything else
    /// is text.
    pub fn parse_literal(raw: &str) -> Value {
        match raw {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            INFINITY_TOKEN => Value::Infinity,
            _ => {
                if let Ok(i) = raw.parse::<i64>() {
                    Value::Int(i)
                } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
                    Value::Float(f)
                } else {
                    Value::infer_text(raw.to_string())
                }
            }
        }
    }

    /// Untyped string input: a hyphenated UUID or an RFC 3339 timestamp gets
    /// its own variant so it binds against `uuid` / `timestamptz` columns.
    /// Everything else stays text.
    ///
    /// Use `Value::Text` directly to force a text parameter.
    pub fn infer_text(raw: String) -> Value {
        if raw.len() == 36 {
            if let Ok(id) = Uuid::parse_str(&raw) {
                return Value::Uuid(id);
            }
        }
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(ts) => Value::Timestamp(ts.with_timezone(&Utc)),
            Err(_) => Value::Text(raw),
        }
    }

    /// JSON rendering, used when values are echoed back to callers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Uuid(id) => serde_json::Value::String(id.to_string()),
            Value::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
            Value::Infinity => serde_json::Value::String(INFINITY_TOKEN.to_string()),
            Value::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Uuid(id) => write!(f, "{}", id),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Infinity => f.write_str(INFINITY_TOKEN),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// JSON scalars map onto their natural variant; strings go through
/// [`Value::infer_text`], so a row read back from the database can be written
/// again. Arrays and objects stay JSON.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Text(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::infer_text(s),
            other => Value::Json(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_empty_string_to_null() {
        assert_eq!(Value::from("").coerce(), Value::Null);
        assert_eq!(Value::from(" ").coerce(), Value::Text(" ".to_string()));
    }

    #[test]
    fn test_coerce_positive_infinity_only() {
        assert_eq!(Value::Float(f64::INFINITY).coerce(), Value::Infinity);
        assert_eq!(
            Value::Float(f64::NEG_INFINITY).coerce(),
            Value::Float(f64::NEG_INFINITY)
        );
        assert_eq!(Value::Float(1.5).coerce(), Value::Float(1.5));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(Value::parse_literal("null"), Value::Null);
        assert_eq!(Value::parse_literal("true"), Value::Bool(true));
        assert_eq!(Value::parse_literal("42"), Value::Int(42));
        assert_eq!(Value::parse_literal("2.5"), Value::Float(2.5));
        assert_eq!(Value::parse_literal("infinity"), Value::Infinity);
        assert_eq!(Value::parse_literal("inf"), Value::Text("inf".to_string()));
        assert_eq!(Value::parse_literal("abc"), Value::Text("abc".to_string()));
    }

    #[test]
    fn test_parse_literal_uuid_and_timestamp() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(
            Value::parse_literal(id),
            Value::Uuid(Uuid::parse_str(id).unwrap())
        );
        // 32 hex digits without hyphens is ordinary text
        assert!(matches!(
            Value::parse_literal("67e5504410b1426f9247bb680e5fe0c8"),
            Value::Text(_)
        ));

        let ts = Value::parse_literal("2024-01-01T09:00:00+09:00");
        assert_eq!(
            ts,
            Value::Timestamp("2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert_eq!(
            Value::parse_literal("2024-01-01"),
            Value::Text("2024-01-01".to_string())
        );
    }

    #[test]
    fn test_typed_values_render_as_strings() {
        let id = Uuid::nil();
        assert_eq!(Value::from(id).to_json(), serde_json::json!(id.to_string()));
        assert_eq!(
            Value::from(Decimal::new(1250, 2)).to_json(),
            serde_json::json!("12.50")
        );
    }

    #[test]
    fn test_from_json() {
        let v: Value = serde_json::json!(7).into();
        assert_eq!(v, Value::Int(7));

        let v: Value = serde_json::json!({ "a": 1 }).into();
        assert!(matches!(v, Value::Json(_)));

        let v: Value = Option::<i64>::None.into();
        assert!(v.is_null());

        let v: Value = serde_json::json!("2024-01-01T00:00:00+00:00").into();
        assert!(matches!(v, Value::Timestamp(_)));

        let v: Value = serde_json::json!("plain").into();
        assert_eq!(v, Value::Text("plain".to_string()));
    }
}
