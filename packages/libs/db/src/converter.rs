//! Converter hooks
//!
//! Per-table strategies that reshape data on its way in and out:
//!
//! - [`InboundConverter`]: payload before insert/update
//! - [`OutboundConverter`]: every row coming back from a read or a
//!   write-returning statement
//! - [`QueryConverter`]: filter before it is compiled
//!
//! Each is implemented for plain closures of the matching shape, so
//! `table.with_outbound(|row, _op| Ok(row))` works without a wrapper type.

use chrono::Utc;

use tk_core::{Filter, Operation, Payload, Result, Value};

use crate::connection::Record;

pub trait InboundConverter: Send + Sync {
    fn convert(&self, payload: Payload, operation: Operation) -> Result<Payload>;
}

pub trait OutboundConverter: Send + Sync {
    fn convert(&self, row: Record, operation: Operation) -> Result<Record>;
}

pub trait QueryConverter: Send + Sync {
    fn convert(&self, filter: Filter) -> Result<Filter>;
}

impl<F> InboundConverter for F
where
    F: Fn(Payload, Operation) -> Result<Payload> + Send + Sync,
{
    fn convert(&self, payload: Payload, operation: Operation) -> Result<Payload> {
        self(payload, operation)
    }
}

impl<F> OutboundConverter for F
where
    F: Fn(Record, Operation) -> Result<Record> + Send + Sync,
{
    fn convert(&self, row: Record, operation: Operation) -> Result<Record> {
        self(row, operation)
    }
}

impl<F> QueryConverter for F
where
    F: Fn(Filter) -> Result<Filter> + Send + Sync,
{
    fn convert(&self, filter: Filter) -> Result<Filter> {
        self(filter)
    }
}

/// Stamps a "modified at" column with the current time on every update.
/// Other operations pass through untouched.
#[derive(Debug, Clone)]
pub struct ModifiedAtStamp {
    column: String,
}

impl ModifiedAtStamp {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Default for ModifiedAtStamp {
    fn default() -> Self {
        Self::new("modifiedAt")
    }
}

impl InboundConverter for ModifiedAtStamp {
    fn convert(&self, mut payload: Payload, operation: Operation) -> Result<Payload> {
        if operation == Operation::Update {
            payload.set(self.column.clone(), Value::Timestamp(Utc::now()));
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tk_core::payload;

    #[test]
    fn test_modified_at_only_on_update() {
        let stamp = ModifiedAtStamp::default();

        let updated = stamp
            .convert(payload! { "name" => "a" }, Operation::Update)
            .unwrap();
        assert!(matches!(updated.get("modifiedAt"), Some(Value::Timestamp(_))));
        assert_eq!(updated.keys().next(), Some("name"));

        let inserted = stamp
            .convert(payload! { "name" => "a" }, Operation::Insert)
            .unwrap();
        assert!(!inserted.contains("modifiedAt"));
    }

    #[test]
    fn test_closures_are_converters() {
        let upper = |mut row: Record, _op: Operation| -> Result<Record> {
            if let Some(serde_json::Value::String(s)) = row.get_mut("name") {
                *s = s.to_uppercase();
            }
            Ok(row)
        };

        let mut row = Record::new();
        row.insert("name".to_string(), serde_json::json!("abc"));
        let row = OutboundConverter::convert(&upper, row, Operation::Query).unwrap();
        assert_eq!(row["name"], serde_json::json!("abc".to_uppercase()));
    }
}
