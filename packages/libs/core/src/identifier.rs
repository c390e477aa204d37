//! Identifier resolution
//!
//! An identifier is either a bare scalar (column `id`) or a keyed payload.
//! A keyed payload must hold exactly one entry, unless one of its entries is
//! named `id`, which then wins over the rest.

use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::value::Value;

/// Implicit primary key column
pub const ID_COLUMN: &str = "id";

/// Row identifier as handed in by callers
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    Scalar(Value),
    Keyed(Payload),
}

/// Resolved `(column, value)` lookup key
#[derive(Debug, Clone, PartialEq)]
pub struct IdKey {
    pub column: String,
    pub value: Value,
}

impl Identifier {
    pub fn resolve(&self) -> Result<IdKey> {
        match self {
            Identifier::Scalar(value) => Ok(IdKey {
                column: ID_COLUMN.to_string(),
                value: value.clone(),
            }),
            Identifier::Keyed(payload) => match payload.len() {
                0 => Err(Error::InvalidIdentifier {
                    reason: "identifier has no keys".to_string(),
                }),
                1 => {
                    let (column, value) = payload
                        .iter()
                        .next()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .ok_or_else(|| Error::InvalidIdentifier {
                            reason: "identifier has no keys".to_string(),
                        })?;
                    Ok(IdKey { column, value })
                }
                n => match payload.get(ID_COLUMN) {
                    Some(value) => Ok(IdKey {
                        column: ID_COLUMN.to_string(),
                        value: value.clone(),
                    }),
                    None => Err(Error::InvalidIdentifier {
                        reason: format!("identifier has {} keys and none is '{}'", n, ID_COLUMN),
                    }),
                },
            },
        }
    }
}

impl From<Payload> for Identifier {
    fn from(p: Payload) -> Self {
        Identifier::Keyed(p)
    }
}

impl From<Value> for Identifier {
    fn from(v: Value) -> Self {
        Identifier::Scalar(v)
    }
}

impl From<i32> for Identifier {
    fn from(v: i32) -> Self {
        Identifier::Scalar(v.into())
    }
}

impl From<i64> for Identifier {
    fn from(v: i64) -> Self {
        Identifier::Scalar(v.into())
    }
}

impl From<&str> for Identifier {
    fn from(v: &str) -> Self {
        Identifier::Scalar(v.into())
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Identifier::Scalar(v.into())
    }
}
