//! Payload codec
//!
//! Turns an ordered payload into three aligned sequences: quoted column
//! names, `$n` placeholders and coerced values.

use tk_core::{Payload, Value};

/// Codec output. All three vectors have the same length and order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Encoded {
    pub columns: Vec<String>,
    pub placeholders: Vec<String>,
    pub values: Vec<Value>,
}

impl Encoded {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Encode a payload. Placeholders are numbered from `$1`.
pub fn encode(payload: &Payload) -> Encoded {
    let mut encoded = Encoded::default();
    for (i, (name, value)) in payload.iter().enumerate() {
        let value = value.clone().coerce();
        encoded.columns.push(quote_ident(name));
        encoded.placeholders.push(placeholder(i + 1));
        encoded.values.push(value);
    }
    encoded
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `$n` for the value at 1-based position `index`
pub fn placeholder(index: usize) -> String {
    format!("${}", index)
}
