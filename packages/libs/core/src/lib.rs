//! tk-core: shared types for tablekit
//!
//! Types every other tablekit crate speaks: column values, ordered payloads
//! and filters, identifiers, pages and operation kinds.
//!
//! # Modules
//!
//! - `value`: tagged scalar values and write coercions
//! - `payload`: ordered field → value mapping (`Payload`, `Filter`)
//! - `identifier`: scalar / keyed identifiers and their resolution
//! - `page`: offset/limit windows
//! - `operation`: operation kinds passed to converters
//! - `error`: shared error type

pub mod error;
pub mod identifier;
pub mod operation;
pub mod page;
pub mod payload;
pub mod value;

pub use error::{Error, Result};
pub use identifier::{IdKey, Identifier, ID_COLUMN};
pub use operation::Operation;
pub use page::Page;
pub use payload::{Filter, Payload};
pub use value::{Value, INFINITY_TOKEN};
