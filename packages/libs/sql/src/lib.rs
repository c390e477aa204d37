//! tk-sql: parameterized statement generation
//!
//! Builds PostgreSQL statements at runtime from ordered payloads and filters.
//! Values never get interpolated into SQL text; they travel as `$n` bind
//! parameters next to it.
//!
//! # Modules
//!
//! - `codec`: payload → (columns, placeholders, values)
//! - `builder`: INSERT / UPDATE / DELETE / SELECT builders
//! - `statement`: SQL text + bind values

pub mod builder;
pub mod codec;
pub mod statement;

pub use builder::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder, DEFAULT_PROJECTION};
pub use codec::{encode, quote_ident, Encoded};
pub use statement::Statement;
