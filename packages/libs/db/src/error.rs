//! Table access error type

/// Errors surfaced by table handles, contexts and connections
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("core error: {0}")]
    Core(#[from] tk_core::Error),

    #[error("expected exactly one row, got {count}")]
    MultipleRows { count: usize },

    #[error("column '{column}' has unsupported type {type_name}")]
    UnsupportedType { column: String, type_name: String },

    #[error("transaction already closed")]
    TransactionClosed,

    #[error("unknown table reference: {name}")]
    UnknownTable { name: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    /// Stable error code for callers that report errors outward
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Database(sqlx::Error::RowNotFound) => "NO_ROWS",
            DbError::Database(_) => "DATABASE_ERROR",
            DbError::Core(e) => e.code(),
            DbError::MultipleRows { .. } => "MULTIPLE_ROWS",
            DbError::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            DbError::TransactionClosed => "TRANSACTION_CLOSED",
            DbError::UnknownTable { .. } => "UNKNOWN_TABLE",
            DbError::Config { .. } => "CONFIG_ERROR",
            DbError::Io(_) => "IO_ERROR",
            DbError::Json(_) => "JSON_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
