//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`fred`] errors with additional context about which
//! operation failed.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A key-value store operation failed.
    #[error("KV store error: {0}")]
    Kv(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with the same identifier already exists.
    #[error("Duplicate record: {0}")]
    Conflict(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored row could not be turned into a typed record.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Map unique violations to [`DbError::Conflict`] and foreign-key
    /// violations to [`DbError::NotFound`], passing every other error
    /// through.
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(what.to_owned())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::NotFound(what.to_owned())
            }
            _ => Self::Postgres(err),
        }
    }
}
