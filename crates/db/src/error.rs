//! Error handling for document store operations

use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Server error code for `createUser` on an existing account.
pub const USER_EXISTS_CODE: i32 = 51003;
/// Server error code for a unique index violation.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

pub type DbResult<T> = Result<T, DbError>;

/// Failures surfaced by a [`crate::DocumentStore`]
#[derive(Error, Debug)]
pub enum DbError {
    #[error("account '{name}' already exists in database '{database}'")]
    AccountExists { database: String, name: String },

    #[error("duplicate key in {database}.{collection}: {message}")]
    DuplicateKey {
        database: String,
        collection: String,
        message: String,
    },

    #[error("text index required for $text query on {database}.{collection}")]
    TextIndexRequired {
        database: String,
        collection: String,
    },

    #[error("invalid index specification: {0}")]
    InvalidIndex(String),

    #[error("server unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    #[error("failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("failed to decode server reply: {0}")]
    Decode(String),

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

impl DbError {
    /// Create a duplicate key error
    pub fn duplicate_key(
        database: impl Into<String>,
        collection: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DuplicateKey {
            database: database.into(),
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// True for any uniqueness violation, typed or still wrapped by the driver.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            DbError::DuplicateKey { .. } => true,
            DbError::Driver(err) => server_code(err) == Some(DUPLICATE_KEY_CODE),
            _ => false,
        }
    }
}

/// Extract the numeric server code from a driver error, if the server sent one.
pub fn server_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        ErrorKind::InsertMany(insert) => insert
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|write| write.code),
        _ => None,
    }
}
