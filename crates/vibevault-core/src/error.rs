//! Vault error handling
//!
//! Typed errors for every service operation. The variants split into
//! user-facing negatives (validation, not found, conflict, unauthenticated)
//! and faults coming from the store or the filesystem.

use std::io;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during vault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// A required field is empty or malformed
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Entity is absent, or owned by another user
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness violation (tag name, link URL, collection name)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No acting user for a write operation
    #[error("User not authenticated")]
    Unauthenticated,

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// SQLite rolled back an enclosing transaction mid-operation
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File read/write failed
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl VaultError {
    /// Shorthand for a `NotFound` error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        VaultError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Attach a path to an I/O error
    pub fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        VaultError::Io {
            path: path.into(),
            source,
        }
    }

    /// Convert a unique-constraint violation into `Conflict`, keeping
    /// every other database error as is
    pub fn from_insert(error: rusqlite::Error, conflict: impl FnOnce() -> String) -> Self {
        if is_unique_violation(&error) {
            VaultError::Conflict(conflict())
        } else {
            VaultError::Database(error)
        }
    }

    /// Check if this error is a normal negative result rather than a fault
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VaultError::Validation(_)
                | VaultError::NotFound { .. }
                | VaultError::Conflict(_)
                | VaultError::Unauthenticated
        )
    }

    /// Get a hint for the user, if one applies
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            VaultError::Unauthenticated => {
                Some("Sign in with --user <email>, VIBEVAULT_USER, or `vibevault config set user_email <email>`.")
            }
            VaultError::Conflict(_) => Some("Use a different name, or edit the existing entry."),
            VaultError::Io { .. } => {
                Some("Check that the path exists and you have read/write permissions.")
            }
            _ => None,
        }
    }
}

/// Check if a SQLite error is a UNIQUE or PRIMARY KEY violation
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.code == ErrorCode::ConstraintViolation
                && matches!(
                    err.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;
