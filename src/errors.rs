//! Unified error type for the machine catalog.
//!
//! Core and repository code return [`Error`]; the HTTP layer maps each variant
//! onto a status code in [`crate::api::error`].

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Caller-supplied input was missing or malformed
    #[error("{message}")]
    Validation {
        /// Safe to show to the caller verbatim
        message: String,
    },

    /// No machine row with the given id
    #[error("Machine not found: {id}")]
    MachineNotFound {
        /// The id that was looked up
        id: i64,
    },

    /// Slug could not be made unique, or a concurrent writer won the race
    #[error("Slug conflict: {slug}")]
    SlugConflict {
        /// The candidate slug that kept colliding
        slug: String,
    },

    /// Relational store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Blob store or filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// True for failures of the relational or blob store.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_storage() {
        assert!(Error::Database(sea_orm::DbErr::Custom("locked".to_string())).is_storage());
        assert!(Error::Io(std::io::Error::other("disk full")).is_storage());
        assert!(!Error::validation("name required").is_storage());
        assert!(!Error::MachineNotFound { id: 1 }.is_storage());
    }
}
