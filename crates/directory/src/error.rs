//! Directory error types and result alias.

use thiserror::Error;

use aulario_storage::StorageError;

use crate::principal::PrincipalKind;

/// Result type alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors that can occur during principal directory operations.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DirectoryError {
    /// A principal with this name already exists within the kind.
    ///
    /// Raised by `create` and by `update` when a rename targets a taken
    /// name. The uniqueness check and the record write happen in one
    /// atomic step, so two concurrent creates of the same name cannot
    /// both succeed.
    #[error("A {kind} named {name:?} already exists")]
    DuplicateName {
        /// The kind within which the name collided.
        kind: PrincipalKind,
        /// The name that was already taken.
        name: String,
    },

    /// No principal with this name exists within the kind.
    #[error("No {kind} named {name:?}")]
    NotFound {
        /// The kind that was searched.
        kind: PrincipalKind,
        /// The name that was not found.
        name: String,
    },

    /// The input failed validation before reaching storage.
    #[error("Validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// The underlying storage backend failed.
    #[error("Storage error")]
    Storage {
        /// The storage failure.
        #[from]
        source: StorageError,
    },
}

impl DirectoryError {
    /// Creates a new `DuplicateName` error.
    #[must_use]
    pub fn duplicate_name(kind: PrincipalKind, name: impl Into<String>) -> Self {
        Self::DuplicateName { kind, name: name.into() }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: PrincipalKind, name: impl Into<String>) -> Self {
        Self::NotFound { kind, name: name.into() }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DirectoryError::duplicate_name(PrincipalKind::Student, "Ana");
        assert_eq!(err.to_string(), r#"A student named "Ana" already exists"#);

        let err = DirectoryError::not_found(PrincipalKind::Admin, "root");
        assert_eq!(err.to_string(), r#"No admin named "root""#);

        let err = DirectoryError::validation("name must not be empty");
        assert_eq!(err.to_string(), "Validation failed: name must not be empty");
    }

    #[test]
    fn test_storage_error_source_chain() {
        use std::error::Error;

        let err: DirectoryError = StorageError::conflict().into();
        let source = err.source().expect("storage source must be preserved");
        assert_eq!(source.to_string(), "Storage conflict");
    }
}
