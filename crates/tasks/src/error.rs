//! Ledger error types and result alias.

use thiserror::Error;

use aulario_storage::{PrincipalId, StorageError, TaskId};

/// Result type alias for catalog and ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during task catalog and assignment ledger
/// operations.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// No task with this id exists in the catalog.
    #[error("No task with id {id}")]
    TaskNotFound {
        /// The id that was not found.
        id: TaskId,
    },

    /// No assignment row matches the (student, task) pair.
    #[error("Student {student_id} has no assignment for task {task_id}")]
    AssignmentNotFound {
        /// The student side of the pair.
        student_id: PrincipalId,
        /// The task side of the pair.
        task_id: TaskId,
    },

    /// The student has no assignments at all.
    ///
    /// Only raised by the compatibility lookup that preserves the legacy
    /// empty-result-as-error behavior; the plain listing returns an empty
    /// vec instead.
    #[error("Student {student_id} has no assigned tasks")]
    NoTasksForStudent {
        /// The student that has nothing assigned.
        student_id: PrincipalId,
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

impl LedgerError {
    /// Creates a new `TaskNotFound` error.
    #[must_use]
    pub fn task_not_found(id: impl Into<TaskId>) -> Self {
        Self::TaskNotFound { id: id.into() }
    }

    /// Creates a new `AssignmentNotFound` error.
    #[must_use]
    pub fn assignment_not_found(
        student_id: impl Into<PrincipalId>,
        task_id: impl Into<TaskId>,
    ) -> Self {
        Self::AssignmentNotFound { student_id: student_id.into(), task_id: task_id.into() }
    }

    /// Creates a new `NoTasksForStudent` error.
    #[must_use]
    pub fn no_tasks_for_student(student_id: impl Into<PrincipalId>) -> Self {
        Self::NoTasksForStudent { student_id: student_id.into() }
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
        let err = LedgerError::task_not_found("t-1");
        assert_eq!(err.to_string(), "No task with id t-1");

        let err = LedgerError::assignment_not_found("s-1", "t-1");
        assert_eq!(err.to_string(), "Student s-1 has no assignment for task t-1");

        let err = LedgerError::validation("task name must not be empty");
        assert_eq!(err.to_string(), "Validation failed: task name must not be empty");
    }

    #[test]
    fn test_storage_error_source_chain() {
        use std::error::Error;

        let err: LedgerError = StorageError::conflict().into();
        let source = err.source().expect("storage source must be preserved");
        assert_eq!(source.to_string(), "Storage conflict");
    }
}
