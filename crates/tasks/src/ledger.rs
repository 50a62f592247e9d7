//! The assignment ledger.
//!
//! The ledger holds the student↔task many-to-many relation. Each
//! assignment is its own row with its own minted id; assigning the same
//! task to the same student twice deliberately creates two rows, and
//! operations on a (student, task) pair apply to every matching row.
//!
//! # Storage Layout
//!
//! ```text
//! assignment/{student_id}/{task_id}/{assignment_id}  →  Assignment (JSON)
//! assignment-task/{task_id}/{assignment_id}          →  primary key bytes
//! ```
//!
//! The primary rows cluster under the student, so every per-student
//! operation is a single range scan. The task-side index exists only for
//! the cascade: deleting a task finds its rows without scanning the whole
//! ledger. Both rows are written in one transaction, so the index never
//! references a row that was not also written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aulario_storage::{AssignmentId, PrincipalId, StorageBackend, TaskId};

use crate::{
    error::{LedgerError, LedgerResult},
    prefix_range,
    task::{TaskCatalog, TaskStep, decode, encode},
};

/// Storage key prefix for primary assignment rows.
pub const ASSIGNMENT_PREFIX: &str = "assignment/";

/// Storage key prefix for the task-side index.
pub const ASSIGNMENT_TASK_PREFIX: &str = "assignment-task/";

/// How an assigned task is presented to the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    /// Text instructions.
    Reading,
    /// Pictogram sequence.
    Image,
    /// Video walkthrough.
    Video,
}

/// One assignment row: a task given to a student in a presentation mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Stable row id, minted at assignment.
    pub id: AssignmentId,
    /// The student the task was assigned to.
    pub student_id: PrincipalId,
    /// The assigned task.
    pub task_id: TaskId,
    /// How the task is presented to this student.
    pub presentation_mode: PresentationMode,
    /// Whether the student has completed the task.
    pub completed: bool,
    /// When the assignment was made.
    pub assigned_at: DateTime<Utc>,
}

/// The join projection returned to callers: an assignment enriched with
/// the task's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedTask {
    /// The assigned task's id.
    pub task_id: TaskId,
    /// The task name.
    pub task_name: String,
    /// Optional task illustration.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_ref: Option<String>,
    /// The task's ordered steps.
    pub steps: Vec<TaskStep>,
    /// How the task is presented to this student.
    pub presentation_mode: PresentationMode,
    /// Whether the student has completed the task.
    pub completed: bool,
}

/// Repository for assignment rows on top of a [`StorageBackend`].
///
/// Cheap to clone when the backend is; holds no state beyond the backend
/// handle. Assignment rows reference students and tasks by id only —
/// existence checks are the caller's responsibility, and the listing join
/// tolerates dangling references.
#[derive(Debug, Clone)]
pub struct AssignmentLedger<B> {
    backend: B,
}

impl<B> AssignmentLedger<B>
where
    B: StorageBackend,
{
    /// Creates a ledger over the given backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Assigns a task to a student.
    ///
    /// Always creates a new row with a fresh id; assigning the same task
    /// to the same student again creates a second independent row. The
    /// primary row and the task-side index row are written in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] if either id is not a valid key segment
    /// - [`LedgerError::Storage`] on backend failures
    #[tracing::instrument(skip(self), fields(student = %student_id, task = %task_id))]
    pub async fn assign(
        &self,
        student_id: &PrincipalId,
        task_id: &TaskId,
        mode: PresentationMode,
    ) -> LedgerResult<Assignment> {
        validate_id("student id", student_id.as_ref())?;
        validate_id("task id", task_id.as_ref())?;

        let assignment = Assignment {
            id: AssignmentId::from(Uuid::new_v4().to_string()),
            student_id: student_id.clone(),
            task_id: task_id.clone(),
            presentation_mode: mode,
            completed: false,
            assigned_at: Utc::now(),
        };

        let primary_key = assignment_key(student_id, task_id, &assignment.id);
        let index_key = task_index_key(task_id, &assignment.id);

        let mut txn = self.backend.transaction().await?;
        txn.set(primary_key.clone(), encode(&assignment)?);
        txn.set(index_key, primary_key);
        txn.commit().await?;

        tracing::debug!(id = %assignment.id, "task assigned");
        Ok(assignment)
    }

    /// Lists a student's assignments joined against the task catalog.
    ///
    /// Returns an empty vec when the student has nothing assigned. A row
    /// whose task no longer exists in the catalog (a cascade caught
    /// mid-flight) is skipped with a warning, never an error.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] if the id is not a valid key segment
    /// - [`LedgerError::Storage`] on backend failures
    #[tracing::instrument(skip(self, catalog), fields(student = %student_id))]
    pub async fn list_for_student(
        &self,
        catalog: &TaskCatalog<B>,
        student_id: &PrincipalId,
    ) -> LedgerResult<Vec<AssignedTask>> {
        validate_id("student id", student_id.as_ref())?;
        let rows = self.rows_for_prefix(student_prefix(student_id)).await?;

        let mut assigned = Vec::with_capacity(rows.len());
        for (_, row) in rows {
            match catalog.find(&row.task_id).await? {
                Some(task) => assigned.push(AssignedTask {
                    task_id: task.id,
                    task_name: task.name,
                    image_ref: task.image_ref,
                    steps: task.steps,
                    presentation_mode: row.presentation_mode,
                    completed: row.completed,
                }),
                None => {
                    tracing::warn!(
                        assignment = %row.id,
                        task = %row.task_id,
                        "assignment references a missing task; skipping"
                    );
                },
            }
        }
        Ok(assigned)
    }

    /// Like [`list_for_student`](Self::list_for_student), but raises
    /// [`LedgerError::NoTasksForStudent`] on an empty result.
    ///
    /// Kept for API consumers that depend on the legacy 404 for a student
    /// with nothing assigned.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NoTasksForStudent`] if the student has no assignments
    pub async fn list_for_student_required(
        &self,
        catalog: &TaskCatalog<B>,
        student_id: &PrincipalId,
    ) -> LedgerResult<Vec<AssignedTask>> {
        let assigned = self.list_for_student(catalog, student_id).await?;
        if assigned.is_empty() {
            return Err(LedgerError::no_tasks_for_student(student_id.clone()));
        }
        Ok(assigned)
    }

    /// Marks every row for the (student, task) pair as completed.
    ///
    /// Duplicate rows all flip together; that is the defined semantics for
    /// a pair assigned more than once. Idempotent — rows already completed
    /// stay completed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] if either id is not a valid key segment
    /// - [`LedgerError::AssignmentNotFound`] if no row matches the pair
    #[tracing::instrument(skip(self), fields(student = %student_id, task = %task_id))]
    pub async fn mark_complete(
        &self,
        student_id: &PrincipalId,
        task_id: &TaskId,
    ) -> LedgerResult<Vec<Assignment>> {
        validate_id("student id", student_id.as_ref())?;
        validate_id("task id", task_id.as_ref())?;
        let rows = self.rows_for_prefix(pair_prefix(student_id, task_id)).await?;
        if rows.is_empty() {
            return Err(LedgerError::assignment_not_found(student_id.clone(), task_id.clone()));
        }

        let mut txn = self.backend.transaction().await?;
        let mut updated = Vec::with_capacity(rows.len());
        for (key, mut row) in rows {
            row.completed = true;
            txn.set(key, encode(&row)?);
            updated.push(row);
        }
        txn.commit().await?;

        tracing::debug!(rows = updated.len(), "assignments marked complete");
        Ok(updated)
    }

    /// Removes every row for the (student, task) pair.
    ///
    /// Returns the number of rows removed; 0 is success, not an error.
    /// Primary rows and their index rows go in one transaction.
    #[tracing::instrument(skip(self), fields(student = %student_id, task = %task_id))]
    pub async fn unassign(
        &self,
        student_id: &PrincipalId,
        task_id: &TaskId,
    ) -> LedgerResult<usize> {
        validate_id("student id", student_id.as_ref())?;
        validate_id("task id", task_id.as_ref())?;
        let rows = self.rows_for_prefix(pair_prefix(student_id, task_id)).await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut txn = self.backend.transaction().await?;
        let count = rows.len();
        for (key, row) in rows {
            txn.delete(key);
            txn.delete(task_index_key(task_id, &row.id));
        }
        txn.commit().await?;

        tracing::debug!(rows = count, "assignments removed");
        Ok(count)
    }

    /// Removes every row referencing a task, across all students.
    ///
    /// Resolves rows through the task-side index, so the cost scales with
    /// the task's assignments, not the whole ledger. Returns the number of
    /// rows removed; 0 is success.
    #[tracing::instrument(skip(self), fields(task = %task_id))]
    pub async fn delete_by_task(&self, task_id: &TaskId) -> LedgerResult<usize> {
        validate_id("task id", task_id.as_ref())?;
        let (start, end) =
            prefix_range(format!("{ASSIGNMENT_TASK_PREFIX}{task_id}/").into_bytes());
        let index_entries = self.backend.get_range(start..end).await?;
        if index_entries.is_empty() {
            return Ok(0);
        }

        let mut txn = self.backend.transaction().await?;
        let count = index_entries.len();
        for entry in index_entries {
            // The index value is the primary row's key.
            txn.delete(entry.value.to_vec());
            txn.delete(entry.key.to_vec());
        }
        txn.commit().await?;

        tracing::debug!(rows = count, "task cascade removed assignments");
        Ok(count)
    }

    /// Loads and decodes all primary rows under a key prefix.
    async fn rows_for_prefix(&self, prefix: Vec<u8>) -> LedgerResult<Vec<(Vec<u8>, Assignment)>> {
        let (start, end) = prefix_range(prefix);
        let entries = self.backend.get_range(start..end).await?;
        entries
            .into_iter()
            .map(|kv| Ok((kv.key.to_vec(), decode(&kv.value)?)))
            .collect()
    }
}

/// Deletes a task record and cascades into the ledger.
///
/// Returns the number of assignment rows removed. The task delete and the
/// cascade are two separate storage operations; a listing that races the
/// gap between them sees a dangling reference, which
/// [`AssignmentLedger::list_for_student`] skips.
///
/// # Errors
///
/// - [`LedgerError::TaskNotFound`] if no such task exists
#[tracing::instrument(skip(catalog, ledger), fields(task = %task_id))]
pub async fn remove_task<B: StorageBackend>(
    catalog: &TaskCatalog<B>,
    ledger: &AssignmentLedger<B>,
    task_id: &TaskId,
) -> LedgerResult<usize> {
    catalog.delete(task_id).await?;
    let count = ledger.delete_by_task(task_id).await?;

    tracing::debug!(rows = count, "task removed with cascade");
    Ok(count)
}

/// Storage key for a primary row:
/// `assignment/{student_id}/{task_id}/{assignment_id}`.
fn assignment_key(student_id: &PrincipalId, task_id: &TaskId, id: &AssignmentId) -> Vec<u8> {
    format!("{ASSIGNMENT_PREFIX}{student_id}/{task_id}/{id}").into_bytes()
}

/// Storage key for a task-side index row:
/// `assignment-task/{task_id}/{assignment_id}`.
fn task_index_key(task_id: &TaskId, id: &AssignmentId) -> Vec<u8> {
    format!("{ASSIGNMENT_TASK_PREFIX}{task_id}/{id}").into_bytes()
}

/// Prefix covering all of one student's rows.
fn student_prefix(student_id: &PrincipalId) -> Vec<u8> {
    format!("{ASSIGNMENT_PREFIX}{student_id}/").into_bytes()
}

/// Prefix covering all rows for one (student, task) pair.
fn pair_prefix(student_id: &PrincipalId, task_id: &TaskId) -> Vec<u8> {
    format!("{ASSIGNMENT_PREFIX}{student_id}/{task_id}/").into_bytes()
}

/// Rejects ids that would break out of their key segment.
///
/// Ids arrive from callers as opaque strings and are embedded into
/// `/`-separated keys; an id containing `/` would alias another
/// student's or task's rows.
fn validate_id(what: &str, id: &str) -> LedgerResult<()> {
    if id.is_empty() {
        return Err(LedgerError::validation(format!("{what} must not be empty")));
    }
    if id.contains('/') {
        return Err(LedgerError::validation(format!("{what} must not contain '/'")));
    }
    if id.chars().any(char::is_control) {
        return Err(LedgerError::validation(format!("{what} must not contain control characters")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use aulario_storage::MemoryBackend;

    use super::*;

    fn fixtures() -> (TaskCatalog<MemoryBackend>, AssignmentLedger<MemoryBackend>) {
        let backend = MemoryBackend::new();
        (TaskCatalog::new(backend.clone()), AssignmentLedger::new(backend))
    }

    fn student(n: u32) -> PrincipalId {
        PrincipalId::from(format!("student-{n}"))
    }

    #[tokio::test]
    async fn test_assign_and_list() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Poner la mesa", None, vec![]).await.unwrap();

        let row =
            ledger.assign(&student(1), &task.id, PresentationMode::Image).await.unwrap();
        assert!(!row.completed);

        let assigned = ledger.list_for_student(&cat, &student(1)).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].task_name, "Poner la mesa");
        assert_eq!(assigned[0].presentation_mode, PresentationMode::Image);
    }

    #[tokio::test]
    async fn test_duplicate_assign_creates_distinct_rows() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();

        let a = ledger.assign(&student(1), &task.id, PresentationMode::Reading).await.unwrap();
        let b = ledger.assign(&student(1), &task.id, PresentationMode::Video).await.unwrap();
        assert_ne!(a.id, b.id);

        let assigned = ledger.list_for_student(&cat, &student(1)).await.unwrap();
        assert_eq!(assigned.len(), 2);
    }

    #[tokio::test]
    async fn test_list_empty_is_ok_required_is_error() {
        let (cat, ledger) = fixtures();

        let assigned = ledger.list_for_student(&cat, &student(1)).await.unwrap();
        assert!(assigned.is_empty());

        let result = ledger.list_for_student_required(&cat, &student(1)).await;
        assert!(matches!(result, Err(LedgerError::NoTasksForStudent { .. })));
    }

    #[tokio::test]
    async fn test_list_skips_dangling_task_reference() {
        let (cat, ledger) = fixtures();
        let kept = cat.create("Kept", None, vec![]).await.unwrap();
        let doomed = cat.create("Doomed", None, vec![]).await.unwrap();

        ledger.assign(&student(1), &kept.id, PresentationMode::Reading).await.unwrap();
        ledger.assign(&student(1), &doomed.id, PresentationMode::Reading).await.unwrap();

        // Delete the task record without cascading, leaving a dangling row.
        cat.delete(&doomed.id).await.unwrap();

        let assigned = ledger.list_for_student(&cat, &student(1)).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].task_name, "Kept");
    }

    #[tokio::test]
    async fn test_mark_complete_flips_all_rows_and_is_idempotent() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();

        ledger.assign(&student(1), &task.id, PresentationMode::Reading).await.unwrap();
        ledger.assign(&student(1), &task.id, PresentationMode::Image).await.unwrap();

        let updated = ledger.mark_complete(&student(1), &task.id).await.unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|row| row.completed));

        // Second call is a no-op success over already-completed rows.
        let again = ledger.mark_complete(&student(1), &task.id).await.unwrap();
        assert_eq!(again.len(), 2);
        assert!(again.iter().all(|row| row.completed));

        let assigned = ledger.list_for_student(&cat, &student(1)).await.unwrap();
        assert!(assigned.iter().all(|t| t.completed));
    }

    #[tokio::test]
    async fn test_mark_complete_no_matching_row() {
        let (_, ledger) = fixtures();
        let result = ledger.mark_complete(&student(1), &TaskId::from("ghost")).await;
        assert!(matches!(result, Err(LedgerError::AssignmentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_mark_complete_is_pair_scoped() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();

        ledger.assign(&student(1), &task.id, PresentationMode::Reading).await.unwrap();
        ledger.assign(&student(2), &task.id, PresentationMode::Reading).await.unwrap();

        ledger.mark_complete(&student(1), &task.id).await.unwrap();

        let other = ledger.list_for_student(&cat, &student(2)).await.unwrap();
        assert!(!other[0].completed, "another student's row must not flip");
    }

    #[tokio::test]
    async fn test_unassign_removes_all_pair_rows() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();

        ledger.assign(&student(1), &task.id, PresentationMode::Reading).await.unwrap();
        ledger.assign(&student(1), &task.id, PresentationMode::Video).await.unwrap();

        let removed = ledger.unassign(&student(1), &task.id).await.unwrap();
        assert_eq!(removed, 2);
        assert!(ledger.list_for_student(&cat, &student(1)).await.unwrap().is_empty());

        // Index rows went with the primaries: the cascade finds nothing.
        assert_eq!(ledger.delete_by_task(&task.id).await.unwrap(), 0);

        // Removing an absent pair is a zero-count success.
        assert_eq!(ledger.unassign(&student(1), &task.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_task_spans_students() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();
        let other = cat.create("Otra", None, vec![]).await.unwrap();

        ledger.assign(&student(1), &task.id, PresentationMode::Reading).await.unwrap();
        ledger.assign(&student(2), &task.id, PresentationMode::Image).await.unwrap();
        ledger.assign(&student(2), &other.id, PresentationMode::Video).await.unwrap();

        let removed = ledger.delete_by_task(&task.id).await.unwrap();
        assert_eq!(removed, 2);

        assert!(ledger.list_for_student(&cat, &student(1)).await.unwrap().is_empty());
        let remaining = ledger.list_for_student(&cat, &student(2)).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].task_id, other.id);
    }

    #[tokio::test]
    async fn test_remove_task_cascades() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();
        ledger.assign(&student(1), &task.id, PresentationMode::Reading).await.unwrap();
        ledger.assign(&student(2), &task.id, PresentationMode::Image).await.unwrap();

        let removed = remove_task(&cat, &ledger, &task.id).await.unwrap();
        assert_eq!(removed, 2);

        assert!(cat.find(&task.id).await.unwrap().is_none());
        assert!(ledger.list_for_student(&cat, &student(1)).await.unwrap().is_empty());
        assert!(ledger.list_for_student(&cat, &student(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_task() {
        let (cat, ledger) = fixtures();
        let result = remove_task(&cat, &ledger, &TaskId::from("ghost")).await;
        assert!(matches!(result, Err(LedgerError::TaskNotFound { .. })));
    }

    #[tokio::test]
    async fn test_assign_rejects_slash_in_ids() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();

        // A student id embedding "/{task_id}" would land its row under
        // another student's pair prefix.
        let crafted = PrincipalId::from(format!("student-1/{}", task.id));
        let result = ledger.assign(&crafted, &task.id, PresentationMode::Reading).await;
        assert!(matches!(result, Err(LedgerError::Validation { .. })));

        let result = ledger
            .assign(&student(1), &TaskId::from("t/../x"), PresentationMode::Reading)
            .await;
        assert!(matches!(result, Err(LedgerError::Validation { .. })));

        // Nothing reached storage under the honest student's prefix.
        assert!(ledger.list_for_student(&cat, &student(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pair_operations_reject_crafted_ids() {
        let (cat, ledger) = fixtures();
        let task = cat.create("Tarea", None, vec![]).await.unwrap();
        ledger.assign(&student(1), &task.id, PresentationMode::Reading).await.unwrap();

        // "student-1/{task_id}" + the real task id must not address the
        // honest row as a false pair match.
        let crafted = PrincipalId::from(format!("student-1/{}", task.id));
        let result = ledger.mark_complete(&crafted, &task.id).await;
        assert!(matches!(result, Err(LedgerError::Validation { .. })));

        let result = ledger.unassign(&crafted, &task.id).await;
        assert!(matches!(result, Err(LedgerError::Validation { .. })));

        let result = ledger.delete_by_task(&TaskId::from("t\n1")).await;
        assert!(matches!(result, Err(LedgerError::Validation { .. })));

        let result = ledger.list_for_student(&cat, &crafted).await;
        assert!(matches!(result, Err(LedgerError::Validation { .. })));

        // The honest row is untouched and still incomplete.
        let rows = ledger.list_for_student(&cat, &student(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].completed);
    }

    #[tokio::test]
    async fn test_assignment_serde_round_trip() {
        let row = Assignment {
            id: AssignmentId::from("a-1"),
            student_id: student(1),
            task_id: TaskId::from("t-1"),
            presentation_mode: PresentationMode::Video,
            completed: true,
            assigned_at: Utc::now(),
        };

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains(r#""presentation_mode":"video""#));
        let back: Assignment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
