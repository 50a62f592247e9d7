//! The task catalog.
//!
//! Tasks are the reusable activity definitions teachers assign to
//! students: a name, an optional illustration, and an ordered list of
//! steps. The catalog is plain keyed CRUD; ids are minted uuids, so there
//! is no uniqueness concern beyond the id itself.
//!
//! # Storage Layout
//!
//! ```text
//! task/{task_id}  →  Task (JSON)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aulario_storage::{StorageBackend, StorageError, TaskId};

use crate::error::{LedgerError, LedgerResult};

/// Storage key prefix for task records.
pub const TASK_PREFIX: &str = "task/";

/// Maximum accepted length of a task or step name, in bytes.
const MAX_NAME_LEN: usize = 256;

/// One step of a task, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    /// Short step title.
    pub name: String,
    /// Longer instruction text.
    pub description: String,
    /// Optional illustration for the step.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_ref: Option<String>,
}

/// A task record: what students can be assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable task id, minted at creation.
    pub id: TaskId,
    /// Task name shown to students and teachers.
    pub name: String,
    /// Optional illustration for the task as a whole.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_ref: Option<String>,
    /// Ordered steps.
    pub steps: Vec<TaskStep>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

/// A partial update to a task. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// New task name.
    pub name: Option<String>,
    /// Replacement illustration; `Some(None)` clears it.
    pub image_ref: Option<Option<String>>,
    /// Replacement step list.
    pub steps: Option<Vec<TaskStep>>,
}

impl TaskPatch {
    /// A patch that changes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the patch changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.image_ref.is_none() && self.steps.is_none()
    }
}

/// CRUD repository for task records on top of a [`StorageBackend`].
///
/// Cheap to clone when the backend is; holds no state beyond the backend
/// handle.
#[derive(Debug, Clone)]
pub struct TaskCatalog<B> {
    backend: B,
}

impl<B> TaskCatalog<B>
where
    B: StorageBackend,
{
    /// Creates a catalog over the given backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Creates a new task with a freshly minted id.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] if the name is empty or too long
    /// - [`LedgerError::Storage`] on backend failures
    #[tracing::instrument(skip(self, image_ref, steps))]
    pub async fn create(
        &self,
        name: &str,
        image_ref: Option<String>,
        steps: Vec<TaskStep>,
    ) -> LedgerResult<Task> {
        validate_name(name)?;
        for step in &steps {
            validate_name(&step.name)?;
        }

        let task = Task {
            id: TaskId::from(Uuid::new_v4().to_string()),
            name: name.to_owned(),
            image_ref,
            steps,
            created_at: Utc::now(),
        };

        self.backend.set(task_key(&task.id), encode(&task)?).await?;

        tracing::debug!(id = %task.id, "task created");
        Ok(task)
    }

    /// Looks a task up by id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(task))` if the task exists
    /// - `Ok(None)` if it doesn't
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn find(&self, id: &TaskId) -> LedgerResult<Option<Task>> {
        match self.backend.get(&task_key(id)).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Looks a task up by id, raising when it is missing.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TaskNotFound`] if no such task exists
    pub async fn get(&self, id: &TaskId) -> LedgerResult<Task> {
        self.find(id).await?.ok_or_else(|| LedgerError::task_not_found(id.clone()))
    }

    /// Lists all tasks, ordered by id.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> LedgerResult<Vec<Task>> {
        let (start, end) = crate::prefix_range(TASK_PREFIX.as_bytes().to_vec());
        let entries = self.backend.get_range(start..end).await?;
        entries.iter().map(|kv| decode(&kv.value)).collect()
    }

    /// Applies a partial update to a task.
    ///
    /// The write is a compare-and-set against the previously read bytes,
    /// so a concurrent writer causes a [`StorageError::Conflict`] instead
    /// of a lost update.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TaskNotFound`] if no such task exists
    /// - [`LedgerError::Validation`] if the new name is invalid
    /// - [`LedgerError::Storage`] on backend failures, including conflicts with concurrent writers
    #[tracing::instrument(skip(self, patch), fields(id = %id))]
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> LedgerResult<Task> {
        let key = task_key(id);
        let old_bytes = self
            .backend
            .get(&key)
            .await?
            .ok_or_else(|| LedgerError::task_not_found(id.clone()))?;
        let mut task: Task = decode(&old_bytes)?;

        if patch.is_empty() {
            return Ok(task);
        }

        if let Some(name) = patch.name {
            validate_name(&name)?;
            task.name = name;
        }
        if let Some(image_ref) = patch.image_ref {
            task.image_ref = image_ref;
        }
        if let Some(steps) = patch.steps {
            for step in &steps {
                validate_name(&step.name)?;
            }
            task.steps = steps;
        }

        self.backend.compare_and_set(&key, Some(&old_bytes), encode(&task)?).await?;
        Ok(task)
    }

    /// Deletes a task record.
    ///
    /// Returns the removed task. This does **not** touch assignment rows;
    /// use [`remove_task`](crate::remove_task) for the cascading delete.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TaskNotFound`] if no such task exists
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn delete(&self, id: &TaskId) -> LedgerResult<Task> {
        let task = self.get(id).await?;
        self.backend.delete(&task_key(id)).await?;

        tracing::debug!(id = %task.id, "task deleted");
        Ok(task)
    }
}

/// Storage key for a task record: `task/{task_id}`.
fn task_key(id: &TaskId) -> Vec<u8> {
    format!("{TASK_PREFIX}{id}").into_bytes()
}

fn validate_name(name: &str) -> LedgerResult<()> {
    if name.is_empty() {
        return Err(LedgerError::validation("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(LedgerError::validation(format!("name must be at most {MAX_NAME_LEN} bytes")));
    }
    Ok(())
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        StorageError::serialization_with_source("failed to encode ledger record", e).into()
    })
}

pub(crate) fn decode<T: for<'de> serde::Deserialize<'de>>(bytes: &[u8]) -> LedgerResult<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        StorageError::serialization_with_source("failed to decode ledger record", e).into()
    })
}
