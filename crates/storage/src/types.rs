//! Common types used across storage operations.
//!
//! This module defines shared data structures used by storage backends
//! and the repositories built on top of them.

use bytes::Bytes;

/// Key-value pair returned from range queries.
///
/// Contains the key and its associated value as byte sequences.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use aulario_storage::KeyValue;
///
/// let kv = KeyValue {
///     key: Bytes::from("principal/student/Ana"),
///     value: Bytes::from(r#"{"name":"Ana"}"#),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: Bytes,

    /// The value stored at this key.
    pub value: Bytes,
}

impl KeyValue {
    /// Creates a new key-value pair.
    ///
    /// # Arguments
    ///
    /// * `key` - The key as a byte sequence
    /// * `value` - The value as a byte sequence
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Macro to define a newtype wrapper around `String` with standard trait
/// implementations.
///
/// Each generated type:
/// - Is a transparent wrapper around `String`
/// - Derives `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Derives `Serialize` and `Deserialize` (transparent)
/// - Implements `From<String>`, `From<&str>` and `AsRef<str>`
/// - Implements `Display` that outputs the inner value
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Stable identifier of an authenticable principal (Student, Teacher, or
    /// Admin).
    ///
    /// Generated once at registration and never reused. Names can change;
    /// this id cannot, which is what keeps assignment ledger references and
    /// issued session tokens valid across renames.
    ///
    /// # Examples
    ///
    /// ```
    /// use aulario_storage::PrincipalId;
    ///
    /// let id = PrincipalId::from("7f9c2ba4-e88f-11eb-9a03-0242ac130003");
    /// assert_eq!(id.as_ref(), "7f9c2ba4-e88f-11eb-9a03-0242ac130003");
    /// ```
    PrincipalId
);

define_id!(
    /// Identifier of a task in the task catalog.
    ///
    /// Referenced (not owned) by assignment ledger rows; the ledger treats a
    /// dangling `TaskId` as not-found, never as corruption.
    TaskId
);

define_id!(
    /// Identifier of a single assignment ledger row.
    ///
    /// Each `assign` call mints a fresh id, so duplicate (student, task)
    /// pairs remain individually addressable.
    AssignmentId
);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversions() {
        let id = TaskId::from("t-123");
        assert_eq!(id.to_string(), "t-123");
        assert_eq!(id.as_ref(), "t-123");

        let owned: TaskId = String::from("t-456").into();
        assert_eq!(owned.0, "t-456");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = PrincipalId::from("p-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"p-1\"");

        let back: PrincipalId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_distinct_id_types_are_distinct() {
        // Same inner string, different types — equality only within a type.
        let a = AssignmentId::from("x");
        let b = AssignmentId::from("x");
        assert_eq!(a, b);
    }
}
