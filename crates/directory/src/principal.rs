//! Principal records and their building blocks.
//!
//! A *principal* is anything that can authenticate against Aulario: a
//! student, a teacher, or an admin. All three share one record shape and
//! one storage layout; they differ in their profile payload and in the
//! secret scheme the authentication layer applies to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aulario_storage::PrincipalId;

/// The role of a principal.
///
/// The kind is part of the storage key (`principal/{kind}/{name}`), so two
/// principals of different kinds may share a name, but names are unique
/// within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// A student account. Secrets are stored hashed.
    Student,
    /// A teacher account.
    Teacher,
    /// An administrator account.
    Admin,
}

impl PrincipalKind {
    /// Stable lowercase name used in storage keys and token subjects.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }

    /// Parses a kind from its lowercase storage name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret material stored alongside a principal.
///
/// The directory treats this as opaque: it stores and returns it but never
/// interprets it. Producing and verifying secrets is the authentication
/// layer's job, which is why the scheme tag travels with the material —
/// verification dispatches on it, so a record hashed under one scheme can
/// coexist with plaintext legacy records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum StoredSecret {
    /// A plaintext secret. Compared in constant time at verification.
    Plain {
        /// The secret itself.
        secret: String,
    },
    /// An Argon2id hash in PHC string format (`$argon2id$v=19$...`).
    Argon2 {
        /// The encoded hash, including salt and parameters.
        hash: String,
    },
}

/// Student-specific profile data.
///
/// Tracks the classroom assignment, the avatar shown in the student UI,
/// and per-modality accessibility preferences that control how task content
/// is presented to this student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Classroom the student belongs to.
    pub classroom: String,

    /// Avatar image reference shown in the student-facing UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Whether textual task content is enabled for this student.
    #[serde(default)]
    pub reading: bool,

    /// Whether pictogram/image task content is enabled.
    #[serde(default)]
    pub image: bool,

    /// Whether video task content is enabled.
    #[serde(default)]
    pub video: bool,

    /// Whether the student uses the dining-room module.
    #[serde(default)]
    pub dining_room: bool,
}

impl StudentProfile {
    /// Creates a profile with the given classroom and all modalities off.
    #[must_use]
    pub fn new(classroom: impl Into<String>) -> Self {
        Self {
            classroom: classroom.into(),
            avatar: None,
            reading: false,
            image: false,
            video: false,
            dining_room: false,
        }
    }
}

/// Role-specific payload of a principal record.
///
/// Teachers and admins carry no extra data beyond name and secret; students
/// carry a [`StudentProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PrincipalProfile {
    /// Student payload.
    Student(StudentProfile),
    /// Teacher payload (no extra fields).
    Teacher,
    /// Admin payload (no extra fields).
    Admin,
}

impl PrincipalProfile {
    /// The kind this profile belongs to.
    #[must_use]
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Self::Student(_) => PrincipalKind::Student,
            Self::Teacher => PrincipalKind::Teacher,
            Self::Admin => PrincipalKind::Admin,
        }
    }
}

/// A stored principal: identity, secret material, and profile.
///
/// The `id` is minted once at creation and never changes, even across
/// renames. Session tokens and assignment ledger rows reference principals
/// by this id, so a rename never invalidates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    /// Stable identifier, stable across renames.
    pub id: PrincipalId,

    /// Login name, unique within the principal's kind.
    pub name: String,

    /// Secret material for authentication.
    pub secret: StoredSecret,

    /// Role-specific payload.
    pub profile: PrincipalProfile,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl PrincipalRecord {
    /// The kind of this principal, derived from its profile.
    #[must_use]
    pub fn kind(&self) -> PrincipalKind {
        self.profile.kind()
    }

    /// Returns a secret-free view of this record, safe to expose to
    /// callers and wire responses.
    #[must_use]
    pub fn view(&self) -> PrincipalView {
        PrincipalView {
            id: self.id.clone(),
            kind: self.kind(),
            name: self.name.clone(),
            student: match &self.profile {
                PrincipalProfile::Student(p) => Some(p.clone()),
                _ => None,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A principal record with the secret material stripped.
///
/// This is the only shape that should ever leave the service layer; the
/// full [`PrincipalRecord`] stays inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalView {
    /// Stable identifier.
    pub id: PrincipalId,
    /// The principal's role.
    pub kind: PrincipalKind,
    /// Login name.
    pub name: String,
    /// Student profile, present only for student principals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentProfile>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to an existing principal.
///
/// `None` fields are left untouched. Setting `name` triggers an atomic
/// rename: the record moves to its new storage key and the id index is
/// repointed in the same transaction.
#[derive(Debug, Clone, Default)]
pub struct PrincipalPatch {
    /// New login name, if renaming.
    pub name: Option<String>,
    /// Replacement secret material, if rotating the secret.
    pub secret: Option<StoredSecret>,
    /// Replacement student profile. Ignored for non-student principals.
    pub student: Option<StudentProfile>,
}

impl PrincipalPatch {
    /// A patch that changes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.secret.is_none() && self.student.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [PrincipalKind::Student, PrincipalKind::Teacher, PrincipalKind::Admin] {
            assert_eq!(PrincipalKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PrincipalKind::parse("janitor"), None);
    }

    #[test]
    fn test_stored_secret_serde_tagging() {
        let plain = StoredSecret::Plain { secret: "pw1".into() };
        let json = serde_json::to_string(&plain).unwrap();
        assert!(json.contains(r#""scheme":"plain""#), "got: {json}");

        let hashed = StoredSecret::Argon2 { hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into() };
        let json = serde_json::to_string(&hashed).unwrap();
        assert!(json.contains(r#""scheme":"argon2""#), "got: {json}");

        let back: StoredSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hashed);
    }

    #[test]
    fn test_view_strips_secret() {
        let record = PrincipalRecord {
            id: PrincipalId::from("p-1"),
            name: "Ana".into(),
            secret: StoredSecret::Argon2 { hash: "$argon2id$...".into() },
            profile: PrincipalProfile::Student(StudentProfile::new("Aula 3")),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = record.view();
        assert_eq!(view.kind, PrincipalKind::Student);
        assert_eq!(view.name, "Ana");
        assert_eq!(view.student.as_ref().map(|p| p.classroom.as_str()), Some("Aula 3"));

        // Serialized view must never contain secret material.
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_profile_kind() {
        assert_eq!(
            PrincipalProfile::Student(StudentProfile::new("A")).kind(),
            PrincipalKind::Student
        );
        assert_eq!(PrincipalProfile::Teacher.kind(), PrincipalKind::Teacher);
        assert_eq!(PrincipalProfile::Admin.kind(), PrincipalKind::Admin);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(PrincipalPatch::empty().is_empty());
        let patch = PrincipalPatch { name: Some("Eva".into()), ..Default::default() };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_student_profile_defaults() {
        // Older records without the modality fields deserialize with them off.
        let json = r#"{"classroom":"Aula 1"}"#;
        let profile: StudentProfile = serde_json::from_str(json).unwrap();
        assert!(!profile.reading && !profile.image && !profile.video && !profile.dining_room);
        assert!(profile.avatar.is_none());
    }
}
