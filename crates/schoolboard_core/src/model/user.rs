//! User identity model with a per-role capability map.
//!
//! # Responsibility
//! - Define the `User` aggregate: one stable identity, several held roles.
//! - Keep one polymorphic profile record per held role as a tagged union.
//!
//! # Invariants
//! - `id` is stable and never reused for another user.
//! - `profiles` is keyed by role; the stored variant must match its key.
//! - A user holds at least one role.

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a user aggregate.
pub type UserId = Uuid;

/// Roles a user may hold. Multiple roles may be held simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Parent,
    Staff,
    Admin,
}

impl Role {
    /// Stable string id used in storage and logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Parent => "parent",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    /// All roles in canonical order.
    pub fn all() -> &'static [Role] {
        &[
            Self::Student,
            Self::Teacher,
            Self::Parent,
            Self::Staff,
            Self::Admin,
        ]
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrollment lifecycle state for a student profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    Graduated,
    Withdrawn,
}

/// Role-specific profile payload for `Role::Student`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// School-issued identity code, normalized to uppercase.
    pub identity_code: String,
    pub enrollment_status: EnrollmentStatus,
}

/// Role-specific profile payload for `Role::Teacher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProfile {
    /// Primary subject taught, if any.
    pub subject: Option<String>,
}

/// Role-specific profile payload for `Role::Parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentProfile {
    /// Contact phone number as entered; no format guarantee.
    pub phone: Option<String>,
}

/// Role-specific profile payload for `Role::Staff`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub department: Option<String>,
}

/// Tagged union of per-role profile records.
///
/// Admin carries no payload; holding the role is the whole capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleProfile {
    Student(StudentProfile),
    Teacher(TeacherProfile),
    Parent(ParentProfile),
    Staff(StaffProfile),
    Admin,
}

impl RoleProfile {
    /// Role this profile variant belongs to.
    pub fn role(&self) -> Role {
        match self {
            Self::Student(_) => Role::Student,
            Self::Teacher(_) => Role::Teacher,
            Self::Parent(_) => Role::Parent,
            Self::Staff(_) => Role::Staff,
            Self::Admin => Role::Admin,
        }
    }
}

/// User aggregate: stable identity plus a capability map of held roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    /// One profile per held role; the key set *is* the held-role set.
    pub profiles: BTreeMap<Role, RoleProfile>,
}

impl User {
    /// Creates a user with a generated stable ID and one initial profile.
    pub fn new(display_name: impl Into<String>, profile: RoleProfile) -> Self {
        Self::with_id(Uuid::new_v4(), display_name, profile)
    }

    /// Creates a user with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: UserId, display_name: impl Into<String>, profile: RoleProfile) -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(profile.role(), profile);
        Self {
            id,
            display_name: display_name.into(),
            profiles,
        }
    }

    /// Returns whether this user holds the given role.
    pub fn holds(&self, role: Role) -> bool {
        self.profiles.contains_key(&role)
    }

    /// Looks up the profile for a role, when held.
    pub fn profile(&self, role: Role) -> Option<&RoleProfile> {
        self.profiles.get(&role)
    }

    /// Adds one role profile. Returns `false` when the role is already held.
    pub fn add_profile(&mut self, profile: RoleProfile) -> bool {
        let role = profile.role();
        if self.profiles.contains_key(&role) {
            return false;
        }
        self.profiles.insert(role, profile);
        true
    }

    /// Validates structural invariants of the aggregate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.display_name.trim().is_empty() {
            return Err(ValidationError::BlankDisplayName);
        }
        if self.profiles.is_empty() {
            return Err(ValidationError::EmptyRoleSet);
        }
        for (role, profile) in &self.profiles {
            if profile.role() != *role {
                return Err(ValidationError::ProfileRoleMismatch { role: *role });
            }
        }
        Ok(())
    }
}
