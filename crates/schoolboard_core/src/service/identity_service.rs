//! Identity use-case service.
//!
//! # Responsibility
//! - Register users and grant additional role profiles.
//! - Normalize and validate student identity codes.
//! - Resolve per-request actor snapshots for the access engine.
//!
//! # Invariants
//! - Identity codes are stored uppercase, matching the accepted format.
//! - A duplicate role grant surfaces as `Conflict`, enforced by the
//!   storage layer.

use crate::access::Actor;
use crate::model::school::SchoolContext;
use crate::model::user::{Role, RoleProfile, User, UserId};
use crate::model::ValidationError;
use crate::repo::ledger_repo::LedgerRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTITY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]{2,18}[A-Z0-9]$").expect("valid identity code regex"));

/// Service error for identity use-cases.
#[derive(Debug)]
pub enum IdentityServiceError {
    /// Malformed registration input.
    Validation(ValidationError),
    /// User or role grant already exists.
    Conflict(String),
    /// Target user does not exist.
    UserNotFound(UserId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for IdentityServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict(details) => write!(f, "conflict: {details}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent identity state: {details}"),
        }
    }
}

impl Error for IdentityServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for IdentityServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Conflict { entity, details } => {
                Self::Conflict(format!("{entity}: {details}"))
            }
            RepoError::NotFound(id) => Self::UserNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Request model for registering one user with one initial role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserRequest {
    pub display_name: String,
    pub profile: RoleProfile,
}

/// Identity service facade over the user repository.
pub struct IdentityService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> IdentityService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers one user with its initial role profile.
    pub fn register_user(
        &self,
        request: RegisterUserRequest,
    ) -> Result<User, IdentityServiceError> {
        let profile = normalize_profile(request.profile)?;
        let user = User::new(request.display_name, profile);
        user.validate().map_err(IdentityServiceError::Validation)?;

        let id = self.repo.create_user(&user)?;
        info!(
            "event=user_register module=identity status=ok user_id={id} roles={}",
            user.profiles
                .keys()
                .map(|role| role.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        self.repo
            .get_user(id)?
            .ok_or(IdentityServiceError::InconsistentState(
                "registered user not found in read-back",
            ))
    }

    /// Grants one additional role profile to an existing user.
    pub fn grant_role(
        &self,
        id: UserId,
        profile: RoleProfile,
    ) -> Result<User, IdentityServiceError> {
        let profile = normalize_profile(profile)?;
        self.repo.grant_role(id, &profile)?;
        info!(
            "event=role_grant module=identity status=ok user_id={id} role={}",
            profile.role()
        );

        self.repo
            .get_user(id)?
            .ok_or(IdentityServiceError::InconsistentState(
                "user missing after role grant",
            ))
    }

    /// Loads one user aggregate.
    pub fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.get_user(id)
    }
}

/// Resolves the actor snapshot for one request.
///
/// Loads the user's held roles and, for student actors, the current
/// assignment for the context's school year, falling back to the most
/// recent assignment by year when the current year has none.
pub fn resolve_actor<U: UserRepository, L: LedgerRepository>(
    users: &U,
    ledger: &L,
    user_id: UserId,
    ctx: &SchoolContext,
) -> RepoResult<Option<Actor>> {
    let Some(user) = users.get_user(user_id)? else {
        return Ok(None);
    };

    let current_assignment = if user.holds(Role::Student) {
        match ledger.assignment_of(user_id, ctx.school_year)? {
            Some(assignment) => Some(assignment),
            None => ledger.latest_assignment(user_id)?,
        }
    } else {
        None
    };

    Ok(Some(Actor::from_user(&user, current_assignment)))
}

fn normalize_profile(profile: RoleProfile) -> Result<RoleProfile, IdentityServiceError> {
    match profile {
        RoleProfile::Student(mut student) => {
            student.identity_code = normalize_identity_code(&student.identity_code)
                .map_err(IdentityServiceError::Validation)?;
            Ok(RoleProfile::Student(student))
        }
        other => Ok(other),
    }
}

/// Normalizes one identity code to uppercase and validates its format.
pub fn normalize_identity_code(value: &str) -> Result<String, ValidationError> {
    let normalized = value.trim().to_ascii_uppercase();
    if IDENTITY_CODE_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidIdentityCode(value.to_string()))
    }
}
