//! Domain model for identity, year-scoped assignments and boards.
//!
//! # Responsibility
//! - Define the canonical records shared by the access engine and stores.
//! - Own model-level validation used on every write and read-back path.
//!
//! # Invariants
//! - Every aggregate is identified by a stable UUID.
//! - Year-scoped facts (assignments, classrooms, relations) are
//!   append-only across school years; history is never rewritten.
//! - Board deletion is a soft status transition, not row removal.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod board;
pub mod school;
pub mod user;

use board::BoardCategory;
use user::Role;

/// Model-level validation failure raised before any persistence attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// User must hold at least one role.
    EmptyRoleSet,
    /// Profile variant stored under a role key it does not belong to.
    ProfileRoleMismatch { role: Role },
    /// Display name is blank after trim.
    BlankDisplayName,
    /// Student identity code does not match the accepted format.
    InvalidIdentityCode(String),
    /// Board title is blank after trim.
    BlankTitle,
    /// Board title exceeds the allowed length.
    TitleTooLong { max_chars: usize },
    /// Board content is blank after trim.
    BlankContent,
    /// Category requires a target grade but none was given.
    MissingTargetGrade(BoardCategory),
    /// Category requires a target classroom but none was given.
    MissingTargetClassroom(BoardCategory),
    /// Category takes no grade/classroom scope but one was given.
    UnexpectedScope(BoardCategory),
    /// Grade outside the supported range.
    GradeOutOfRange(i32),
    /// Class number must be positive.
    InvalidClassNumber(i32),
    /// Attendance number must be positive.
    InvalidAttendanceNumber(i32),
    /// Subject relation requires a non-blank subject name.
    SubjectNameRequired,
    /// Homeroom relation must not carry a subject name.
    SubjectNameForbidden,
    /// School year outside the supported range.
    SchoolYearOutOfRange(i32),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRoleSet => write!(f, "user must hold at least one role"),
            Self::ProfileRoleMismatch { role } => {
                write!(f, "profile stored under role `{role}` has a different kind")
            }
            Self::BlankDisplayName => write!(f, "display name must not be blank"),
            Self::InvalidIdentityCode(value) => {
                write!(f, "invalid student identity code: `{value}`")
            }
            Self::BlankTitle => write!(f, "board title must not be blank"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "board title exceeds {max_chars} characters")
            }
            Self::BlankContent => write!(f, "board content must not be blank"),
            Self::MissingTargetGrade(category) => {
                write!(f, "category `{category}` requires a target grade")
            }
            Self::MissingTargetClassroom(category) => {
                write!(f, "category `{category}` requires a target classroom")
            }
            Self::UnexpectedScope(category) => {
                write!(f, "category `{category}` takes no grade/classroom scope")
            }
            Self::GradeOutOfRange(grade) => write!(f, "grade out of range: {grade}"),
            Self::InvalidClassNumber(value) => write!(f, "invalid class number: {value}"),
            Self::InvalidAttendanceNumber(value) => {
                write!(f, "invalid attendance number: {value}")
            }
            Self::SubjectNameRequired => {
                write!(f, "subject relation requires a subject name")
            }
            Self::SubjectNameForbidden => {
                write!(f, "homeroom relation must not carry a subject name")
            }
            Self::SchoolYearOutOfRange(year) => write!(f, "school year out of range: {year}"),
        }
    }
}

impl Error for ValidationError {}

/// Lowest supported grade.
pub const GRADE_MIN: i32 = 1;
/// Highest supported grade.
pub const GRADE_MAX: i32 = 12;

const SCHOOL_YEAR_MIN: i32 = 1990;
const SCHOOL_YEAR_MAX: i32 = 2999;

/// Validates a grade value shared by classrooms and board scopes.
pub fn validate_grade(grade: i32) -> Result<(), ValidationError> {
    if (GRADE_MIN..=GRADE_MAX).contains(&grade) {
        Ok(())
    } else {
        Err(ValidationError::GradeOutOfRange(grade))
    }
}

/// Validates a school-year value shared by all year-scoped records.
pub fn validate_school_year(year: i32) -> Result<(), ValidationError> {
    if (SCHOOL_YEAR_MIN..=SCHOOL_YEAR_MAX).contains(&year) {
        Ok(())
    } else {
        Err(ValidationError::SchoolYearOutOfRange(year))
    }
}
