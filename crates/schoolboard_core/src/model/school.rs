//! Year-scoped assignment model: classrooms, enrollments, relations.
//!
//! # Responsibility
//! - Define the ledger facts the access engine resolves membership from.
//! - Keep the classroom row the single source of homeroom-teacher truth.
//!
//! # Invariants
//! - One classroom per (school_year, grade, class_number).
//! - One student assignment per (student, school_year); a new year adds a
//!   new record instead of mutating history.
//! - One teacher↔student relation per (teacher, student, year, role).

use crate::model::user::UserId;
use crate::model::{validate_grade, validate_school_year, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a classroom row.
pub type ClassroomId = Uuid;

/// School year as a calendar year number (e.g. 2026).
pub type SchoolYear = i32;

/// One classroom in one school year.
///
/// `homeroom_teacher_id` is year-scoped through the row's own
/// `school_year`; callers never supply a separate year when resolving
/// the homeroom teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub school_year: SchoolYear,
    pub grade: i32,
    pub class_number: i32,
    pub homeroom_teacher_id: Option<UserId>,
}

impl Classroom {
    /// Creates a classroom with a generated stable ID and no homeroom yet.
    pub fn new(school_year: SchoolYear, grade: i32, class_number: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            school_year,
            grade,
            class_number,
            homeroom_teacher_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_school_year(self.school_year)?;
        validate_grade(self.grade)?;
        if self.class_number < 1 {
            return Err(ValidationError::InvalidClassNumber(self.class_number));
        }
        Ok(())
    }
}

/// Write model for enrolling one student into a classroom for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAssignment {
    pub student_id: UserId,
    pub school_year: SchoolYear,
    pub classroom_id: ClassroomId,
    pub attendance_number: i32,
}

impl StudentAssignment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_school_year(self.school_year)?;
        if self.attendance_number < 1 {
            return Err(ValidationError::InvalidAttendanceNumber(
                self.attendance_number,
            ));
        }
        Ok(())
    }
}

/// Read model for one resolved assignment, joined with its classroom.
///
/// Carried on the actor snapshot so permission checks never re-query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub student_id: UserId,
    pub school_year: SchoolYear,
    pub classroom_id: ClassroomId,
    pub grade: i32,
    pub class_number: i32,
    pub attendance_number: i32,
}

/// Role a teacher plays toward one student in one school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeacherRole {
    Homeroom,
    Subject,
}

impl TeacherRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Homeroom => "homeroom",
            Self::Subject => "subject",
        }
    }
}

impl Display for TeacherRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Academic semester within one school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semester {
    First,
    Second,
}

/// Read-only per-request context carrying the configured current school
/// year and semester.
///
/// Supplied by the surrounding application from its system-setting
/// collaborator; this core never reads it from global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchoolContext {
    pub school_year: SchoolYear,
    pub semester: Semester,
}

impl SchoolContext {
    pub fn new(school_year: SchoolYear, semester: Semester) -> Self {
        Self {
            school_year,
            semester,
        }
    }
}

/// Year-scoped teacher↔student relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherStudent {
    pub teacher_id: UserId,
    pub student_id: UserId,
    pub school_year: SchoolYear,
    pub role: TeacherRole,
    /// Required for `Subject`, forbidden for `Homeroom`.
    pub subject_name: Option<String>,
}

impl TeacherStudent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_school_year(self.school_year)?;
        match (self.role, self.subject_name.as_deref()) {
            (TeacherRole::Subject, None) => Err(ValidationError::SubjectNameRequired),
            (TeacherRole::Subject, Some(name)) if name.trim().is_empty() => {
                Err(ValidationError::SubjectNameRequired)
            }
            (TeacherRole::Homeroom, Some(_)) => Err(ValidationError::SubjectNameForbidden),
            _ => Ok(()),
        }
    }
}
