//! Enrollment and assignment use-case service.
//!
//! # Responsibility
//! - Provide the write surface of the assignment ledger: classrooms,
//!   student enrollment/promotion, teacher↔student relations.
//! - Resolve assignments for callers (exact year, current-year with
//!   fallback) and answer homeroom-teacher queries.
//!
//! # Invariants
//! - Enrollment never mutates a previous year's record; each year adds a
//!   new assignment row.
//! - Duplicate year-scoped facts surface as `Conflict`, enforced by
//!   storage constraints at insert time.

use crate::model::school::{
    AssignmentRecord, Classroom, ClassroomId, SchoolContext, SchoolYear, StudentAssignment,
    TeacherStudent,
};
use crate::model::user::UserId;
use crate::model::ValidationError;
use crate::repo::ledger_repo::{is_homeroom_teacher, LedgerRepository};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for enrollment use-cases.
#[derive(Debug)]
pub enum EnrollmentServiceError {
    /// Duplicate classroom, assignment or relation.
    Conflict(String),
    /// Referenced classroom does not exist.
    ClassroomNotFound(ClassroomId),
    /// Malformed request input.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for EnrollmentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict(details) => write!(f, "conflict: {details}"),
            Self::ClassroomNotFound(id) => write!(f, "classroom not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EnrollmentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EnrollmentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict { entity, details } => {
                Self::Conflict(format!("{entity}: {details}"))
            }
            RepoError::NotFound(id) => Self::ClassroomNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Request model for creating one classroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateClassroomRequest {
    pub school_year: SchoolYear,
    pub grade: i32,
    pub class_number: i32,
}

/// Request model for enrolling one student for one school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollStudentRequest {
    pub student_id: UserId,
    pub school_year: SchoolYear,
    pub classroom_id: ClassroomId,
    pub attendance_number: i32,
}

/// Enrollment service facade over the assignment ledger.
pub struct EnrollmentService<R: LedgerRepository> {
    ledger: R,
}

impl<R: LedgerRepository> EnrollmentService<R> {
    /// Creates a service using the provided ledger implementation.
    pub fn new(ledger: R) -> Self {
        Self { ledger }
    }

    /// Creates one classroom for one school year.
    pub fn create_classroom(
        &self,
        request: CreateClassroomRequest,
    ) -> Result<Classroom, EnrollmentServiceError> {
        let classroom = Classroom {
            id: Uuid::new_v4(),
            school_year: request.school_year,
            grade: request.grade,
            class_number: request.class_number,
            homeroom_teacher_id: None,
        };
        let id = self.ledger.create_classroom(&classroom)?;
        info!(
            "event=classroom_create module=enrollment status=ok classroom_id={id} year={} grade={} class={}",
            classroom.school_year, classroom.grade, classroom.class_number
        );
        Ok(classroom)
    }

    /// Sets or clears the homeroom teacher of one classroom.
    pub fn assign_homeroom_teacher(
        &self,
        classroom_id: ClassroomId,
        teacher_id: Option<UserId>,
    ) -> Result<(), EnrollmentServiceError> {
        self.ledger.set_homeroom_teacher(classroom_id, teacher_id)?;
        info!(
            "event=homeroom_assign module=enrollment status=ok classroom_id={classroom_id} teacher_id={}",
            teacher_id.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        Ok(())
    }

    /// Enrolls (or promotes) one student into a classroom for one year.
    ///
    /// A second enrollment for the same (student, year) pair fails with
    /// `Conflict` atomically at insert time.
    pub fn enroll_student(
        &self,
        request: EnrollStudentRequest,
    ) -> Result<AssignmentRecord, EnrollmentServiceError> {
        let assignment = StudentAssignment {
            student_id: request.student_id,
            school_year: request.school_year,
            classroom_id: request.classroom_id,
            attendance_number: request.attendance_number,
        };
        self.ledger.create_assignment(&assignment)?;
        info!(
            "event=student_enroll module=enrollment status=ok student_id={} year={} classroom_id={}",
            request.student_id, request.school_year, request.classroom_id
        );

        self.ledger
            .assignment_of(request.student_id, request.school_year)?
            .ok_or_else(|| {
                EnrollmentServiceError::Repo(RepoError::InvalidData(
                    "created assignment not found in read-back".to_string(),
                ))
            })
    }

    /// Records one teacher↔student relation for one school year.
    pub fn register_teacher_student(
        &self,
        relation: TeacherStudent,
    ) -> Result<(), EnrollmentServiceError> {
        self.ledger.create_teacher_student(&relation)?;
        info!(
            "event=teacher_student_register module=enrollment status=ok teacher_id={} student_id={} year={} role={}",
            relation.teacher_id, relation.student_id, relation.school_year, relation.role
        );
        Ok(())
    }

    /// Returns the single assignment for one student and year, if any.
    pub fn assignment_of(
        &self,
        student_id: UserId,
        school_year: SchoolYear,
    ) -> Result<Option<AssignmentRecord>, EnrollmentServiceError> {
        Ok(self.ledger.assignment_of(student_id, school_year)?)
    }

    /// Resolves the assignment for the context's current school year,
    /// falling back to the most recent one by year.
    pub fn current_assignment(
        &self,
        student_id: UserId,
        ctx: &SchoolContext,
    ) -> Result<Option<AssignmentRecord>, EnrollmentServiceError> {
        if let Some(assignment) = self.ledger.assignment_of(student_id, ctx.school_year)? {
            return Ok(Some(assignment));
        }
        Ok(self.ledger.latest_assignment(student_id)?)
    }

    /// Returns whether the teacher is homeroom teacher of the classroom,
    /// per the classroom row's own year-scoped field.
    pub fn is_homeroom_teacher(
        &self,
        teacher_id: UserId,
        classroom_id: ClassroomId,
    ) -> Result<bool, EnrollmentServiceError> {
        Ok(is_homeroom_teacher(&self.ledger, teacher_id, classroom_id)?)
    }

    /// Classrooms where the teacher is homeroom teacher.
    pub fn homeroom_classrooms(
        &self,
        teacher_id: UserId,
    ) -> Result<Vec<Classroom>, EnrollmentServiceError> {
        Ok(self.ledger.homeroom_classrooms(teacher_id)?)
    }
}
