//! Assignment ledger contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist year-scoped membership facts: classrooms, student
//!   assignments, teacher↔student relations.
//! - Resolve assignment records (joined with classroom grade/class
//!   number) for the access engine.
//!
//! # Invariants
//! - One classroom per (school_year, grade, class_number).
//! - One assignment per (student, school_year).
//! - One relation per (teacher, student, school_year, role).
//! - All three rules are enforced by schema constraints at insert time.

use crate::model::school::{
    AssignmentRecord, Classroom, ClassroomId, SchoolYear, StudentAssignment, TeacherRole,
    TeacherStudent,
};
use crate::model::user::UserId;
use crate::repo::{
    ensure_connection_ready, map_insert_error, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    sa.student_id,
    sa.school_year,
    sa.classroom_id,
    sa.attendance_number,
    c.grade,
    c.class_number
FROM student_assignments sa
INNER JOIN classrooms c ON c.id = sa.classroom_id";

/// Repository interface for the assignment ledger.
pub trait LedgerRepository {
    /// Persists one classroom row. `Conflict` on duplicate
    /// (year, grade, class_number).
    fn create_classroom(&self, classroom: &Classroom) -> RepoResult<ClassroomId>;
    /// Loads one classroom by id.
    fn get_classroom(&self, id: ClassroomId) -> RepoResult<Option<Classroom>>;
    /// Sets or clears the homeroom teacher of one classroom.
    fn set_homeroom_teacher(
        &self,
        classroom_id: ClassroomId,
        teacher_id: Option<UserId>,
    ) -> RepoResult<()>;
    /// Classrooms where the given teacher is homeroom teacher, newest
    /// school year first.
    fn homeroom_classrooms(&self, teacher_id: UserId) -> RepoResult<Vec<Classroom>>;
    /// Persists one student assignment. `Conflict` on duplicate
    /// (student, school_year).
    fn create_assignment(&self, assignment: &StudentAssignment) -> RepoResult<()>;
    /// Resolves the single assignment for one student and year.
    fn assignment_of(
        &self,
        student_id: UserId,
        school_year: SchoolYear,
    ) -> RepoResult<Option<AssignmentRecord>>;
    /// Resolves the most recent assignment for one student by year.
    fn latest_assignment(&self, student_id: UserId) -> RepoResult<Option<AssignmentRecord>>;
    /// Persists one teacher↔student relation. `Conflict` on duplicate
    /// (teacher, student, year, role).
    fn create_teacher_student(&self, relation: &TeacherStudent) -> RepoResult<()>;
    /// Relations held by one teacher in one school year.
    fn teacher_students(
        &self,
        teacher_id: UserId,
        school_year: SchoolYear,
    ) -> RepoResult<Vec<TeacherStudent>>;
}

/// SQLite-backed assignment ledger.
pub struct SqliteLedgerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["classrooms", "student_assignments", "teacher_students"],
        )?;
        Ok(Self { conn })
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn create_classroom(&self, classroom: &Classroom) -> RepoResult<ClassroomId> {
        classroom.validate()?;

        self.conn
            .execute(
                "INSERT INTO classrooms (
                    id,
                    school_year,
                    grade,
                    class_number,
                    homeroom_teacher_id
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    classroom.id.to_string(),
                    classroom.school_year,
                    classroom.grade,
                    classroom.class_number,
                    classroom.homeroom_teacher_id.map(|id| id.to_string()),
                ],
            )
            .map_err(|err| {
                map_insert_error(
                    "classroom",
                    format!(
                        "year {} grade {} class {}",
                        classroom.school_year, classroom.grade, classroom.class_number
                    ),
                    err,
                )
            })?;

        Ok(classroom.id)
    }

    fn get_classroom(&self, id: ClassroomId) -> RepoResult<Option<Classroom>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, school_year, grade, class_number, homeroom_teacher_id
             FROM classrooms
             WHERE id = ?1;",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_classroom_row(row)?));
        }
        Ok(None)
    }

    fn set_homeroom_teacher(
        &self,
        classroom_id: ClassroomId,
        teacher_id: Option<UserId>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE classrooms SET homeroom_teacher_id = ?2 WHERE id = ?1;",
            params![
                classroom_id.to_string(),
                teacher_id.map(|id| id.to_string())
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(classroom_id));
        }
        Ok(())
    }

    fn homeroom_classrooms(&self, teacher_id: UserId) -> RepoResult<Vec<Classroom>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, school_year, grade, class_number, homeroom_teacher_id
             FROM classrooms
             WHERE homeroom_teacher_id = ?1
             ORDER BY school_year DESC, grade ASC, class_number ASC;",
        )?;

        let mut rows = stmt.query([teacher_id.to_string()])?;
        let mut classrooms = Vec::new();
        while let Some(row) = rows.next()? {
            classrooms.push(parse_classroom_row(row)?);
        }
        Ok(classrooms)
    }

    fn create_assignment(&self, assignment: &StudentAssignment) -> RepoResult<()> {
        assignment.validate()?;

        if self.get_classroom(assignment.classroom_id)?.is_none() {
            return Err(RepoError::NotFound(assignment.classroom_id));
        }

        self.conn
            .execute(
                "INSERT INTO student_assignments (
                    student_id,
                    school_year,
                    classroom_id,
                    attendance_number
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    assignment.student_id.to_string(),
                    assignment.school_year,
                    assignment.classroom_id.to_string(),
                    assignment.attendance_number,
                ],
            )
            .map_err(|err| {
                map_insert_error(
                    "student assignment",
                    format!(
                        "student {} already assigned for year {}",
                        assignment.student_id, assignment.school_year
                    ),
                    err,
                )
            })?;

        Ok(())
    }

    fn assignment_of(
        &self,
        student_id: UserId,
        school_year: SchoolYear,
    ) -> RepoResult<Option<AssignmentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE sa.student_id = ?1 AND sa.school_year = ?2;"
        ))?;

        let mut rows = stmt.query(params![student_id.to_string(), school_year])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_assignment_row(row)?));
        }
        Ok(None)
    }

    fn latest_assignment(&self, student_id: UserId) -> RepoResult<Option<AssignmentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE sa.student_id = ?1
             ORDER BY sa.school_year DESC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query([student_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_assignment_row(row)?));
        }
        Ok(None)
    }

    fn create_teacher_student(&self, relation: &TeacherStudent) -> RepoResult<()> {
        relation.validate()?;

        self.conn
            .execute(
                "INSERT INTO teacher_students (
                    teacher_id,
                    student_id,
                    school_year,
                    role,
                    subject_name
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    relation.teacher_id.to_string(),
                    relation.student_id.to_string(),
                    relation.school_year,
                    relation.role.as_str(),
                    relation.subject_name.as_deref(),
                ],
            )
            .map_err(|err| {
                map_insert_error(
                    "teacher-student relation",
                    format!(
                        "teacher {} / student {} / year {} / role {}",
                        relation.teacher_id,
                        relation.student_id,
                        relation.school_year,
                        relation.role
                    ),
                    err,
                )
            })?;

        Ok(())
    }

    fn teacher_students(
        &self,
        teacher_id: UserId,
        school_year: SchoolYear,
    ) -> RepoResult<Vec<TeacherStudent>> {
        let mut stmt = self.conn.prepare(
            "SELECT teacher_id, student_id, school_year, role, subject_name
             FROM teacher_students
             WHERE teacher_id = ?1 AND school_year = ?2
             ORDER BY student_id ASC, role ASC;",
        )?;

        let mut rows = stmt.query(params![teacher_id.to_string(), school_year])?;
        let mut relations = Vec::new();
        while let Some(row) = rows.next()? {
            let teacher_text: String = row.get("teacher_id")?;
            let student_text: String = row.get("student_id")?;
            let role_text: String = row.get("role")?;
            let relation = TeacherStudent {
                teacher_id: parse_uuid(&teacher_text, "teacher_students.teacher_id")?,
                student_id: parse_uuid(&student_text, "teacher_students.student_id")?,
                school_year: row.get("school_year")?,
                role: parse_teacher_role(&role_text)?,
                subject_name: row.get("subject_name")?,
            };
            relation.validate()?;
            relations.push(relation);
        }
        Ok(relations)
    }
}

/// Returns whether the given teacher is homeroom teacher of the given
/// classroom, per the classroom row's own year-scoped field.
pub fn is_homeroom_teacher<R: LedgerRepository>(
    ledger: &R,
    teacher_id: UserId,
    classroom_id: ClassroomId,
) -> RepoResult<bool> {
    let Some(classroom) = ledger.get_classroom(classroom_id)? else {
        return Ok(false);
    };
    Ok(classroom.homeroom_teacher_id == Some(teacher_id))
}

fn parse_classroom_row(row: &Row<'_>) -> RepoResult<Classroom> {
    let id_text: String = row.get("id")?;
    let homeroom_text: Option<String> = row.get("homeroom_teacher_id")?;
    let homeroom_teacher_id = match homeroom_text {
        Some(text) => Some(parse_uuid(&text, "classrooms.homeroom_teacher_id")?),
        None => None,
    };

    let classroom = Classroom {
        id: parse_uuid(&id_text, "classrooms.id")?,
        school_year: row.get("school_year")?,
        grade: row.get("grade")?,
        class_number: row.get("class_number")?,
        homeroom_teacher_id,
    };
    classroom.validate()?;
    Ok(classroom)
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<AssignmentRecord> {
    let student_text: String = row.get("student_id")?;
    let classroom_text: String = row.get("classroom_id")?;
    Ok(AssignmentRecord {
        student_id: parse_uuid(&student_text, "student_assignments.student_id")?,
        school_year: row.get("school_year")?,
        classroom_id: parse_uuid(&classroom_text, "student_assignments.classroom_id")?,
        grade: row.get("grade")?,
        class_number: row.get("class_number")?,
        attendance_number: row.get("attendance_number")?,
    })
}

fn parse_teacher_role(value: &str) -> RepoResult<TeacherRole> {
    match value {
        "homeroom" => Ok(TeacherRole::Homeroom),
        "subject" => Ok(TeacherRole::Subject),
        other => Err(RepoError::InvalidData(format!(
            "invalid teacher role `{other}` in teacher_students.role"
        ))),
    }
}
