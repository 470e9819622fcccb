use schoolboard_core::db::open_db_in_memory;
use schoolboard_core::{
    Classroom, CreateClassroomRequest, EnrollStudentRequest, EnrollmentService,
    EnrollmentServiceError, EnrollmentStatus, LedgerRepository, RepoError, RoleProfile,
    SchoolContext, Semester, SqliteLedgerRepository, SqliteUserRepository, StudentAssignment,
    StudentProfile, TeacherProfile, TeacherRole, TeacherStudent, User, UserId, UserRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn seed_student(conn: &Connection, name: &str, code: &str) -> UserId {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    users
        .create_user(&User::new(
            name,
            RoleProfile::Student(StudentProfile {
                identity_code: code.to_string(),
                enrollment_status: EnrollmentStatus::Enrolled,
            }),
        ))
        .unwrap()
}

fn seed_teacher(conn: &Connection, name: &str) -> UserId {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    users
        .create_user(&User::new(
            name,
            RoleProfile::Teacher(TeacherProfile { subject: None }),
        ))
        .unwrap()
}

#[test]
fn second_assignment_for_same_student_and_year_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let student = seed_student(&conn, "Mina", "S-2026-0001");
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let c7 = Classroom::new(2026, 2, 7);
    let c9 = Classroom::new(2026, 2, 9);
    ledger.create_classroom(&c7).unwrap();
    ledger.create_classroom(&c9).unwrap();

    ledger
        .create_assignment(&StudentAssignment {
            student_id: student,
            school_year: 2026,
            classroom_id: c7.id,
            attendance_number: 1,
        })
        .unwrap();

    let err = ledger
        .create_assignment(&StudentAssignment {
            student_id: student,
            school_year: 2026,
            classroom_id: c9.id,
            attendance_number: 2,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict {
            entity: "student assignment",
            ..
        }
    ));

    // The original record is untouched.
    let record = ledger.assignment_of(student, 2026).unwrap().unwrap();
    assert_eq!(record.classroom_id, c7.id);
    assert_eq!(record.attendance_number, 1);
}

#[test]
fn promotion_appends_a_new_year_record_without_rewriting_history() {
    let conn = open_db_in_memory().unwrap();
    let student = seed_student(&conn, "Mina", "S-2026-0001");
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let second_grade = Classroom::new(2026, 2, 7);
    let third_grade = Classroom::new(2027, 3, 4);
    ledger.create_classroom(&second_grade).unwrap();
    ledger.create_classroom(&third_grade).unwrap();

    for (year, classroom, number) in [(2026, &second_grade, 12), (2027, &third_grade, 9)] {
        ledger
            .create_assignment(&StudentAssignment {
                student_id: student,
                school_year: year,
                classroom_id: classroom.id,
                attendance_number: number,
            })
            .unwrap();
    }

    let old = ledger.assignment_of(student, 2026).unwrap().unwrap();
    assert_eq!(old.grade, 2);
    assert_eq!(old.attendance_number, 12);

    let new = ledger.assignment_of(student, 2027).unwrap().unwrap();
    assert_eq!(new.grade, 3);
    assert_eq!(new.class_number, 4);
}

#[test]
fn duplicate_classroom_for_year_grade_class_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    ledger.create_classroom(&Classroom::new(2026, 2, 7)).unwrap();
    let err = ledger
        .create_classroom(&Classroom::new(2026, 2, 7))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict {
            entity: "classroom",
            ..
        }
    ));

    // Same grade/class in another year is a different classroom.
    ledger.create_classroom(&Classroom::new(2027, 2, 7)).unwrap();
}

#[test]
fn duplicate_teacher_student_relation_conflicts_but_other_role_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let teacher = seed_teacher(&conn, "Park");
    let student = seed_student(&conn, "Mina", "S-2026-0001");
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let homeroom = TeacherStudent {
        teacher_id: teacher,
        student_id: student,
        school_year: 2026,
        role: TeacherRole::Homeroom,
        subject_name: None,
    };
    ledger.create_teacher_student(&homeroom).unwrap();

    let err = ledger.create_teacher_student(&homeroom).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict {
            entity: "teacher-student relation",
            ..
        }
    ));

    // The same pair may hold a subject relation in the same year.
    ledger
        .create_teacher_student(&TeacherStudent {
            teacher_id: teacher,
            student_id: student,
            school_year: 2026,
            role: TeacherRole::Subject,
            subject_name: Some("math".to_string()),
        })
        .unwrap();

    let relations = ledger.teacher_students(teacher, 2026).unwrap();
    assert_eq!(relations.len(), 2);
}

#[test]
fn assignment_into_unknown_classroom_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let student = seed_student(&conn, "Mina", "S-2026-0001");
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();

    let missing = Uuid::new_v4();
    let err = ledger
        .create_assignment(&StudentAssignment {
            student_id: student,
            school_year: 2026,
            classroom_id: missing,
            attendance_number: 1,
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn current_assignment_prefers_context_year_then_falls_back_to_latest() {
    let conn = open_db_in_memory().unwrap();
    let student = seed_student(&conn, "Mina", "S-2026-0001");

    let service = EnrollmentService::new(SqliteLedgerRepository::try_new(&conn).unwrap());
    let classroom = service
        .create_classroom(CreateClassroomRequest {
            school_year: 2026,
            grade: 2,
            class_number: 7,
        })
        .unwrap();
    service
        .enroll_student(EnrollStudentRequest {
            student_id: student,
            school_year: 2026,
            classroom_id: classroom.id,
            attendance_number: 5,
        })
        .unwrap();

    let current = service
        .current_assignment(student, &SchoolContext::new(2026, Semester::First))
        .unwrap()
        .unwrap();
    assert_eq!(current.school_year, 2026);
    assert_eq!(current.grade, 2);

    // No 2027 record yet: resolution falls back to the 2026 one.
    let fallback = service
        .current_assignment(student, &SchoolContext::new(2027, Semester::First))
        .unwrap()
        .unwrap();
    assert_eq!(fallback.school_year, 2026);

    let nobody = service
        .current_assignment(Uuid::new_v4(), &SchoolContext::new(2026, Semester::First))
        .unwrap();
    assert!(nobody.is_none());
}

#[test]
fn enrollment_conflicts_surface_through_the_service() {
    let conn = open_db_in_memory().unwrap();
    let student = seed_student(&conn, "Mina", "S-2026-0001");

    let service = EnrollmentService::new(SqliteLedgerRepository::try_new(&conn).unwrap());
    let classroom = service
        .create_classroom(CreateClassroomRequest {
            school_year: 2026,
            grade: 2,
            class_number: 7,
        })
        .unwrap();

    let request = EnrollStudentRequest {
        student_id: student,
        school_year: 2026,
        classroom_id: classroom.id,
        attendance_number: 5,
    };
    service.enroll_student(request).unwrap();

    let err = service.enroll_student(request).unwrap_err();
    assert!(matches!(err, EnrollmentServiceError::Conflict(_)));
}

#[test]
fn homeroom_resolution_uses_the_classroom_row() {
    let conn = open_db_in_memory().unwrap();
    let teacher = seed_teacher(&conn, "Park");
    let other = seed_teacher(&conn, "Choi");

    let service = EnrollmentService::new(SqliteLedgerRepository::try_new(&conn).unwrap());
    let classroom = service
        .create_classroom(CreateClassroomRequest {
            school_year: 2026,
            grade: 2,
            class_number: 7,
        })
        .unwrap();

    service
        .assign_homeroom_teacher(classroom.id, Some(teacher))
        .unwrap();

    assert!(service.is_homeroom_teacher(teacher, classroom.id).unwrap());
    assert!(!service.is_homeroom_teacher(other, classroom.id).unwrap());
    // Unknown classroom is a plain "no", not an error.
    assert!(!service.is_homeroom_teacher(teacher, Uuid::new_v4()).unwrap());

    let rooms = service.homeroom_classrooms(teacher).unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].id, classroom.id);

    service.assign_homeroom_teacher(classroom.id, None).unwrap();
    assert!(!service.is_homeroom_teacher(teacher, classroom.id).unwrap());
}
