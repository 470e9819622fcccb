use rusqlite::Connection;
use schoolboard_core::db::open_db_in_memory;
use schoolboard_core::{
    Actor, AssignmentRecord, BoardCategory, BoardId, BoardService, BoardServiceError, Classroom,
    CreateBoardRequest, EnrollmentStatus, LedgerRepository, ListBoardsRequest, PageRequest,
    RoleProfile, SqliteBoardRepository, SqliteLedgerRepository, SqliteUserRepository,
    StudentProfile, TeacherProfile, UpdateBoardRequest, User, UserRepository, ValidationError,
    BOARDS_DEFAULT_LIMIT,
};
use uuid::Uuid;

// Boards reference their writer by foreign key, so every acting user
// gets a real row before posting.
fn persisted_actor(conn: &Connection, profile: RoleProfile) -> Actor {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let user = User::new("poster", profile);
    users.create_user(&user).unwrap();
    Actor::from_user(&user, None)
}

fn admin(conn: &Connection) -> Actor {
    persisted_actor(conn, RoleProfile::Admin)
}

fn teacher(conn: &Connection) -> Actor {
    persisted_actor(conn, RoleProfile::Teacher(TeacherProfile { subject: None }))
}

fn student_in(conn: &Connection, classroom: &Classroom) -> Actor {
    let mut actor = persisted_actor(
        conn,
        RoleProfile::Student(StudentProfile {
            identity_code: "S-2026-0042".to_string(),
            enrollment_status: EnrollmentStatus::Enrolled,
        }),
    );
    actor.current_assignment = Some(AssignmentRecord {
        student_id: actor.user_id,
        school_year: classroom.school_year,
        classroom_id: classroom.id,
        grade: classroom.grade,
        class_number: classroom.class_number,
        attendance_number: 7,
    });
    actor
}

fn service(conn: &Connection) -> BoardService<SqliteBoardRepository<'_>, SqliteLedgerRepository<'_>> {
    BoardService::new(
        SqliteBoardRepository::try_new(conn).unwrap(),
        SqliteLedgerRepository::try_new(conn).unwrap(),
    )
}

fn notice_request(title: &str) -> CreateBoardRequest {
    CreateBoardRequest {
        category: BoardCategory::SchoolNotice,
        title: title.to_string(),
        content: "content".to_string(),
        target_grade: None,
        target_classroom_id: None,
    }
}

fn class_request(classroom: &Classroom, title: &str) -> CreateBoardRequest {
    CreateBoardRequest {
        category: BoardCategory::ClassBoard,
        title: title.to_string(),
        content: "content".to_string(),
        target_grade: None,
        target_classroom_id: Some(classroom.id),
    }
}

fn raw_view_count(conn: &Connection, id: BoardId) -> i64 {
    conn.query_row(
        "SELECT view_count FROM boards WHERE id = ?1;",
        [id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn school_notice_is_admin_only_to_create() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let admin = admin(&conn);
    let board = service.create_board(notice_request("welcome"), &admin).unwrap();
    assert_eq!(board.writer_id, admin.user_id);
    assert!(board.is_active());
    assert_eq!(board.view_count, 0);

    let teacher = teacher(&conn);
    let err = service
        .create_board(notice_request("from teacher"), &teacher)
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::AccessDenied { .. }));
}

#[test]
fn class_board_write_requires_own_classroom() {
    let conn = open_db_in_memory().unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();
    let c7 = Classroom::new(2026, 2, 7);
    let c9 = Classroom::new(2026, 2, 9);
    ledger.create_classroom(&c7).unwrap();
    ledger.create_classroom(&c9).unwrap();

    let service = service(&conn);
    let student = student_in(&conn, &c7);

    let board = service
        .create_board(class_request(&c7, "hello c7"), &student)
        .unwrap();
    assert_eq!(board.target_classroom_id, Some(c7.id));

    let err = service
        .create_board(class_request(&c9, "hello c9"), &student)
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::AccessDenied { .. }));
}

#[test]
fn create_without_required_scope_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let admin = admin(&conn);

    let err = service
        .create_board(
            CreateBoardRequest {
                category: BoardCategory::GradeBoard,
                title: "no grade".to_string(),
                content: "content".to_string(),
                target_grade: None,
                target_classroom_id: None,
            },
            &admin,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        BoardServiceError::Validation(ValidationError::MissingTargetGrade(_))
    ));
}

#[test]
fn only_the_writer_or_admin_may_edit() {
    let conn = open_db_in_memory().unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();
    let c7 = Classroom::new(2026, 2, 7);
    ledger.create_classroom(&c7).unwrap();

    let service = service(&conn);
    let writer = student_in(&conn, &c7);
    let classmate = student_in(&conn, &c7);

    let board = service
        .create_board(class_request(&c7, "original"), &writer)
        .unwrap();

    let edit = UpdateBoardRequest {
        title: "edited".to_string(),
        content: "edited content".to_string(),
        pinned: None,
    };

    let err = service
        .update_board(board.id, edit.clone(), &classmate)
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::AccessDenied { .. }));

    let updated = service.update_board(board.id, edit, &writer).unwrap();
    assert_eq!(updated.title, "edited");
    assert_eq!(updated.content, "edited content");
}

#[test]
fn pin_flag_is_admin_only_even_for_the_writer() {
    let conn = open_db_in_memory().unwrap();
    let ledger = SqliteLedgerRepository::try_new(&conn).unwrap();
    let c7 = Classroom::new(2026, 2, 7);
    ledger.create_classroom(&c7).unwrap();

    let service = service(&conn);
    let writer = student_in(&conn, &c7);
    let admin = admin(&conn);

    let board = service
        .create_board(class_request(&c7, "pin me"), &writer)
        .unwrap();

    // Writer editing with a pin flag attached is denied outright.
    let err = service
        .update_board(
            board.id,
            UpdateBoardRequest {
                title: "pin me".to_string(),
                content: "content".to_string(),
                pinned: Some(true),
            },
            &writer,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        BoardServiceError::AccessDenied {
            action: "change pin flag"
        }
    ));

    let err = service.toggle_pinned(board.id, &writer).unwrap_err();
    assert!(matches!(err, BoardServiceError::AccessDenied { .. }));

    let pinned = service.toggle_pinned(board.id, &admin).unwrap();
    assert!(pinned.pinned);
    let unpinned = service.toggle_pinned(board.id, &admin).unwrap();
    assert!(!unpinned.pinned);
}

#[test]
fn failed_pin_half_rolls_back_the_whole_edit() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let admin = admin(&conn);

    let board = service.create_board(notice_request("original"), &admin).unwrap();

    // Make only the pin statement fail; the title/content statement
    // before it still succeeds inside the same transaction.
    conn.execute_batch(
        "CREATE TRIGGER reject_pin BEFORE UPDATE OF pinned ON boards
         BEGIN SELECT RAISE(ABORT, 'pin rejected'); END;",
    )
    .unwrap();

    let err = service
        .update_board(
            board.id,
            UpdateBoardRequest {
                title: "edited".to_string(),
                content: "edited content".to_string(),
                pinned: Some(true),
            },
            &admin,
        )
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::Repo(_)));

    // Nothing committed: the text edit was rolled back with the pin.
    conn.execute_batch("DROP TRIGGER reject_pin;").unwrap();
    let reloaded = service.get_board(board.id).unwrap();
    assert_eq!(reloaded.title, "original");
    assert!(!reloaded.pinned);
}

#[test]
fn view_increments_the_counter_exactly_once_per_read() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let admin = admin(&conn);

    let board = service.create_board(notice_request("count me"), &admin).unwrap();
    assert_eq!(board.view_count, 0);

    let first = service.get_board(board.id).unwrap();
    assert_eq!(first.view_count, 1);
    let second = service.get_board(board.id).unwrap();
    assert_eq!(second.view_count, 2);
}

#[test]
fn deleted_boards_look_missing_and_stop_counting() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let admin = admin(&conn);

    let board = service.create_board(notice_request("short lived"), &admin).unwrap();
    service.get_board(board.id).unwrap();
    service.delete_board(board.id, &admin).unwrap();

    let err = service.get_board(board.id).unwrap_err();
    // Deleted and never-existed render the same text.
    assert_eq!(err.to_string(), format!("board not found: {}", board.id));
    let missing = service.get_board(Uuid::new_v4()).unwrap_err();
    assert!(missing.to_string().starts_with("board not found: "));

    // The counter stayed where it was at deletion time.
    assert_eq!(raw_view_count(&conn, board.id), 1);

    // Deleted boards cannot be edited either.
    let err = service
        .update_board(
            board.id,
            UpdateBoardRequest {
                title: "try again".to_string(),
                content: "content".to_string(),
                pinned: None,
            },
            &admin,
        )
        .unwrap_err();
    assert_eq!(err.to_string(), format!("board not found: {}", board.id));
}

#[test]
fn listing_filters_by_resolved_scope_and_hides_deleted_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let admin = admin(&conn);
    let teacher = teacher(&conn);

    for (grade, title) in [(2, "for grade 2"), (2, "also grade 2"), (3, "for grade 3")] {
        service
            .create_board(
                CreateBoardRequest {
                    category: BoardCategory::GradeBoard,
                    title: title.to_string(),
                    content: "content".to_string(),
                    target_grade: Some(grade),
                    target_classroom_id: None,
                },
                &teacher,
            )
            .unwrap();
    }
    let doomed = service
        .create_board(
            CreateBoardRequest {
                category: BoardCategory::GradeBoard,
                title: "deleted grade 2".to_string(),
                content: "content".to_string(),
                target_grade: Some(2),
                target_classroom_id: None,
            },
            &teacher,
        )
        .unwrap();
    service.delete_board(doomed.id, &admin).unwrap();

    let page = service
        .list_boards(
            ListBoardsRequest {
                category: BoardCategory::GradeBoard,
                target_grade: Some(2),
                target_classroom_id: None,
                page: PageRequest::default(),
            },
            &teacher,
        )
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.applied_limit, BOARDS_DEFAULT_LIMIT);
    assert!(page.items.iter().all(|item| item.target_grade == Some(2)));
    assert!(page.items.iter().all(|item| item.title != "deleted grade 2"));

    // A grade-2 student may list grade 2 but not grade 3.
    let c7 = Classroom::new(2026, 2, 7);
    let student = student_in(&conn, &c7);
    let err = service
        .list_boards(
            ListBoardsRequest {
                category: BoardCategory::GradeBoard,
                target_grade: Some(3),
                target_classroom_id: None,
                page: PageRequest::default(),
            },
            &student,
        )
        .unwrap_err();
    assert!(matches!(err, BoardServiceError::AccessDenied { .. }));
}

#[test]
fn listing_orders_pinned_first_then_newest_and_paginates() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let admin = admin(&conn);

    let mut ids = Vec::new();
    for title in ["oldest", "middle", "newest"] {
        ids.push(service.create_board(notice_request(title), &admin).unwrap().id);
    }
    // Deterministic creation times for the ordering assertion.
    for (offset, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE boards SET created_at = ?1 WHERE id = ?2;",
            rusqlite::params![1_000 + offset as i64, id.to_string()],
        )
        .unwrap();
    }
    // Pin the oldest: it must jump to the front regardless of age.
    service.toggle_pinned(ids[0], &admin).unwrap();

    let request = ListBoardsRequest {
        category: BoardCategory::SchoolNotice,
        target_grade: None,
        target_classroom_id: None,
        page: PageRequest {
            limit: Some(2),
            offset: 0,
        },
    };
    let first_page = service.list_boards(request, &admin).unwrap();
    assert_eq!(first_page.total, 3);
    assert_eq!(first_page.applied_limit, 2);
    let titles: Vec<&str> = first_page.items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, ["oldest", "newest"]);

    let second_page = service
        .list_boards(
            ListBoardsRequest {
                page: PageRequest {
                    limit: Some(2),
                    offset: 2,
                },
                ..request
            },
            &admin,
        )
        .unwrap();
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].title, "middle");
}
