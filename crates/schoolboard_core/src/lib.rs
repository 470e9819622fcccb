//! Core domain logic for the school board service.
//! This crate is the single source of truth for who may read or write
//! which board, and for the year-scoped assignment facts those
//! decisions depend on.

pub mod access;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::{can_modify, can_read, can_toggle_pin, can_write, Actor, ScopeTarget};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{Board, BoardCategory, BoardId, BoardStatus};
pub use model::school::{
    AssignmentRecord, Classroom, ClassroomId, SchoolContext, SchoolYear, Semester,
    StudentAssignment, TeacherRole, TeacherStudent,
};
pub use model::user::{
    EnrollmentStatus, ParentProfile, Role, RoleProfile, StaffProfile, StudentProfile,
    TeacherProfile, User, UserId,
};
pub use model::ValidationError;
pub use repo::board_repo::{
    normalize_board_limit, BoardListQuery, BoardRepository, BoardSummary, SqliteBoardRepository,
    BOARDS_DEFAULT_LIMIT, BOARDS_LIMIT_MAX,
};
pub use repo::ledger_repo::{LedgerRepository, SqliteLedgerRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::board_service::{
    BoardPage, BoardService, BoardServiceError, CreateBoardRequest, ListBoardsRequest,
    PageRequest, UpdateBoardRequest,
};
pub use service::enrollment_service::{
    CreateClassroomRequest, EnrollStudentRequest, EnrollmentService, EnrollmentServiceError,
};
pub use service::identity_service::{
    resolve_actor, IdentityService, IdentityServiceError, RegisterUserRequest,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
