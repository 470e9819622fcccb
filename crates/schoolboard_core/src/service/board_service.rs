//! Board use-case service.
//!
//! # Responsibility
//! - Gate every board mutation through the access control engine.
//! - Resolve category scope targets against the assignment ledger before
//!   any decision runs.
//! - Own view-counter, soft-delete and pin semantics at the use-case
//!   level.
//!
//! # Invariants
//! - Authorization is evaluated before any mutation; a denial leaves no
//!   partial write.
//! - A deleted board is reported exactly like a missing one to callers;
//!   only the internal error variant differs.
//! - Listing never trusts a client-asserted scope: the requested scope
//!   is re-validated through the same rules as `can_read`.

use crate::access::{self, Actor, ScopeTarget};
use crate::model::board::{
    validate_board_scope, validate_board_text, Board, BoardCategory, BoardId, ScopeKind,
};
use crate::model::school::ClassroomId;
use crate::model::ValidationError;
use crate::repo::board_repo::{
    normalize_board_limit, BoardListQuery, BoardRepository, BoardSummary,
};
use crate::repo::ledger_repo::LedgerRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for board use-cases.
///
/// `Gone` and `NotFound` render identically: callers must not be able
/// to tell a soft-deleted board from one that never existed.
#[derive(Debug)]
pub enum BoardServiceError {
    /// Actor's roles/scope do not allow the attempted action.
    AccessDenied { action: &'static str },
    /// Board does not exist.
    NotFound(BoardId),
    /// Board exists but is soft-deleted.
    Gone(BoardId),
    /// Malformed request input.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessDenied { action } => write!(f, "access denied: {action}"),
            // Same text on purpose: deleted boards are indistinguishable
            // from missing ones at the surface.
            Self::NotFound(id) | Self::Gone(id) => write!(f, "board not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent board state: {details}"),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BoardServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Request model for creating one board post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBoardRequest {
    pub category: BoardCategory,
    pub title: String,
    pub content: String,
    pub target_grade: Option<i32>,
    pub target_classroom_id: Option<ClassroomId>,
}

/// Request model for editing one board post.
///
/// `pinned` may only be supplied by an admin actor; any other actor is
/// denied even when the text edit itself would be allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBoardRequest {
    pub title: String,
    pub content: String,
    pub pinned: Option<bool>,
}

/// Request model for listing one category page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Request model for one scoped board listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListBoardsRequest {
    pub category: BoardCategory,
    pub target_grade: Option<i32>,
    pub target_classroom_id: Option<ClassroomId>,
    pub page: PageRequest,
}

/// Page envelope for board listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPage {
    pub items: Vec<BoardSummary>,
    /// Total active rows matching the scope, ignoring pagination.
    pub total: u64,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
    pub offset: u32,
}

/// Board service facade gating all mutations through the access engine.
pub struct BoardService<B: BoardRepository, L: LedgerRepository> {
    boards: B,
    ledger: L,
}

impl<B: BoardRepository, L: LedgerRepository> BoardService<B, L> {
    /// Creates a service from board and ledger repository implementations.
    pub fn new(boards: B, ledger: L) -> Self {
        Self { boards, ledger }
    }

    /// Resolves scope parameters and answers the read-permission check.
    pub fn can_read(
        &self,
        actor: &Actor,
        category: BoardCategory,
        target_grade: Option<i32>,
        target_classroom_id: Option<ClassroomId>,
    ) -> Result<bool, BoardServiceError> {
        let scope = self.resolve_scope(category, target_grade, target_classroom_id)?;
        Ok(access::can_read(actor, category, &scope))
    }

    /// Resolves scope parameters and answers the write-permission check.
    pub fn can_write(
        &self,
        actor: &Actor,
        category: BoardCategory,
        target_grade: Option<i32>,
        target_classroom_id: Option<ClassroomId>,
    ) -> Result<bool, BoardServiceError> {
        let scope = self.resolve_scope(category, target_grade, target_classroom_id)?;
        Ok(access::can_write(actor, category, &scope))
    }

    /// Creates one board post after a `can_write` gate.
    pub fn create_board(
        &self,
        request: CreateBoardRequest,
        actor: &Actor,
    ) -> Result<Board, BoardServiceError> {
        validate_board_text(&request.title, &request.content)
            .map_err(BoardServiceError::Validation)?;
        validate_board_scope(
            request.category,
            request.target_grade,
            request.target_classroom_id,
        )
        .map_err(BoardServiceError::Validation)?;

        let scope = self.resolve_scope(
            request.category,
            request.target_grade,
            request.target_classroom_id,
        )?;
        if !access::can_write(actor, request.category, &scope) {
            warn!(
                "event=board_create module=board status=denied category={} actor_id={}",
                request.category, actor.user_id
            );
            return Err(BoardServiceError::AccessDenied {
                action: "create board",
            });
        }

        let mut board = Board::new(
            request.category,
            request.title,
            request.content,
            actor.user_id,
        );
        board.target_grade = request.target_grade;
        board.target_classroom_id = request.target_classroom_id;

        let id = self.boards.create_board(&board)?;
        info!(
            "event=board_create module=board status=ok board_id={id} category={} actor_id={}",
            board.category, actor.user_id
        );

        self.boards
            .get_board(id, false)?
            .ok_or(BoardServiceError::InconsistentState(
                "created board not found in read-back",
            ))
    }

    /// Edits title/content (and, for admins, the pin flag) of one board
    /// after a `can_modify` gate.
    pub fn update_board(
        &self,
        id: BoardId,
        request: UpdateBoardRequest,
        actor: &Actor,
    ) -> Result<Board, BoardServiceError> {
        let board = self.require_active(id)?;
        if !access::can_modify(actor, &board) {
            return Err(BoardServiceError::AccessDenied {
                action: "modify board",
            });
        }
        // The pin flag rides along on edits only for admins, independent
        // of the writer check above.
        if request.pinned.is_some() && !access::can_toggle_pin(actor) {
            return Err(BoardServiceError::AccessDenied {
                action: "change pin flag",
            });
        }
        validate_board_text(&request.title, &request.content)
            .map_err(BoardServiceError::Validation)?;

        self.boards
            .update_board(id, &request.title, &request.content, request.pinned)?;
        info!(
            "event=board_update module=board status=ok board_id={id} actor_id={}",
            actor.user_id
        );

        self.boards
            .get_board(id, false)?
            .ok_or(BoardServiceError::InconsistentState(
                "updated board not found in read-back",
            ))
    }

    /// Soft-deletes one board after a `can_modify` gate. Terminal.
    pub fn delete_board(&self, id: BoardId, actor: &Actor) -> Result<(), BoardServiceError> {
        let board = self.require_active(id)?;
        if !access::can_modify(actor, &board) {
            return Err(BoardServiceError::AccessDenied {
                action: "delete board",
            });
        }

        self.boards.soft_delete_board(id)?;
        info!(
            "event=board_delete module=board status=ok board_id={id} actor_id={}",
            actor.user_id
        );
        Ok(())
    }

    /// Flips the pin flag of one board. Admin-only, writer included.
    pub fn toggle_pinned(&self, id: BoardId, actor: &Actor) -> Result<Board, BoardServiceError> {
        if !access::can_toggle_pin(actor) {
            return Err(BoardServiceError::AccessDenied {
                action: "toggle pin flag",
            });
        }

        let board = self.require_active(id)?;
        self.boards.set_pinned(id, !board.pinned)?;
        info!(
            "event=board_pin module=board status=ok board_id={id} pinned={} actor_id={}",
            !board.pinned, actor.user_id
        );

        self.boards
            .get_board(id, false)?
            .ok_or(BoardServiceError::InconsistentState(
                "board missing after pin toggle",
            ))
    }

    /// Returns one board's content, incrementing its view counter.
    ///
    /// Deleted boards return the not-found shape without touching the
    /// counter and without exposing content.
    pub fn get_board(&self, id: BoardId) -> Result<Board, BoardServiceError> {
        if let Some(board) = self.boards.view_board(id)? {
            return Ok(board);
        }
        Err(self.missing_board_error(id)?)
    }

    /// Lists one page of a category, enforcing the read rules of the
    /// requested scope server-side.
    pub fn list_boards(
        &self,
        request: ListBoardsRequest,
        actor: &Actor,
    ) -> Result<BoardPage, BoardServiceError> {
        let scope = self.resolve_scope(
            request.category,
            request.target_grade,
            request.target_classroom_id,
        )?;
        if !access::can_read(actor, request.category, &scope) {
            warn!(
                "event=board_list module=board status=denied category={} actor_id={}",
                request.category, actor.user_id
            );
            return Err(BoardServiceError::AccessDenied {
                action: "list boards",
            });
        }

        // Row filters come from the *resolved* scope, not raw request
        // input, so an allowed read can never leak a wider scope.
        let (grade_filter, classroom_filter) = match &scope {
            ScopeTarget::Grade(grade) => (Some(*grade), None),
            ScopeTarget::Classroom(classroom) => (None, Some(classroom.id)),
            _ => (None, None),
        };

        let query = BoardListQuery {
            category: Some(request.category),
            target_grade: grade_filter,
            target_classroom_id: classroom_filter,
            include_deleted: false,
            limit: request.page.limit,
            offset: request.page.offset,
        };

        let total = self.boards.count_boards(&query)?;
        let items = self.boards.list_boards(&query)?;
        Ok(BoardPage {
            items,
            total,
            applied_limit: normalize_board_limit(request.page.limit),
            offset: request.page.offset,
        })
    }

    /// Resolves raw scope parameters into a `ScopeTarget`.
    ///
    /// Missing parameters and unknown classroom ids resolve to
    /// `Unresolved` (denied), never to an error.
    fn resolve_scope(
        &self,
        category: BoardCategory,
        target_grade: Option<i32>,
        target_classroom_id: Option<ClassroomId>,
    ) -> Result<ScopeTarget, BoardServiceError> {
        let scope = match category.required_scope() {
            ScopeKind::School => ScopeTarget::School,
            ScopeKind::Grade => match target_grade {
                Some(grade) => ScopeTarget::Grade(grade),
                None => ScopeTarget::Unresolved,
            },
            ScopeKind::Classroom => match target_classroom_id {
                Some(classroom_id) => match self.ledger.get_classroom(classroom_id)? {
                    Some(classroom) => ScopeTarget::Classroom(classroom),
                    None => ScopeTarget::Unresolved,
                },
                None => ScopeTarget::Unresolved,
            },
        };
        Ok(scope)
    }

    fn require_active(&self, id: BoardId) -> Result<Board, BoardServiceError> {
        match self.boards.get_board(id, false)? {
            Some(board) => Ok(board),
            None => Err(self.missing_board_error(id)?),
        }
    }

    /// Distinguishes `Gone` from `NotFound` internally; both render the
    /// same to callers.
    fn missing_board_error(&self, id: BoardId) -> Result<BoardServiceError, BoardServiceError> {
        match self.boards.get_board(id, true)? {
            Some(_) => Ok(BoardServiceError::Gone(id)),
            None => Ok(BoardServiceError::NotFound(id)),
        }
    }
}
