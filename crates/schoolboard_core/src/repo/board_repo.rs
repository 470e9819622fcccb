//! Board repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the canonical `boards` table.
//! - Keep soft-delete, pin and view-counter mechanics inside the
//!   persistence boundary.
//!
//! # Invariants
//! - Write paths call `Board::validate()` before SQL mutations.
//! - Deletion flips `status` to `deleted`; rows are never removed.
//! - The view counter increments in the same statement that reads the
//!   row, and only for active rows.

use crate::model::board::{Board, BoardCategory, BoardId, BoardStatus};
use crate::model::school::ClassroomId;
use crate::model::user::UserId;
use crate::repo::{
    bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const BOARD_COLUMNS: &str = "id,
    category,
    title,
    content,
    writer_id,
    target_grade,
    target_classroom_id,
    pinned,
    view_count,
    status,
    created_at,
    updated_at";

/// Default page size for board listings.
pub const BOARDS_DEFAULT_LIMIT: u32 = 20;
/// Maximum page size for board listings.
pub const BOARDS_LIMIT_MAX: u32 = 100;

/// Clamps a requested page limit into the supported range.
pub fn normalize_board_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => BOARDS_DEFAULT_LIMIT,
        Some(value) => value.min(BOARDS_LIMIT_MAX),
    }
}

/// Query options for board listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardListQuery {
    pub category: Option<BoardCategory>,
    /// Exact grade filter for grade-scoped categories.
    pub target_grade: Option<i32>,
    /// Exact classroom filter for classroom-scoped categories.
    pub target_classroom_id: Option<ClassroomId>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Read model for board listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    pub id: BoardId,
    pub category: BoardCategory,
    pub title: String,
    pub writer_id: UserId,
    pub target_grade: Option<i32>,
    pub target_classroom_id: Option<ClassroomId>,
    pub pinned: bool,
    pub view_count: i64,
    pub created_at: i64,
}

/// Repository interface for board persistence.
pub trait BoardRepository {
    fn create_board(&self, board: &Board) -> RepoResult<BoardId>;
    /// Replaces title and content (and, when given, the pin flag) of one
    /// active board in a single transaction: either every part of the
    /// edit commits or none does.
    fn update_board(
        &self,
        id: BoardId,
        title: &str,
        content: &str,
        pinned: Option<bool>,
    ) -> RepoResult<()>;
    /// Sets the pin flag of one active board.
    fn set_pinned(&self, id: BoardId, pinned: bool) -> RepoResult<()>;
    /// Flips one board to `deleted` status. Idempotent.
    fn soft_delete_board(&self, id: BoardId) -> RepoResult<()>;
    fn get_board(&self, id: BoardId, include_deleted: bool) -> RepoResult<Option<Board>>;
    /// Atomically increments the view counter of one *active* board and
    /// returns the post-increment row. Deleted or missing boards return
    /// `None` and leave no trace on any counter.
    fn view_board(&self, id: BoardId) -> RepoResult<Option<Board>>;
    fn list_boards(&self, query: &BoardListQuery) -> RepoResult<Vec<BoardSummary>>;
    fn count_boards(&self, query: &BoardListQuery) -> RepoResult<u64>;
}

/// SQLite-backed board repository.
pub struct SqliteBoardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["boards"])?;
        Ok(Self { conn })
    }
}

impl BoardRepository for SqliteBoardRepository<'_> {
    fn create_board(&self, board: &Board) -> RepoResult<BoardId> {
        board.validate()?;

        self.conn.execute(
            "INSERT INTO boards (
                id,
                category,
                title,
                content,
                writer_id,
                target_grade,
                target_classroom_id,
                pinned,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                board.id.to_string(),
                board.category.as_str(),
                board.title.as_str(),
                board.content.as_str(),
                board.writer_id.to_string(),
                board.target_grade,
                board.target_classroom_id.map(|id| id.to_string()),
                bool_to_int(board.pinned),
                board.status.as_str(),
            ],
        )?;

        Ok(board.id)
    }

    fn update_board(
        &self,
        id: BoardId,
        title: &str,
        content: &str,
        pinned: Option<bool>,
    ) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let changed = tx.execute(
            "UPDATE boards
             SET
                title = ?2,
                content = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND status = 'active';",
            params![id.to_string(), title, content],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        if let Some(pinned) = pinned {
            let changed = tx.execute(
                "UPDATE boards
                 SET pinned = ?2
                 WHERE id = ?1
                   AND status = 'active';",
                params![id.to_string(), bool_to_int(pinned)],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn set_pinned(&self, id: BoardId, pinned: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE boards
             SET
                pinned = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND status = 'active';",
            params![id.to_string(), bool_to_int(pinned)],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn soft_delete_board(&self, id: BoardId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE boards
             SET
                status = 'deleted',
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_board(&self, id: BoardId, include_deleted: bool) -> RepoResult<Option<Board>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOARD_COLUMNS}
             FROM boards
             WHERE id = ?1
               AND (?2 = 1 OR status = 'active');"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_board_row(row)?));
        }
        Ok(None)
    }

    fn view_board(&self, id: BoardId) -> RepoResult<Option<Board>> {
        let mut stmt = self.conn.prepare(&format!(
            "UPDATE boards
             SET view_count = view_count + 1
             WHERE id = ?1
               AND status = 'active'
             RETURNING {BOARD_COLUMNS};"
        ))?;

        // Parse outside the closure so row-decoding errors keep their
        // repository-level type instead of being flattened into SQL errors.
        let board = stmt
            .query_row([id.to_string()], |row| Ok(parse_board_row(row)))
            .optional()?;

        match board {
            Some(raw) => Ok(Some(raw?)),
            None => Ok(None),
        }
    }

    fn list_boards(&self, query: &BoardListQuery) -> RepoResult<Vec<BoardSummary>> {
        let mut sql = String::from(
            "SELECT
                id,
                category,
                title,
                writer_id,
                target_grade,
                target_classroom_id,
                pinned,
                view_count,
                created_at
             FROM boards
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        push_filters(&mut sql, &mut bind_values, query);

        sql.push_str(" ORDER BY pinned DESC, created_at DESC, id ASC");

        let limit = normalize_board_limit(query.limit);
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(parse_summary_row(row)?);
        }
        Ok(summaries)
    }

    fn count_boards(&self, query: &BoardListQuery) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM boards WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        push_filters(&mut sql, &mut bind_values, query);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn push_filters(sql: &mut String, bind_values: &mut Vec<Value>, query: &BoardListQuery) {
    if !query.include_deleted {
        sql.push_str(" AND status = 'active'");
    }
    if let Some(category) = query.category {
        sql.push_str(" AND category = ?");
        bind_values.push(Value::Text(category.as_str().to_string()));
    }
    if let Some(grade) = query.target_grade {
        sql.push_str(" AND target_grade = ?");
        bind_values.push(Value::Integer(i64::from(grade)));
    }
    if let Some(classroom_id) = query.target_classroom_id {
        sql.push_str(" AND target_classroom_id = ?");
        bind_values.push(Value::Text(classroom_id.to_string()));
    }
}

fn parse_board_row(row: &Row<'_>) -> RepoResult<Board> {
    let id_text: String = row.get("id")?;
    let category_text: String = row.get("category")?;
    let writer_text: String = row.get("writer_id")?;
    let status_text: String = row.get("status")?;
    let classroom_text: Option<String> = row.get("target_classroom_id")?;

    let target_classroom_id = match classroom_text {
        Some(text) => Some(parse_uuid(&text, "boards.target_classroom_id")?),
        None => None,
    };

    let board = Board {
        id: parse_uuid(&id_text, "boards.id")?,
        category: parse_category(&category_text)?,
        title: row.get("title")?,
        content: row.get("content")?,
        writer_id: parse_uuid(&writer_text, "boards.writer_id")?,
        target_grade: row.get("target_grade")?,
        target_classroom_id,
        pinned: int_to_bool(row.get("pinned")?, "boards.pinned")?,
        view_count: row.get("view_count")?,
        status: parse_status(&status_text)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    board.validate()?;
    Ok(board)
}

fn parse_summary_row(row: &Row<'_>) -> RepoResult<BoardSummary> {
    let id_text: String = row.get("id")?;
    let category_text: String = row.get("category")?;
    let writer_text: String = row.get("writer_id")?;
    let classroom_text: Option<String> = row.get("target_classroom_id")?;

    let target_classroom_id = match classroom_text {
        Some(text) => Some(parse_uuid(&text, "boards.target_classroom_id")?),
        None => None,
    };

    Ok(BoardSummary {
        id: parse_uuid(&id_text, "boards.id")?,
        category: parse_category(&category_text)?,
        title: row.get("title")?,
        writer_id: parse_uuid(&writer_text, "boards.writer_id")?,
        target_grade: row.get("target_grade")?,
        target_classroom_id,
        pinned: int_to_bool(row.get("pinned")?, "boards.pinned")?,
        view_count: row.get("view_count")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_category(value: &str) -> RepoResult<BoardCategory> {
    match value {
        "school_notice" => Ok(BoardCategory::SchoolNotice),
        "grade_board" => Ok(BoardCategory::GradeBoard),
        "class_board" => Ok(BoardCategory::ClassBoard),
        "teacher_board" => Ok(BoardCategory::TeacherBoard),
        "parent_notice" => Ok(BoardCategory::ParentNotice),
        "parent_board" => Ok(BoardCategory::ParentBoard),
        other => Err(RepoError::InvalidData(format!(
            "invalid board category `{other}` in boards.category"
        ))),
    }
}

fn parse_status(value: &str) -> RepoResult<BoardStatus> {
    match value {
        "active" => Ok(BoardStatus::Active),
        "deleted" => Ok(BoardStatus::Deleted),
        other => Err(RepoError::InvalidData(format!(
            "invalid board status `{other}` in boards.status"
        ))),
    }
}
