//! Board post model.
//!
//! # Responsibility
//! - Define the board aggregate and its category/status enumerations.
//! - Validate title/content and category-specific scope requirements.
//!
//! # Invariants
//! - Lifecycle is `Active -> Deleted` (terminal, soft); rows are never
//!   physically removed.
//! - `pinned` is orthogonal to status and mutable only while active.
//! - `view_count` only ever increases.

use crate::model::school::ClassroomId;
use crate::model::user::UserId;
use crate::model::{validate_grade, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a board post.
pub type BoardId = Uuid;

/// Maximum title length in characters.
pub const BOARD_TITLE_MAX_CHARS: usize = 200;

/// Six access domains partitioning the board namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardCategory {
    SchoolNotice,
    GradeBoard,
    ClassBoard,
    TeacherBoard,
    ParentNotice,
    ParentBoard,
}

impl BoardCategory {
    /// Stable string id used in storage and logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SchoolNotice => "school_notice",
            Self::GradeBoard => "grade_board",
            Self::ClassBoard => "class_board",
            Self::TeacherBoard => "teacher_board",
            Self::ParentNotice => "parent_notice",
            Self::ParentBoard => "parent_board",
        }
    }

    /// All categories in canonical order.
    pub fn all() -> &'static [BoardCategory] {
        &[
            Self::SchoolNotice,
            Self::GradeBoard,
            Self::ClassBoard,
            Self::TeacherBoard,
            Self::ParentNotice,
            Self::ParentBoard,
        ]
    }

    /// Scope parameter this category requires on posts and checks.
    pub fn required_scope(self) -> ScopeKind {
        match self {
            Self::GradeBoard => ScopeKind::Grade,
            Self::ClassBoard => ScopeKind::Classroom,
            _ => ScopeKind::School,
        }
    }
}

impl Display for BoardCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of scope parameter a category requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// School-wide; no grade or classroom parameter.
    School,
    /// Requires a target grade.
    Grade,
    /// Requires a target classroom.
    Classroom,
}

/// Board lifecycle status. Deletion is terminal and soft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardStatus {
    Active,
    Deleted,
}

impl BoardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

/// One board post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub category: BoardCategory,
    pub title: String,
    pub content: String,
    pub writer_id: UserId,
    /// Set iff `category` requires grade scope.
    pub target_grade: Option<i32>,
    /// Set iff `category` requires classroom scope.
    pub target_classroom_id: Option<ClassroomId>,
    pub pinned: bool,
    pub view_count: i64,
    pub status: BoardStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Board {
    /// Creates an active, unpinned board with a generated stable ID.
    ///
    /// Timestamps are assigned by storage defaults on insert.
    pub fn new(
        category: BoardCategory,
        title: impl Into<String>,
        content: impl Into<String>,
        writer_id: UserId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            title: title.into(),
            content: content.into(),
            writer_id,
            target_grade: None,
            target_classroom_id: None,
            pinned: false,
            view_count: 0,
            status: BoardStatus::Active,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Returns whether this board is visible to readers.
    pub fn is_active(&self) -> bool {
        self.status == BoardStatus::Active
    }

    /// Validates title/content plus the category's scope requirement.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_board_text(&self.title, &self.content)?;
        validate_board_scope(self.category, self.target_grade, self.target_classroom_id)
    }
}

/// Validates title and content constraints shared by create and update.
pub fn validate_board_text(title: &str, content: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    if title.chars().count() > BOARD_TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            max_chars: BOARD_TITLE_MAX_CHARS,
        });
    }
    if content.trim().is_empty() {
        return Err(ValidationError::BlankContent);
    }
    Ok(())
}

/// Validates that the given scope parameters fit the category.
pub fn validate_board_scope(
    category: BoardCategory,
    target_grade: Option<i32>,
    target_classroom_id: Option<ClassroomId>,
) -> Result<(), ValidationError> {
    match category.required_scope() {
        ScopeKind::School => {
            if target_grade.is_some() || target_classroom_id.is_some() {
                return Err(ValidationError::UnexpectedScope(category));
            }
        }
        ScopeKind::Grade => {
            let grade =
                target_grade.ok_or(ValidationError::MissingTargetGrade(category))?;
            validate_grade(grade)?;
            if target_classroom_id.is_some() {
                return Err(ValidationError::UnexpectedScope(category));
            }
        }
        ScopeKind::Classroom => {
            if target_classroom_id.is_none() {
                return Err(ValidationError::MissingTargetClassroom(category));
            }
            if target_grade.is_some() {
                return Err(ValidationError::UnexpectedScope(category));
            }
        }
    }
    Ok(())
}
