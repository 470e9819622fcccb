//! Access control engine for board categories.
//!
//! # Responsibility
//! - Decide read/write/modify/pin permission from an actor snapshot, a
//!   board category and a resolved target scope.
//! - Stay pure: no storage access inside decision functions; scope
//!   resolution happens before the engine runs.
//!
//! # Invariants
//! - An actor holding admin passes every check.
//! - Every rule is a set-membership test across *all* held roles, never
//!   a comparison against one primary role.
//! - Unmatched category/role combinations deny (fail closed).
//! - A required scope that is missing or did not resolve to an existing
//!   classroom denies instead of erroring.

use crate::model::board::{Board, BoardCategory};
use crate::model::school::{AssignmentRecord, Classroom};
use crate::model::user::{Role, User, UserId};
use std::collections::BTreeSet;

/// Per-request snapshot of the acting user, resolved once upstream.
///
/// `current_assignment` is the student's assignment for the configured
/// current school year (with most-recent-year fallback); `None` for
/// actors without a student assignment history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub roles: BTreeSet<Role>,
    pub current_assignment: Option<AssignmentRecord>,
}

impl Actor {
    /// Builds an actor snapshot from a loaded user aggregate.
    pub fn from_user(user: &User, current_assignment: Option<AssignmentRecord>) -> Self {
        Self {
            user_id: user.id,
            roles: user.profiles.keys().copied().collect(),
            current_assignment,
        }
    }

    /// Returns whether the actor holds the given role.
    pub fn holds(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.holds(Role::Admin)
    }
}

/// Resolved target scope for one permission check.
///
/// Categories with grade or classroom scope require the matching
/// variant; `Unresolved` stands for a missing parameter or a classroom
/// id that did not resolve to an existing row, and always denies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeTarget {
    /// School-wide category; no scope parameter applies.
    School,
    Grade(i32),
    /// Resolved classroom row; carries the year-scoped homeroom teacher.
    Classroom(Classroom),
    Unresolved,
}

/// Decides read permission per the category matrix.
pub fn can_read(actor: &Actor, category: BoardCategory, scope: &ScopeTarget) -> bool {
    if actor.is_admin() {
        return true;
    }

    match (category, scope) {
        (BoardCategory::SchoolNotice, ScopeTarget::School) => true,
        (BoardCategory::GradeBoard, ScopeTarget::Grade(grade)) => {
            actor.holds(Role::Teacher) || student_in_grade(actor, *grade)
        }
        (BoardCategory::ClassBoard, ScopeTarget::Classroom(classroom)) => {
            is_homeroom_of(actor, classroom) || student_in_classroom(actor, classroom)
        }
        (BoardCategory::TeacherBoard, ScopeTarget::School) => actor.holds(Role::Teacher),
        (BoardCategory::ParentNotice | BoardCategory::ParentBoard, ScopeTarget::School) => {
            actor.holds(Role::Parent) || actor.holds(Role::Teacher)
        }
        _ => false,
    }
}

/// Decides write permission per the category matrix.
pub fn can_write(actor: &Actor, category: BoardCategory, scope: &ScopeTarget) -> bool {
    if actor.is_admin() {
        return true;
    }

    match (category, scope) {
        // School notices are admin-only; the short-circuit above is the
        // single allow path.
        (BoardCategory::SchoolNotice, _) => false,
        (BoardCategory::GradeBoard, ScopeTarget::Grade(_)) => actor.holds(Role::Teacher),
        (BoardCategory::ClassBoard, ScopeTarget::Classroom(classroom)) => {
            student_in_classroom(actor, classroom)
        }
        (BoardCategory::TeacherBoard, ScopeTarget::School) => actor.holds(Role::Teacher),
        (BoardCategory::ParentNotice, ScopeTarget::School) => actor.holds(Role::Teacher),
        (BoardCategory::ParentBoard, ScopeTarget::School) => actor.holds(Role::Parent),
        _ => false,
    }
}

/// Decides modify/delete permission: admin or the board's own writer.
pub fn can_modify(actor: &Actor, board: &Board) -> bool {
    actor.is_admin() || actor.user_id == board.writer_id
}

/// Pin toggling is admin-only regardless of writer.
pub fn can_toggle_pin(actor: &Actor) -> bool {
    actor.is_admin()
}

fn student_in_grade(actor: &Actor, grade: i32) -> bool {
    actor.holds(Role::Student)
        && actor
            .current_assignment
            .as_ref()
            .is_some_and(|assignment| assignment.grade == grade)
}

fn student_in_classroom(actor: &Actor, classroom: &Classroom) -> bool {
    actor.holds(Role::Student)
        && actor
            .current_assignment
            .as_ref()
            .is_some_and(|assignment| assignment.classroom_id == classroom.id)
}

fn is_homeroom_of(actor: &Actor, classroom: &Classroom) -> bool {
    actor.holds(Role::Teacher) && classroom.homeroom_teacher_id == Some(actor.user_id)
}

#[cfg(test)]
mod tests {
    use super::{can_modify, can_read, can_toggle_pin, can_write, Actor, ScopeTarget};
    use crate::model::board::{Board, BoardCategory};
    use crate::model::school::{AssignmentRecord, Classroom};
    use crate::model::user::Role;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn actor_with(roles: &[Role], assignment: Option<AssignmentRecord>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            current_assignment: assignment,
        }
    }

    fn assignment_in(classroom: &Classroom, student_id: Uuid) -> AssignmentRecord {
        AssignmentRecord {
            student_id,
            school_year: classroom.school_year,
            classroom_id: classroom.id,
            grade: classroom.grade,
            class_number: classroom.class_number,
            attendance_number: 1,
        }
    }

    #[test]
    fn unresolved_scope_denies_everyone_but_admin() {
        let teacher = actor_with(&[Role::Teacher], None);
        let admin = actor_with(&[Role::Admin], None);
        for category in BoardCategory::all() {
            assert!(
                !can_read(&teacher, *category, &ScopeTarget::Unresolved),
                "teacher read must fail closed for {category}"
            );
            assert!(
                !can_write(&teacher, *category, &ScopeTarget::Unresolved),
                "teacher write must fail closed for {category}"
            );
            assert!(can_read(&admin, *category, &ScopeTarget::Unresolved));
            assert!(can_write(&admin, *category, &ScopeTarget::Unresolved));
        }
    }

    #[test]
    fn multi_role_actor_uses_set_membership_not_primary_role() {
        // Holds parent and teacher at once; parent board write needs the
        // parent role even though teacher is "stronger" elsewhere.
        let both = actor_with(&[Role::Teacher, Role::Parent], None);
        assert!(can_write(&both, BoardCategory::ParentBoard, &ScopeTarget::School));
        assert!(can_write(&both, BoardCategory::ParentNotice, &ScopeTarget::School));
        assert!(can_write(&both, BoardCategory::TeacherBoard, &ScopeTarget::School));

        let teacher_only = actor_with(&[Role::Teacher], None);
        assert!(!can_write(
            &teacher_only,
            BoardCategory::ParentBoard,
            &ScopeTarget::School
        ));
    }

    #[test]
    fn homeroom_teacher_reads_but_cannot_write_class_board() {
        let teacher = actor_with(&[Role::Teacher], None);
        let mut classroom = Classroom::new(2026, 2, 7);
        classroom.homeroom_teacher_id = Some(teacher.user_id);
        let scope = ScopeTarget::Classroom(classroom);

        assert!(can_read(&teacher, BoardCategory::ClassBoard, &scope));
        assert!(!can_write(&teacher, BoardCategory::ClassBoard, &scope));
    }

    #[test]
    fn non_homeroom_teacher_cannot_read_class_board() {
        let teacher = actor_with(&[Role::Teacher], None);
        let mut classroom = Classroom::new(2026, 2, 7);
        classroom.homeroom_teacher_id = Some(Uuid::new_v4());

        assert!(!can_read(
            &teacher,
            BoardCategory::ClassBoard,
            &ScopeTarget::Classroom(classroom)
        ));
    }

    #[test]
    fn class_board_write_requires_exact_classroom_not_same_grade() {
        let student_id = Uuid::new_v4();
        let own = Classroom::new(2026, 2, 7);
        let sibling = Classroom::new(2026, 2, 9);
        let mut student = actor_with(&[Role::Student], None);
        student.user_id = student_id;
        student.current_assignment = Some(assignment_in(&own, student_id));

        assert!(can_write(
            &student,
            BoardCategory::ClassBoard,
            &ScopeTarget::Classroom(own)
        ));
        assert!(!can_write(
            &student,
            BoardCategory::ClassBoard,
            &ScopeTarget::Classroom(sibling)
        ));
    }

    #[test]
    fn student_without_assignment_is_denied_grade_scope() {
        let student = actor_with(&[Role::Student], None);
        assert!(!can_read(
            &student,
            BoardCategory::GradeBoard,
            &ScopeTarget::Grade(2)
        ));
    }

    #[test]
    fn pin_toggle_is_admin_only_even_for_writer() {
        let writer = actor_with(&[Role::Teacher], None);
        let board = Board::new(BoardCategory::TeacherBoard, "t", "c", writer.user_id);
        assert!(can_modify(&writer, &board));
        assert!(!can_toggle_pin(&writer));

        let admin = actor_with(&[Role::Admin], None);
        assert!(can_toggle_pin(&admin));
    }

    #[test]
    fn modify_is_writer_or_admin_only() {
        let writer = actor_with(&[Role::Student], None);
        let stranger = actor_with(&[Role::Teacher], None);
        let admin = actor_with(&[Role::Admin], None);
        let board = Board::new(BoardCategory::SchoolNotice, "t", "c", writer.user_id);

        assert!(can_modify(&writer, &board));
        assert!(!can_modify(&stranger, &board));
        assert!(can_modify(&admin, &board));
    }
}
