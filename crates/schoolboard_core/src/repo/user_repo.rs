//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the user aggregate: identity row plus one role-profile row
//!   per held role.
//! - Rebuild the capability map (role -> tagged profile) on read.
//!
//! # Invariants
//! - `User::validate()` runs before any SQL mutation.
//! - The `role` column must agree with the profile payload's own tag;
//!   disagreement on read is rejected as invalid data.
//! - Duplicate role grants are rejected by the (user_id, role) primary
//!   key, not by a prior existence read.

use crate::model::user::{Role, RoleProfile, User, UserId};
use crate::repo::{
    ensure_connection_ready, map_insert_error, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

/// Repository interface for the identity store.
pub trait UserRepository {
    /// Persists a new user and all of its role profiles atomically.
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    /// Loads one user with its full capability map.
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Adds one role profile to an existing user.
    ///
    /// Returns `Conflict` when the role is already held.
    fn grant_role(&self, id: UserId, profile: &RoleProfile) -> RepoResult<()>;
    /// Returns the set of roles held by one user.
    fn roles_of(&self, id: UserId) -> RepoResult<Vec<Role>>;
}

/// SQLite-backed user repository.
#[derive(Debug)]
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "user_roles"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO users (id, display_name) VALUES (?1, ?2);",
            params![user.id.to_string(), user.display_name.as_str()],
        )
        .map_err(|err| map_insert_error("user", user.id.to_string(), err))?;

        for (role, profile) in &user.profiles {
            insert_role_row(&tx, user.id, *role, profile)?;
        }

        tx.commit()?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let id_text = id.to_string();
        let header: Option<String> = self
            .conn
            .query_row(
                "SELECT display_name FROM users WHERE id = ?1;",
                [id_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(display_name) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT role, profile_json
             FROM user_roles
             WHERE user_id = ?1
             ORDER BY role ASC;",
        )?;
        let mut rows = stmt.query([id_text.as_str()])?;

        let mut profiles = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let role_text: String = row.get("role")?;
            let role = parse_role(&role_text)?;
            let payload: String = row.get("profile_json")?;
            let profile: RoleProfile = serde_json::from_str(&payload).map_err(|err| {
                RepoError::InvalidData(format!(
                    "unreadable profile payload for user {id_text} role {role_text}: {err}"
                ))
            })?;
            if profile.role() != role {
                return Err(RepoError::InvalidData(format!(
                    "profile payload tagged `{}` stored under role `{role_text}`",
                    profile.role()
                )));
            }
            profiles.insert(role, profile);
        }

        let user = User {
            id: parse_uuid(&id_text, "users.id")?,
            display_name,
            profiles,
        };
        user.validate()?;
        Ok(Some(user))
    }

    fn grant_role(&self, id: UserId, profile: &RoleProfile) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::NotFound(id));
        }

        insert_role_row(self.conn, id, profile.role(), profile)
    }

    fn roles_of(&self, id: UserId) -> RepoResult<Vec<Role>> {
        let mut stmt = self.conn.prepare(
            "SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY role ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;

        let mut roles = Vec::new();
        while let Some(row) = rows.next()? {
            let role_text: String = row.get("role")?;
            roles.push(parse_role(&role_text)?);
        }
        Ok(roles)
    }
}

fn insert_role_row(
    conn: &Connection,
    user_id: UserId,
    role: Role,
    profile: &RoleProfile,
) -> RepoResult<()> {
    let payload = serde_json::to_string(profile).map_err(|err| {
        RepoError::InvalidData(format!("unserializable profile payload: {err}"))
    })?;

    conn.execute(
        "INSERT INTO user_roles (user_id, role, profile_json) VALUES (?1, ?2, ?3);",
        params![user_id.to_string(), role.as_str(), payload],
    )
    .map_err(|err| {
        map_insert_error(
            "role grant",
            format!("user {user_id} already holds role {role}"),
            err,
        )
    })?;
    Ok(())
}

fn parse_role(value: &str) -> RepoResult<Role> {
    match value {
        "student" => Ok(Role::Student),
        "teacher" => Ok(Role::Teacher),
        "parent" => Ok(Role::Parent),
        "staff" => Ok(Role::Staff),
        "admin" => Ok(Role::Admin),
        other => Err(RepoError::InvalidData(format!(
            "invalid role `{other}` in user_roles.role"
        ))),
    }
}
