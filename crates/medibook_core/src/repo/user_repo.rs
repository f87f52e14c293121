//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - `username` and `email` uniqueness is enforced by the schema and
//!   reported as `ConstraintKind::Unique`.
//! - Deleting a user that still owns a profile fails with
//!   `ConstraintKind::ForeignKey`; profiles must be deleted first.

use super::{bool_to_int, expect_changed, int_to_bool, RepoError, RepoResult};
use crate::model::user::{NewUser, User, UserRole};
use crate::model::UserId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    password_hash,
    role,
    is_active,
    created_at
FROM users";

/// Query options for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub include_inactive: bool,
}

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>>;
    fn set_user_active(&self, id: UserId, is_active: bool) -> RepoResult<()>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, column: &str, value: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE {column} = ?1;"))?;
        let user = stmt.query_row([value], |row| Ok(parse_user_row(row))).optional()?;
        user.transpose()
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId> {
        user.validate()?;

        self.conn.execute(
            "INSERT INTO users (
                username,
                email,
                password_hash,
                role,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                user.username.as_str(),
                user.email.as_str(),
                user.password_hash.as_str(),
                user.role.as_str(),
                bool_to_int(user.is_active),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let user = stmt.query_row([id], |row| Ok(parse_user_row(row))).optional()?;
        user.transpose()
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.find_one("username", username)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_one("email", email)
    }

    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_inactive {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(role) = query.role {
            sql.push_str(" AND role = ?");
            bind_values.push(Value::Text(role.as_str().to_string()));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn set_user_active(&self, id: UserId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET is_active = ?2 WHERE id = ?1;",
            params![id, bool_to_int(is_active)],
        )?;
        expect_changed(changed, "user", id)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        expect_changed(changed, "user", id)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let role_text: String = row.get("role")?;
    let role = UserRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        role,
        is_active: int_to_bool("users.is_active", row.get("is_active")?)?,
        created_at: row.get("created_at")?,
    })
}
