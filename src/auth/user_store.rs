//! User Storage
//! Mission: Credential store collaborator backed by SQLite
//!
//! The auth core only relies on the record shape this store returns
//! (`id, email, username, role, password_hash`); the storage itself is
//! swappable.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::{info, warn};

use crate::auth::models::{Role, UserRecord};
use crate::auth::password;

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        self.create_default_admin(&conn)?;

        Ok(())
    }

    /// Create default admin user for initial setup
    fn create_default_admin(&self, conn: &Connection) -> Result<()> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count == 0 {
            let password_hash = password::hash_password("admin123")?;

            conn.execute(
                "INSERT INTO users (email, username, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    "admin@bazaar.local",
                    "admin",
                    password_hash,
                    Role::Admin.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to insert admin user")?;

            info!("🔐 Default admin user created (email: admin@bazaar.local, password: admin123)");
            warn!("⚠️  CHANGE DEFAULT PASSWORD IN PRODUCTION!");
        }

        Ok(())
    }

    fn user_from_row(row: &Row) -> rusqlite::Result<UserRecord> {
        let role_str: String = row.get(4)?;
        Ok(UserRecord {
            id: row.get::<_, i64>(0)? as u32,
            email: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
            role: Role::parse(&role_str).unwrap_or(Role::User),
            created_at: row.get(5)?,
        })
    }

    /// Get user by email
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, email, username, password_hash, role, created_at
             FROM users WHERE email = ?1",
        )?;

        match stmt.query_row(params![email], Self::user_from_row) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify email and password, returning the user on success.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub fn verify_credentials(&self, email: &str, plain: &str) -> Result<Option<UserRecord>> {
        match self.get_user_by_email(email)? {
            Some(user) => {
                if password::verify_password(plain, &user.password_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Create a new user
    pub fn create_user(
        &self,
        email: &str,
        username: &str,
        plain: &str,
        role: Role,
    ) -> Result<UserRecord> {
        let password_hash = password::hash_password(plain)?;
        let created_at = Utc::now().to_rfc3339();

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO users (email, username, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![email, username, password_hash, role.as_str(), created_at],
        )
        .context("Failed to insert user")?;

        let user = UserRecord {
            id: conn.last_insert_rowid() as u32,
            email: email.to_string(),
            username: username.to_string(),
            password_hash,
            role,
            created_at,
        };

        info!("✅ Created user: {} ({})", user.username, user.role.as_str());

        Ok(user)
    }

    /// List all users (admin only)
    pub fn list_users(&self) -> Result<Vec<UserRecord>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, email, username, password_hash, role, created_at FROM users",
        )?;

        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Delete a user by ID (admin only)
    pub fn delete_user(&self, user_id: u32) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        let rows_affected =
            conn.execute("DELETE FROM users WHERE id = ?1", params![user_id as i64])?;

        if rows_affected == 0 {
            anyhow::bail!("User not found");
        }

        info!("🗑️  Deleted user: {}", user_id);
        Ok(())
    }
}
