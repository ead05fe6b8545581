//! User, role and preference tables, plus credential checks.

use crate::db::DatabaseHandle;
use crate::error::AppError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub const SUPER_RANK: i64 = 1000;
pub const ADMIN_RANK: i64 = 500;
pub const USER_RANK: i64 = 1;

const USER_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        password TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        rank INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_role (
        user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
        role_id INTEGER NOT NULL REFERENCES role(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, role_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pref (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER REFERENCES user(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        value TEXT,
        UNIQUE (user_id, name)
    )
    "#,
];

const DEFAULT_ROLES: &[(&str, &str, i64)] = &[
    ("super", "Full access", SUPER_RANK),
    ("admin", "Site administration", ADMIN_RANK),
    ("user", "Signed-in user", USER_RANK),
];

/// Create user tables and seed the default roles.
pub async fn initialize_user_tables(db: &mut DatabaseHandle) -> Result<(), AppError> {
    let conn = db.conn()?;
    for ddl in USER_TABLES {
        sqlx::query(ddl).execute(&mut *conn).await?;
    }
    for (name, description, rank) in DEFAULT_ROLES {
        sqlx::query("INSERT OR IGNORE INTO role (name, description, rank) VALUES (?, ?, ?)")
            .bind(name)
            .bind(description)
            .bind(rank)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Insert a user and attach the named role. Returns the new user id.
pub async fn create_user(
    db: &mut DatabaseHandle,
    username: &str,
    password: &str,
    role: &str,
) -> Result<i64, AppError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("username and password are required".into()));
    }
    let hash = hash_password(password)?;
    let conn = db.conn()?;

    let role_id: Option<i64> = sqlx::query_scalar("SELECT id FROM role WHERE name = ?")
        .bind(role)
        .fetch_optional(&mut *conn)
        .await?;
    let role_id = role_id.ok_or_else(|| AppError::NotFound(format!("role {}", role)))?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM user WHERE username = ?")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest(format!("user {} already exists", username)));
    }

    let user_id = sqlx::query("INSERT INTO user (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(&hash)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    sqlx::query("INSERT INTO user_role (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *conn)
        .await?;
    Ok(user_id)
}

/// Check credentials for an active user.
pub async fn authenticate(db: &mut DatabaseHandle, username: &str, password: &str) -> Result<bool, AppError> {
    let stored: Option<String> = sqlx::query_scalar("SELECT password FROM user WHERE username = ? AND active = 1")
        .bind(username.trim())
        .fetch_optional(db.conn()?)
        .await?;
    let Some(stored) = stored else {
        return Ok(false);
    };
    let parsed = match PasswordHash::new(&stored) {
        Ok(p) => p,
        Err(_) => {
            tracing::warn!(user = %username, "stored password is not a valid hash");
            return Ok(false);
        }
    };
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
