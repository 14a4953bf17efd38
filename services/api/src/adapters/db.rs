//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ChatStore` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use support_chat_core::domain::{Document, Role, Turn, UserCredentials};
use support_chat_core::ports::{ChatStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ChatStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    username: String,
    password_hash: String,
}

impl UserRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            username: self.username,
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    title: String,
    content: String,
    uploaded_by: String,
    uploaded_at: DateTime<Utc>,
}

impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            title: self.title,
            content: self.content,
            uploaded_by: self.uploaded_by,
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(FromRow)]
struct TurnRecord {
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TurnRecord {
    fn to_domain(self) -> PortResult<Turn> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            PortError::Unexpected(format!("unknown role '{}' in turns table", self.role))
        })?;
        Ok(Turn {
            role,
            content: self.content,
            timestamp: self.created_at,
        })
    }
}

//=========================================================================================
// `ChatStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatStore for DbAdapter {
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<()> {
        sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err)
                    if db_err.message().contains("UNIQUE constraint failed") =>
                {
                    PortError::Conflict(format!("user '{username}' already exists"))
                }
                _ => unexpected(e),
            })?;
        Ok(())
    }

    async fn get_user(&self, username: &str) -> PortResult<UserCredentials> {
        let record: Option<UserRecord> =
            sqlx::query_as("SELECT username, password_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;

        record
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("user '{username}' not found")))
    }

    async fn create_document(
        &self,
        username: &str,
        title: &str,
        content: &str,
    ) -> PortResult<Document> {
        let document = Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            uploaded_by: username.to_string(),
            uploaded_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO documents (id, title, content, uploaded_by, uploaded_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.uploaded_by)
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(document)
    }

    async fn recent_documents(&self, username: &str, limit: usize) -> PortResult<Vec<Document>> {
        let records: Vec<DocumentRecord> = sqlx::query_as(
            "SELECT id, title, content, uploaded_by, uploaded_at FROM documents \
             WHERE uploaded_by = ? ORDER BY uploaded_at DESC, rowid DESC LIMIT ?",
        )
        .bind(username)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(DocumentRecord::to_domain).collect())
    }

    async fn append_turns(&self, username: &str, turns: &[Turn]) -> PortResult<()> {
        for turn in turns {
            sqlx::query(
                "INSERT INTO turns (username, role, content, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(username)
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(turn.timestamp)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        }
        Ok(())
    }

    async fn history(&self, username: &str) -> PortResult<Vec<Turn>> {
        let records: Vec<TurnRecord> = sqlx::query_as(
            "SELECT role, content, created_at FROM turns WHERE username = ? ORDER BY id ASC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(TurnRecord::to_domain).collect()
    }
}
