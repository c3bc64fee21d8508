//! SQLite-backed job store.

use super::{JobStore, Subscription, WatchCallback, WatchRegistry};
use crate::error::DatabaseError;
use crate::types::{JobId, JobPatch, JobRecord, Status, UserId};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::{FromRow, SqliteConnection};
use std::path::Path;
use std::str::FromStr;

/// Job row from database
#[derive(Debug, Clone, FromRow)]
struct JobRow {
    user_id: String,
    job_id: i64,
    url: String,
    format: Option<String>,
    status: i32,
    progress: f32,
    result_url: Option<String>,
    error_message: Option<String>,
    /// Unix timestamp in milliseconds
    created_at: i64,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        JobRecord {
            id: JobId(row.job_id),
            user_id: UserId(row.user_id),
            url: row.url,
            format: row.format,
            status: Status::from_i32(row.status),
            progress: row.progress,
            result_url: row.result_url,
            error: row.error_message,
            created_at: chrono::DateTime::from_timestamp_millis(row.created_at)
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

/// Job store persisted in one SQLite table keyed by `(user_id, job_id)`
pub struct SqliteStore {
    pool: SqlitePool,
    watchers: WatchRegistry,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let store = Self {
            pool,
            watchers: WatchRegistry::new(),
        };
        store.run_migrations().await?;

        tracing::info!(path = %path.display(), "SQLite job store opened");
        Ok(store)
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// The observer registry, for inspecting live watches
    pub fn watchers(&self) -> &WatchRegistry {
        &self.watchers
    }

    /// Number of records kept for one user
    pub async fn count_for_user(&self, user: &UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count jobs: {}",
                    e
                )))
            })?;
        Ok(count)
    }

    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?;

        if current_version.unwrap_or(0) < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: jobs table
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying job store migration v1");

        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            sqlx::query(
                r#"
                CREATE TABLE jobs (
                    user_id TEXT NOT NULL,
                    job_id INTEGER NOT NULL,
                    url TEXT NOT NULL,
                    format TEXT,
                    status INTEGER NOT NULL DEFAULT 0,
                    progress REAL NOT NULL DEFAULT 0.0,
                    result_url TEXT,
                    error_message TEXT,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (user_id, job_id)
                )
                "#,
            )
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to create jobs table: {}",
                    e
                )))
            })?;

            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
                .bind(1)
                .bind(chrono::Utc::now().timestamp())
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::MigrationFailed(format!(
                        "Failed to record migration: {}",
                        e
                    )))
                })?;

            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v1: {}",
                            e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Job store migration v1 complete");
        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn put(&self, user: &UserId, id: JobId, patch: &JobPatch) -> Result<JobRecord> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let existing = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                user_id, job_id, url, format, status, progress,
                result_url, error_message, created_at
            FROM jobs
            WHERE user_id = ? AND job_id = ?
            "#,
        )
        .bind(user.as_str())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read job: {}",
                e
            )))
        })?;

        let mut record = existing
            .map(JobRecord::from)
            .unwrap_or_else(|| JobRecord::empty(user.clone(), id));
        record.merge(patch);

        sqlx::query(
            r#"
            INSERT INTO jobs (
                user_id, job_id, url, format, status, progress,
                result_url, error_message, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, job_id) DO UPDATE SET
                url = excluded.url,
                format = excluded.format,
                status = excluded.status,
                progress = excluded.progress,
                result_url = excluded.result_url,
                error_message = excluded.error_message,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user.as_str())
        .bind(id)
        .bind(&record.url)
        .bind(&record.format)
        .bind(record.status.to_i32())
        .bind(record.progress)
        .bind(&record.result_url)
        .bind(&record.error)
        .bind(record.created_at.timestamp_millis())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write job: {}",
                e
            )))
        })?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit job write: {}",
                e
            )))
        })?;

        self.watchers.notify(&record);
        Ok(record)
    }

    async fn get(&self, user: &UserId, id: JobId) -> Result<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                user_id, job_id, url, format, status, progress,
                result_url, error_message, created_at
            FROM jobs
            WHERE user_id = ? AND job_id = ?
            "#,
        )
        .bind(user.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get job: {}",
                e
            )))
        })?;

        Ok(row.map(JobRecord::from))
    }

    fn watch(&self, user: &UserId, id: JobId, callback: WatchCallback) -> Subscription {
        self.watchers.register(user, id, callback)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
