//! Credential store: where user records live.
//!
//! `PgUserStore` is the production backend. `MemoryUserStore` keeps records in
//! process and backs the HTTP and workflow tests.
//!
//! Neither backend offers an atomic insert-if-absent: `find_by_email` followed by
//! `create` is two independent operations, and the `users` table has no
//! unique index on `email`.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tokio::sync::RwLock;
use tracing::{info_span, Instrument};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// A persisted user. `password_hash` is an Argon2id PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

impl UserRecord {
    #[must_use]
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user lookup failed: {0}")]
    Lookup(#[source] sqlx::Error),
    #[error("user insert failed: {0}")]
    Insert(#[source] sqlx::Error),
    #[error("database ping failed: {0}")]
    Ping(#[source] sqlx::Error),
    #[error("schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// First record whose email matches exactly, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Persist `record` and return it as stored.
    async fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError>;

    /// Liveness probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist yet.
    ///
    /// # Errors
    /// Returns `StoreError::Schema` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = SCHEMA_SQL
        );
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(StoreError::Schema)?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = "SELECT id, email, password FROM users WHERE email = $1 LIMIT 1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(StoreError::Lookup)?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(StoreError::Lookup)
    }

    async fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        let query = "INSERT INTO users (id, email, password) VALUES ($1, $2, $3)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(record.id)
            .bind(&record.email)
            .bind(&record.password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(StoreError::Insert)?;

        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .map_err(StoreError::Ping)?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .map_err(StoreError::Ping)
    }
}

/// In-process store; records are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    records: RwLock<Vec<UserRecord>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_users(records: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    pub async fn records(&self) -> Vec<UserRecord> {
        self.records.read().await.clone()
    }

    pub async fn count_email(&self, email: &str) -> usize {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| record.email == email)
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.email == email)
            .cloned())
    }

    async fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        self.records.write().await.push(record.clone());
        Ok(record)
    }
}
