//! Session store contract and its PostgreSQL implementation

use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::{PgPool, Row, postgres::PgRow};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::EngineError,
    models::{Session, SessionKind, SessionStatus},
};

/// Errors surfaced by session stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error("session {0} already exists")]
    Duplicate(Uuid),

    #[error("version conflict: expected {expected}, stored {actual}")]
    Conflict { expected: i64, actual: i64 },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(format!("Session {id}")),
            StoreError::Duplicate(id) => {
                EngineError::Validation(format!("session {id} already exists"))
            }
            StoreError::Conflict { expected, actual } => EngineError::Conflict { expected, actual },
            StoreError::Database(e) => EngineError::Storage(e),
        }
    }
}

/// Durable, versioned session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session as given
    async fn insert(&self, session: &Session) -> Result<Session, StoreError>;

    /// Fetch a session by ID
    async fn find(&self, kind: SessionKind, id: Uuid) -> Result<Option<Session>, StoreError>;

    /// Replace the stored record with `next` if its version is still `expected_version`.
    ///
    /// Fails with `StoreError::Conflict` when another write got there first and
    /// `StoreError::NotFound` when the row does not exist. Either way nothing is written.
    async fn update(&self, next: &Session, expected_version: i64) -> Result<Session, StoreError>;

    /// Sessions where the user is mentor or mentee, ordered by schedule
    async fn list_for_user(
        &self,
        kind: SessionKind,
        user_id: Uuid,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, StoreError>;
}

const BASE_COLUMNS: &str = "id, mentor_id, mentee_id, topic, scheduled_at, status, notes, \
                            cancel_reason, version, created_at, updated_at";

fn columns(kind: SessionKind) -> String {
    match kind {
        SessionKind::Mentorship => BASE_COLUMNS.to_string(),
        SessionKind::Visio => format!("{BASE_COLUMNS}, room_id, link"),
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DatabaseError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(DatabaseError::Query)
}

fn map_row(kind: SessionKind, row: &PgRow) -> Result<Session, DatabaseError> {
    let status: String = column(row, "status")?;
    let status = status.parse().map_err(DatabaseError::Decode)?;

    let (room_id, link) = match kind {
        SessionKind::Mentorship => (None, None),
        SessionKind::Visio => (column(row, "room_id")?, column(row, "link")?),
    };

    Ok(Session {
        id: column(row, "id")?,
        kind,
        mentor_id: column(row, "mentor_id")?,
        mentee_id: column(row, "mentee_id")?,
        topic: column(row, "topic")?,
        scheduled_at: column(row, "scheduled_at")?,
        status,
        notes: column(row, "notes")?,
        cancel_reason: column(row, "cancel_reason")?,
        room_id,
        link,
        version: column(row, "version")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// PostgreSQL session store over `mentorship_sessions` and `visio_sessions`
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Create a new session store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &Session) -> Result<Session, StoreError> {
        let kind = session.kind;
        let sql = match kind {
            SessionKind::Mentorship => format!(
                "INSERT INTO {} ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
                 RETURNING {cols}",
                kind.table(),
                cols = columns(kind)
            ),
            SessionKind::Visio => format!(
                "INSERT INTO {} ({cols}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
                 RETURNING {cols}",
                kind.table(),
                cols = columns(kind)
            ),
        };

        let mut query = sqlx::query(&sql)
            .bind(session.id)
            .bind(session.mentor_id)
            .bind(session.mentee_id)
            .bind(&session.topic)
            .bind(session.scheduled_at)
            .bind(session.status.as_str())
            .bind(&session.notes)
            .bind(&session.cancel_reason)
            .bind(session.version)
            .bind(session.created_at)
            .bind(session.updated_at);
        if kind.has_link() {
            query = query.bind(&session.room_id).bind(&session.link);
        }

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(map_row(kind, &row)?)
    }

    async fn find(&self, kind: SessionKind, id: Uuid) -> Result<Option<Session>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            columns(kind),
            kind.table()
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        match row {
            Some(row) => Ok(Some(map_row(kind, &row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, next: &Session, expected_version: i64) -> Result<Session, StoreError> {
        let kind = next.kind;
        let link_assignment = if kind.has_link() { ", link = $9" } else { "" };
        let sql = format!(
            "UPDATE {} SET scheduled_at = $3, status = $4, notes = $5, cancel_reason = $6, \
             version = $7, updated_at = $8{link_assignment} \
             WHERE id = $1 AND version = $2 \
             RETURNING {}",
            kind.table(),
            columns(kind)
        );

        let mut query = sqlx::query(&sql)
            .bind(next.id)
            .bind(expected_version)
            .bind(next.scheduled_at)
            .bind(next.status.as_str())
            .bind(&next.notes)
            .bind(&next.cancel_reason)
            .bind(next.version)
            .bind(next.updated_at);
        if kind.has_link() {
            query = query.bind(&next.link);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        if let Some(row) = row {
            return Ok(map_row(kind, &row)?);
        }

        // Nothing matched: tell a stale version apart from a missing row
        let stored: Option<i64> =
            sqlx::query_scalar(&format!("SELECT version FROM {} WHERE id = $1", kind.table()))
                .bind(next.id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

        debug!(
            "Conditional update of session {} at version {} matched no row",
            next.id, expected_version
        );

        match stored {
            Some(actual) => Err(StoreError::Conflict {
                expected: expected_version,
                actual,
            }),
            None => Err(StoreError::NotFound(next.id)),
        }
    }

    async fn list_for_user(
        &self,
        kind: SessionKind,
        user_id: Uuid,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} \
             WHERE (mentor_id = $1 OR mentee_id = $1) AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY scheduled_at ASC, id ASC",
            columns(kind),
            kind.table()
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(status.map(SessionStatus::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        let sessions = rows
            .iter()
            .map(|row| map_row(kind, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }
}
