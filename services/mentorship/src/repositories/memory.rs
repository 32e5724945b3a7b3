//! In-process stores used by tests and database-less local runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    scores::ScoreSource,
    sessions::{SessionStore, StoreError},
};
use crate::models::{ActivityRecord, Session, SessionKind, SessionStatus};

/// Session store keeping every record in a mutex-guarded map
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<(SessionKind, Uuid), Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let key = (session.kind, session.id);
        if sessions.contains_key(&key) {
            return Err(StoreError::Duplicate(session.id));
        }
        sessions.insert(key, session.clone());
        Ok(session.clone())
    }

    async fn find(&self, kind: SessionKind, id: Uuid) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(&(kind, id)).cloned())
    }

    async fn update(&self, next: &Session, expected_version: i64) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let stored = sessions
            .get_mut(&(next.kind, next.id))
            .ok_or(StoreError::NotFound(next.id))?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                expected: expected_version,
                actual: stored.version,
            });
        }

        *stored = next.clone();
        Ok(next.clone())
    }

    async fn list_for_user(
        &self,
        kind: SessionKind,
        user_id: Uuid,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.lock().await;
        let mut matching: Vec<Session> = sessions
            .values()
            .filter(|s| s.kind == kind && s.is_participant(user_id))
            .filter(|s| status.is_none_or(|status| s.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matching)
    }
}

/// Score source backed by a plain list of activities
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreSource {
    activities: Arc<RwLock<Vec<ActivityRecord>>>,
}

impl MemoryScoreSource {
    pub fn new(activities: Vec<ActivityRecord>) -> Self {
        Self {
            activities: Arc::new(RwLock::new(activities)),
        }
    }

    /// Append an activity, as the learning platform would when a quiz or course finishes
    pub async fn record(&self, activity: ActivityRecord) {
        self.activities.write().await.push(activity);
    }
}

#[async_trait]
impl ScoreSource for MemoryScoreSource {
    async fn activities(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>, DatabaseError> {
        let activities = self.activities.read().await;
        Ok(activities
            .iter()
            .filter(|a| since.is_none_or(|since| a.occurred_at >= since))
            .cloned()
            .collect())
    }
}
