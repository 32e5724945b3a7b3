//! Read-only access to scored learning activities
//!
//! Quiz results, course completions and user profiles are owned by other
//! parts of the platform; this service only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::models::{Activity, ActivityRecord, Role};

/// Source of scored activities for the leaderboard
#[async_trait]
pub trait ScoreSource: Send + Sync {
    /// Every activity at or after `since` (all of them when `None`)
    async fn activities(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>, DatabaseError>;
}

/// Score source reading `quiz_results` and `course_completions`
#[derive(Clone)]
pub struct PgScoreSource {
    pool: PgPool,
}

impl PgScoreSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreSource for PgScoreSource {
    async fn activities(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT q.user_id, u.name, u.role, 'quiz' AS kind,
                   q.score::BIGINT AS points, q.completed_at AS occurred_at
            FROM quiz_results q
            JOIN users u ON u.id = q.user_id
            WHERE $1::TIMESTAMPTZ IS NULL OR q.completed_at >= $1
            UNION ALL
            SELECT c.user_id, u.name, u.role, 'course' AS kind,
                   0::BIGINT AS points, c.completed_at AS occurred_at
            FROM course_completions c
            JOIN users u ON u.id = c.user_id
            WHERE $1::TIMESTAMPTZ IS NULL OR c.completed_at >= $1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        let mut activities = Vec::with_capacity(rows.len());
        for row in rows {
            let role: String = row.try_get("role").map_err(DatabaseError::Query)?;
            let user_role = match role.parse::<Role>() {
                Ok(role) => role,
                Err(e) => {
                    warn!("Skipping activity with {}", e);
                    continue;
                }
            };

            let kind: String = row.try_get("kind").map_err(DatabaseError::Query)?;
            let activity = match kind.as_str() {
                "quiz" => Activity::Quiz {
                    points: row.try_get("points").map_err(DatabaseError::Query)?,
                },
                _ => Activity::CourseCompleted,
            };

            activities.push(ActivityRecord {
                user_id: row.try_get("user_id").map_err(DatabaseError::Query)?,
                user_name: row.try_get("name").map_err(DatabaseError::Query)?,
                user_role,
                activity,
                occurred_at: row.try_get("occurred_at").map_err(DatabaseError::Query)?,
            });
        }

        Ok(activities)
    }
}
