//! Leaderboard models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::caller::Role;

/// Time window a leaderboard covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    #[default]
    #[serde(alias = "all_time", alias = "all")]
    AllTime,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::AllTime,
    ];

    /// Earliest activity timestamp included in this period, `None` for all time
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Daily => Some(now - Duration::days(1)),
            Period::Weekly => Some(now - Duration::days(7)),
            Period::Monthly => Some(now - Duration::days(30)),
            Period::AllTime => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::AllTime => "allTime",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role restriction applied to a leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleFilter {
    #[default]
    All,
    Student,
    Mentor,
    Teacher,
    Admin,
}

impl RoleFilter {
    pub const ALL: [RoleFilter; 5] = [
        RoleFilter::All,
        RoleFilter::Student,
        RoleFilter::Mentor,
        RoleFilter::Teacher,
        RoleFilter::Admin,
    ];

    pub fn matches(self, role: Role) -> bool {
        match self {
            RoleFilter::All => true,
            RoleFilter::Student => role == Role::Student,
            RoleFilter::Mentor => role == Role::Mentor,
            RoleFilter::Teacher => role == Role::Teacher,
            RoleFilter::Admin => role == Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoleFilter::All => "all",
            RoleFilter::Student => "student",
            RoleFilter::Mentor => "mentor",
            RoleFilter::Teacher => "teacher",
            RoleFilter::Admin => "admin",
        }
    }
}

/// Scored activity kinds read from the learning platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Quiz attempt worth the given points
    Quiz { points: i64 },
    /// Completed course
    CourseCompleted,
}

/// One scored activity of one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_role: Role,
    pub activity: Activity,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregated leaderboard line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
    pub total_score: i64,
    pub quiz_score: i64,
    pub completed_courses: i64,
    pub average_score: f64,
    /// 1-based position in the full filtered ordering
    pub rank: usize,
}

/// Ranking entry with its display position (medal or number)
#[derive(Debug, Clone, Serialize)]
pub struct RankingEntryView {
    #[serde(flatten)]
    pub entry: RankingEntry,
    pub position: String,
}

/// Query parameters for leaderboard endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingQuery {
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub role: RoleFilter,
    /// Number of items per page
    pub limit: Option<u32>,
    /// Page number (1-based)
    pub page: Option<u32>,
}

/// Response for leaderboard listing with pagination
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingPage {
    pub entries: Vec<RankingEntryView>,
    pub period: Period,
    pub role: RoleFilter,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    /// The caller's own line, taken from the same snapshot as `entries`
    pub me: Option<RankingEntryView>,
}
