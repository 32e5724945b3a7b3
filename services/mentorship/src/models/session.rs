//! Session models for mentorship and visio meetings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Which table a session lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// In-person or offline mentorship meeting
    Mentorship,
    /// Live video meeting with a join link
    Visio,
}

impl SessionKind {
    pub fn table(self) -> &'static str {
        match self {
            SessionKind::Mentorship => "mentorship_sessions",
            SessionKind::Visio => "visio_sessions",
        }
    }

    pub fn has_link(self) -> bool {
        matches!(self, SessionKind::Visio)
    }
}

/// Persisted lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Planned,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Planned => "Planned",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            SessionStatus::Planned => false,
            SessionStatus::Completed | SessionStatus::Cancelled => true,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planned" => Ok(SessionStatus::Planned),
            "Completed" => Ok(SessionStatus::Completed),
            "Cancelled" => Ok(SessionStatus::Cancelled),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// Status as reported to readers. `InProgress` is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl From<SessionStatus> for DisplayStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Planned => DisplayStatus::Planned,
            SessionStatus::Completed => DisplayStatus::Completed,
            SessionStatus::Cancelled => DisplayStatus::Cancelled,
        }
    }
}

/// Side of the meeting a user sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Mentor,
    Mentee,
}

/// Stored session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub kind: SessionKind,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub topic: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    /// Conference room identifier, visio sessions only
    pub room_id: Option<String>,
    /// Join URL, visio sessions only; cleared when the session is cancelled
    pub link: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Role the given user plays in this session, if any
    pub fn participant_role(&self, user_id: Uuid) -> Option<ParticipantRole> {
        if self.mentor_id == user_id {
            Some(ParticipantRole::Mentor)
        } else if self.mentee_id == user_id {
            Some(ParticipantRole::Mentee)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_role(user_id).is_some()
    }
}

/// Session as returned to API consumers, with read-time derived fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    /// Status with `InProgress` applied for joinable visio sessions
    pub display_status: DisplayStatus,
    /// Role of the caller in this session
    pub my_role: Option<ParticipantRole>,
    /// Whether the join window is currently open
    pub ready: bool,
    pub window_opens_at: DateTime<Utc>,
    pub window_closes_at: DateTime<Utc>,
}

/// Request for session creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Counterpart (mentee) of the calling mentor
    pub participant_id: Uuid,
    pub topic: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Request for session completion
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteSessionRequest {
    pub notes: String,
    pub version: i64,
}

/// Request for session cancellation
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSessionRequest {
    pub reason: Option<String>,
    pub version: i64,
}

/// Request for session rescheduling
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleSessionRequest {
    pub scheduled_at: DateTime<Utc>,
    pub version: i64,
}

/// Query parameters for session listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
    /// Filter by stored status
    pub status: Option<SessionStatus>,
}

/// Response for a successful join
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub session_id: Uuid,
    pub room_id: Option<String>,
    pub link: String,
}
