//! Scheduling rules: future-date validation, the join window, and join links
//!
//! Readiness is computed on every read from `scheduled_at` and the current
//! time. It is never stored and never changes the session status.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::{EngineError, EngineResult},
    models::{
        Caller, DisplayStatus, Session, SessionKind, SessionStatus, SessionView,
        session::JoinResponse,
    },
};

/// Minutes before `scheduled_at` the join window opens
pub const DEFAULT_JOIN_LEAD_MINUTES: i64 = 15;
/// Minutes after `scheduled_at` the join window stays open
pub const DEFAULT_JOIN_GRACE_MINUTES: i64 = 30;

/// Interval around `scheduled_at` during which a session may be joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinWindow {
    lead: Duration,
    grace: Duration,
}

impl Default for JoinWindow {
    fn default() -> Self {
        Self::new(DEFAULT_JOIN_LEAD_MINUTES, DEFAULT_JOIN_GRACE_MINUTES)
    }
}

impl JoinWindow {
    pub fn new(lead_minutes: i64, grace_minutes: i64) -> Self {
        Self {
            lead: Duration::minutes(lead_minutes),
            grace: Duration::minutes(grace_minutes),
        }
    }

    pub fn opens_at(&self, scheduled_at: DateTime<Utc>) -> DateTime<Utc> {
        scheduled_at - self.lead
    }

    pub fn closes_at(&self, scheduled_at: DateTime<Utc>) -> DateTime<Utc> {
        scheduled_at + self.grace
    }

    /// Both bounds are inclusive
    pub fn is_ready(&self, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.opens_at(scheduled_at) <= now && now <= self.closes_at(scheduled_at)
    }

    /// Read-time status: a planned visio session inside its window is `InProgress`
    pub fn display_status(&self, session: &Session, now: DateTime<Utc>) -> DisplayStatus {
        match session.status {
            SessionStatus::Planned
                if session.kind.has_link() && self.is_ready(session.scheduled_at, now) =>
            {
                DisplayStatus::InProgress
            }
            status => status.into(),
        }
    }

    /// Wrap a stored session with the fields derived at read time
    pub fn view(&self, session: Session, caller: &Caller, now: DateTime<Utc>) -> SessionView {
        let ready = session.status == SessionStatus::Planned
            && self.is_ready(session.scheduled_at, now);
        SessionView {
            display_status: self.display_status(&session, now),
            my_role: session.participant_role(caller.id),
            ready,
            window_opens_at: self.opens_at(session.scheduled_at),
            window_closes_at: self.closes_at(session.scheduled_at),
            session,
        }
    }

    /// Return the stored join link when the caller may enter the room now
    pub fn join(
        &self,
        session: &Session,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> EngineResult<JoinResponse> {
        if !session.is_participant(caller.id) {
            return Err(EngineError::Authorization(
                "only the mentor or mentee can join this session".to_string(),
            ));
        }

        if session.status != SessionStatus::Planned {
            return Err(EngineError::InvalidTransition {
                status: session.status,
                action: "join",
            });
        }

        if !self.is_ready(session.scheduled_at, now) {
            return Err(EngineError::NotReady {
                opens_at: self.opens_at(session.scheduled_at),
                closes_at: self.closes_at(session.scheduled_at),
            });
        }

        let link = session
            .link
            .clone()
            .ok_or_else(|| EngineError::NotFound("Join link".to_string()))?;

        Ok(JoinResponse {
            session_id: session.id,
            room_id: session.room_id.clone(),
            link,
        })
    }
}

/// Readiness with the default 15/30 minute window
pub fn is_ready(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    JoinWindow::default().is_ready(scheduled_at, now)
}

/// A schedule is valid only when strictly in the future
pub fn validate_schedule(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> EngineResult<()> {
    if scheduled_at <= now {
        return Err(EngineError::Validation(format!(
            "scheduledAt must be in the future (got {scheduled_at}, now {now})"
        )));
    }
    Ok(())
}

/// Issues room identifiers and join links for the conferencing provider
#[derive(Debug, Clone)]
pub struct LinkIssuer {
    base_url: String,
}

impl LinkIssuer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    /// Fresh room id and link for a new session of the given kind
    pub fn issue(&self, kind: SessionKind) -> (Option<String>, Option<String>) {
        match kind {
            SessionKind::Mentorship => (None, None),
            SessionKind::Visio => {
                let room_id = format!("mentorship-{}", Uuid::new_v4().simple());
                let link = format!("{}/{}", self.base_url, room_id);
                (Some(room_id), Some(link))
            }
        }
    }

    /// Drop the join link of a session whose room must no longer be entered
    pub fn revoke(session: &mut Session) {
        session.link = None;
    }
}
