//! Session state machine
//!
//! ```text
//! Planned --complete(notes)--> Completed
//! Planned --cancel(reason?)--> Cancelled
//! Planned --reschedule(at)---> Planned
//! ```
//!
//! Completed and Cancelled are terminal. Every accepted action yields the next
//! record with `version + 1`; the caller persists it with a compare-and-swap on
//! the version it read.

use chrono::{DateTime, Utc};

use crate::{
    error::{EngineError, EngineResult},
    models::{Caller, Session, SessionStatus},
    scheduling::{LinkIssuer, validate_schedule},
};

/// Mutation requested on a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Complete { notes: String },
    Cancel { reason: Option<String> },
    Reschedule { scheduled_at: DateTime<Utc> },
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::Complete { .. } => "complete",
            SessionAction::Cancel { .. } => "cancel",
            SessionAction::Reschedule { .. } => "reschedule",
        }
    }
}

/// Validate `action` against the stored `session` and build the next record.
///
/// Checks run in order: participant, version, transition, payload. Nothing is
/// written here; a rejected action leaves the caller with the untouched input.
pub fn apply(
    session: &Session,
    caller: &Caller,
    expected_version: i64,
    action: SessionAction,
    now: DateTime<Utc>,
) -> EngineResult<Session> {
    if !session.is_participant(caller.id) {
        return Err(EngineError::Authorization(format!(
            "only participants can {} this session",
            action.name()
        )));
    }

    if session.version != expected_version {
        return Err(EngineError::Conflict {
            expected: expected_version,
            actual: session.version,
        });
    }

    if session.status.is_terminal() {
        return Err(EngineError::InvalidTransition {
            status: session.status,
            action: action.name(),
        });
    }

    let mut next = session.clone();
    match action {
        SessionAction::Complete { notes } => {
            let notes = notes.trim();
            if notes.is_empty() {
                return Err(EngineError::Validation(
                    "notes are required to complete a session".to_string(),
                ));
            }
            next.status = SessionStatus::Completed;
            next.notes = Some(notes.to_string());
        }
        SessionAction::Cancel { reason } => {
            next.status = SessionStatus::Cancelled;
            next.cancel_reason = reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            LinkIssuer::revoke(&mut next);
        }
        SessionAction::Reschedule { scheduled_at } => {
            validate_schedule(scheduled_at, now)?;
            next.scheduled_at = scheduled_at;
        }
    }

    next.version = session.version + 1;
    next.updated_at = now;
    Ok(next)
}
