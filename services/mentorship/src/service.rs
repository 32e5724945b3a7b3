//! Session operations: creation, lifecycle mutations, reads and joins
//!
//! Every mutation is one read-modify-write: load the row, run the state
//! machine, then persist with a compare-and-swap on the version that was read.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{EngineError, EngineResult},
    lifecycle::{self, SessionAction},
    models::{
        Caller, ProgressionSummary, Session, SessionKind, SessionStatus, SessionView,
        session::{CreateSessionRequest, JoinResponse},
    },
    progression::{self, LevelThresholds},
    repositories::SessionStore,
    scheduling::{JoinWindow, LinkIssuer, validate_schedule},
};

const MAX_TOPIC_LEN: usize = 200;

/// Session lifecycle service
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    window: JoinWindow,
    links: LinkIssuer,
    thresholds: LevelThresholds,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        window: JoinWindow,
        links: LinkIssuer,
        thresholds: LevelThresholds,
    ) -> Self {
        Self {
            store,
            clock,
            window,
            links,
            thresholds,
        }
    }

    /// Schedule a new session with the caller as mentor
    pub async fn create(
        &self,
        caller: &Caller,
        kind: SessionKind,
        request: CreateSessionRequest,
    ) -> EngineResult<SessionView> {
        if !caller.role.can_host_sessions() {
            return Err(EngineError::Authorization(format!(
                "role {} cannot schedule sessions",
                caller.role
            )));
        }

        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(EngineError::Validation("topic is required".to_string()));
        }
        if topic.chars().count() > MAX_TOPIC_LEN {
            return Err(EngineError::Validation(format!(
                "topic must be at most {MAX_TOPIC_LEN} characters"
            )));
        }
        if request.participant_id == caller.id {
            return Err(EngineError::Validation(
                "a session needs a counterpart other than the caller".to_string(),
            ));
        }

        let now = self.clock.now();
        validate_schedule(request.scheduled_at, now)?;

        let (room_id, link) = self.links.issue(kind);
        let session = Session {
            id: Uuid::new_v4(),
            kind,
            mentor_id: caller.id,
            mentee_id: request.participant_id,
            topic: topic.to_string(),
            scheduled_at: request.scheduled_at,
            status: SessionStatus::Planned,
            notes: None,
            cancel_reason: None,
            room_id,
            link,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let session = self.store.insert(&session).await?;
        info!(
            "Created {:?} session {} between mentor {} and mentee {}",
            kind, session.id, session.mentor_id, session.mentee_id
        );

        Ok(self.window.view(session, caller, now))
    }

    /// Fetch one session the caller may see
    pub async fn get(&self, caller: &Caller, kind: SessionKind, id: Uuid) -> EngineResult<SessionView> {
        let session = self.load(kind, id).await?;
        if !session.is_participant(caller.id) && !caller.role.can_view_any_session() {
            return Err(EngineError::Authorization(
                "only participants can view this session".to_string(),
            ));
        }
        Ok(self.window.view(session, caller, self.clock.now()))
    }

    /// Sessions the caller takes part in
    pub async fn list(
        &self,
        caller: &Caller,
        kind: SessionKind,
        status: Option<SessionStatus>,
    ) -> EngineResult<Vec<SessionView>> {
        let now = self.clock.now();
        let sessions = self.store.list_for_user(kind, caller.id, status).await?;
        Ok(sessions
            .into_iter()
            .map(|s| self.window.view(s, caller, now))
            .collect())
    }

    pub async fn complete(
        &self,
        caller: &Caller,
        kind: SessionKind,
        id: Uuid,
        version: i64,
        notes: String,
    ) -> EngineResult<SessionView> {
        self.mutate(caller, kind, id, version, SessionAction::Complete { notes })
            .await
    }

    pub async fn cancel(
        &self,
        caller: &Caller,
        kind: SessionKind,
        id: Uuid,
        version: i64,
        reason: Option<String>,
    ) -> EngineResult<SessionView> {
        self.mutate(caller, kind, id, version, SessionAction::Cancel { reason })
            .await
    }

    pub async fn reschedule(
        &self,
        caller: &Caller,
        kind: SessionKind,
        id: Uuid,
        version: i64,
        scheduled_at: chrono::DateTime<chrono::Utc>,
    ) -> EngineResult<SessionView> {
        self.mutate(
            caller,
            kind,
            id,
            version,
            SessionAction::Reschedule { scheduled_at },
        )
        .await
    }

    /// Join link of a visio session, available only inside the join window
    pub async fn join(&self, caller: &Caller, id: Uuid) -> EngineResult<JoinResponse> {
        let session = self.load(SessionKind::Visio, id).await?;
        let joined = self.window.join(&session, caller, self.clock.now());
        match &joined {
            Ok(_) => info!("User {} joined session {}", caller.id, id),
            Err(e) => warn!("User {} could not join session {}: {}", caller.id, id, e),
        }
        joined
    }

    /// Progression of a user across both session kinds
    pub async fn progression(&self, user_id: Uuid) -> EngineResult<ProgressionSummary> {
        let mut sessions = self
            .store
            .list_for_user(SessionKind::Mentorship, user_id, None)
            .await?;
        sessions.extend(
            self.store
                .list_for_user(SessionKind::Visio, user_id, None)
                .await?,
        );
        Ok(progression::summarize(user_id, &sessions, &self.thresholds))
    }

    async fn load(&self, kind: SessionKind, id: Uuid) -> EngineResult<Session> {
        self.store
            .find(kind, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Session {id}")))
    }

    async fn mutate(
        &self,
        caller: &Caller,
        kind: SessionKind,
        id: Uuid,
        version: i64,
        action: SessionAction,
    ) -> EngineResult<SessionView> {
        let action_name = action.name();
        let current = self.load(kind, id).await?;
        let now = self.clock.now();

        let result = match lifecycle::apply(&current, caller, version, action, now) {
            Ok(next) => self
                .store
                .update(&next, version)
                .await
                .map_err(EngineError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(stored) => {
                info!(
                    "Session {} {}: status {} version {} by {}",
                    stored.id, action_name, stored.status, stored.version, caller.id
                );
                Ok(self.window.view(stored, caller, now))
            }
            Err(e) => {
                warn!(
                    "Rejected {} on session {} by {}: {}",
                    action_name, id, caller.id, e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, models::Role, repositories::MemorySessionStore};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()
    }

    fn service(clock: &FixedClock) -> SessionService {
        SessionService::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(clock.clone()),
            JoinWindow::default(),
            LinkIssuer::new("https://meet.example.test"),
            LevelThresholds::default(),
        )
    }

    fn request(mentee: Uuid, at: DateTime<Utc>) -> CreateSessionRequest {
        CreateSessionRequest {
            participant_id: mentee,
            topic: "Rust lifetimes".to_string(),
            scheduled_at: at,
        }
    }

    #[tokio::test]
    async fn test_create_requires_hosting_role_and_future_date() {
        let clock = FixedClock::new(start());
        let service = service(&clock);
        let mentee = Uuid::new_v4();

        let student = Caller::new(Uuid::new_v4(), Role::Student);
        let err = service
            .create(&student, SessionKind::Mentorship, request(mentee, start() + Duration::hours(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Authorization(_)));

        let mentor = Caller::new(Uuid::new_v4(), Role::Mentor);
        let err = service
            .create(&mentor, SessionKind::Mentorship, request(mentee, start()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = service
            .create(&mentor, SessionKind::Mentorship, request(mentor.id, start() + Duration::hours(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let view = service
            .create(&mentor, SessionKind::Visio, request(mentee, start() + Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(view.session.version, 1);
        assert_eq!(view.session.status, SessionStatus::Planned);
        assert!(view.session.link.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_completes_succeed_once() {
        let clock = FixedClock::new(start());
        let service = service(&clock);
        let mentor = Caller::new(Uuid::new_v4(), Role::Teacher);
        let mentee = Caller::new(Uuid::new_v4(), Role::Student);

        let created = service
            .create(&mentor, SessionKind::Mentorship, request(mentee.id, start() + Duration::hours(1)))
            .await
            .unwrap();
        let id = created.session.id;

        let (a, b) = tokio::join!(
            service.complete(&mentor, SessionKind::Mentorship, id, 1, "by mentor".to_string()),
            service.complete(&mentee, SessionKind::Mentorship, id, 1, "by mentee".to_string()),
        );

        let results = [a, b];
        let successes: Vec<&SessionView> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(successes.len(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(EngineError::Conflict { .. })))
        );

        let stored = service.get(&mentor, SessionKind::Mentorship, id).await.unwrap();
        assert_eq!(stored.session.version, 2);
        assert_eq!(stored.session.notes, successes[0].session.notes);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_session_untouched() {
        let clock = FixedClock::new(start());
        let service = service(&clock);
        let mentor = Caller::new(Uuid::new_v4(), Role::Mentor);
        let mentee = Uuid::new_v4();

        let created = service
            .create(&mentor, SessionKind::Mentorship, request(mentee, start() + Duration::hours(1)))
            .await
            .unwrap();
        let id = created.session.id;

        let err = service
            .reschedule(&mentor, SessionKind::Mentorship, id, 1, start() - Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let stored = service.get(&mentor, SessionKind::Mentorship, id).await.unwrap();
        assert_eq!(stored.session, created.session);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let clock = FixedClock::new(start());
        let service = service(&clock);
        let mentor = Caller::new(Uuid::new_v4(), Role::Mentor);

        let err = service
            .cancel(&mentor, SessionKind::Visio, Uuid::new_v4(), 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = service.join(&mentor, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_progression_spans_both_kinds() {
        let clock = FixedClock::new(start());
        let service = service(&clock);
        let mentor = Caller::new(Uuid::new_v4(), Role::Mentor);
        let mentee = Uuid::new_v4();

        let mut ids = Vec::new();
        for kind in [
            SessionKind::Mentorship,
            SessionKind::Mentorship,
            SessionKind::Visio,
            SessionKind::Visio,
        ] {
            let view = service
                .create(&mentor, kind, request(mentee, start() + Duration::hours(1)))
                .await
                .unwrap();
            ids.push((kind, view.session.id));
        }
        for (kind, id) in &ids[..3] {
            service
                .complete(&mentor, *kind, *id, 1, "done".to_string())
                .await
                .unwrap();
        }

        let summary = service.progression(mentee).await.unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.percent, 75);
    }
}
