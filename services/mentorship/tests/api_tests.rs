//! Integration tests for the mentorship API
//!
//! The router runs over the in-memory stores with a fixed clock; tokens are
//! signed with the RSA key pair under `tests/fixtures`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

use mentorship::{
    AppState,
    clock::FixedClock,
    create_router,
    leaderboard::RankingService,
    middleware::{Claims, JwtVerifier, TokenType},
    models::{Activity, ActivityRecord, Role},
    progression::LevelThresholds,
    ranking::ScoringRules,
    repositories::{MemoryScoreSource, MemorySessionStore},
    scheduling::{JoinWindow, LinkIssuer},
    service::SessionService,
};

const PRIVATE_KEY: &str = include_str!("fixtures/jwt_private.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/jwt_public.pem");

struct TestApp {
    router: Router,
    clock: FixedClock,
    scores: MemoryScoreSource,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()
}

fn setup_app() -> TestApp {
    let clock = FixedClock::new(start());
    let scores = MemoryScoreSource::default();

    let sessions = SessionService::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(clock.clone()),
        JoinWindow::default(),
        LinkIssuer::new("https://meet.example.org"),
        LevelThresholds::default(),
    );
    let ranking = RankingService::new(
        Arc::new(scores.clone()),
        Arc::new(clock.clone()),
        ScoringRules::default(),
        None,
    );

    let state = AppState {
        sessions,
        ranking,
        verifier: Arc::new(JwtVerifier::from_rsa_pem(PUBLIC_KEY).unwrap()),
        db_pool: None,
    };

    TestApp {
        router: create_router(state),
        clock,
        scores,
    }
}

fn token_of(user: Uuid, roles: &[&str], token_type: TokenType) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = Claims {
        sub: user,
        roles: roles.iter().map(|r| r.to_string()).collect(),
        permissions: vec![],
        iat: now,
        exp: now + 900,
        token_type,
    };
    jsonwebtoken::encode(
        &Header::new(jsonwebtoken::Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap(),
    )
    .unwrap()
}

fn token(user: Uuid, role: &str) -> String {
    token_of(user, &[role], TokenType::Access)
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn create_session(
    app: &TestApp,
    prefix: &str,
    mentor: Uuid,
    mentee: Uuid,
    at: DateTime<Utc>,
) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            prefix,
            &token(mentor, "mentor"),
            Some(json!({
                "participantId": mentee,
                "topic": "Ownership and borrowing",
                "scheduledAt": at,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn quiz(user: Uuid, name: &str, role: Role, points: i64) -> ActivityRecord {
    ActivityRecord {
        user_id: user,
        user_name: name.to_string(),
        user_role: role,
        activity: Activity::Quiz { points },
        occurred_at: start() - Duration::hours(2),
    }
}

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_app();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "mentorship-service");
    assert_eq!(body["database"], "memory");
    assert_eq!(body["cache"], "disabled");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = setup_app();

    let request = Request::builder()
        .uri("/sessions")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_refresh_token_is_rejected() {
    let app = setup_app();
    let refresh = token_of(Uuid::new_v4(), &["mentor"], TokenType::Refresh);

    let (status, _) = send(&app, request("GET", "/sessions", &refresh, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_student_cannot_schedule() {
    let app = setup_app();
    let student = Uuid::new_v4();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/sessions",
            &token(student, "student"),
            Some(json!({
                "participantId": Uuid::new_v4(),
                "topic": "Traits",
                "scheduledAt": start() + Duration::days(1),
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "authorization");
}

#[tokio::test]
async fn test_mentorship_session_lifecycle() {
    let app = setup_app();
    let mentor = Uuid::new_v4();
    let mentee = Uuid::new_v4();

    let created = create_session(&app, "/sessions", mentor, mentee, start() + Duration::days(1)).await;
    assert_eq!(created["status"], "Planned");
    assert_eq!(created["version"], 1);
    let id = created["id"].as_str().unwrap().to_string();

    // The mentee sees the session with their role
    let (status, listed) = send(
        &app,
        request("GET", "/sessions?status=Planned", &token(mentee, "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["myRole"], "mentee");

    // Outsiders cannot read it
    let (status, _) = send(
        &app,
        request("GET", &format!("/sessions/{id}"), &token(Uuid::new_v4(), "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, completed) = send(
        &app,
        request(
            "PUT",
            &format!("/sessions/{id}"),
            &token(mentor, "mentor"),
            Some(json!({ "notes": "Covered lifetimes", "version": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "Completed");
    assert_eq!(completed["notes"], "Covered lifetimes");
    assert_eq!(completed["version"], 2);

    // Stale version is reported before the terminal state
    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/sessions/{id}/cancel"),
            &token(mentee, "student"),
            Some(json!({ "version": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/sessions/{id}/cancel"),
            &token(mentee, "student"),
            Some(json!({ "reason": "too late", "version": 2 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_transition");

    let (status, progression) = send(
        &app,
        request("GET", &format!("/progression/{mentee}"), &token(mentee, "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progression["total"], 1);
    assert_eq!(progression["completed"], 1);
    assert_eq!(progression["percent"], 100);
}

#[tokio::test]
async fn test_reschedule_into_the_past_is_rejected() {
    let app = setup_app();
    let mentor = Uuid::new_v4();

    let created = create_session(&app, "/sessions", mentor, Uuid::new_v4(), start() + Duration::days(1)).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/sessions/{id}/reschedule"),
            &token(mentor, "mentor"),
            Some(json!({ "scheduledAt": start() - Duration::hours(1), "version": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    let later = start() + Duration::days(2);
    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/sessions/{id}/reschedule"),
            &token(mentor, "mentor"),
            Some(json!({ "scheduledAt": later, "version": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Planned");
    assert_eq!(body["version"], 2);
    let stored: DateTime<Utc> = serde_json::from_value(body["scheduledAt"].clone()).unwrap();
    assert_eq!(stored, later);
}

#[tokio::test]
async fn test_visio_join_window() {
    let app = setup_app();
    let mentor = Uuid::new_v4();
    let mentee = Uuid::new_v4();

    let created = create_session(&app, "/visio", mentor, mentee, start() + Duration::hours(1)).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert!(created["link"].is_string());
    assert!(created["roomId"].is_string());

    // Too early
    let (status, body) = send(
        &app,
        request("GET", &format!("/visio/{id}/join"), &token(mentee, "student"), None),
    )
    .await;
    assert_eq!(status.as_u16(), 425);
    assert_eq!(body["code"], "not_ready");

    app.clock.advance(Duration::minutes(50));

    let (status, view) = send(
        &app,
        request("GET", &format!("/visio/{id}"), &token(mentee, "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["ready"], true);
    assert_eq!(view["displayStatus"], "InProgress");
    assert_eq!(view["status"], "Planned");

    let (status, first) = send(
        &app,
        request("GET", &format!("/visio/{id}/join"), &token(mentee, "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(
        &app,
        request("GET", &format!("/visio/{id}/join"), &token(mentor, "mentor"), None),
    )
    .await;
    assert_eq!(first["link"], second["link"]);
    assert_eq!(first["link"], created["link"]);

    let (status, _) = send(
        &app,
        request("GET", &format!("/visio/{id}/join"), &token(Uuid::new_v4(), "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancelled_visio_cannot_be_joined() {
    let app = setup_app();
    let mentor = Uuid::new_v4();
    let mentee = Uuid::new_v4();

    let created = create_session(&app, "/visio", mentor, mentee, start() + Duration::minutes(10)).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, cancelled) = send(
        &app,
        request(
            "PUT",
            &format!("/visio/{id}/cancel"),
            &token(mentor, "mentor"),
            Some(json!({ "reason": "Mentor unavailable", "version": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "Cancelled");
    assert!(cancelled["link"].is_null());

    let (status, body) = send(
        &app,
        request("GET", &format!("/visio/{id}/join"), &token(mentee, "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn test_sessions_and_visio_are_separate() {
    let app = setup_app();
    let mentor = Uuid::new_v4();

    let created = create_session(&app, "/sessions", mentor, Uuid::new_v4(), start() + Duration::days(1)).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        request("GET", &format!("/visio/{id}"), &token(mentor, "mentor"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_ranking_page_and_me() {
    let app = setup_app();
    let alice = Uuid::from_u128(1);
    let bob = Uuid::from_u128(2);
    let carol = Uuid::from_u128(3);

    app.scores.record(quiz(alice, "Alice", Role::Student, 80)).await;
    app.scores.record(quiz(bob, "Bob", Role::Student, 50)).await;
    app.scores.record(quiz(carol, "Carol", Role::Mentor, 70)).await;
    app.scores
        .record(ActivityRecord {
            user_id: bob,
            user_name: "Bob".to_string(),
            user_role: Role::Student,
            activity: Activity::CourseCompleted,
            occurred_at: start() - Duration::hours(1),
        })
        .await;

    let (status, page) = send(
        &app,
        request("GET", "/ranking?limit=2&page=1", &token(carol, "mentor"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["hasNext"], true);
    assert_eq!(page["hasPrev"], false);
    assert_eq!(page["entries"][0]["userId"], alice.to_string());
    assert_eq!(page["entries"][0]["position"], "🥇");
    assert_eq!(page["entries"][1]["userId"], carol.to_string());
    assert_eq!(page["me"]["rank"], 2);

    let (status, me) = send(
        &app,
        request("GET", "/ranking/me", &token(bob, "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["rank"], 3);
    assert_eq!(me["totalScore"], 60);
    assert_eq!(me["completedCourses"], 1);

    let (status, students) = send(
        &app,
        request("GET", "/ranking?role=student", &token(bob, "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(students["total"], 2);
    assert_eq!(students["me"]["rank"], 2);

    let (status, _) = send(
        &app,
        request("GET", "/ranking/me", &token(Uuid::new_v4(), "student"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_completion_has_one_winner() {
    let app = setup_app();
    let mentor = Uuid::new_v4();
    let mentee = Uuid::new_v4();

    let created = create_session(&app, "/sessions", mentor, mentee, start() + Duration::days(1)).await;
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/sessions/{id}");

    let (a, b) = tokio::join!(
        send(
            &app,
            request("PUT", &uri, &token(mentor, "mentor"), Some(json!({ "notes": "from mentor", "version": 1 }))),
        ),
        send(
            &app,
            request("PUT", &uri, &token(mentee, "student"), Some(json!({ "notes": "from mentee", "version": 1 }))),
        ),
    );

    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let winner = if a.0 == StatusCode::OK { a.1 } else { b.1 };
    let (_, stored) = send(&app, request("GET", &uri, &token(mentor, "mentor"), None)).await;
    assert_eq!(stored["notes"], winner["notes"]);
    assert_eq!(stored["version"], 2);
}

#[tokio::test]
async fn test_malformed_input_is_a_validation_error() {
    let app = setup_app();
    let mentor = Uuid::new_v4();

    let created = create_session(&app, "/sessions", mentor, Uuid::new_v4(), start() + Duration::days(1)).await;
    let id = created["id"].as_str().unwrap().to_string();

    let cases = [
        request(
            "PUT",
            &format!("/sessions/{id}"),
            &token(mentor, "mentor"),
            Some(json!({ "notes": "Covered lifetimes" })),
        ),
        request(
            "PUT",
            &format!("/sessions/{id}/reschedule"),
            &token(mentor, "mentor"),
            Some(json!({ "scheduledAt": "next tuesday", "version": 1 })),
        ),
        request("GET", "/ranking?period=fortnightly", &token(mentor, "mentor"), None),
        request("GET", "/sessions/not-a-uuid", &token(mentor, "mentor"), None),
    ];

    for case in cases {
        let uri = case.uri().to_string();
        let (status, body) = send(&app, case).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "validation", "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }

    // Nothing was written by the rejected requests
    let (_, stored) = send(
        &app,
        request("GET", &format!("/sessions/{id}"), &token(mentor, "mentor"), None),
    )
    .await;
    assert_eq!(stored["version"], 1);
    assert_eq!(stored["status"], "Planned");
}
