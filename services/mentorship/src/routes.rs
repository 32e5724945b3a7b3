//! Mentorship service routes

use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiResult,
    middleware::auth_middleware,
    models::{
        Caller, RankingQuery, SessionKind,
        session::{
            CancelSessionRequest, CompleteSessionRequest, CreateSessionRequest,
            RescheduleSessionRequest, SessionQuery,
        },
    },
};

/// Create the router for the mentorship service
pub fn create_router(state: AppState) -> Router {
    let visio_routes =
        session_routes(SessionKind::Visio).route("/:id/join", get(join_session));

    let protected_routes = Router::new()
        .nest("/sessions", session_routes(SessionKind::Mentorship))
        .nest("/visio", visio_routes)
        .route("/ranking", get(get_ranking))
        .route("/ranking/me", get(get_my_rank))
        .route("/progression/:user_id", get(get_progression))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// The five session routes, bound to one session kind
fn session_routes(kind: SessionKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/:id", get(get_session).put(complete_session))
        .route("/:id/cancel", put(cancel_session))
        .route("/:id/reschedule", put(reschedule_session))
        .layer(Extension(kind))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db_pool {
        Some(pool) if common::database::health_check(pool).await => "up",
        Some(_) => "down",
        None => "memory",
    };

    let cache = match state.ranking.cache_health().await {
        Some(true) => "up",
        Some(false) => "down",
        None => "disabled",
    };

    let status = if database == "down" || cache == "down" {
        "degraded"
    } else {
        "ok"
    };

    Json(json!({
        "status": status,
        "service": "mentorship-service",
        "database": database,
        "cache": cache,
    }))
}

/// Schedule a new session
pub async fn create_session(
    State(state): State<AppState>,
    Extension(kind): Extension<SessionKind>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let session = state.sessions.create(&caller, kind, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Sessions of the current user, optionally filtered by status
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(kind): Extension<SessionKind>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let sessions = state.sessions.list(&caller, kind, query.status).await?;
    Ok(Json(sessions))
}

/// Get a session by ID
pub async fn get_session(
    State(state): State<AppState>,
    Extension(kind): Extension<SessionKind>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let session = state.sessions.get(&caller, kind, id).await?;
    Ok(Json(session))
}

/// Mark a session as completed
pub async fn complete_session(
    State(state): State<AppState>,
    Extension(kind): Extension<SessionKind>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CompleteSessionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let session = state
        .sessions
        .complete(&caller, kind, id, payload.version, payload.notes)
        .await?;
    Ok(Json(session))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    Extension(kind): Extension<SessionKind>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CancelSessionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let session = state
        .sessions
        .cancel(&caller, kind, id, payload.version, payload.reason)
        .await?;
    Ok(Json(session))
}

pub async fn reschedule_session(
    State(state): State<AppState>,
    Extension(kind): Extension<SessionKind>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RescheduleSessionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let session = state
        .sessions
        .reschedule(&caller, kind, id, payload.version, payload.scheduled_at)
        .await?;
    Ok(Json(session))
}

/// Join link of a visio session
pub async fn join_session(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let join = state.sessions.join(&caller, id).await?;
    Ok(Json(join))
}

/// Leaderboard page with the caller's own entry
pub async fn get_ranking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<RankingQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let page = state.ranking.page(&query, caller.id).await?;
    Ok(Json(page))
}

pub async fn get_my_rank(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<RankingQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let entry = state.ranking.my_rank(&query, caller.id).await?;
    Ok(Json(entry))
}

/// Session progression of a user
pub async fn get_progression(
    State(state): State<AppState>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(user_id) = user_id?;
    let summary = state.sessions.progression(user_id).await?;
    Ok(Json(summary))
}
