//! Application state shared across handlers

use sqlx::PgPool;
use std::sync::Arc;

use crate::{leaderboard::RankingService, middleware::JwtVerifier, service::SessionService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub ranking: RankingService,
    pub verifier: Arc<JwtVerifier>,
    /// Present when sessions are persisted in PostgreSQL
    pub db_pool: Option<PgPool>,
}
