use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use common::{
    cache::RedisPool,
    database::{self, init_pool},
};
use mentorship::{
    AppState,
    clock::{Clock, SystemClock},
    config::Settings,
    leaderboard::{LeaderboardCache, RankingService},
    middleware::JwtVerifier,
    refresh::start_leaderboard_refresh,
    repositories::{
        self, MemoryScoreSource, MemorySessionStore, PgScoreSource, PgSessionStore, ScoreSource,
        SessionStore,
    },
    routes,
    scheduling::LinkIssuer,
    service::SessionService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting mentorship service");

    let settings = Settings::load().context("Failed to load configuration")?;

    let public_key = settings
        .jwt
        .public_key
        .as_deref()
        .context("JWT_PUBLIC_KEY (or MENTORSHIP__JWT__PUBLIC_KEY) must be set")?;
    let verifier = JwtVerifier::from_key_or_path(public_key)?;

    // Initialize storage
    let (db_pool, store, scores): (_, Arc<dyn SessionStore>, Arc<dyn ScoreSource>) =
        match settings.database.to_config() {
            Some(db_config) => {
                let pool = init_pool(&db_config).await?;
                if database::health_check(&pool).await {
                    info!("Database connection successful");
                } else {
                    anyhow::bail!("Failed to connect to database");
                }
                repositories::migrate(&pool).await?;
                (
                    Some(pool.clone()),
                    Arc::new(PgSessionStore::new(pool.clone())),
                    Arc::new(PgScoreSource::new(pool)),
                )
            }
            None => {
                warn!("No database configured, sessions are kept in memory");
                (
                    None,
                    Arc::new(MemorySessionStore::new()),
                    Arc::new(MemoryScoreSource::default()),
                )
            }
        };

    // Leaderboard cache is optional
    let cache = match settings.redis.url.as_deref() {
        Some(url) => match RedisPool::open(url) {
            Ok(redis) => Some(LeaderboardCache::new(redis, settings.ranking.cache_ttl())),
            Err(e) => {
                warn!("Redis unavailable, leaderboard cache disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sessions = SessionService::new(
        store,
        clock.clone(),
        settings.scheduling.join_window(),
        LinkIssuer::new(settings.scheduling.conference_base_url.clone()),
        settings.progression.thresholds(),
    );
    let ranking = RankingService::new(scores, clock, settings.ranking.scoring(), cache);

    let _scheduler =
        start_leaderboard_refresh(ranking.clone(), &settings.ranking.refresh_schedule).await?;

    let app_state = AppState {
        sessions,
        ranking,
        verifier: Arc::new(verifier),
        db_pool,
    };

    info!("Mentorship service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let address = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Mentorship service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
