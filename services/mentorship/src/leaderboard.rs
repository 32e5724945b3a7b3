//! Leaderboard service and its snapshot cache
//!
//! A snapshot is built once per period and role filter and then served for
//! both the paginated list and the caller's own rank. With Redis configured
//! the snapshot is shared across requests until its TTL expires.

use common::cache::RedisPool;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{EngineError, EngineResult},
    models::{
        Period, RankingQuery, RoleFilter,
        ranking::{RankingEntryView, RankingPage},
    },
    ranking::{Leaderboard, Pagination, ScoringRules},
    repositories::ScoreSource,
};

/// Redis-backed store of serialized leaderboard snapshots
#[derive(Clone)]
pub struct LeaderboardCache {
    redis: RedisPool,
    ttl: Duration,
}

impl LeaderboardCache {
    pub fn new(redis: RedisPool, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    pub fn key(period: Period, role: RoleFilter) -> String {
        format!("leaderboard:{}:{}", period.as_str(), role.as_str())
    }

    pub async fn get(&self, period: Period, role: RoleFilter) -> EngineResult<Option<Leaderboard>> {
        Ok(self.redis.get_json(&Self::key(period, role)).await?)
    }

    pub async fn put(&self, board: &Leaderboard) -> EngineResult<()> {
        self.redis
            .put_json(&Self::key(board.period, board.role), board, self.ttl.as_secs())
            .await?;
        Ok(())
    }

    pub async fn is_healthy(&self) -> bool {
        self.redis.health_check().await
    }
}

/// Ranking service over scored activities
#[derive(Clone)]
pub struct RankingService {
    scores: Arc<dyn ScoreSource>,
    clock: Arc<dyn Clock>,
    rules: ScoringRules,
    cache: Option<LeaderboardCache>,
}

impl RankingService {
    pub fn new(
        scores: Arc<dyn ScoreSource>,
        clock: Arc<dyn Clock>,
        rules: ScoringRules,
        cache: Option<LeaderboardCache>,
    ) -> Self {
        Self {
            scores,
            clock,
            rules,
            cache,
        }
    }

    /// Build a fresh snapshot straight from the score source
    pub async fn build(&self, period: Period, role: RoleFilter) -> EngineResult<Leaderboard> {
        let now = self.clock.now();
        let activities = self.scores.activities(period.since(now)).await?;
        let board = Leaderboard::build(&activities, period, role, now, &self.rules);
        debug!(
            "Built {} leaderboard for {} with {} entries",
            period,
            role.as_str(),
            board.len()
        );
        Ok(board)
    }

    /// Cached snapshot when available, otherwise a freshly built one.
    ///
    /// Cache failures fall back to building; the leaderboard never fails on
    /// Redis alone.
    pub async fn snapshot(&self, period: Period, role: RoleFilter) -> EngineResult<Leaderboard> {
        let Some(cache) = &self.cache else {
            return self.build(period, role).await;
        };

        match cache.get(period, role).await {
            Ok(Some(board)) => return Ok(board),
            Ok(None) => {}
            Err(e) => warn!("Leaderboard cache read failed: {}", e),
        }

        let board = self.build(period, role).await?;
        if let Err(e) = cache.put(&board).await {
            warn!("Leaderboard cache write failed: {}", e);
        }
        Ok(board)
    }

    /// Redis reachability, `None` when caching is disabled
    pub async fn cache_health(&self) -> Option<bool> {
        match &self.cache {
            Some(cache) => Some(cache.is_healthy().await),
            None => None,
        }
    }

    /// One page of the leaderboard plus the caller's line from the same snapshot
    pub async fn page(&self, query: &RankingQuery, caller_id: Uuid) -> EngineResult<RankingPage> {
        let board = self.snapshot(query.period, query.role).await?;
        Ok(board.page(Pagination::new(query.page, query.limit), Some(caller_id)))
    }

    /// The user's own entry in the leaderboard
    pub async fn my_rank(&self, query: &RankingQuery, user_id: Uuid) -> EngineResult<RankingEntryView> {
        let board = self.snapshot(query.period, query.role).await?;
        board
            .rank_of(user_id)
            .cloned()
            .map(RankingEntryView::from)
            .ok_or_else(|| {
                EngineError::NotFound(format!("Ranking entry for user {user_id}"))
            })
    }

    /// Rebuild and cache every period and role combination
    pub async fn refresh_all(&self) -> EngineResult<usize> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };

        let mut refreshed = 0;
        for period in Period::ALL {
            for role in RoleFilter::ALL {
                let board = self.build(period, role).await?;
                cache.put(&board).await?;
                refreshed += 1;
            }
        }

        info!("Refreshed {} leaderboard snapshots", refreshed);
        Ok(refreshed)
    }
}
