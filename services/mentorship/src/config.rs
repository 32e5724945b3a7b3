//! Service configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `config/mentorship.toml`, then `MENTORSHIP__SECTION__KEY` environment
//! variables. The plain `DATABASE_URL`, `REDIS_URL` and `JWT_PUBLIC_KEY`
//! variables shared with the other services are honoured as defaults.

use common::database::DatabaseConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::{progression::LevelThresholds, ranking::ScoringRules, scheduling::JoinWindow};

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// PostgreSQL settings; the in-memory store is used when `url` is unset
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

impl DatabaseSettings {
    pub fn to_config(&self) -> Option<DatabaseConfig> {
        self.url.as_ref().map(|url| DatabaseConfig {
            database_url: url.clone(),
            max_connections: self.max_connections,
            connection_timeout: self.connection_timeout,
        })
    }
}

/// Redis settings; leaderboard caching is off when `url` is unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisSettings {
    pub url: Option<String>,
}

/// Access token verification settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwtSettings {
    /// RS256 public key in PEM format, or a path to it
    pub public_key: Option<String>,
}

/// Join window and conferencing settings
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingSettings {
    pub join_lead_minutes: i64,
    pub join_grace_minutes: i64,
    pub conference_base_url: String,
}

impl SchedulingSettings {
    pub fn join_window(&self) -> JoinWindow {
        JoinWindow::new(self.join_lead_minutes, self.join_grace_minutes)
    }
}

/// Progression level thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressionSettings {
    pub medium_from: u32,
    pub medium_to: u32,
}

impl ProgressionSettings {
    pub fn thresholds(&self) -> LevelThresholds {
        LevelThresholds {
            medium_from: self.medium_from,
            medium_to: self.medium_to,
        }
    }
}

/// Leaderboard scoring and caching settings
#[derive(Debug, Clone, Deserialize)]
pub struct RankingSettings {
    pub course_bonus: i64,
    pub cache_ttl_seconds: u64,
    /// Cron expression (with seconds) for the snapshot refresh job
    pub refresh_schedule: String,
}

impl RankingSettings {
    pub fn scoring(&self) -> ScoringRules {
        ScoringRules {
            course_bonus: self.course_bonus,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub jwt: JwtSettings,
    pub scheduling: SchedulingSettings,
    pub progression: ProgressionSettings,
    pub ranking: RankingSettings,
}

impl Settings {
    /// Load settings from defaults, `config/mentorship.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3002)?
            .set_default("database.max_connections", 5)?
            .set_default("database.connection_timeout", 30)?
            .set_default("scheduling.join_lead_minutes", 15)?
            .set_default("scheduling.join_grace_minutes", 30)?
            .set_default("scheduling.conference_base_url", "https://meet.jit.si")?
            .set_default("progression.medium_from", 40)?
            .set_default("progression.medium_to", 75)?
            .set_default("ranking.course_bonus", 10)?
            .set_default("ranking.cache_ttl_seconds", 60)?
            .set_default("ranking.refresh_schedule", "0 * * * * *")?;

        for (var, key) in [
            ("DATABASE_URL", "database.url"),
            ("REDIS_URL", "redis.url"),
            ("JWT_PUBLIC_KEY", "jwt.public_key"),
        ] {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_default(key, value)?;
            }
        }

        builder
            .add_source(File::with_name("config/mentorship").required(false))
            .add_source(
                Environment::with_prefix("MENTORSHIP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
