//! Repositories for session storage and score inputs

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;

pub mod memory;
pub mod scores;
pub mod sessions;

pub use memory::{MemoryScoreSource, MemorySessionStore};
pub use scores::{PgScoreSource, ScoreSource};
pub use sessions::{PgSessionStore, SessionStore, StoreError};

/// Apply the bundled migrations for the session tables
pub async fn migrate(pool: &PgPool) -> DatabaseResult<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    Ok(())
}
