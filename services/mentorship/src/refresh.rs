//! Scheduled leaderboard snapshot refresh

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::leaderboard::RankingService;

/// Start the cron job that rebuilds every cached leaderboard snapshot.
///
/// The returned scheduler must be kept alive for the job to keep firing.
pub async fn start_leaderboard_refresh(
    ranking: RankingService,
    schedule: &str,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_, _| {
        let ranking = ranking.clone();
        Box::pin(async move {
            match ranking.refresh_all().await {
                Ok(count) => info!("Leaderboard refresh job rebuilt {} snapshots", count),
                Err(e) => error!("Leaderboard refresh job failed: {}", e),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Started leaderboard refresh with schedule: {}", schedule);
    Ok(scheduler)
}
