//! Progression aggregator
//!
//! Recomputed from the session log on every call; nothing beyond the
//! sessions themselves is stored.

use uuid::Uuid;

use crate::models::{ProgressionLevel, ProgressionSummary, Session, SessionStatus};

/// Percent boundaries between levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelThresholds {
    /// Below this percent the level is `Low`
    pub medium_from: u32,
    /// Above this percent the level is `High`; the value itself is still `Medium`
    pub medium_to: u32,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            medium_from: 40,
            medium_to: 75,
        }
    }
}

impl LevelThresholds {
    pub fn level(&self, total: u32, percent: u32) -> ProgressionLevel {
        if total == 0 {
            ProgressionLevel::None
        } else if percent < self.medium_from {
            ProgressionLevel::Low
        } else if percent <= self.medium_to {
            ProgressionLevel::Medium
        } else {
            ProgressionLevel::High
        }
    }
}

/// `round(completed / total * 100)`, halves rounded up, 0 when `total` is 0
pub fn percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (completed, total) = (u64::from(completed), u64::from(total));
    ((completed * 200 + total) / (2 * total)) as u32
}

/// Summarise the sessions of one user. Cancelled sessions count toward the
/// total but never toward completion.
pub fn summarize(
    user_id: Uuid,
    sessions: &[Session],
    thresholds: &LevelThresholds,
) -> ProgressionSummary {
    let total = sessions.len() as u32;
    let completed = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .count() as u32;
    let percent = percent(completed, total);

    ProgressionSummary {
        user_id,
        total,
        completed,
        percent,
        level: thresholds.level(total, percent),
    }
}
