//! Ranking engine
//!
//! A [`Leaderboard`] is one immutable snapshot of the full filtered ordering.
//! Pages and "my rank" lookups are both read from the same snapshot, so a
//! caller's rank always agrees with the list it appears in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{
    Activity, ActivityRecord, Period, RankingEntry, Role, RoleFilter,
    ranking::{RankingEntryView, RankingPage},
};

/// Points added per completed course
pub const DEFAULT_COURSE_BONUS: i64 = 10;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Scoring rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringRules {
    pub course_bonus: i64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            course_bonus: DEFAULT_COURSE_BONUS,
        }
    }
}

impl ScoringRules {
    pub fn bonus(&self, completed_courses: i64) -> i64 {
        completed_courses * self.course_bonus
    }
}

/// Normalised pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Page defaults to 1, limit to 10 and is clamped to 1..=100
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}

/// Display position for a rank: medals for the podium, the number otherwise
pub fn position_label(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => n.to_string(),
    }
}

impl From<RankingEntry> for RankingEntryView {
    fn from(entry: RankingEntry) -> Self {
        let position = position_label(entry.rank);
        Self { entry, position }
    }
}

#[derive(Debug)]
struct Totals {
    name: String,
    role: Role,
    quiz_score: i64,
    quiz_count: i64,
    completed_courses: i64,
}

/// Snapshot of the full, ranked ordering for one period and role filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub period: Period,
    pub role: RoleFilter,
    pub generated_at: DateTime<Utc>,
    entries: Vec<RankingEntry>,
}

impl Leaderboard {
    /// Aggregate `activities` into a ranked leaderboard.
    ///
    /// Sorted by total score descending, ties broken by ascending user id.
    pub fn build(
        activities: &[ActivityRecord],
        period: Period,
        role: RoleFilter,
        now: DateTime<Utc>,
        rules: &ScoringRules,
    ) -> Self {
        let since = period.since(now);
        let mut totals: BTreeMap<Uuid, Totals> = BTreeMap::new();

        for record in activities {
            if since.is_some_and(|since| record.occurred_at < since) {
                continue;
            }
            if !role.matches(record.user_role) {
                continue;
            }

            let totals = totals.entry(record.user_id).or_insert_with(|| Totals {
                name: record.user_name.clone(),
                role: record.user_role,
                quiz_score: 0,
                quiz_count: 0,
                completed_courses: 0,
            });
            match record.activity {
                Activity::Quiz { points } => {
                    totals.quiz_score += points;
                    totals.quiz_count += 1;
                }
                Activity::CourseCompleted => totals.completed_courses += 1,
            }
        }

        let mut entries: Vec<RankingEntry> = totals
            .into_iter()
            .map(|(user_id, t)| RankingEntry {
                user_id,
                name: t.name,
                role: t.role,
                total_score: t.quiz_score + rules.bonus(t.completed_courses),
                quiz_score: t.quiz_score,
                completed_courses: t.completed_courses,
                average_score: average(t.quiz_score, t.quiz_count),
                rank: 0,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        Self {
            period,
            role,
            generated_at: now,
            entries,
        }
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry of `user_id` in this snapshot
    pub fn rank_of(&self, user_id: Uuid) -> Option<&RankingEntry> {
        self.entries.iter().find(|e| e.user_id == user_id)
    }

    /// Slice one page out of the full ordering; ranks stay global
    pub fn page(&self, pagination: Pagination, me: Option<Uuid>) -> RankingPage {
        let total = self.entries.len();
        let entries = self
            .entries
            .iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .cloned()
            .map(RankingEntryView::from)
            .collect();

        RankingPage {
            entries,
            period: self.period,
            role: self.role,
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages: total.div_ceil(pagination.limit as usize) as u32,
            has_next: (pagination.page as usize) * (pagination.limit as usize) < total,
            has_prev: pagination.page > 1,
            me: me
                .and_then(|id| self.rank_of(id))
                .cloned()
                .map(RankingEntryView::from),
        }
    }
}

fn average(sum: i64, count: i64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    ((sum as f64 / count as f64) * 100.0).round() / 100.0
}
