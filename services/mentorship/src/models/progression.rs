//! Progression summary derived from a user's session history

use serde::Serialize;
use uuid::Uuid;

/// Coarse classification of a user's completion ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressionLevel {
    None,
    Low,
    Medium,
    High,
}

/// Derived progression, never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSummary {
    pub user_id: Uuid,
    pub total: u32,
    pub completed: u32,
    pub percent: u32,
    pub level: ProgressionLevel,
}
