//! Domain models and request/response payloads

pub mod caller;
pub mod progression;
pub mod ranking;
pub mod session;

pub use caller::{Caller, Role};
pub use progression::{ProgressionLevel, ProgressionSummary};
pub use ranking::{Activity, ActivityRecord, Period, RankingEntry, RankingQuery, RoleFilter};
pub use session::{
    DisplayStatus, ParticipantRole, Session, SessionKind, SessionStatus, SessionView,
};
