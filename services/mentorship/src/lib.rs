//! Mentorship service
//!
//! Session lifecycle, join-window scheduling, progression and leaderboard
//! ranking behind an authenticated HTTP API.

pub mod clock;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod progression;
pub mod ranking;
pub mod refresh;
pub mod repositories;
pub mod routes;
pub mod scheduling;
pub mod service;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
