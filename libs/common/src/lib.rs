//! Common library for the mentorship platform
//!
//! This crate provides shared infrastructure used by the services, including
//! PostgreSQL connectivity, the Redis cache client, and the error types they
//! surface.

pub mod cache;
pub mod database;
pub mod error;
