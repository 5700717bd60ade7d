//! PostgreSQL persistence for the planner's storage collaborators.
//!
//! Publication documents (the catalog source) and planning audit records.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
