//! Database repositories
//!
//! Repository pattern for database access, separating data access logic
//! from business logic.

pub mod catalog;
pub mod epg;
