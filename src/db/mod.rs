//! Database module
//!
//! PostgreSQL integration using sqlx with:
//! - Connection pool management and migrations
//! - Row types with FromRow
//! - Repository functions for catalog records and EPG entries

pub mod models;
pub mod pool;
pub mod repository;

// Re-export commonly used items
pub use models::{CatalogRow, NewCatalogRecord};
pub use pool::{create_pool, health_check, run_migrations};
