//! Database layer
//!
//! Database abstraction for the newsnotes server. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration. Repositories
//! dispatch on the driver and keep one query implementation per backend.
//!
//! # Usage
//!
//! ```ignore
//! use newsnotes::config::DatabaseConfig;
//! use newsnotes::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    backend, create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase,
};
