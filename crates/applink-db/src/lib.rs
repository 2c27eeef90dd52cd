//! AppLink Database — SurrealDB connection management, repository
//! implementations, and the deferred-write unit of work.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations for the `applink-core` traits
//! - Batch commit via [`SurrealUnitOfWork`] and [`SurrealFlusher`]
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;
mod unit_of_work;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{SurrealAccountRepository, SurrealInstallationRepository};
pub use schema::{run_migrations, schema_v1};
pub use unit_of_work::{SurrealFlusher, SurrealUnitOfWork};
