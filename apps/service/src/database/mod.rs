/// Database layer
///
/// libsql-backed implementations of the engine's persistence and id
/// allocation collaborators.

pub mod migrations;
pub mod repository;

pub use repository::DatabaseImpl;

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
