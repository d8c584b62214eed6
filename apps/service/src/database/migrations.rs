use anyhow::Result;
use libsql::Connection;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 2;

/// Run database migrations
///
/// This is the single source of truth for the monitoring schema.
pub async fn run_migrations(conn: &Connection) -> Result<()> {
    // Create schema_migrations table first (tracks applied migrations)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::info!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("Running migrations from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Initial monitoring schema").await?;
    }

    if current_version < 2 {
        run_migration_v2(conn).await?;
        record_migration(conn, 2, "Add ID pool table").await?;
    }

    tracing::info!("Database migrations completed successfully (now at version {})", SCHEMA_VERSION);
    Ok(())
}

/// Get current schema version from database
async fn get_current_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i32> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

/// Record that a migration was applied
async fn record_migration(conn: &Connection, version: i32, description: &str) -> Result<()> {
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)?.as_secs() as i64;

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, now, description],
    )
    .await?;

    tracing::info!("Applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: Initial schema
/// Creates profiles, sessions, session state, id-to-key map and interface index
async fn run_migration_v1(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS monitor_profiles (
            id INTEGER PRIMARY KEY,
            failure_threshold INTEGER NOT NULL,
            probe_interval_ms INTEGER NOT NULL,
            monitor_window INTEGER NOT NULL,
            protocol TEXT NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS monitoring_info (
            id INTEGER PRIMARY KEY,
            mode TEXT NOT NULL,
            source TEXT NOT NULL,
            destination TEXT,
            profile_id INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS monitoring_state (
            monitor_key TEXT PRIMARY KEY,
            monitor_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            state TEXT NOT NULL,
            request_count INTEGER NOT NULL DEFAULT 0,
            response_pending_count INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS monitor_keys (
            monitor_id INTEGER PRIMARY KEY,
            monitor_key TEXT NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS interface_monitors (
            interface TEXT NOT NULL,
            monitor_id INTEGER NOT NULL,
            PRIMARY KEY (interface, monitor_id)
        )",
        (),
    )
    .await?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_monitoring_info_profile ON monitoring_info(profile_id)", ()).await?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_monitoring_state_monitor ON monitoring_state(monitor_id)", ()).await?;

    Ok(())
}

/// Migration v2: ID pool
/// Persists id allocations so ids stay stable across restarts
async fn run_migration_v2(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS id_pool (
            pool TEXT NOT NULL,
            id_key TEXT NOT NULL,
            id INTEGER NOT NULL,
            PRIMARY KEY (pool, id_key),
            UNIQUE (pool, id)
        )",
        (),
    )
    .await?;

    Ok(())
}
