//! # Request and Prediction Logs
//!
//! SQLite persistence for the monitoring endpoints via SQLx.
//!
//! ## Architecture
//!
//! The log is **best-effort**. The service opens the database at startup and
//! applies the embedded migrations; if that fails it runs without a log and
//! the monitoring endpoints answer 503. A failed insert is logged at warn
//! and never fails the request that produced it.
//!
//! Both tables are append-only. Timestamps are stored as fixed-width
//! RFC 3339 text (see `hpp_core::temporal`) so time-window queries are plain
//! string comparisons on an indexed column.

pub mod predictions;
pub mod requests;

use std::str::FromStr;
use std::time::Duration;

use hpp_core::MonitoringConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Open (creating if needed) the log database and run migrations.
///
/// `database_url` wins over `database_path` when both are set.
pub async fn init_pool(config: &MonitoringConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = match &config.database_url {
        Some(url) => SqliteConnectOptions::from_str(url)?,
        None => {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
                }
            }
            SqliteConnectOptions::new().filename(&config.database_path)
        }
    }
    .create_if_missing(true)
    .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::info!("connected to SQLite log database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(pool)
}

/// Whether the database answers a trivial query.
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Lower bound of a look-back window, formatted for comparison with stored
/// timestamps.
pub(crate) fn window_start(hours: u32) -> String {
    let since = chrono::Utc::now() - chrono::TimeDelta::hours(i64::from(hours));
    hpp_core::temporal::format_timestamp(since)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A migrated database in a temporary directory.
    pub async fn temp_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitoringConfig {
            database_path: dir.path().join("logs").join("monitoring.db"),
            database_url: None,
            metrics_enabled: true,
        };
        let pool = init_pool(&config).await.unwrap();
        (dir, pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_parent_directory_and_schema() {
        let (dir, pool) = testing::temp_pool().await;
        assert!(dir.path().join("logs").join("monitoring.db").exists());
        ping(&pool).await.unwrap();
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(tables.contains(&"predictions".to_string()));
        assert!(tables.contains(&"requests".to_string()));
    }

    #[test]
    fn window_start_is_in_the_past() {
        let start = window_start(1);
        assert!(start < hpp_core::temporal::now_timestamp());
    }
}
