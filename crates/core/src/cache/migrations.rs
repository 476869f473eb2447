//! Schema migrations for the response cache database.
//!
//! Applied versions are recorded in `_migrations`; each pending script runs
//! in its own transaction together with its version row.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered `(version, script)` pairs. Versions must strictly increase.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_api_cache.sql"))];

/// Highest schema version known to this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Bring the schema up to [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if a script fails; that script's changes
/// are rolled back.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )?;

        let applied: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, script) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
            let tx = conn.transaction()?;
            tx.execute_batch(script)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn applied_versions(conn: &Connection) -> Vec<i64> {
        conn.call(|conn| {
            let mut stmt = conn.prepare("SELECT version FROM _migrations ORDER BY version")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<Result<Vec<i64>, _>>()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_twice_applies_once() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert_eq!(applied_versions(&conn).await, vec![SCHEMA_VERSION]);
    }

    #[tokio::test]
    async fn test_api_cache_table_exists() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let columns: Vec<String> = conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('api_cache') ORDER BY cid")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()
            })
            .await
            .unwrap();

        assert!(columns.iter().any(|c| c == "key"));
        assert!(columns.iter().any(|c| c == "stored_at"));
    }

    #[test]
    fn test_versions_increase() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(MIGRATIONS.last().map(|m| m.0), Some(SCHEMA_VERSION));
    }
}
