//! Channel database schema.
//!
//! The `schema_version` table holds a single row. A fresh database gets the
//! current layout; a database written by a newer build is refused rather
//! than guessed at.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

/// Layout version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Create the schema if missing and check its version. Safe to call on every open.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // WAL makes each committed put atomic with respect to a crash
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);",
    )?;

    let stored: Option<u32> = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()?;

    match stored {
        None => {
            create_tables(conn)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
            tracing::debug!(version = SCHEMA_VERSION, "channel schema created");
        }
        Some(version) if version > SCHEMA_VERSION => {
            return Err(StoreError::schema(format!(
                "database is at version {version}, this build only knows up to {SCHEMA_VERSION}"
            )));
        }
        Some(_) => {}
    }

    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    // One row per channel; terms and snapshot are kept in wire encoding
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS hosted_channels (
            channel_id BLOB PRIMARY KEY,
            peer_id BLOB NOT NULL,
            chain_hash BLOB NOT NULL,
            is_host INTEGER NOT NULL,
            phase INTEGER NOT NULL,
            refund_script_pub_key BLOB NOT NULL,
            init_hosted_channel BLOB,
            last_cross_signed_state BLOB,
            updated_at INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_hosted_channels_peer ON hosted_channels(peer_id);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_wal_mode_enabled() {
        // WAL mode doesn't persist for in-memory databases
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("test.db")).unwrap();
        initialize_schema(&conn).unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn test_reopen_keeps_version() {
        let conn = Connection::open_in_memory().unwrap();
        for _ in 0..3 {
            initialize_schema(&conn).unwrap();
        }
        let rows: u32 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let exists: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='hosted_channels'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1);
    }

    #[test]
    fn test_schema_version_recorded() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        let version: u32 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_existing_tables_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let conn = Connection::open(&path).unwrap();
            initialize_schema(&conn).unwrap();
            conn.execute(
                "INSERT INTO hosted_channels (channel_id, peer_id, chain_hash, is_host, phase,
                    refund_script_pub_key) VALUES (x'01', x'02', x'03', 0, 1, x'')",
                [],
            )
            .unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        initialize_schema(&conn).unwrap();
        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM hosted_channels", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION + 1])
            .unwrap();
        assert!(matches!(
            initialize_schema(&conn),
            Err(StoreError::Schema(_))
        ));
    }
}
