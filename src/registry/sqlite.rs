//! SQLite-backed connection store implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

use super::traits::{ConnectionRecord, ConnectionStore, StoreError};

/// A persistent connection store backed by a SQLite database in the
/// workspace directory. Survives process restarts, which makes it the
/// production backend: a relay restart must not orphan live connections.
pub struct SqliteConnectionStore {
    conn: Mutex<Connection>,
}

impl SqliteConnectionStore {
    pub fn new(workspace_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace_dir)?;
        let db_path = workspace_dir.join("connections.db");
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS connections (
                connection_id TEXT PRIMARY KEY,
                agent_id      TEXT NOT NULL,
                endpoint_url  TEXT NOT NULL,
                connected_at  TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ConnectionRecord>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(ConnectionRecord {
                connection_id: row.get(0)?,
                agent_id: row.get(1)?,
                endpoint_url: row.get(2)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[async_trait]
impl ConnectionStore for SqliteConnectionStore {
    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO connections (connection_id, agent_id, endpoint_url, connected_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.connection_id,
                record.agent_id,
                record.endpoint_url,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_by_agent(&self, agent_id: &str) -> Result<Vec<ConnectionRecord>, StoreError> {
        // agent_id carries no index; this is a table scan, accepted at this
        // system's scale.
        let conn = self.conn.lock();
        Self::query_records(
            &conn,
            "SELECT connection_id, agent_id, endpoint_url FROM connections WHERE agent_id = ?1",
            &[&agent_id],
        )
    }

    async fn delete(&self, connection_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM connections WHERE connection_id = ?1",
            params![connection_id],
        )?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConnectionRecord>, StoreError> {
        let conn = self.conn.lock();
        Self::query_records(
            &conn,
            "SELECT connection_id, agent_id, endpoint_url FROM connections",
            &[],
        )
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
