use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::PathBuf;

pub struct StoredDocument {
    pub payload: String,
    pub digest: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: PathBuf) -> SqlResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> SqlResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqlResult<Self> {
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![
            (
                "001_create_settings.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/001_create_settings.sql"
                )),
            ),
            (
                "002_create_documents.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/002_create_documents.sql"
                )),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }

    pub fn delete_setting(&self, key: &str) -> SqlResult<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn get_document(&self, key: &str) -> SqlResult<Option<StoredDocument>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload, digest FROM documents WHERE key = ?1")?;
        stmt.query_row(params![key], |row| {
            Ok(StoredDocument {
                payload: row.get(0)?,
                digest: row.get(1)?,
            })
        })
        .optional()
    }

    pub fn get_document_digest(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT digest FROM documents WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }

    pub fn put_document(&self, key: &str, payload: &str, digest: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (key, payload, digest, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))",
            params![key, payload, digest],
        )?;
        Ok(())
    }

    pub fn remove_document(&self, key: &str) -> SqlResult<()> {
        self.conn
            .execute("DELETE FROM documents WHERE key = ?1", params![key])?;
        Ok(())
    }
}
