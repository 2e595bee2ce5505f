pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Stored catalog is inconsistent: {0}")]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Schema version this build writes.
const SCHEMA_VERSION: i32 = 1;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        // WAL mode for better concurrent read performance
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version > SCHEMA_VERSION {
            return Err(DbError::Migration(format!(
                "database schema v{} is newer than this build (v{})",
                version, SCHEMA_VERSION
            )));
        }
        if version < 1 {
            self.migrate_v1()?;
        }

        self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// V1: songs, saved playback state, named playlists
    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS songs (
                id              INTEGER PRIMARY KEY,
                title           TEXT NOT NULL,
                artist          TEXT NOT NULL,
                genre           TEXT NOT NULL,
                album           TEXT NOT NULL,
                year            INTEGER NOT NULL,
                duration_secs   REAL NOT NULL DEFAULT 0,
                file_size       INTEGER NOT NULL DEFAULT 0,
                play_count      INTEGER NOT NULL DEFAULT 0,
                favorite        INTEGER NOT NULL DEFAULT 0,
                file_path       TEXT,
                added_at        TEXT NOT NULL
            );

            -- Engine state between runs. Positions are 0-based.
            CREATE TABLE IF NOT EXISTS playback_order (
                position    INTEGER PRIMARY KEY,
                song_id     INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS play_queue (
                position    INTEGER PRIMARY KEY,
                song_id     INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS history (
                position    INTEGER PRIMARY KEY,
                song_id     INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS catalog_meta (
                key         TEXT PRIMARY KEY,
                value       INTEGER
            );

            CREATE TABLE IF NOT EXISTS playlists (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                cover_color     TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE IF NOT EXISTS playlist_songs (
                playlist_id     INTEGER NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                song_id         INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
                position        INTEGER NOT NULL,
                PRIMARY KEY (playlist_id, song_id)
            );
            CREATE INDEX IF NOT EXISTS idx_playlist_songs_song ON playlist_songs(song_id);
            ",
        )?;
        Ok(())
    }
}
