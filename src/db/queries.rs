use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, Row, Transaction, params};

use super::models::{Playlist, PlaylistAdd};
use super::{Database, Result};
use crate::catalog::summary::random_color;
use crate::catalog::{CatalogSnapshot, Song, SongId};

/// Tables holding an ordered list of song ids.
const POSITION_TABLES: [&str; 3] = ["playback_order", "play_queue", "history"];

/// Read a non-negative integer column.
fn unsigned(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let v: i64 = row.get(idx)?;
    u64::try_from(v).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, v))
}

/// SQLite integers are signed; refuse values that would wrap.
fn signed(v: u64) -> rusqlite::Result<i64> {
    i64::try_from(v).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    let added_at: String = row.get(11)?;
    let added_at = DateTime::parse_from_rfc3339(&added_at)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        genre: row.get(3)?,
        album: row.get(4)?,
        year: row.get(5)?,
        duration_secs: row.get(6)?,
        file_size: unsigned(row, 7)?,
        play_count: unsigned(row, 8)?,
        favorite: row.get(9)?,
        file_path: row.get(10)?,
        added_at,
    })
}

fn write_positions(tx: &Transaction<'_>, table: &str, ids: &[SongId]) -> Result<()> {
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} (position, song_id) VALUES (?1, ?2)"
    ))?;
    for (position, id) in ids.iter().enumerate() {
        stmt.execute(params![position as i64, id])?;
    }
    Ok(())
}

fn set_meta(tx: &Transaction<'_>, key: &str, value: impl ToSql) -> Result<()> {
    tx.execute(
        "INSERT INTO catalog_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

impl Database {
    /// Persist a catalog snapshot, replacing whatever was saved before.
    /// Songs absent from the snapshot are deleted (and drop out of playlists).
    pub fn save_snapshot(&self, snap: &CatalogSnapshot) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for table in POSITION_TABLES {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        {
            let mut upsert = tx.prepare(
                "INSERT INTO songs (
                    id, title, artist, genre, album, year, duration_secs,
                    file_size, play_count, favorite, file_path, added_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    artist = excluded.artist,
                    genre = excluded.genre,
                    album = excluded.album,
                    year = excluded.year,
                    duration_secs = excluded.duration_secs,
                    file_size = excluded.file_size,
                    play_count = excluded.play_count,
                    favorite = excluded.favorite,
                    file_path = excluded.file_path,
                    added_at = excluded.added_at
                ",
            )?;
            for s in &snap.songs {
                upsert.execute(params![
                    s.id, s.title, s.artist, s.genre, s.album, s.year, s.duration_secs,
                    signed(s.file_size)?, signed(s.play_count)?, s.favorite, s.file_path,
                    s.added_at.to_rfc3339(),
                ])?;
            }
        }

        let keep: HashSet<SongId> = snap.songs.iter().map(|s| s.id).collect();
        let stored: Vec<SongId> = tx
            .prepare("SELECT id FROM songs")?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for id in stored.into_iter().filter(|id| !keep.contains(id)) {
            tx.execute("DELETE FROM songs WHERE id = ?1", params![id])?;
        }

        write_positions(&tx, "playback_order", &snap.playback_order)?;
        write_positions(&tx, "play_queue", &snap.queue)?;
        write_positions(&tx, "history", &snap.history)?;
        set_meta(&tx, "next_id", signed(snap.next_id)?)?;
        set_meta(&tx, "cursor", snap.cursor)?;

        tx.commit()?;
        log::info!("Saved catalog: {} songs", snap.songs.len());
        Ok(())
    }

    /// Load the saved snapshot, or `None` if nothing has been saved yet.
    pub fn load_snapshot(&self) -> Result<Option<CatalogSnapshot>> {
        let next_id: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT value FROM catalog_meta WHERE key = 'next_id'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let Some(Some(next_id)) = next_id else {
            return Ok(None);
        };
        let next_id = u64::try_from(next_id)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, next_id))?;

        let cursor: Option<SongId> = self
            .conn
            .query_row(
                "SELECT value FROM catalog_meta WHERE key = 'cursor'",
                [],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let songs = self
            .conn
            .prepare(
                "SELECT id, title, artist, genre, album, year, duration_secs,
                        file_size, play_count, favorite, file_path, added_at
                 FROM songs ORDER BY id",
            )?
            .query_map([], song_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(CatalogSnapshot {
            songs,
            playback_order: self.read_positions("playback_order")?,
            cursor,
            queue: self.read_positions("play_queue")?,
            history: self.read_positions("history")?,
            next_id,
        }))
    }

    fn read_positions(&self, table: &str) -> Result<Vec<SongId>> {
        let ids = self
            .conn
            .prepare(&format!("SELECT song_id FROM {table} ORDER BY position"))?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Create an empty playlist with a random cover colour.
    pub fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist> {
        self.conn.execute(
            "INSERT INTO playlists (name, description, cover_color) VALUES (?1, ?2, ?3)",
            params![name, description, random_color(&mut rand::thread_rng())],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_playlist(id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows.into())
    }

    pub fn get_playlist(&self, id: i64) -> Result<Option<Playlist>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, cover_color, created_at
                 FROM playlists WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Playlist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        cover_color: row.get(3)?,
                        created_at: row.get(4)?,
                        songs: Vec::new(),
                    })
                },
            )
            .optional()?;

        match row {
            Some(mut playlist) => {
                playlist.songs = self.playlist_song_ids(id)?;
                Ok(Some(playlist))
            }
            None => Ok(None),
        }
    }

    pub fn list_playlists(&self) -> Result<Vec<Playlist>> {
        let ids: Vec<i64> = self
            .conn
            .prepare("SELECT id FROM playlists ORDER BY id")?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut playlists = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.get_playlist(id)? {
                playlists.push(p);
            }
        }
        Ok(playlists)
    }

    pub fn playlist_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM playlists", [], |row| row.get(0))?;
        Ok(count)
    }

    fn playlist_song_ids(&self, playlist_id: i64) -> Result<Vec<SongId>> {
        let ids = self
            .conn
            .prepare(
                "SELECT song_id FROM playlist_songs WHERE playlist_id = ?1 ORDER BY position",
            )?
            .query_map(params![playlist_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn playlist_exists(&self, id: i64) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM playlists WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Append a song to a playlist. Adding a song twice is a no-op.
    /// The song must already be saved.
    pub fn add_to_playlist(&self, playlist_id: i64, song_id: SongId) -> Result<PlaylistAdd> {
        if !self.playlist_exists(playlist_id)? {
            return Ok(PlaylistAdd::NoSuchPlaylist);
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id, position)
             SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
             FROM playlist_songs WHERE playlist_id = ?1",
            params![playlist_id, song_id],
        )?;
        Ok(if inserted > 0 {
            PlaylistAdd::Added
        } else {
            PlaylistAdd::AlreadyPresent
        })
    }

    /// Returns `None` if the playlist does not exist, otherwise whether the
    /// song was a member.
    pub fn remove_from_playlist(&self, playlist_id: i64, song_id: SongId) -> Result<Option<bool>> {
        if !self.playlist_exists(playlist_id)? {
            return Ok(None);
        }
        let removed = self.conn.execute(
            "DELETE FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2",
            params![playlist_id, song_id],
        )?;
        Ok(Some(removed > 0))
    }

    pub fn delete_playlist(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}
