use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::catalog::SongId;

impl ToSql for SongId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        i64::try_from(self.0)
            .map(ToSqlOutput::from)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    }
}

impl FromSql for SongId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let v = i64::column_result(value)?;
        u64::try_from(v)
            .map(SongId)
            .map_err(|_| FromSqlError::OutOfRange(v))
    }
}

/// A named, user-curated list of songs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// `#rrggbb`, assigned at random on creation.
    pub cover_color: String,
    pub created_at: String,
    /// Members in the order they were added.
    pub songs: Vec<SongId>,
}

/// Outcome of adding a song to a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistAdd {
    Added,
    AlreadyPresent,
    NoSuchPlaylist,
}
