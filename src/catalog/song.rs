use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a song. Assigned once by [`IdGenerator`], never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub u64);

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The canonical record for one song.
///
/// The catalog owns exactly one `Song` per id; every index refers to it by
/// [`SongId`]. Values handed out across the catalog boundary are clones
/// taken at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub album: String,
    pub year: i32,
    pub duration_secs: f64,
    pub file_size: u64,
    pub play_count: u64,
    pub favorite: bool,
    /// Where the audio lives, if the song was imported from a file.
    pub file_path: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl Song {
    fn from_new(id: SongId, new: NewSong) -> Self {
        Self {
            id,
            title: new.title,
            artist: new.artist,
            genre: new.genre,
            album: new.album,
            year: new.year,
            duration_secs: new.duration_secs,
            file_size: new.file_size,
            play_count: 0,
            favorite: false,
            file_path: new.file_path,
            added_at: Utc::now(),
        }
    }
}

/// Attribute bundle for a song that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub album: String,
    pub year: i32,
    pub duration_secs: f64,
    pub file_size: u64,
    pub file_path: Option<String>,
}

impl NewSong {
    /// A bundle with only a title; every other attribute is "unknown".
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: "Unknown Artist".to_string(),
            genre: "Unknown Genre".to_string(),
            album: "Unknown Album".to_string(),
            year: 0,
            duration_secs: 0.0,
            file_size: 0,
            file_path: None,
        }
    }
}

/// Partial metadata update. `None` fields are left untouched.
/// The title is deliberately absent: it is the ordering key of the library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongUpdate {
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub duration_secs: Option<f64>,
}

impl SongUpdate {
    pub fn is_empty(&self) -> bool {
        self.artist.is_none()
            && self.genre.is_none()
            && self.album.is_none()
            && self.year.is_none()
            && self.duration_secs.is_none()
    }

    pub(crate) fn apply(self, song: &mut Song) {
        if let Some(artist) = self.artist {
            song.artist = artist;
        }
        if let Some(genre) = self.genre {
            song.genre = genre;
        }
        if let Some(album) = self.album {
            song.album = album;
        }
        if let Some(year) = self.year {
            song.year = year;
        }
        if let Some(duration) = self.duration_secs {
            song.duration_secs = duration;
        }
    }
}

/// Monotonic id source owned by a catalog.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume numbering at `next` (never below 1).
    pub fn starting_at(next: u64) -> Self {
        Self { next: next.max(1) }
    }

    /// The id the next call to [`IdGenerator::allocate`] will return.
    pub fn peek(&self) -> u64 {
        self.next
    }

    pub fn allocate(&mut self) -> SongId {
        let id = SongId(self.next);
        self.next += 1;
        id
    }

    pub(crate) fn create(&mut self, new: NewSong) -> Song {
        let id = self.allocate();
        Song::from_new(id, new)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
