use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::song::{IdGenerator, Song, SongId};
use super::{CatalogError, CatalogService, CatalogSettings, Result};

/// Everything needed to rebuild a catalog: the canonical songs plus the
/// playback order, cursor, queue, history and id counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Songs in the order they are filed into the library on restore.
    pub songs: Vec<Song>,
    pub playback_order: Vec<SongId>,
    pub cursor: Option<SongId>,
    pub queue: Vec<SongId>,
    /// Oldest first.
    pub history: Vec<SongId>,
    pub next_id: u64,
}

impl CatalogService {
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            songs: self.songs.values().cloned().collect(),
            playback_order: self.playlist.ids(),
            cursor: self.playlist.current(),
            queue: self.queue.ids(),
            history: self.history.ids(),
            next_id: self.ids.peek(),
        }
    }

    /// Rebuild a catalog from a snapshot.
    ///
    /// Songs missing from `playback_order` are appended after it. The id
    /// counter resumes past the highest known id even if `next_id` is stale.
    /// History beyond the configured limit keeps only its newest entries.
    pub fn from_snapshot(snapshot: CatalogSnapshot, settings: CatalogSettings) -> Result<Self> {
        let mut catalog = Self::new(settings);

        let mut seen = HashSet::new();
        for song in &snapshot.songs {
            if !seen.insert(song.id) {
                return Err(CatalogError::DuplicateSong(song.id));
            }
        }
        let check = |context: &'static str, ids: &[SongId]| -> Result<()> {
            match ids.iter().find(|id| !seen.contains(*id)) {
                Some(&id) => Err(CatalogError::UnknownSong { context, id }),
                None => Ok(()),
            }
        };
        check("playback order", &snapshot.playback_order)?;
        check("queue", &snapshot.queue)?;
        check("history", &snapshot.history)?;
        check("cursor", snapshot.cursor.as_slice())?;

        let max_id = snapshot.songs.iter().map(|s| s.id.0).max().unwrap_or(0);
        let next_id = max_id
            .checked_add(1)
            .map(|after_max| snapshot.next_id.max(after_max))
            .filter(|next| *next < u64::MAX)
            .ok_or(CatalogError::IdOutOfRange(max_id.max(snapshot.next_id)))?;
        catalog.ids = IdGenerator::starting_at(next_id);

        for song in snapshot.songs {
            catalog.library.insert(song.id, &song.title);
            for key in super::index_keys(&song) {
                catalog.index.set(key, song.id);
            }
            catalog.songs.insert(song.id, song);
        }

        let mut placed = HashSet::new();
        for id in snapshot.playback_order {
            if placed.insert(id) {
                catalog.playlist.append(id);
            }
        }
        let unplaced: Vec<SongId> = catalog
            .songs
            .keys()
            .copied()
            .filter(|id| !placed.contains(id))
            .collect();
        if !unplaced.is_empty() {
            log::warn!(
                "{} songs missing from saved playback order; appending them",
                unplaced.len()
            );
        }
        for id in unplaced {
            catalog.playlist.append(id);
        }

        match snapshot.cursor {
            Some(id) => {
                catalog.playlist.set_cursor(id);
            }
            None => catalog.playlist.clear_cursor(),
        }
        for id in snapshot.queue {
            catalog.queue.enqueue(id);
        }
        for id in snapshot.history {
            catalog.history.record(id);
        }

        log::info!(
            "Restored catalog: {} songs, {} queued, {} in history",
            catalog.len(),
            catalog.queue.len(),
            catalog.history.len()
        );
        Ok(catalog)
    }
}
