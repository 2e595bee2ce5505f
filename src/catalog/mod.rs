//! The in-memory music catalog.
//!
//! [`CatalogService`] owns one canonical [`Song`] per id and keeps four
//! structures in step with it:
//!
//! - [`OrderedIndex`] for alphabetical browse, range and substring search
//! - [`MultiKeyIndex`] for lookup by genre, artist, album or [`ALL_KEY`]
//! - [`PlaybackSequence`] for playlist order and the now-playing cursor
//! - [`SongQueue`] / [`HistoryQueue`] for up-next and recently played
//!
//! Every structure stores [`SongId`]s only; reads resolve them through the
//! catalog, so a change to a song is visible through every index at once.
//! The service itself is single-threaded; [`SharedCatalog`] puts it behind
//! one reader/writer lock for concurrent callers.

pub mod multikey;
pub mod ordered;
pub mod queue;
pub mod sequence;
pub mod snapshot;
pub mod song;
pub mod summary;

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use rand::Rng;
use thiserror::Error;

pub use multikey::MultiKeyIndex;
pub use ordered::OrderedIndex;
pub use queue::{HistoryQueue, SongQueue};
pub use sequence::PlaybackSequence;
pub use snapshot::CatalogSnapshot;
pub use song::{IdGenerator, NewSong, Song, SongId, SongUpdate};

/// Catalog-wide key every song is filed under in the multi-key index.
pub const ALL_KEY: &str = "all";

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("Duplicate song id {0} in snapshot")]
    DuplicateSong(SongId),
    #[error("Snapshot {context} refers to unknown song {id}")]
    UnknownSong { context: &'static str, id: SongId },
    #[error("Snapshot id {0} leaves no room for new songs")]
    IdOutOfRange(u64),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Construction-time sizing for a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSettings {
    /// How many plays the recently-played history retains.
    pub history_limit: usize,
    /// Fixed bucket count of the multi-key index.
    pub hash_buckets: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            history_limit: queue::DEFAULT_HISTORY_LIMIT,
            hash_buckets: multikey::DEFAULT_BUCKETS,
        }
    }
}

pub struct CatalogService {
    songs: BTreeMap<SongId, Song>,
    ids: IdGenerator,
    library: OrderedIndex,
    index: MultiKeyIndex,
    playlist: PlaybackSequence,
    queue: SongQueue,
    history: HistoryQueue,
    settings: CatalogSettings,
}

/// The multi-key index entries for a song.
fn index_keys(song: &Song) -> [&str; 4] {
    [song.genre.as_str(), song.artist.as_str(), song.album.as_str(), ALL_KEY]
}

impl CatalogService {
    pub fn new(settings: CatalogSettings) -> Self {
        Self {
            songs: BTreeMap::new(),
            ids: IdGenerator::new(),
            library: OrderedIndex::new(),
            index: MultiKeyIndex::with_buckets(settings.hash_buckets),
            playlist: PlaybackSequence::new(),
            queue: SongQueue::new(),
            history: HistoryQueue::new(settings.history_limit),
            settings,
        }
    }

    pub fn settings(&self) -> CatalogSettings {
        self.settings
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, id: SongId) -> Option<Song> {
        self.songs.get(&id).cloned()
    }

    pub fn contains(&self, id: SongId) -> bool {
        self.songs.contains_key(&id)
    }

    fn resolve(&self, ids: impl IntoIterator<Item = SongId>) -> Vec<Song> {
        ids.into_iter()
            .filter_map(|id| self.songs.get(&id).cloned())
            .collect()
    }

    /// File an already-identified song into every structure.
    fn insert(&mut self, song: Song) {
        self.library.insert(song.id, &song.title);
        for key in index_keys(&song) {
            self.index.set(key, song.id);
        }
        self.playlist.append(song.id);
        self.songs.insert(song.id, song);
    }

    /// Assign an id to `new` and add it to the library, the key index and the
    /// end of the playback sequence.
    pub fn add_song(&mut self, new: NewSong) -> Song {
        let song = self.ids.create(new);
        log::debug!("Adding song {} \"{}\"", song.id, song.title);
        self.insert(song.clone());
        song
    }

    /// Remove a song from every structure. Its id is not handed out again.
    pub fn remove_song(&mut self, id: SongId) -> Option<Song> {
        let song = self.songs.remove(&id)?;
        self.library.remove(id, &song.title);
        for key in index_keys(&song) {
            self.index.remove(key, id);
        }
        self.playlist.remove(id);
        self.queue.remove_all(id);
        self.history.remove_all(id);
        log::debug!("Removed song {} \"{}\"", id, song.title);
        Some(song)
    }

    /// Change metadata in place, re-filing the song under its new keys.
    pub fn update_song(&mut self, id: SongId, update: SongUpdate) -> Option<Song> {
        let song = self.songs.get_mut(&id)?;
        for key in index_keys(song) {
            self.index.remove(key, id);
        }
        update.apply(song);
        for key in index_keys(song) {
            self.index.set(key, id);
        }
        Some(song.clone())
    }

    /// Flip the favorite flag. Returns the new value.
    pub fn toggle_favorite(&mut self, id: SongId) -> Option<bool> {
        let song = self.songs.get_mut(&id)?;
        song.favorite = !song.favorite;
        Some(song.favorite)
    }

    /// Favorite songs in playback order.
    pub fn favorites(&self) -> Vec<Song> {
        self.all()
            .into_iter()
            .filter(|song| song.favorite)
            .collect()
    }

    /// Every song in playback order.
    pub fn all(&self) -> Vec<Song> {
        self.resolve(self.playlist.ids())
    }

    /// Every song in ascending case-insensitive title order.
    pub fn sorted(&self) -> Vec<Song> {
        self.resolve(self.library.in_order())
    }

    /// Songs whose title contains `term`, case-insensitively.
    pub fn search(&self, term: &str) -> Vec<Song> {
        self.resolve(self.library.search(term))
    }

    /// Songs whose title starts with a character in `[start, end]`.
    pub fn range(&self, start: char, end: char) -> Vec<Song> {
        self.resolve(self.library.by_range(start, end))
    }

    /// Songs filed under a genre, artist, album or [`ALL_KEY`].
    pub fn by_key(&self, key: &str) -> Vec<Song> {
        self.resolve(self.index.get(key))
    }

    /// Every distinct song reachable through the key index.
    pub fn indexed(&self) -> Vec<Song> {
        self.resolve(self.index.all_unique())
    }

    pub fn current(&self) -> Option<Song> {
        self.playlist.current().and_then(|id| self.get(id))
    }

    /// Play the next song: the head of the queue if any, otherwise the next
    /// song in the playback sequence. The song's play count goes up and it is
    /// recorded in the history.
    pub fn next(&mut self) -> Option<Song> {
        let id = match self.queue.dequeue() {
            Some(id) => id,
            None => self.playlist.next()?,
        };
        let song = self.songs.get_mut(&id)?;
        song.play_count += 1;
        self.history.record(id);
        Some(song.clone())
    }

    /// Step the playback cursor back. Not counted as a play.
    pub fn previous(&mut self) -> Option<Song> {
        let id = self.playlist.prev()?;
        self.get(id)
    }

    pub fn shuffle(&mut self) -> Vec<Song> {
        self.shuffle_with(&mut rand::thread_rng())
    }

    /// Shuffle the playback sequence; the cursor moves to the new first song.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<Song> {
        self.playlist.shuffle_with(rng);
        self.all()
    }

    /// Queue a song to play next. Returns the queue length, or `None` for an
    /// unknown id.
    pub fn enqueue(&mut self, id: SongId) -> Option<usize> {
        if !self.songs.contains_key(&id) {
            return None;
        }
        self.queue.enqueue(id);
        Some(self.queue.len())
    }

    /// Pop the head of the queue without playing it.
    pub fn dequeue(&mut self) -> Option<Song> {
        let id = self.queue.dequeue()?;
        self.get(id)
    }

    pub fn peek_queue(&self) -> Option<Song> {
        self.queue.peek().and_then(|id| self.get(id))
    }

    pub fn remove_from_queue(&mut self, id: SongId) -> bool {
        self.queue.remove(id)
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Queued songs, next first.
    pub fn queue(&self) -> Vec<Song> {
        self.resolve(self.queue.ids())
    }

    /// Recently played songs, oldest first.
    pub fn recently_played(&self) -> Vec<Song> {
        self.resolve(self.history.ids())
    }
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new(CatalogSettings::default())
    }
}

/// A [`CatalogService`] behind a single reader/writer lock.
///
/// Each closure runs with the lock held for its whole duration, so a reader
/// never sees a song in one structure but not yet in another.
#[derive(Clone, Default)]
pub struct SharedCatalog {
    inner: Arc<RwLock<CatalogService>>,
}

impl SharedCatalog {
    pub fn new(service: CatalogService) -> Self {
        Self {
            inner: Arc::new(RwLock::new(service)),
        }
    }

    /// Run a query under the shared lock.
    pub fn read<T>(&self, f: impl FnOnce(&CatalogService) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run a mutation (including cursor moves) under the exclusive lock.
    pub fn write<T>(&self, f: impl FnOnce(&mut CatalogService) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn song(title: &str, artist: &str, genre: &str, album: &str) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            genre: genre.to_string(),
            album: album.to_string(),
            year: 1977,
            duration_secs: 300.0,
            file_size: 1_000,
            file_path: None,
        }
    }

    fn titles(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(|s| s.title.as_str()).collect()
    }

    fn sample() -> CatalogService {
        let mut catalog = CatalogService::default();
        catalog.add_song(song("Zebra", "The Herd", "Rock", "Savanna"));
        catalog.add_song(song("Apple", "Orchard", "Pop", "Fruit"));
        catalog.add_song(song("Mango", "Orchard", "Pop", "Fruit"));
        catalog
    }

    #[test]
    fn test_add_song_fans_out_to_every_structure() {
        let catalog = sample();
        assert_eq!(titles(&catalog.all()), vec!["Zebra", "Apple", "Mango"]);
        assert_eq!(titles(&catalog.sorted()), vec!["Apple", "Mango", "Zebra"]);
        assert_eq!(titles(&catalog.range('a', 'm')), vec!["Apple", "Mango"]);
        assert_eq!(titles(&catalog.by_key("Orchard")), vec!["Apple", "Mango"]);
        assert_eq!(titles(&catalog.by_key("Fruit")), vec!["Apple", "Mango"]);
        assert_eq!(titles(&catalog.by_key("Rock")), vec!["Zebra"]);
        assert_eq!(catalog.by_key(ALL_KEY).len(), 3);
        assert_eq!(catalog.indexed().len(), 3);
        assert!(catalog.by_key("Jazz").is_empty());
    }

    #[test]
    fn test_song_under_shared_key_values_appears_once() {
        let mut catalog = CatalogService::default();
        let s = catalog.add_song(song("Same", "Same", "Same", "Same"));
        assert_eq!(catalog.by_key("Same"), vec![s.clone()]);
        assert_eq!(catalog.by_key(ALL_KEY), vec![s.clone()]);
        assert_eq!(catalog.indexed(), vec![s]);
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut catalog = CatalogService::default();
        let a = catalog.add_song(NewSong::titled("A"));
        catalog.remove_song(a.id);
        let b = catalog.add_song(NewSong::titled("B"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_mutation_is_visible_through_every_index() {
        let mut catalog = sample();
        let apple = catalog.search("apple")[0].id;
        assert_eq!(catalog.toggle_favorite(apple), Some(true));

        assert!(catalog.search("apple")[0].favorite);
        assert!(catalog.by_key("Pop")[0].favorite);
        assert!(catalog.sorted()[0].favorite);
        assert_eq!(titles(&catalog.favorites()), vec!["Apple"]);

        assert_eq!(catalog.toggle_favorite(apple), Some(false));
        assert!(catalog.favorites().is_empty());
        assert_eq!(catalog.toggle_favorite(SongId(999)), None);
    }

    #[test]
    fn test_next_plays_through_sequence_and_records_history() {
        let mut catalog = sample();
        assert_eq!(catalog.current().unwrap().title, "Zebra");
        assert_eq!(catalog.next().unwrap().title, "Apple");
        assert_eq!(catalog.next().unwrap().title, "Mango");
        let wrapped = catalog.next().unwrap();
        assert_eq!(wrapped.title, "Zebra");
        assert_eq!(wrapped.play_count, 1);
        assert_eq!(titles(&catalog.recently_played()), vec!["Apple", "Mango", "Zebra"]);
        assert_eq!(catalog.search("zebra")[0].play_count, 1);
    }

    #[test]
    fn test_queue_takes_priority_over_sequence() {
        let mut catalog = sample();
        let mango = catalog.search("mango")[0].id;
        assert_eq!(catalog.enqueue(mango), Some(1));
        assert_eq!(catalog.enqueue(SongId(404)), None);
        assert_eq!(catalog.peek_queue().unwrap().title, "Mango");

        assert_eq!(catalog.next().unwrap().title, "Mango");
        assert!(catalog.queue().is_empty());
        // Sequence cursor did not move while the queue was draining
        assert_eq!(catalog.current().unwrap().title, "Zebra");
        assert_eq!(catalog.next().unwrap().title, "Apple");
        assert_eq!(catalog.get(mango).unwrap().play_count, 1);
    }

    #[test]
    fn test_queue_management() {
        let mut catalog = sample();
        let all: Vec<SongId> = catalog.all().iter().map(|s| s.id).collect();
        for id in &all {
            catalog.enqueue(*id);
        }
        assert!(catalog.remove_from_queue(all[1]));
        assert!(!catalog.remove_from_queue(all[1]));
        assert_eq!(titles(&catalog.queue()), vec!["Zebra", "Mango"]);
        assert_eq!(catalog.dequeue().unwrap().title, "Zebra");
        // Dequeue is not a play
        assert!(catalog.recently_played().is_empty());
        catalog.clear_queue();
        assert!(catalog.queue().is_empty());
        assert!(catalog.dequeue().is_none());
    }

    #[test]
    fn test_previous_wraps_and_is_not_a_play() {
        let mut catalog = sample();
        assert_eq!(catalog.previous().unwrap().title, "Mango");
        assert_eq!(catalog.get(catalog.current().unwrap().id).unwrap().play_count, 0);
        assert!(catalog.recently_played().is_empty());
    }

    #[test]
    fn test_empty_catalog_is_quiet() {
        let mut catalog = CatalogService::default();
        assert!(catalog.is_empty());
        assert!(catalog.next().is_none());
        assert!(catalog.previous().is_none());
        assert!(catalog.current().is_none());
        assert!(catalog.search("x").is_empty());
        assert!(catalog.shuffle().is_empty());
        assert!(catalog.remove_song(SongId(1)).is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut catalog = CatalogService::new(CatalogSettings {
            history_limit: 2,
            ..Default::default()
        });
        catalog.add_song(NewSong::titled("One"));
        catalog.add_song(NewSong::titled("Two"));
        catalog.add_song(NewSong::titled("Three"));
        for _ in 0..4 {
            catalog.next();
        }
        // Plays: Two, Three, One, Two
        assert_eq!(titles(&catalog.recently_played()), vec!["One", "Two"]);
    }

    #[test]
    fn test_remove_song_clears_every_structure() {
        let mut catalog = sample();
        let apple = catalog.search("apple")[0].id;
        catalog.enqueue(apple);
        catalog.enqueue(apple);
        catalog.next(); // plays Apple from the queue
        catalog.next(); // and again

        let removed = catalog.remove_song(apple).unwrap();
        assert_eq!(removed.title, "Apple");
        assert!(catalog.get(apple).is_none());
        assert!(catalog.search("apple").is_empty());
        assert_eq!(titles(&catalog.sorted()), vec!["Mango", "Zebra"]);
        assert_eq!(titles(&catalog.by_key("Orchard")), vec!["Mango"]);
        assert_eq!(catalog.by_key(ALL_KEY).len(), 2);
        assert_eq!(titles(&catalog.all()), vec!["Zebra", "Mango"]);
        assert!(catalog.recently_played().is_empty());
        assert!(catalog.queue().is_empty());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_removing_current_restarts_from_head() {
        let mut catalog = sample();
        catalog.next(); // Apple
        let apple = catalog.current().unwrap().id;
        catalog.remove_song(apple);
        assert!(catalog.current().is_none());
        assert_eq!(catalog.next().unwrap().title, "Zebra");
    }

    #[test]
    fn test_update_song_rekeys_index() {
        let mut catalog = sample();
        let mango = catalog.search("mango")[0].id;
        let updated = catalog
            .update_song(mango, SongUpdate {
                genre: Some("Tropical".into()),
                artist: Some("Island".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.genre, "Tropical");
        assert_eq!(updated.album, "Fruit");

        assert_eq!(titles(&catalog.by_key("Tropical")), vec!["Mango"]);
        assert_eq!(titles(&catalog.by_key("Pop")), vec!["Apple"]);
        assert_eq!(titles(&catalog.by_key("Orchard")), vec!["Apple"]);
        assert_eq!(titles(&catalog.by_key("Fruit")), vec!["Apple", "Mango"]);
        assert_eq!(catalog.by_key(ALL_KEY).len(), 3);
        assert!(catalog.update_song(SongId(77), SongUpdate::default()).is_none());
    }

    #[test]
    fn test_shuffle_keeps_song_set_and_resets_cursor() {
        let mut catalog = sample();
        catalog.next();
        let shuffled = catalog.shuffle_with(&mut StdRng::seed_from_u64(3));
        let mut names = titles(&shuffled);
        names.sort();
        assert_eq!(names, vec!["Apple", "Mango", "Zebra"]);
        assert_eq!(catalog.current().unwrap().id, shuffled[0].id);
        // Ordered views are untouched
        assert_eq!(titles(&catalog.sorted()), vec!["Apple", "Mango", "Zebra"]);
    }

    #[test]
    fn test_shared_catalog_readers_see_consistent_state() {
        let shared = SharedCatalog::default();
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        shared.write(|c| {
                            c.add_song(NewSong::titled(format!("w{} song {}", w, i)));
                        });
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        shared.read(|c| {
                            let n = c.len();
                            assert_eq!(c.all().len(), n);
                            assert_eq!(c.sorted().len(), n);
                            assert_eq!(c.by_key(ALL_KEY).len(), n);
                        });
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
        assert_eq!(shared.read(|c| c.len()), 200);
        assert_eq!(shared.write(|c| c.next().map(|s| s.play_count)), Some(1));
    }
}
