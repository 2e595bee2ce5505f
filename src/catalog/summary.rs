use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::Serialize;

use super::CatalogService;
use super::song::{Song, SongId};

/// Library-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_songs: usize,
    pub total_duration_secs: f64,
    pub total_size_bytes: u64,
    pub favorite_count: usize,
    pub total_plays: u64,
    pub genres: BTreeMap<String, usize>,
    pub artists: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreSummary {
    pub name: String,
    pub count: usize,
    /// `#rrggbb` display colour, picked at random on each call.
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSummary {
    pub name: String,
    pub count: usize,
    pub song_ids: Vec<SongId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumSummary {
    pub name: String,
    /// Artist and year of the first song seen on the album.
    pub artist: String,
    pub year: i32,
    pub songs: Vec<Song>,
}

/// A random `#rrggbb` colour.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06x}", rng.gen_range(0..0x100_0000u32))
}

/// Group songs by `name_of`, keeping groups in first-seen order.
fn group_by<'a, F>(songs: &'a [Song], name_of: F) -> Vec<(&'a str, Vec<&'a Song>)>
where
    F: Fn(&'a Song) -> &'a str,
{
    let mut groups: Vec<(&str, Vec<&Song>)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for song in songs {
        let name = name_of(song);
        match position.get(name) {
            Some(&i) => groups[i].1.push(song),
            None => {
                position.insert(name, groups.len());
                groups.push((name, vec![song]));
            }
        }
    }
    groups
}

impl CatalogService {
    pub fn stats(&self) -> CatalogStats {
        let songs = self.all();
        let mut genres = BTreeMap::new();
        let mut artists = BTreeMap::new();
        for song in &songs {
            *genres.entry(song.genre.clone()).or_insert(0) += 1;
            *artists.entry(song.artist.clone()).or_insert(0) += 1;
        }

        CatalogStats {
            total_songs: songs.len(),
            total_duration_secs: songs.iter().map(|s| s.duration_secs).sum(),
            total_size_bytes: songs.iter().map(|s| s.file_size).sum(),
            favorite_count: songs.iter().filter(|s| s.favorite).count(),
            total_plays: songs.iter().map(|s| s.play_count).sum(),
            genres,
            artists,
        }
    }

    pub fn genres(&self) -> Vec<GenreSummary> {
        self.genres_with(&mut rand::thread_rng())
    }

    /// Genres with song counts, in order of first appearance in the playlist.
    pub fn genres_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<GenreSummary> {
        let songs = self.all();
        group_by(&songs, |s| s.genre.as_str())
            .into_iter()
            .map(|(name, members)| GenreSummary {
                name: name.to_string(),
                count: members.len(),
                color: random_color(rng),
            })
            .collect()
    }

    pub fn artists(&self) -> Vec<ArtistSummary> {
        let songs = self.all();
        group_by(&songs, |s| s.artist.as_str())
            .into_iter()
            .map(|(name, members)| ArtistSummary {
                name: name.to_string(),
                count: members.len(),
                song_ids: members.iter().map(|s| s.id).collect(),
            })
            .collect()
    }

    pub fn albums(&self) -> Vec<AlbumSummary> {
        let songs = self.all();
        group_by(&songs, |s| s.album.as_str())
            .into_iter()
            .map(|(name, members)| AlbumSummary {
                name: name.to_string(),
                artist: members[0].artist.clone(),
                year: members[0].year,
                songs: members.into_iter().cloned().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewSong;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn song(title: &str, artist: &str, genre: &str, album: &str, secs: f64) -> NewSong {
        NewSong {
            title: title.into(),
            artist: artist.into(),
            genre: genre.into(),
            album: album.into(),
            year: 1972,
            duration_secs: secs,
            file_size: 100,
            file_path: None,
        }
    }

    fn catalog() -> CatalogService {
        let mut c = CatalogService::default();
        c.add_song(song("Jack Straw", "Grateful Dead", "Rock", "Europe '72", 290.0));
        c.add_song(song("Harpua", "Phish", "Jam", "Junta", 600.0));
        c.add_song(song("Tennessee Jed", "Grateful Dead", "Rock", "Europe '72", 430.0));
        c.add_song(song("Stash", "Phish", "Jam", "A Picture of Nectar", 500.0));
        c
    }

    #[test]
    fn test_stats_totals() {
        let mut c = catalog();
        let id = c.search("harpua")[0].id;
        c.toggle_favorite(id);
        c.next();

        let stats = c.stats();
        assert_eq!(stats.total_songs, 4);
        assert!((stats.total_duration_secs - 1820.0).abs() < 1e-9);
        assert_eq!(stats.total_size_bytes, 400);
        assert_eq!(stats.favorite_count, 1);
        assert_eq!(stats.total_plays, 1);
        assert_eq!(stats.genres["Rock"], 2);
        assert_eq!(stats.artists["Phish"], 2);
    }

    #[test]
    fn test_genres_in_first_seen_order() {
        let genres = catalog().genres();
        let counts: Vec<(&str, usize)> = genres.iter().map(|g| (g.name.as_str(), g.count)).collect();
        assert_eq!(counts, vec![("Rock", 2), ("Jam", 2)]);
    }

    #[test]
    fn test_genres_carry_a_colour() {
        let c = catalog();
        let genres = c.genres_with(&mut StdRng::seed_from_u64(9));
        for g in &genres {
            assert_eq!(g.color.len(), 7);
            assert!(g.color.starts_with('#'));
            assert!(g.color[1..].chars().all(|ch| ch.is_ascii_hexdigit()));
        }
        assert_eq!(genres, c.genres_with(&mut StdRng::seed_from_u64(9)));
    }

    #[test]
    fn test_artists_list_song_ids() {
        let artists = catalog().artists();
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].name, "Grateful Dead");
        assert_eq!(artists[0].song_ids, vec![SongId(1), SongId(3)]);
        assert_eq!(artists[1].song_ids, vec![SongId(2), SongId(4)]);
    }

    #[test]
    fn test_albums_group_songs() {
        let albums = catalog().albums();
        let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Europe '72", "Junta", "A Picture of Nectar"]);
        assert_eq!(albums[0].songs.len(), 2);
        assert_eq!(albums[0].artist, "Grateful Dead");
        assert_eq!(albums[0].year, 1972);
    }

    #[test]
    fn test_empty_summaries() {
        let c = CatalogService::default();
        assert_eq!(c.stats().total_songs, 0);
        assert!(c.genres().is_empty());
        assert!(c.artists().is_empty());
        assert!(c.albums().is_empty());
    }
}
