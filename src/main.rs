use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jukebox::catalog::{CatalogService, NewSong, Song, SongId, SongUpdate};
use jukebox::db::Database;
use jukebox::db::models::{Playlist, PlaylistAdd};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jukebox", version, about = "Music catalog: browse, search, queue and play back a song library")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import audio files, reading their tags
    Add {
        /// Files to import (mp3, wav, ogg, m4a, flac)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Override the artist for every file
        #[arg(long)]
        artist: Option<String>,

        /// Override the genre for every file
        #[arg(long)]
        genre: Option<String>,

        /// Override the album for every file
        #[arg(long)]
        album: Option<String>,

        /// Override the release year for every file
        #[arg(long)]
        year: Option<i32>,
    },

    /// Add a song without an audio file
    AddManual {
        #[arg(long)]
        title: String,

        #[arg(long)]
        artist: Option<String>,

        #[arg(long)]
        genre: Option<String>,

        #[arg(long)]
        album: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Remove a song from the catalog
    Remove { id: u64 },

    /// List every song in playback order
    List {
        /// Alphabetical by title instead
        #[arg(long)]
        sorted: bool,
    },

    /// Find songs whose title contains a term (case-insensitive)
    Search { term: String },

    /// Songs whose title starts with a letter in [start, end]
    Range { start: char, end: char },

    /// Songs filed under a genre, artist, album or "all"
    By { key: String },

    /// Toggle a song's favorite flag
    Favorite { id: u64 },

    /// List favorite songs
    Favorites,

    /// Change a song's metadata (the title is fixed)
    Update {
        id: u64,

        #[arg(long)]
        artist: Option<String>,

        #[arg(long)]
        genre: Option<String>,

        #[arg(long)]
        album: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Show the song under the playback cursor
    Current,

    /// Play the next song (queued songs first)
    Next,

    /// Step the playback cursor back
    Prev,

    /// Shuffle the playback order
    Shuffle,

    /// Manage the up-next queue (shows it by default)
    Queue {
        #[command(subcommand)]
        action: Option<QueueAction>,
    },

    /// Recently played songs, oldest first
    Recent,

    /// Show library statistics
    Stats,

    /// Songs per genre
    Genres,

    /// Songs per artist
    Artists,

    /// Albums with their songs
    Albums,

    /// Manage named playlists
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// Queue a song to play next
    Add { id: u64 },
    /// Drop a song from the queue
    Remove { id: u64 },
    /// Empty the queue
    Clear,
    /// Pop the head of the queue without playing it
    Next,
    /// Show the queue
    Show,
}

#[derive(Subcommand)]
enum PlaylistAction {
    /// Create an empty playlist
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List playlists
    List,
    /// Show a playlist's songs
    Show { id: i64 },
    /// Add a song to a playlist
    Add { id: i64, song: u64 },
    /// Remove a song from a playlist
    Remove { id: i64, song: u64 },
    /// Delete a playlist
    Delete { id: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = jukebox::config::AppConfig::load();

    // Resolve database path: CLI > config > XDG default
    let db_path = cli.db_path
        .or(config.db_path.clone())
        .unwrap_or_else(jukebox::config::default_db_path);
    log::info!("Database: {}", db_path.display());

    let db = Database::open(&db_path).context("Failed to open database")?;

    let settings = config.catalog_settings();
    let mut catalog = match db.load_snapshot().context("Failed to load catalog")? {
        Some(snapshot) => CatalogService::from_snapshot(snapshot, settings)
            .context("Saved catalog is inconsistent")?,
        None => CatalogService::new(settings),
    };

    let out = Output { json: cli.json };
    let mutated = run(cli.command, &mut catalog, &db, &config, &out)?;

    if mutated {
        db.save_snapshot(&catalog.snapshot())
            .context("Failed to save catalog")?;
    }

    Ok(())
}

/// Run one command. Returns whether catalog state changed and needs saving.
fn run(
    command: Commands,
    catalog: &mut CatalogService,
    db: &Database,
    config: &jukebox::config::AppConfig,
    out: &Output,
) -> Result<bool> {
    match command {
        Commands::Add { files, artist, genre, album, year } => {
            let mut added = Vec::new();
            let mut errors = 0usize;
            for path in &files {
                let mut new = match jukebox::import::read_song(path, &config.defaults) {
                    Ok(new) => new,
                    Err(e) => {
                        log::warn!("Skipping {}: {}", path.display(), e);
                        errors += 1;
                        continue;
                    }
                };
                if let Some(a) = &artist {
                    new.artist = a.clone();
                }
                if let Some(g) = &genre {
                    new.genre = g.clone();
                }
                if let Some(a) = &album {
                    new.album = a.clone();
                }
                if let Some(y) = year {
                    new.year = y;
                }
                added.push(catalog.add_song(new));
            }

            if out.json {
                out.print_json(&added)?;
            } else {
                println!("Import complete: {} added, {} errors", added.len(), errors);
                for song in &added {
                    println!("  [{}] {}", song.id, song.title);
                }
            }
            if added.is_empty() && errors > 0 {
                anyhow::bail!("No files could be imported");
            }
            Ok(!added.is_empty())
        }

        Commands::AddManual { title, artist, genre, album, year, duration } => {
            if title.trim().is_empty() {
                anyhow::bail!("Title must not be empty");
            }
            let mut new = NewSong::titled(title.trim());
            new.artist = artist.unwrap_or_else(|| config.defaults.artist.clone());
            new.genre = genre.unwrap_or_else(|| config.defaults.genre.clone());
            new.album = album.unwrap_or_else(|| config.defaults.album.clone());
            if let Some(y) = year {
                new.year = y;
            }
            if let Some(d) = duration {
                new.duration_secs = d;
            }
            let song = catalog.add_song(new);
            out.song(&song, "Added")?;
            Ok(true)
        }

        Commands::Remove { id } => {
            let song = catalog
                .remove_song(SongId(id))
                .with_context(|| format!("No song with id {}", id))?;
            out.song(&song, "Removed")?;
            Ok(true)
        }

        Commands::List { sorted } => {
            let songs = if sorted { catalog.sorted() } else { catalog.all() };
            out.songs(&songs)?;
            Ok(false)
        }

        Commands::Search { term } => {
            out.songs(&catalog.search(&term))?;
            Ok(false)
        }

        Commands::Range { start, end } => {
            out.songs(&catalog.range(start, end))?;
            Ok(false)
        }

        Commands::By { key } => {
            out.songs(&catalog.by_key(&key))?;
            Ok(false)
        }

        Commands::Favorite { id } => {
            let favorite = catalog
                .toggle_favorite(SongId(id))
                .with_context(|| format!("No song with id {}", id))?;
            if out.json {
                out.print_json(&catalog.get(SongId(id)))?;
            } else if favorite {
                println!("Song {} marked as favorite", id);
            } else {
                println!("Song {} is no longer a favorite", id);
            }
            Ok(true)
        }

        Commands::Favorites => {
            out.songs(&catalog.favorites())?;
            Ok(false)
        }

        Commands::Update { id, artist, genre, album, year, duration } => {
            let update = SongUpdate {
                artist,
                genre,
                album,
                year,
                duration_secs: duration,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update. Pass --artist, --genre, --album, --year or --duration.");
            }
            let song = catalog
                .update_song(SongId(id), update)
                .with_context(|| format!("No song with id {}", id))?;
            out.song(&song, "Updated")?;
            Ok(true)
        }

        Commands::Current => {
            out.maybe_song(catalog.current().as_ref(), "Now playing", "Nothing is playing.")?;
            Ok(false)
        }

        Commands::Next => {
            let song = catalog.next();
            out.maybe_song(song.as_ref(), "Now playing", "The catalog is empty.")?;
            Ok(song.is_some())
        }

        Commands::Prev => {
            let song = catalog.previous();
            out.maybe_song(song.as_ref(), "Now playing", "The catalog is empty.")?;
            Ok(song.is_some())
        }

        Commands::Shuffle => {
            let songs = catalog.shuffle();
            out.songs(&songs)?;
            Ok(!songs.is_empty())
        }

        Commands::Queue { action } => match action.unwrap_or(QueueAction::Show) {
            QueueAction::Add { id } => {
                let len = catalog
                    .enqueue(SongId(id))
                    .with_context(|| format!("No song with id {}", id))?;
                if out.json {
                    out.print_json(&catalog.queue())?;
                } else {
                    println!("Queued song {} ({} in queue)", id, len);
                }
                Ok(true)
            }
            QueueAction::Remove { id } => {
                if !catalog.remove_from_queue(SongId(id)) {
                    anyhow::bail!("Song {} is not queued", id);
                }
                if out.json {
                    out.print_json(&catalog.queue())?;
                } else {
                    println!("Removed song {} from the queue", id);
                }
                Ok(true)
            }
            QueueAction::Clear => {
                catalog.clear_queue();
                if !out.json {
                    println!("Queue cleared");
                }
                Ok(true)
            }
            QueueAction::Next => {
                let song = catalog.dequeue();
                out.maybe_song(song.as_ref(), "Dequeued", "The queue is empty.")?;
                Ok(song.is_some())
            }
            QueueAction::Show => {
                out.songs(&catalog.queue())?;
                Ok(false)
            }
        },

        Commands::Recent => {
            out.songs(&catalog.recently_played())?;
            Ok(false)
        }

        Commands::Stats => {
            let stats = catalog.stats();
            if out.json {
                out.print_json(&stats)?;
                return Ok(false);
            }
            println!("Library Statistics");
            println!("==================");
            println!("Total songs:      {}", stats.total_songs);
            println!("Total duration:   {:.1} hours", stats.total_duration_secs / 3600.0);
            println!("Total size:       {:.1} MB", stats.total_size_bytes as f64 / 1_048_576.0);
            println!("Favorites:        {}", stats.favorite_count);
            println!("Total plays:      {}", stats.total_plays);
            println!("Playlists:        {}", db.playlist_count()?);
            println!();

            if !stats.genres.is_empty() {
                println!("Genres:");
                for (genre, count) in &stats.genres {
                    println!("  {:<30} {}", genre, count);
                }
                println!();
            }

            if !stats.artists.is_empty() {
                println!("Artists:");
                for (artist, count) in &stats.artists {
                    println!("  {:<30} {}", artist, count);
                }
            }
            Ok(false)
        }

        Commands::Genres => {
            let genres = catalog.genres();
            if out.json {
                out.print_json(&genres)?;
            } else {
                for g in &genres {
                    println!("{:<30} {:>5}  {}", g.name, g.count, g.color);
                }
            }
            Ok(false)
        }

        Commands::Artists => {
            let artists = catalog.artists();
            if out.json {
                out.print_json(&artists)?;
            } else {
                for a in &artists {
                    println!("{:<30} {}", a.name, a.count);
                }
            }
            Ok(false)
        }

        Commands::Albums => {
            let albums = catalog.albums();
            if out.json {
                out.print_json(&albums)?;
            } else {
                for a in &albums {
                    println!("{} - {} ({})", a.name, a.artist, a.year);
                    for song in &a.songs {
                        println!("  [{}] {}", song.id, song.title);
                    }
                }
            }
            Ok(false)
        }

        Commands::Playlist { action } => {
            run_playlist(action, catalog, db, out)?;
            Ok(false)
        }
    }
}

/// Playlists live only in the database, so these never touch the snapshot.
fn run_playlist(
    action: PlaylistAction,
    catalog: &CatalogService,
    db: &Database,
    out: &Output,
) -> Result<()> {
    match action {
        PlaylistAction::Create { name, description } => {
            let playlist = db
                .create_playlist(&name, &description)
                .context("Failed to create playlist")?;
            if out.json {
                out.print_json(&playlist)?;
            } else {
                println!("Created playlist {} \"{}\" ({})", playlist.id, playlist.name, playlist.cover_color);
            }
        }
        PlaylistAction::List => {
            let playlists = db.list_playlists().context("Query failed")?;
            if out.json {
                out.print_json(&playlists)?;
            } else if playlists.is_empty() {
                println!("No playlists.");
            } else {
                println!("{:>4}  {:<30} {:>5}  {}", "ID", "Name", "Songs", "Created");
                println!("{}", "-".repeat(60));
                for p in &playlists {
                    println!("{:>4}  {:<30} {:>5}  {}", p.id, truncate(&p.name, 30), p.songs.len(), p.created_at);
                }
            }
        }
        PlaylistAction::Show { id } => {
            let playlist = db
                .get_playlist(id)
                .context("Query failed")?
                .with_context(|| format!("No playlist with id {}", id))?;
            print_playlist(&playlist, catalog, out)?;
        }
        PlaylistAction::Add { id, song } => {
            if !catalog.contains(SongId(song)) {
                anyhow::bail!("No song with id {}", song);
            }
            match db.add_to_playlist(id, SongId(song)).context("Failed to update playlist")? {
                PlaylistAdd::Added => println!("Added song {} to playlist {}", song, id),
                PlaylistAdd::AlreadyPresent => println!("Song {} is already in playlist {}", song, id),
                PlaylistAdd::NoSuchPlaylist => anyhow::bail!("No playlist with id {}", id),
            }
        }
        PlaylistAction::Remove { id, song } => {
            match db.remove_from_playlist(id, SongId(song)).context("Failed to update playlist")? {
                Some(true) => println!("Removed song {} from playlist {}", song, id),
                Some(false) => println!("Song {} is not in playlist {}", song, id),
                None => anyhow::bail!("No playlist with id {}", id),
            }
        }
        PlaylistAction::Delete { id } => {
            if !db.delete_playlist(id).context("Failed to delete playlist")? {
                anyhow::bail!("No playlist with id {}", id);
            }
            println!("Deleted playlist {}", id);
        }
    }
    Ok(())
}

fn print_playlist(playlist: &Playlist, catalog: &CatalogService, out: &Output) -> Result<()> {
    let songs: Vec<Song> = playlist
        .songs
        .iter()
        .filter_map(|id| catalog.get(*id))
        .collect();
    if out.json {
        #[derive(Serialize)]
        struct PlaylistView<'a> {
            #[serde(flatten)]
            playlist: &'a Playlist,
            tracks: &'a [Song],
        }
        return out.print_json(&PlaylistView { playlist, tracks: &songs });
    }
    println!("{} ({})", playlist.name, playlist.cover_color);
    if !playlist.description.is_empty() {
        println!("{}", playlist.description);
    }
    println!();
    out.songs(&songs)
}

/// Human-readable or JSON rendering of command results.
struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn song(&self, song: &Song, label: &str) -> Result<()> {
        if self.json {
            return self.print_json(song);
        }
        println!("{}: [{}] {} - {}", label, song.id, song.title, song.artist);
        Ok(())
    }

    fn maybe_song(&self, song: Option<&Song>, label: &str, empty: &str) -> Result<()> {
        match song {
            Some(s) => self.song(s, label),
            None if self.json => self.print_json(&song),
            None => {
                println!("{}", empty);
                Ok(())
            }
        }
    }

    /// Print a table of songs.
    fn songs(&self, songs: &[Song]) -> Result<()> {
        if self.json {
            return self.print_json(songs);
        }
        if songs.is_empty() {
            println!("No songs.");
            return Ok(());
        }

        println!(
            "{:>4}  {:<30} {:<20} {:<15} {:>4} {:>6} {:>5} {:>3}",
            "ID", "Title", "Artist", "Genre", "Year", "Time", "Plays", "Fav"
        );
        println!("{}", "-".repeat(97));
        for s in songs {
            println!(
                "{:>4}  {:<30} {:<20} {:<15} {:>4} {:>6} {:>5} {:>3}",
                s.id,
                truncate(&s.title, 30),
                truncate(&s.artist, 20),
                truncate(&s.genre, 15),
                s.year,
                format_duration(s.duration_secs),
                s.play_count,
                if s.favorite { "*" } else { "" },
            );
        }
        Ok(())
    }
}

/// Truncate to `width` characters, marking the cut with "...".
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

/// Seconds as m:ss.
fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
