use std::path::Path;

use chrono::Datelike;
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use thiserror::Error;

use crate::catalog::NewSong;
use crate::config::ImportDefaults;

/// Audio file extensions accepted by `add`.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// "01_Dark-Star" -> "01 Dark Star"
pub fn title_from_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let title = stem.replace(['_', '-'], " ").trim().to_string();
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

/// Build a song from an audio file's tags.
///
/// Missing tags fall back to `defaults`; a missing title to the file name
/// and a missing year to the current year. Files whose tags can't be parsed
/// are still imported on those fallbacks.
pub fn read_song(path: &Path, defaults: &ImportDefaults) -> Result<NewSong, ImportError> {
    if !is_supported(path) {
        return Err(ImportError::Unsupported(
            extension(path).unwrap_or_else(|| path.display().to_string()),
        ));
    }

    let file_size = std::fs::metadata(path)
        .map_err(|source| ImportError::Io {
            path: path.display().to_string(),
            source,
        })?
        .len();

    let mut song = NewSong {
        title: title_from_stem(path),
        artist: defaults.artist.clone(),
        genre: defaults.genre.clone(),
        album: defaults.album.clone(),
        year: chrono::Local::now().year(),
        duration_secs: 0.0,
        file_size,
        file_path: Some(path.display().to_string()),
    };

    let tagged_file = match lofty::read_from_path(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("Could not read tags from {}: {}", path.display(), e);
            return Ok(song);
        }
    };

    song.duration_secs = tagged_file.properties().duration().as_secs_f64();

    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return Ok(song);
    };

    let non_empty = |s: std::borrow::Cow<'_, str>| {
        let s = s.trim().to_string();
        (!s.is_empty()).then_some(s)
    };
    if let Some(title) = tag.title().and_then(non_empty) {
        song.title = title;
    }
    if let Some(artist) = tag.artist().and_then(non_empty) {
        song.artist = artist;
    }
    if let Some(genre) = tag.genre().and_then(non_empty) {
        song.genre = genre;
    }
    if let Some(album) = tag.album().and_then(non_empty) {
        song.album = album;
    }
    if let Some(year) = tag.year().filter(|y| *y > 0) {
        song.year = year as i32;
    }

    Ok(song)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_title_from_stem() {
        assert_eq!(title_from_stem(Path::new("/music/01_Dark-Star.flac")), "01 Dark Star");
        assert_eq!(title_from_stem(Path::new("Ripple.mp3")), "Ripple");
        assert_eq!(title_from_stem(Path::new("___.mp3")), "Untitled");
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("a.mp3")));
        assert!(is_supported(Path::new("a.FLAC")));
        assert!(!is_supported(Path::new("a.shn")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn test_unsupported_file_rejected() {
        let err = read_song(Path::new("notes.txt"), &ImportDefaults::default()).unwrap_err();
        assert!(matches!(err, ImportError::Unsupported(ext) if ext == "txt"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_song(
            Path::new("/definitely/not/here.mp3"),
            &ImportDefaults::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[test]
    fn test_untagged_file_uses_fallbacks() {
        let path: PathBuf = std::env::temp_dir()
            .join(format!("jukebox-import-{}_Not-Fade-Away.mp3", std::process::id()));
        std::fs::write(&path, b"not really audio").unwrap();

        let defaults = ImportDefaults {
            artist: "Various".to_string(),
            ..Default::default()
        };
        let song = read_song(&path, &defaults).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(song.title.ends_with("Not Fade Away"));
        assert_eq!(song.artist, "Various");
        assert_eq!(song.genre, "Unknown Genre");
        assert_eq!(song.file_size, 16);
        assert_eq!(song.year, chrono::Local::now().year());
        assert_eq!(song.file_path.as_deref(), Some(path.display().to_string().as_str()));
    }
}
