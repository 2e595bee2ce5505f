use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::catalog::CatalogSettings;
use crate::catalog::multikey::DEFAULT_BUCKETS;
use crate::catalog::queue::DEFAULT_HISTORY_LIMIT;

/// Application configuration loaded from TOML config file.
/// Every field has a default; the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Custom database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// How many plays "recently played" keeps.
    pub history_limit: usize,
    /// Bucket count of the genre/artist/album index. Fixed for the lifetime
    /// of a catalog.
    pub hash_buckets: usize,
    /// Fallbacks for imported files without tags.
    pub defaults: ImportDefaults,
}

/// Metadata used when an imported file carries no tag for a field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportDefaults {
    pub artist: String,
    pub genre: String,
    pub album: String,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            artist: "Unknown Artist".to_string(),
            genre: "Unknown Genre".to_string(),
            album: "Unknown Album".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            hash_buckets: DEFAULT_BUCKETS,
            defaults: ImportDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/jukebox/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Sizing for the in-memory catalog. A zero bucket count falls back to the default.
    pub fn catalog_settings(&self) -> CatalogSettings {
        let hash_buckets = if self.hash_buckets > 0 {
            self.hash_buckets
        } else {
            log::warn!("hash_buckets must be positive; using {}", DEFAULT_BUCKETS);
            DEFAULT_BUCKETS
        };
        CatalogSettings {
            history_limit: self.history_limit,
            hash_buckets,
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default database path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("jukebox.db")
    } else {
        // Fallback: current directory
        PathBuf::from("jukebox.db")
    }
}
