pub mod catalog;
pub mod config;
pub mod db;
pub mod import;

/// Application name for XDG paths
pub const APP_NAME: &str = "jukebox";
