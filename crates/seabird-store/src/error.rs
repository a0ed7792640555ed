use std::fmt;
use std::path::{Path, PathBuf};

use seabird_core::AllocError;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    GeoJson(geojson::Error),
    Json(serde_json::Error),
    Config(toml::de::Error),
    Io { path: PathBuf, source: std::io::Error },
    Alloc(AllocError),
    InvalidData(String),
}

impl StoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Csv(e) => write!(f, "CSV error: {e}"),
            StoreError::GeoJson(e) => write!(f, "GeoJSON error: {e}"),
            StoreError::Json(e) => write!(f, "JSON error: {e}"),
            StoreError::Config(e) => write!(f, "invalid config: {e}"),
            StoreError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            StoreError::Alloc(e) => write!(f, "{e}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Csv(e)
    }
}

impl From<geojson::Error> for StoreError {
    fn from(e: geojson::Error) -> Self {
        StoreError::GeoJson(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(e: toml::de::Error) -> Self {
        StoreError::Config(e)
    }
}

impl From<AllocError> for StoreError {
    fn from(e: AllocError) -> Self {
        StoreError::Alloc(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
