//! Theme preference and the stores it is persisted in.
//!
//! The preference is a single string entry under [`THEME_KEY`]. Stores are a
//! trait so the controller can be driven against an in-memory map in tests
//! and against a JSON file in the CLI. A store that fails is never fatal to
//! the caller: see [`load_theme`] and [`save_theme`].

use crate::error::PaperMindError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Key the theme preference is stored under.
pub const THEME_KEY: &str = "theme";

/// Light or dark page theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Label of the toggle button while this theme is applied: it names the
    /// theme a click would switch to.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Theme::Dark => "Light mode",
            Theme::Light => "Dark mode",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// String-keyed persistent storage.
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PaperMindError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PaperMindError>;
}

/// Read the stored theme, falling back to [`Theme::Dark`].
///
/// Read failures and unrecognised values are logged and treated as absent.
pub fn load_theme(store: &dyn PreferenceStore) -> Theme {
    match store.get(THEME_KEY) {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
            warn!("Ignoring stored theme: {e}");
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(e) => {
            warn!("Theme preference unavailable, using default: {e}");
            Theme::default()
        }
    }
}

/// Persist `theme`; a failing store is logged and otherwise ignored.
pub fn save_theme(store: &mut dyn PreferenceStore, theme: Theme) {
    if let Err(e) = store.set(THEME_KEY, theme.as_str()) {
        warn!("Could not persist theme '{theme}': {e}");
    }
}

/// Volatile store, lost when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PaperMindError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PaperMindError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, one string value per key.
///
/// Every call goes back to the file, so two processes sharing it see each
/// other's writes. Writes replace the file atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, detail: impl fmt::Display) -> PaperMindError {
        PaperMindError::Storage {
            path: self.path.clone(),
            detail: detail.to_string(),
        }
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, PaperMindError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.storage_error(e)),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| self.storage_error(e))
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PaperMindError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PaperMindError> {
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            warn!("Replacing unreadable preference file: {e}");
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.storage_error(e))?;

        let json = serde_json::to_vec_pretty(&entries).map_err(|e| self.storage_error(e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.storage_error(e))?;
        tmp.write_all(&json).map_err(|e| self.storage_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.storage_error(e.error))?;

        debug!("Stored {key}={value} in {}", self.path.display());
        Ok(())
    }
}
