//! Journal configuration: where the data directory lives and how keys are derived.
//!
//! Configuration is stored as camelCase JSON. A missing or unreadable file is
//! not an error; defaults are used instead.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Default file name of the entry store inside the data directory.
pub const DEFAULT_STORE_FILE: &str = "diary.sqlite";

/// Default file name of the persisted salt inside the data directory.
pub const DEFAULT_SALT_FILE: &str = "salt.bin";

/// Argon2id cost parameters used to turn a password into an entry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes over memory.
    pub iterations: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self { memory_kib: 19 * 1024, iterations: 3, parallelism: 1 }
    }
}

/// Everything needed to open a [`Journal`](super::journal::Journal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalConfig {
    /// Directory holding the store file and the salt file.
    pub data_dir: PathBuf,
    pub store_file: String,
    pub salt_file: String,
    pub kdf: KdfParams,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

impl JournalConfig {
    /// Default settings rooted at `data_dir`.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            store_file: DEFAULT_STORE_FILE.to_string(),
            salt_file: DEFAULT_SALT_FILE.to_string(),
            kdf: KdfParams::default(),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    pub fn salt_path(&self) -> PathBuf {
        self.data_dir.join(&self.salt_file)
    }

    /// Loads configuration from `path`; returns defaults if the file is missing or corrupt.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path.as_ref()) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!(
                    "Ignoring unreadable config {}: {e}",
                    path.as_ref().display()
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Writes configuration to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::Io`] if the directory or file cannot be
    /// written, or [`crate::JournalError::Json`] if serialization fails.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Returns the default data directory: `~/.diario/data`.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".diario")
        .join("data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        let config = JournalConfig::with_data_dir("/tmp/journal");
        assert_eq!(config.store_path(), PathBuf::from("/tmp/journal/diary.sqlite"));
        assert_eq!(config.salt_path(), PathBuf::from("/tmp/journal/salt.bin"));
        assert!(default_data_dir().ends_with(".diario/data"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = JournalConfig::with_data_dir(dir.path());
        config.kdf.iterations = 5;
        config.save_to(&path).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"dataDir\""));
        assert!(json.contains("\"memoryKib\""));

        assert_eq!(JournalConfig::load_from(&path), config);
    }

    #[test]
    fn test_load_missing_or_corrupt_returns_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            JournalConfig::load_from(dir.path().join("absent.json")),
            JournalConfig::default()
        );
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(JournalConfig::load_from(&path), JournalConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{"storeFile":"other.sqlite"}"#).unwrap();
        let config = JournalConfig::load_from(&path);
        assert_eq!(config.store_file, "other.sqlite");
        assert_eq!(config.salt_file, DEFAULT_SALT_FILE);
        assert_eq!(config.kdf, KdfParams::default());
    }
}
