//! Error types for the Diario core library.

use thiserror::Error;

/// All errors that can occur within the Diario core library.
#[derive(Debug, Error)]
pub enum JournalError {
    /// A SQLite operation on the entry store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// An I/O operation on the data directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record is not a well-formed entry document.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A stored record could not be decrypted with the current key.
    #[error("Decrypt error: {0}")]
    Decrypt(String),

    /// Input was rejected by strict validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The configured key-derivation parameters are unusable.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// The data directory holds a file that cannot be used (e.g. a truncated salt).
    #[error("Invalid data directory: {0}")]
    InvalidDataDir(String),

    /// The supplied current password does not match the active key.
    #[error("Wrong password for this journal")]
    WrongPassword,

    /// JSON serialization of a record or the configuration failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`JournalError`].
pub type Result<T> = std::result::Result<T, JournalError>;

impl JournalError {
    /// Returns `true` for failures of the underlying store file or directory.
    ///
    /// These are fatal to the triggering call and are surfaced to the user.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_) | Self::InvalidDataDir(_))
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(e) => format!("Failed to save: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Decode(_) => "This entry is damaged and cannot be shown".to_string(),
            Self::Decrypt(_) => "This entry cannot be unlocked with the current password".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::KeyDerivation(e) => format!("Encryption settings are invalid: {e}"),
            Self::InvalidDataDir(msg) => format!("Could not open journal: {msg}"),
            Self::WrongPassword => "Wrong password, please try again".to_string(),
            Self::Json(e) => format!("Settings format error: {e}"),
        }
    }
}
