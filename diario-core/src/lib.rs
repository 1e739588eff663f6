//! Core library for Diario, a local-first personal journal.
//!
//! The primary entry point is [`Journal`], which represents an open data
//! directory holding the entry store and, once a password has been set, the
//! key-derivation salt. All entry reads and writes go through `Journal` methods.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    cache::EntryCache,
    config::{default_data_dir, JournalConfig, KdfParams, DEFAULT_SALT_FILE, DEFAULT_STORE_FILE},
    crypto::{EntryKey, Session},
    entry::{
        normalize_tags, parse_tag_list, Entry, EntryDraft, EntryPatch, Location, MediaAttachment,
        MediaKind, Mood,
    },
    error::{JournalError, Result},
    journal::{Journal, Lookup},
    query::{MoodHistogram, SearchQuery},
    storage::Storage,
};
