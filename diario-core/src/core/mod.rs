//! Internal domain modules for the Diario core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod cache;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod journal;
pub mod query;
pub mod storage;

#[doc(inline)]
pub use cache::EntryCache;
#[doc(inline)]
pub use config::{default_data_dir, JournalConfig, KdfParams};
#[doc(inline)]
pub use crypto::{EntryKey, Session};
#[doc(inline)]
pub use entry::{
    normalize_tags, parse_tag_list, Entry, EntryDraft, EntryPatch, Location, MediaAttachment,
    MediaKind, Mood,
};
#[doc(inline)]
pub use error::{JournalError, Result};
#[doc(inline)]
pub use journal::{Journal, Lookup};
#[doc(inline)]
pub use query::{MoodHistogram, SearchQuery};
#[doc(inline)]
pub use storage::Storage;
