//! High-level journal operations over an entry store.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::codec;
use super::entry::{dedup_media, normalize_tags};
use super::query::{on_calendar_day, within_range};
use crate::{
    Entry, EntryCache, EntryDraft, EntryPatch, JournalConfig, JournalError, MediaKind,
    MoodHistogram, Result, SearchQuery, Session, Storage,
};

/// The outcome of reading one entry.
///
/// `get` collapses this to an `Option`; `lookup` keeps the distinction between
/// an id that was never stored and a record that exists but cannot be read.
#[derive(Debug)]
pub enum Lookup {
    Found(Entry),
    /// The record exists but could not be decoded or decrypted.
    Unreadable(JournalError),
    Absent,
}

impl Lookup {
    pub fn into_entry(self) -> Option<Entry> {
        match self {
            Lookup::Found(entry) => Some(entry),
            Lookup::Unreadable(_) | Lookup::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self, Lookup::Unreadable(_))
    }
}

/// An open journal: the entry store, its cache and the active key session.
///
/// `Journal` is the only type collaborators need. It is `Send + Sync`; all
/// state sits behind a single mutex, so compound operations such as
/// read-modify-write updates and password rotation never interleave.
pub struct Journal {
    config: JournalConfig,
    state: Mutex<JournalState>,
}

struct JournalState {
    storage: Storage,
    cache: EntryCache,
    session: Session,
}

impl Journal {
    /// Opens (or creates) the journal described by `config`.
    ///
    /// An empty `password` opens the journal without encryption.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if the data directory cannot be created,
    /// [`JournalError::Storage`] if the store file is unusable,
    /// [`JournalError::InvalidDataDir`] for a malformed salt file, or
    /// [`JournalError::KeyDerivation`] for unusable KDF parameters.
    pub fn open(config: JournalConfig, password: &str) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let storage = Storage::open(config.store_path())?;
        let session = Session::unlock(password, &config.salt_path(), &config.kdf)?;

        log::info!(
            "Opened journal at {} ({} entries, encryption {})",
            config.data_dir.display(),
            storage.len()?,
            if session.is_encrypted() { "on" } else { "off" }
        );

        Ok(Self {
            config,
            state: Mutex::new(JournalState { storage, cache: EntryCache::new(), session }),
        })
    }

    /// Opens the journal in `data_dir` with default settings.
    pub fn open_in<P: Into<PathBuf>>(data_dir: P, password: &str) -> Result<Self> {
        Self::open(JournalConfig::with_data_dir(data_dir), password)
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Whether entries are currently written encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.lock().session.is_encrypted()
    }

    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates and persists a new entry, returning its id.
    ///
    /// Moods outside `1..=5` are stored as 3 and repeated tags are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Storage`] if the write fails.
    pub fn create(&self, draft: EntryDraft) -> Result<String> {
        let entry = Entry::new(draft);
        self.lock().persist(&entry)?;
        log::info!("Created entry {}", entry.id);
        Ok(entry.id)
    }

    /// Like [`create`](Self::create), but rejects input that `create` would correct.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Validation`] for an out-of-range mood, a blank or
    /// repeated tag, or a repeated media id.
    pub fn create_strict(&self, draft: EntryDraft) -> Result<String> {
        draft.validate_strict()?;
        self.create(draft)
    }

    /// Upserts an in-memory entry and returns the stored copy.
    ///
    /// `updated_at` is refreshed. An entry with an empty id is given a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Storage`] if the write fails.
    pub fn save(&self, mut entry: Entry) -> Result<Entry> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        entry.tags = normalize_tags(std::mem::take(&mut entry.tags));
        entry.media = dedup_media(std::mem::take(&mut entry.media));
        entry.touch();
        self.lock().persist(&entry)?;
        log::info!("Saved entry {}", entry.id);
        Ok(entry)
    }

    /// Fetches an entry, serving from the cache when possible.
    ///
    /// Unknown ids and unreadable records both yield `None`; the latter is logged.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Storage`] only if the store itself fails.
    pub fn get(&self, id: &str) -> Result<Option<Entry>> {
        Ok(self.lock().lookup(id)?.into_entry())
    }

    /// Fetches an entry and reports why it is missing, if it is.
    pub fn lookup(&self, id: &str) -> Result<Lookup> {
        self.lock().lookup(id)
    }

    /// Applies the supplied fields of `patch` to entry `id` and persists it.
    ///
    /// Returns `None` if the entry does not exist or cannot be read.
    pub fn update(&self, id: &str, patch: EntryPatch) -> Result<Option<Entry>> {
        self.lock().modify(id, |entry| {
            entry.apply(patch);
            Some(entry.clone())
        })
    }

    /// Adds `tag` to entry `id`. Returns `false` if the entry is missing or
    /// already carries the tag.
    pub fn add_tag(&self, id: &str, tag: &str) -> Result<bool> {
        let added = self.lock().modify(id, |entry| entry.add_tag(tag).then_some(()))?;
        Ok(added.is_some())
    }

    /// Removes `tag` from entry `id`. Returns `false` if nothing changed.
    pub fn remove_tag(&self, id: &str, tag: &str) -> Result<bool> {
        let removed = self.lock().modify(id, |entry| entry.remove_tag(tag).then_some(()))?;
        Ok(removed.is_some())
    }

    /// Attaches media to entry `id`, returning the new attachment id.
    pub fn add_media(
        &self,
        id: &str,
        kind: MediaKind,
        data_ref: &str,
        description: &str,
    ) -> Result<Option<String>> {
        self.lock()
            .modify(id, |entry| Some(entry.add_media(kind, data_ref, description)))
    }

    /// Removes attachment `media_id` from entry `id`. Returns `false` if nothing changed.
    pub fn remove_media(&self, id: &str, media_id: &str) -> Result<bool> {
        let removed = self
            .lock()
            .modify(id, |entry| entry.remove_media(media_id).then_some(()))?;
        Ok(removed.is_some())
    }

    /// Permanently removes entry `id`. Returns whether a record existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut state = self.lock();
        let existed = state.storage.delete(id)?;
        state.cache.evict(id);
        if existed {
            log::info!("Deleted entry {id}");
        }
        Ok(existed)
    }

    /// Number of stored records, readable or not.
    pub fn count(&self) -> Result<usize> {
        self.lock().storage.len()
    }

    /// Every readable entry, newest first. Unreadable records are skipped.
    pub fn list_all(&self) -> Result<Vec<Entry>> {
        self.lock().readable_entries()
    }

    /// Entries matching `query`, newest first.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<Entry>> {
        Ok(query.apply(self.list_all()?))
    }

    /// Entries created on the given local calendar year, month and day.
    ///
    /// Leaving out `month` (and `day`) widens the match to the whole year (or month).
    pub fn entries_on(&self, year: i32, month: Option<u32>, day: Option<u32>) -> Result<Vec<Entry>> {
        let entries = self.list_all()?;
        Ok(entries
            .into_iter()
            .filter(|e| on_calendar_day(e, year, month, day))
            .collect())
    }

    /// Every tag in use, sorted and without repeats.
    pub fn all_tags(&self) -> Result<Vec<String>> {
        let tags: BTreeSet<String> = self
            .list_all()?
            .into_iter()
            .flat_map(|e| e.tags)
            .collect();
        Ok(tags.into_iter().collect())
    }

    /// Per-mood entry counts over the optionally bounded creation range.
    pub fn mood_histogram(
        &self,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
    ) -> Result<MoodHistogram> {
        let entries = self.list_all()?;
        Ok(MoodHistogram::from_entries(
            entries.iter().filter(|e| within_range(e, date_from, date_to)),
        ))
    }

    /// Re-encrypts every entry under `new_password`; an empty password turns
    /// encryption off.
    ///
    /// Returns `false` and leaves the journal untouched if any entry could not
    /// be carried over. The reason is logged.
    pub fn rotate_password(&self, new_password: &str) -> bool {
        match self.try_rotate_password(new_password) {
            Ok(count) => {
                log::info!("Password changed, {count} entries re-encoded");
                true
            }
            Err(e) => {
                log::error!("Password change failed, previous key kept: {e}");
                false
            }
        }
    }

    /// Fallible form of [`rotate_password`](Self::rotate_password), returning the
    /// number of entries re-encoded.
    ///
    /// The transition is all-or-nothing: every record is decoded under the
    /// current key and encoded under the new one before anything is written,
    /// and the writes share one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Decrypt`] or [`JournalError::Decode`] if a stored
    /// record is unreadable under the current key, and [`JournalError::Storage`]
    /// if the batch write fails.
    pub fn try_rotate_password(&self, new_password: &str) -> Result<usize> {
        let mut state = self.lock();
        let next = self.unlock(new_password)?;
        state.rotate_to(next)
    }

    /// Rotates to `new_password` after checking `current_password` against the
    /// active key.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::WrongPassword`] if `current_password` does not
    /// match, otherwise the errors of [`try_rotate_password`](Self::try_rotate_password).
    pub fn change_password(&self, current_password: &str, new_password: &str) -> Result<usize> {
        let mut state = self.lock();
        let verified = match state.session.key() {
            None => current_password.is_empty(),
            Some(active) => {
                !current_password.is_empty()
                    && self
                        .unlock(current_password)?
                        .key()
                        .map_or(false, |candidate| candidate.matches(active))
            }
        };
        if !verified {
            return Err(JournalError::WrongPassword);
        }
        let next = self.unlock(new_password)?;
        state.rotate_to(next)
    }

    fn unlock(&self, password: &str) -> Result<Session> {
        Session::unlock(password, &self.config.salt_path(), &self.config.kdf)
    }
}

impl JournalState {
    fn lookup(&mut self, id: &str) -> Result<Lookup> {
        if let Some(entry) = self.cache.get(id) {
            log::debug!("Cache hit for entry {id}");
            return Ok(Lookup::Found(entry));
        }
        let Some(bytes) = self.storage.get(id)? else {
            return Ok(Lookup::Absent);
        };
        match codec::decode(&bytes, self.session.key()) {
            Ok(mut entry) => {
                if entry.id != id {
                    entry.id = id.to_string();
                }
                self.cache.put(entry.clone());
                Ok(Lookup::Found(entry))
            }
            Err(e) => {
                self.cache.evict(id);
                match &e {
                    JournalError::Decrypt(_) => log::error!("Entry {id} cannot be decrypted: {e}"),
                    _ => log::warn!("Entry {id} cannot be decoded: {e}"),
                }
                Ok(Lookup::Unreadable(e))
            }
        }
    }

    fn persist(&mut self, entry: &Entry) -> Result<()> {
        let written = codec::encode(entry, self.session.key())
            .and_then(|payload| self.storage.put(&entry.id, &payload));
        match written {
            Ok(()) => {
                self.cache.put(entry.clone());
                Ok(())
            }
            Err(e) => {
                self.cache.evict(&entry.id);
                log::error!("Failed to save entry {}: {e}", entry.id);
                Err(e)
            }
        }
    }

    /// Read-modify-write of one entry. `f` returns `None` when it made no change,
    /// in which case nothing is written.
    fn modify<T>(&mut self, id: &str, f: impl FnOnce(&mut Entry) -> Option<T>) -> Result<Option<T>> {
        let mut entry = match self.lookup(id)? {
            Lookup::Found(entry) => entry,
            Lookup::Unreadable(_) | Lookup::Absent => return Ok(None),
        };
        let Some(out) = f(&mut entry) else {
            return Ok(None);
        };
        self.persist(&entry)?;
        Ok(Some(out))
    }

    fn readable_entries(&mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for id in self.storage.keys()? {
            if let Lookup::Found(entry) = self.lookup(&id)? {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries)
    }

    fn rotate_to(&mut self, next: Session) -> Result<usize> {
        let ids = self.storage.keys()?;
        let mut entries = Vec::with_capacity(ids.len());
        let mut records = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(bytes) = self.storage.get(&id)? else {
                continue;
            };
            let mut entry = codec::decode(&bytes, self.session.key()).map_err(|e| {
                log::error!("Entry {id} is unreadable under the current key: {e}");
                e
            })?;
            entry.id = id.clone();
            records.push((id, codec::encode(&entry, next.key())?));
            entries.push(entry);
        }

        self.storage.put_all(&records)?;
        self.session = next;
        self.cache.clear();
        for entry in entries {
            self.cache.put(entry);
        }
        Ok(records.len())
    }
}
