//! The journal entry model: mood levels, location, media attachments, and the
//! draft/patch inputs used to create and edit entries.
//!
//! Entries are plain data. Nothing here touches the disk; an [`Entry`] becomes
//! durable only once it is saved through a [`Journal`](super::journal::Journal).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{JournalError, Result};

/// How the author felt when writing an entry, on a five-step scale.
///
/// Serialized as its integer level (`1..=5`). Deserializing any other integer
/// yields [`Mood::Okay`], the same default used when reading damaged records.
///
/// # Examples
///
/// ```rust
/// use diario_core::Mood;
///
/// assert_eq!(Mood::from_level(4), Some(Mood::Good));
/// assert_eq!(Mood::or_default(9), Mood::Okay);
/// assert_eq!(serde_json::to_string(&Mood::Great).unwrap(), "5");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", from = "i64")]
pub enum Mood {
    Awful = 1,
    Bad = 2,
    #[default]
    Okay = 3,
    Good = 4,
    Great = 5,
}

impl Mood {
    /// Every level, lowest first.
    pub const ALL: [Mood; 5] = [Mood::Awful, Mood::Bad, Mood::Okay, Mood::Good, Mood::Great];

    /// The integer level, `1..=5`.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Returns the mood for `level`, or `None` when it is outside `1..=5`.
    pub fn from_level(level: i64) -> Option<Mood> {
        match level {
            1 => Some(Mood::Awful),
            2 => Some(Mood::Bad),
            3 => Some(Mood::Okay),
            4 => Some(Mood::Good),
            5 => Some(Mood::Great),
            _ => None,
        }
    }

    /// Lenient conversion: out-of-range levels fall back to [`Mood::Okay`].
    pub fn or_default(level: i64) -> Mood {
        Mood::from_level(level).unwrap_or_default()
    }

    /// Strict conversion used by [`EntryDraft::validate_strict`].
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Validation`] if `level` is outside `1..=5`.
    pub fn strict(level: i64) -> Result<Mood> {
        Mood::from_level(level).ok_or_else(|| {
            JournalError::Validation(format!("mood must be between 1 and 5, got {level}"))
        })
    }

    /// A short English label for display.
    pub fn label(self) -> &'static str {
        match self {
            Mood::Awful => "Awful",
            Mood::Bad => "Bad",
            Mood::Okay => "Okay",
            Mood::Good => "Good",
            Mood::Great => "Great",
        }
    }
}

impl From<Mood> for u8 {
    fn from(mood: Mood) -> u8 {
        mood.level()
    }
}

impl From<i64> for Mood {
    fn from(level: i64) -> Mood {
        Mood::or_default(level)
    }
}

/// Where an entry was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Human-readable place name; may be empty.
    pub name: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self { latitude, longitude, name: name.into() }
    }
}

/// The kind of payload a [`MediaAttachment`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Sketch,
}

impl MediaKind {
    /// The lowercase tag used in stored records.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Sketch => "sketch",
        }
    }

    /// Parses a stored type tag. Unknown tags return `None`.
    pub fn parse(tag: &str) -> Option<MediaKind> {
        match tag {
            "image" => Some(MediaKind::Image),
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            "sketch" => Some(MediaKind::Sketch),
            _ => None,
        }
    }
}

/// A file or drawing attached to exactly one entry.
///
/// `data_ref` is opaque to the engine: an inline base64 payload or a path,
/// whatever the attaching collaborator chose to store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub data_ref: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl MediaAttachment {
    /// Creates an attachment with a fresh id and the current time.
    pub fn new(kind: MediaKind, data_ref: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            data_ref: data_ref.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

/// One journal record.
///
/// Invariants maintained by every constructor and mutator in this module:
/// tags are trimmed, non-empty and duplicate-free; media ids are unique within
/// the entry; `updated_at >= created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub title: String,
    /// Markdown source.
    pub content: String,
    pub mood: Mood,
    pub tags: Vec<String>,
    pub location: Option<Location>,
    pub media: Vec<MediaAttachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Builds an in-memory entry from `draft` with a fresh id.
    ///
    /// Out-of-range moods become [`Mood::Okay`], tags are normalised and
    /// attachments with repeated ids are dropped. The entry is not durable
    /// until saved.
    pub fn new(draft: EntryDraft) -> Self {
        let now = Utc::now();
        let created_at = draft.created_at.unwrap_or(now);
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            content: draft.content,
            mood: draft.mood.map(Mood::or_default).unwrap_or_default(),
            tags: normalize_tags(draft.tags),
            location: draft.location,
            media: dedup_media(draft.media),
            created_at,
            updated_at: now.max(created_at),
        }
    }

    /// Refreshes `updated_at`, never letting it fall behind `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Appends `tag` unless it is blank or already present.
    ///
    /// Returns `true` if the entry changed.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        self.touch();
        true
    }

    /// Removes `tag`. Returns `true` if it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        if self.tags.len() == before {
            return false;
        }
        self.touch();
        true
    }

    /// Attaches a new media record and returns its id.
    pub fn add_media(
        &mut self,
        kind: MediaKind,
        data_ref: impl Into<String>,
        description: impl Into<String>,
    ) -> String {
        let attachment = MediaAttachment::new(kind, data_ref, description);
        let id = attachment.id.clone();
        self.media.push(attachment);
        self.touch();
        id
    }

    /// Removes the attachment with `media_id`. Returns `true` if it existed.
    pub fn remove_media(&mut self, media_id: &str) -> bool {
        let before = self.media.len();
        self.media.retain(|m| m.id != media_id);
        if self.media.len() == before {
            return false;
        }
        self.touch();
        true
    }

    /// Overwrites the fields present in `patch` and refreshes `updated_at`.
    pub fn apply(&mut self, patch: EntryPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(mood) = patch.mood {
            self.mood = Mood::or_default(mood);
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(media) = patch.media {
            self.media = dedup_media(media);
        }
        self.touch();
    }
}

/// Input for creating an entry.
///
/// `mood` is kept as a raw integer so that callers can hand over whatever the
/// UI produced; [`Journal::create`](super::journal::Journal::create) corrects it
/// and [`Journal::create_strict`](super::journal::Journal::create_strict) rejects it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
    pub mood: Option<i64>,
    pub tags: Vec<String>,
    pub location: Option<Location>,
    pub media: Vec<MediaAttachment>,
    /// Backdates the entry; defaults to the time of creation.
    pub created_at: Option<DateTime<Utc>>,
}

impl EntryDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into(), ..Self::default() }
    }

    pub fn mood(mut self, mood: i64) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn media(mut self, media: Vec<MediaAttachment>) -> Self {
        self.media = media;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Checks the draft without correcting anything.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Validation`] for an out-of-range mood, a blank or
    /// repeated tag, or a repeated media id.
    pub fn validate_strict(&self) -> Result<()> {
        if let Some(mood) = self.mood {
            Mood::strict(mood)?;
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(JournalError::Validation("tags must not be blank".to_string()));
            }
            if seen.contains(&tag) {
                return Err(JournalError::Validation(format!("duplicate tag '{tag}'")));
            }
            seen.push(tag);
        }
        for (i, media) in self.media.iter().enumerate() {
            if self.media[..i].iter().any(|m| m.id == media.id) {
                return Err(JournalError::Validation(format!(
                    "duplicate media id '{}'",
                    media.id
                )));
            }
        }
        Ok(())
    }
}

/// A partial update: only the `Some` fields are written.
///
/// `location: Some(None)` clears the location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub location: Option<Option<Location>>,
    pub media: Option<Vec<MediaAttachment>>,
}

impl EntryPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn mood(mut self, mood: i64) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn location(mut self, location: Option<Location>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn media(mut self, media: Vec<MediaAttachment>) -> Self {
        self.media = Some(media);
        self
    }
}

/// Trims tags, drops blanks and repeats, and keeps first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Splits comma-separated editor input into normalised tags.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    normalize_tags(input.split(',').map(str::to_string).collect())
}

pub(crate) fn dedup_media(media: Vec<MediaAttachment>) -> Vec<MediaAttachment> {
    let mut out: Vec<MediaAttachment> = Vec::with_capacity(media.len());
    for item in media {
        if !out.iter().any(|m| m.id == item.id) {
            out.push(item);
        }
    }
    out
}
