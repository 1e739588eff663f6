//! Conversion between [`Entry`] values and the bytes kept in the store.
//!
//! The plain form is a UTF-8 JSON object:
//!
//! ```text
//! { id, title, content, mood, tags[], location{}, media[]{id, type, data_ref,
//!   description, created_at}, created_at, updated_at }
//! ```
//!
//! with ISO-8601 timestamps. When a key is supplied the plain form is sealed
//! with [`crypto::seal`](super::crypto::seal), so a stored blob is either JSON
//! or `[IV][ciphertext][tag]` depending on the session that wrote it.
//!
//! Decoding is lenient about content and strict about syntax: a field that is
//! missing or has the wrong type takes its default, but bytes that are not a
//! JSON object are a [`JournalError::Decode`].

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};

use super::crypto::{self, EntryKey};
use super::entry::{dedup_media, normalize_tags};
use crate::{Entry, JournalError, Location, MediaAttachment, MediaKind, Mood, Result};

/// Serializes `entry`, sealing it when `key` is present.
///
/// # Errors
///
/// Returns [`JournalError::Json`] if serialization fails or
/// [`JournalError::Decrypt`] if the cipher rejects the payload.
pub fn encode(entry: &Entry, key: Option<&EntryKey>) -> Result<Vec<u8>> {
    let plain = serde_json::to_vec(&to_record(entry))?;
    match key {
        Some(key) => crypto::seal(&plain, key),
        None => Ok(plain),
    }
}

/// Reverses [`encode`].
///
/// # Errors
///
/// Returns [`JournalError::Decrypt`] if `key` is present and the blob cannot be
/// opened with it, or [`JournalError::Decode`] if the plain form is not a JSON
/// object.
pub fn decode(bytes: &[u8], key: Option<&EntryKey>) -> Result<Entry> {
    match key {
        Some(key) => {
            let plain = crypto::open(bytes, key)?;
            decode_plain(&plain)
        }
        None => decode_plain(bytes),
    }
}

fn decode_plain(bytes: &[u8]) -> Result<Entry> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| JournalError::Decode(e.to_string()))?;
    match value {
        Value::Object(record) => Ok(from_record(&record)),
        other => Err(JournalError::Decode(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn to_record(entry: &Entry) -> Value {
    let location = match &entry.location {
        Some(loc) => json!({
            "latitude": loc.latitude,
            "longitude": loc.longitude,
            "name": loc.name,
        }),
        None => json!({}),
    };
    let media: Vec<Value> = entry
        .media
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "type": m.kind.as_str(),
                "data_ref": m.data_ref,
                "description": m.description,
                "created_at": m.created_at.to_rfc3339(),
            })
        })
        .collect();

    json!({
        "id": entry.id,
        "title": entry.title,
        "content": entry.content,
        "mood": entry.mood.level(),
        "tags": entry.tags,
        "location": location,
        "media": media,
        "created_at": entry.created_at.to_rfc3339(),
        "updated_at": entry.updated_at.to_rfc3339(),
    })
}

fn from_record(record: &Map<String, Value>) -> Entry {
    let created = record.get("created_at").and_then(parse_timestamp);
    let updated = record.get("updated_at").and_then(parse_timestamp);
    let created_at = created.or(updated).unwrap_or_else(Utc::now);
    let updated_at = updated.unwrap_or(created_at).max(created_at);

    let tags = match record.get("tags") {
        Some(Value::Array(items)) => normalize_tags(
            items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        ),
        _ => Vec::new(),
    };

    let id = str_field(record, "id");
    let media = match record.get("media") {
        Some(Value::Array(items)) => dedup_media(
            items
                .iter()
                .enumerate()
                .filter_map(|(index, m)| {
                    m.as_object()
                        .map(|m| media_from_record(m, &id, index, created_at))
                })
                .collect(),
        ),
        _ => Vec::new(),
    };

    Entry {
        id,
        title: str_field(record, "title"),
        content: str_field(record, "content"),
        mood: record
            .get("mood")
            .and_then(Value::as_i64)
            .map(Mood::or_default)
            .unwrap_or_default(),
        tags,
        location: record
            .get("location")
            .and_then(Value::as_object)
            .and_then(location_from_record),
        media,
        created_at,
        updated_at,
    }
}

/// Attachments stored without an id get one derived from the entry id and
/// their position, so the same record always yields the same ids.
fn media_from_record(
    record: &Map<String, Value>,
    entry_id: &str,
    index: usize,
    fallback_time: DateTime<Utc>,
) -> MediaAttachment {
    let id = str_field(record, "id");
    let data_ref = record
        .get("data_ref")
        .or_else(|| record.get("data"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    MediaAttachment {
        id: if id.is_empty() { format!("{entry_id}-media-{index}") } else { id },
        kind: record
            .get("type")
            .and_then(Value::as_str)
            .and_then(MediaKind::parse)
            .unwrap_or(MediaKind::Image),
        data_ref,
        description: str_field(record, "description"),
        created_at: record
            .get("created_at")
            .and_then(parse_timestamp)
            .unwrap_or(fallback_time),
    }
}

fn location_from_record(record: &Map<String, Value>) -> Option<Location> {
    let latitude = record
        .get("latitude")
        .or_else(|| record.get("lat"))
        .and_then(Value::as_f64);
    let longitude = record
        .get("longitude")
        .or_else(|| record.get("lng"))
        .and_then(Value::as_f64);
    let name = str_field(record, "name");
    if latitude.is_none() && longitude.is_none() && name.is_empty() {
        return None;
    }
    Some(Location {
        latitude: latitude.unwrap_or_default(),
        longitude: longitude.unwrap_or_default(),
        name,
    })
}

/// Accepts RFC 3339 as well as zone-less ISO-8601, which is read as local time.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn str_field(record: &Map<String, Value>, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
