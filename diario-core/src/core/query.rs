//! Filters and aggregates evaluated over decoded entries.

use chrono::{DateTime, Datelike, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{Entry, Mood};

/// Conjunctive search filters. Every `None` (or empty tag list) is unconstrained.
///
/// Filters are applied in this order: text, tags, date range, mood.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Case-insensitive substring of the title or the content.
    pub text: Option<String>,
    /// Matches entries carrying at least one of these tags.
    pub tags: Vec<String>,
    /// Inclusive lower bound on `created_at`.
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub date_to: Option<DateTime<Utc>>,
    pub mood: Option<Mood>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
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

    pub fn date_from(mut self, from: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self
    }

    pub fn date_to(mut self, to: DateTime<Utc>) -> Self {
        self.date_to = Some(to);
        self
    }

    pub fn mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
            && self.wanted_tags().next().is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.mood.is_none()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            if !entry.title.to_lowercase().contains(&needle)
                && !entry.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        let mut wanted = self.wanted_tags().peekable();
        if wanted.peek().is_some() && !wanted.any(|t| entry.has_tag(t)) {
            return false;
        }
        if !within_range(entry, self.date_from, self.date_to) {
            return false;
        }
        self.mood.map_or(true, |mood| entry.mood == mood)
    }

    fn wanted_tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty())
    }

    /// Keeps the matching entries, preserving their order.
    pub fn apply(&self, entries: Vec<Entry>) -> Vec<Entry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// `true` when `created_at` lies within the inclusive bounds.
pub fn within_range(entry: &Entry, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |from| entry.created_at >= from) && to.map_or(true, |to| entry.created_at <= to)
}

/// `true` when the entry was created on the given local calendar year,
/// and month and day where supplied.
pub fn on_calendar_day(entry: &Entry, year: i32, month: Option<u32>, day: Option<u32>) -> bool {
    let local = entry.created_at.with_timezone(&Local);
    local.year() == year
        && month.map_or(true, |m| local.month() == m)
        && day.map_or(true, |d| local.day() == d)
}

/// Number of entries per mood level. All five levels are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoodHistogram {
    counts: BTreeMap<Mood, usize>,
}

impl Default for MoodHistogram {
    fn default() -> Self {
        Self { counts: Mood::ALL.iter().map(|m| (*m, 0)).collect() }
    }
}

impl MoodHistogram {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut histogram = Self::default();
        for entry in entries {
            *histogram.counts.entry(entry.mood).or_insert(0) += 1;
        }
        histogram
    }

    pub fn get(&self, mood: Mood) -> usize {
        self.counts.get(&mood).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Mood, usize)> + '_ {
        self.counts.iter().map(|(m, c)| (*m, *c))
    }

    pub fn as_map(&self) -> &BTreeMap<Mood, usize> {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryDraft;
    use chrono::{Duration, TimeZone};

    fn entry(title: &str, content: &str, mood: i64, tags: &[&str]) -> Entry {
        Entry::new(
            EntryDraft::new(title, content)
                .mood(mood)
                .tags(tags.iter().copied()),
        )
    }

    #[test]
    fn test_text_filter_is_case_insensitive_over_title_and_content() {
        let e = entry("Morning Run", "Felt GREAT today", 4, &[]);
        assert!(SearchQuery::new().text("morning").matches(&e));
        assert!(SearchQuery::new().text("great").matches(&e));
        assert!(!SearchQuery::new().text("evening").matches(&e));
    }

    #[test]
    fn test_tag_filter_is_any_of() {
        let e = entry("", "", 3, &["work", "family"]);
        assert!(SearchQuery::new().tags(["family"]).matches(&e));
        assert!(SearchQuery::new().tags(["travel", "work"]).matches(&e));
        assert!(!SearchQuery::new().tags(["travel"]).matches(&e));
        assert!(!SearchQuery::new().tags(["Work"]).matches(&e));
    }

    #[test]
    fn test_tag_filter_trims_and_ignores_blank_tags() {
        let e = entry("", "", 3, &["work"]);
        assert!(SearchQuery::new().tags([" work "]).matches(&e));
        assert!(!SearchQuery::new().tags([" travel "]).matches(&e));

        let blank = SearchQuery::new().tags(["  ", ""]);
        assert!(blank.is_unconstrained());
        assert!(blank.matches(&e));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let e = entry("", "", 3, &[]);
        let at = e.created_at;
        assert!(SearchQuery::new().date_from(at).date_to(at).matches(&e));
        assert!(!SearchQuery::new().date_from(at + Duration::seconds(1)).matches(&e));
        assert!(!SearchQuery::new().date_to(at - Duration::seconds(1)).matches(&e));
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let e = entry("Hike", "mountain", 5, &["outdoors"]);
        let q = SearchQuery::new().text("hike").tags(["outdoors"]).mood(Mood::Great);
        assert!(q.matches(&e));
        assert!(!q.clone().mood(Mood::Bad).matches(&e));
        assert!(!q.text("swim").matches(&e));
    }

    #[test]
    fn test_unconstrained_query_keeps_everything_in_order() {
        let entries = vec![entry("a", "", 1, &[]), entry("b", "", 2, &[])];
        let q = SearchQuery::new().text("");
        assert!(q.is_unconstrained());
        assert_eq!(q.apply(entries.clone()), entries);
    }

    #[test]
    fn test_on_calendar_day() {
        let created = Local.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap().with_timezone(&Utc);
        let e = Entry::new(EntryDraft::default().created_at(created));
        assert!(on_calendar_day(&e, 2024, None, None));
        assert!(on_calendar_day(&e, 2024, Some(3), None));
        assert!(on_calendar_day(&e, 2024, Some(3), Some(15)));
        assert!(!on_calendar_day(&e, 2024, Some(3), Some(16)));
        assert!(!on_calendar_day(&e, 2023, None, None));
    }

    #[test]
    fn test_histogram_has_all_levels() {
        let entries = vec![entry("", "", 1, &[]), entry("", "", 1, &[]), entry("", "", 5, &[])];
        let histogram = MoodHistogram::from_entries(&entries);
        assert_eq!(histogram.as_map().len(), 5);
        assert_eq!(histogram.get(Mood::Awful), 2);
        assert_eq!(histogram.get(Mood::Okay), 0);
        assert_eq!(histogram.get(Mood::Great), 1);
        assert_eq!(histogram.total(), 3);

        let empty = MoodHistogram::from_entries(&Vec::<Entry>::new());
        assert_eq!(empty.iter().count(), 5);
        assert_eq!(empty.total(), 0);
    }

    #[test]
    fn test_histogram_serializes_levels_as_keys() {
        let json = serde_json::to_string(&MoodHistogram::default()).unwrap();
        assert_eq!(json, r#"{"counts":{"1":0,"2":0,"3":0,"4":0,"5":0}}"#);
    }
}
