//! summarize.rs
//!
//! Pure filter-and-summarize pass over one batch of upstream events:
//! time window, area match, newest-first ordering, truncation. No I/O and
//! no clock reads; `now` always comes from the caller.

use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Utc};
use tracing::debug;

use crate::config::{MatchMode, SensorConfig};
use crate::models::{MatchedEvent, RawEvent, Snapshot};

/// Upstream sends `2024-01-10 10:00:00 +01:00`; padding and the offset colon
/// are not reliable. Offset-less timestamps are rejected.
const EVENT_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

pub fn parse_event_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    EVENT_TIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
}

pub fn render_event_time(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Case-insensitive comparison of one area against a location label.
pub fn area_matches(location_name: &str, area: &str, mode: MatchMode) -> bool {
    let location = location_name.trim().to_lowercase();
    let area = area.trim().to_lowercase();

    if area.is_empty() || location.is_empty() {
        return false;
    }

    match mode {
        MatchMode::Exact => location == area,
        MatchMode::Contains => location.contains(&area),
    }
}

/// Areas (in config order, duplicates kept) that match the location.
pub fn matched_areas(location_name: &str, areas: &[String], mode: MatchMode) -> Vec<String> {
    areas
        .iter()
        .filter(|area| area_matches(location_name, area, mode))
        .cloned()
        .collect()
}

pub fn summarize(raw_events: &[RawEvent], config: &SensorConfig, now: DateTime<Utc>) -> Snapshot {
    if config.areas.is_empty() {
        return Snapshot::default();
    }

    let cutoff = now - Duration::hours(i64::from(config.hours));

    let mut survivors: Vec<(DateTime<FixedOffset>, &RawEvent, Vec<String>)> = raw_events
        .iter()
        .filter_map(|event| {
            let Some(at) = parse_event_time(&event.datetime) else {
                debug!(event = %event.name, datetime = %event.datetime, "Unparseable event time");
                return None;
            };

            if at.with_timezone(&Utc) < cutoff {
                return None;
            }

            let areas = matched_areas(&event.location.name, &config.areas, config.match_mode);
            if areas.is_empty() {
                return None;
            }

            Some((at, event, areas))
        })
        .collect();

    // sort_by is stable: equal timestamps keep feed order
    survivors.sort_by(|a, b| b.0.cmp(&a.0));

    let count = survivors.len();
    let events: Vec<MatchedEvent> = survivors
        .into_iter()
        .take(config.max_items)
        .map(|(at, event, matched_areas)| MatchedEvent {
            id: event.id.clone(),
            name: event.name.clone(),
            url: event.url.clone(),
            datetime: render_event_time(&at),
            event_type: event.event_type.clone(),
            location: event.location.clone(),
            matched_areas,
        })
        .collect();
    let latest = events.first().cloned();

    Snapshot {
        events,
        latest,
        count,
    }
}
