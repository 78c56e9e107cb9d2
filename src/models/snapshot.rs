use chrono::{DateTime, Utc};
use serde::Serialize;

use super::event::{EventId, Location};
use crate::config::{MatchMode, SensorConfig};

/// Event as published in the sensor attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedEvent {
    pub id: Option<EventId>,
    pub name: String,
    pub url: Option<String>,
    /// RFC 3339, seconds precision, in the event's own offset.
    pub datetime: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub location: Location,
    pub matched_areas: Vec<String>,
}

/// Result of one summarize pass. Replaced wholesale on each refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub events: Vec<MatchedEvent>,
    pub latest: Option<MatchedEvent>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAttributes {
    pub area: String,
    pub match_mode: MatchMode,
    pub hours: u32,
    pub max_items: usize,
    pub count: usize,
    pub latest: Option<MatchedEvent>,
    pub events: Vec<MatchedEvent>,
}

/// What the host exposes for a sensor: value, attributes, health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub name: String,
    pub state: Option<String>,
    pub available: bool,
    pub attributes: SensorAttributes,
    pub diagnostics: Diagnostics,
}

impl SensorState {
    pub fn build(
        config: &SensorConfig,
        snapshot: Option<&Snapshot>,
        diagnostics: Diagnostics,
        available: bool,
    ) -> Self {
        let latest = snapshot.and_then(|s| s.latest.clone());
        let state = latest
            .as_ref()
            .map(|e| e.name.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Self {
            name: config.name.clone(),
            state,
            available,
            attributes: SensorAttributes {
                area: config.area_label(),
                match_mode: config.match_mode,
                hours: config.hours,
                max_items: config.max_items,
                count: snapshot.map(|s| s.count).unwrap_or(0),
                latest,
                events: snapshot.map(|s| s.events.clone()).unwrap_or_default(),
            },
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> MatchedEvent {
        MatchedEvent {
            id: Some(EventId::Number(1)),
            name: name.to_string(),
            url: None,
            datetime: "2024-01-10T10:00:00+01:00".to_string(),
            event_type: "Stöld".to_string(),
            location: Location::named("Lund"),
            matched_areas: vec!["Lund".to_string()],
        }
    }

    fn config() -> SensorConfig {
        SensorConfig::new(vec!["Lund".into(), "Malmö".into()], MatchMode::Contains, 24, 5)
    }

    #[test]
    fn state_is_latest_name() {
        let snapshot = Snapshot {
            events: vec![event("Stöld, Lund")],
            latest: Some(event("Stöld, Lund")),
            count: 3,
        };

        let state = SensorState::build(&config(), Some(&snapshot), Diagnostics::default(), true);
        assert_eq!(state.state.as_deref(), Some("Stöld, Lund"));
        assert_eq!(state.attributes.area, "Lund / Malmö");
        assert_eq!(state.attributes.count, 3);
        assert_eq!(state.attributes.events.len(), 1);
    }

    #[test]
    fn blank_latest_name_has_no_state() {
        let snapshot = Snapshot {
            events: vec![event("   ")],
            latest: Some(event("   ")),
            count: 1,
        };

        let state = SensorState::build(&config(), Some(&snapshot), Diagnostics::default(), true);
        assert_eq!(state.state, None);
    }

    #[test]
    fn missing_snapshot_exposes_empty_attributes() {
        let state = SensorState::build(&config(), None, Diagnostics::default(), false);
        assert_eq!(state.state, None);
        assert!(!state.available);
        assert_eq!(state.attributes.count, 0);
        assert!(state.attributes.latest.is_none());
        assert!(state.attributes.events.is_empty());
    }

    #[test]
    fn attributes_serialize_with_upstream_field_names() {
        let value = serde_json::to_value(event("A")).unwrap();
        assert_eq!(value["type"], "Stöld");
        assert_eq!(value["location"]["name"], "Lund");
        assert_eq!(value["matched_areas"][0], "Lund");

        let state = SensorState::build(&config(), None, Diagnostics::default(), true);
        let value = serde_json::to_value(state).unwrap();
        assert_eq!(value["attributes"]["match_mode"], "contains");
    }
}
