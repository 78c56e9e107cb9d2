use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Upstream identifier; the feed uses integers but nothing relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(i64),
    /// Fractional or out-of-range numbers, kept verbatim.
    OtherNumber(serde_json::Number),
    Text(String),
}

/// One record of `GET /api/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<EventId>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub datetime: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub event_type: String,
    pub location: Location,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Place label plus whatever else the feed sends (`gps`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }
}

impl RawEvent {
    /// Decodes the feed body element by element. Records that do not fit
    /// the schema are dropped so one bad item never sinks the batch.
    pub fn parse_batch(items: Vec<Value>) -> Vec<RawEvent> {
        let total = items.len();
        let events: Vec<RawEvent> = items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<RawEvent>(item) {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!(index, error = %e, "Skipping malformed event record");
                    None
                }
            })
            .collect();

        if events.len() < total {
            debug!(
                kept = events.len(),
                dropped = total - events.len(),
                "Dropped malformed event records"
            );
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_upstream_record() {
        let value = json!({
            "id": 512345,
            "datetime": "2024-01-10 10:00:00 +01:00",
            "name": "10 januari 10.00, Stöld, Lund",
            "summary": "Cykel stulen.",
            "url": "/aktuellt/handelser/2024/januari/10/stold-lund/",
            "type": "Stöld",
            "location": { "name": "Lund", "gps": "55.703,13.191" }
        });

        let event: RawEvent = serde_json::from_value(value).unwrap();
        assert_eq!(event.id, Some(EventId::Number(512345)));
        assert_eq!(event.event_type, "Stöld");
        assert_eq!(event.location.name, "Lund");
        assert_eq!(event.location.extra.get("gps"), Some(&json!("55.703,13.191")));
    }

    #[test]
    fn string_ids_are_accepted() {
        let event: RawEvent = serde_json::from_value(json!({
            "id": "abc",
            "name": "A",
            "location": { "name": "Lund" }
        }))
        .unwrap();
        assert_eq!(event.id, Some(EventId::Text("abc".into())));
        assert_eq!(event.datetime, "");
    }

    #[test]
    fn batch_drops_records_missing_required_fields() {
        let items = vec![
            json!({ "name": "ok", "location": { "name": "Lund" } }),
            json!({ "location": { "name": "Lund" } }),
            json!({ "name": "no location" }),
            json!({ "name": "no place", "location": { "gps": "1,2" } }),
            json!("not an object"),
            json!({ "name": "also ok", "location": { "name": "Malmö" }, "extra": true }),
        ];

        let events = RawEvent::parse_batch(items);
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ok", "also ok"]);
    }

    #[test]
    fn batch_keeps_records_with_null_optional_fields() {
        let items = vec![
            json!({
                "id": null,
                "name": "A",
                "datetime": "2024-01-10 10:00:00 +01:00",
                "summary": null,
                "type": null,
                "url": null,
                "location": { "name": "Lund" }
            }),
            json!({ "id": 12.5, "name": "B", "datetime": null, "location": { "name": "Lund" } }),
        ];

        let events = RawEvent::parse_batch(items);
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].id, None);
        assert_eq!(events[0].event_type, "");
        assert_eq!(events[0].url, None);

        assert_eq!(events[1].datetime, "");
        assert!(matches!(events[1].id, Some(EventId::OtherNumber(_))));
    }

    #[test]
    fn location_passes_through_extra_fields() {
        let mut location = Location::named("Lund");
        location.extra.insert("gps".into(), json!("55.7,13.1"));

        let value = serde_json::to_value(&location).unwrap();
        assert_eq!(value, json!({ "name": "Lund", "gps": "55.7,13.1" }));
    }
}
