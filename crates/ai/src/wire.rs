//! Provider wire adapter.
//!
//! The provider streams envelopes shaped like
//! `{"systemMessage": {...}, "timestamp": ...}`. They are flattened into the
//! adapted shape the classifier reads:
//!
//! | provider field                          | adapted field        |
//! |-----------------------------------------|----------------------|
//! | `data.generatedSql`                     | `generated_query`    |
//! | `data.result.{data,schema,name,executionTime}` | `result.{rows,schema,name,execution_time}` |
//! | `chart.result.vegaConfig` (+title, description) | `chart_spec` (+`chart_title`, `chart_description`) |
//! | `text.parts`                            | `text_parts`         |

use serde_json::{Map, Value};

use crate::types::RawProviderEvent;

pub const GENERATED_QUERY: &str = "generated_query";
pub const RESULT: &str = "result";
pub const CHART_SPEC: &str = "chart_spec";
pub const CHART_TITLE: &str = "chart_title";
pub const CHART_DESCRIPTION: &str = "chart_description";
pub const TEXT_PARTS: &str = "text_parts";
pub const TIMESTAMP: &str = "timestamp";

const ADAPTED_KEYS: [&str; 4] = [GENERATED_QUERY, RESULT, CHART_SPEC, TEXT_PARTS];

/// True when the event already uses the adapted field names.
pub fn is_adapted(event: &RawProviderEvent) -> bool {
    event
        .as_object()
        .map(|obj| ADAPTED_KEYS.iter().any(|k| obj.contains_key(*k)))
        .unwrap_or(false)
}

/// Flatten a provider envelope into the adapted shape.
///
/// Adapted events and events without a `systemMessage` are returned as-is.
pub fn adapt_event(event: &RawProviderEvent) -> RawProviderEvent {
    if is_adapted(event) {
        return event.clone();
    }
    let Some(system) = event.get("systemMessage").and_then(Value::as_object) else {
        return event.clone();
    };

    let mut adapted = Map::new();

    if let Some(data) = system.get("data") {
        if let Some(sql) = data.get("generatedSql") {
            adapted.insert(GENERATED_QUERY.to_string(), sql.clone());
        }
        if let Some(Value::Object(result)) = data.get("result") {
            let mut mapped = Map::new();
            for (from, to) in [
                ("data", "rows"),
                ("schema", "schema"),
                ("name", "name"),
                ("executionTime", "execution_time"),
            ] {
                if let Some(value) = result.get(from) {
                    mapped.insert(to.to_string(), value.clone());
                }
            }
            adapted.insert(RESULT.to_string(), Value::Object(mapped));
        }
    }

    if let Some(chart_result) = system.get("chart").and_then(|c| c.get("result")) {
        if let Some(spec) = chart_result.get("vegaConfig") {
            adapted.insert(CHART_SPEC.to_string(), spec.clone());
            for (from, to) in [("title", CHART_TITLE), ("description", CHART_DESCRIPTION)] {
                if let Some(value) = chart_result.get(from) {
                    adapted.insert(to.to_string(), value.clone());
                }
            }
        }
    }

    if let Some(parts) = system.get("text").and_then(|t| t.get("parts")) {
        adapted.insert(TEXT_PARTS.to_string(), parts.clone());
    }

    if let Some(timestamp) = event.get(TIMESTAMP) {
        adapted.insert(TIMESTAMP.to_string(), timestamp.clone());
    }

    Value::Object(adapted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_envelope() {
        let event = json!({
            "systemMessage": { "data": { "generatedSql": "SELECT 1" } },
            "timestamp": "2024-12-31T10:00:00Z"
        });

        let adapted = adapt_event(&event);

        assert_eq!(adapted[GENERATED_QUERY], "SELECT 1");
        assert_eq!(adapted[TIMESTAMP], "2024-12-31T10:00:00Z");
    }

    #[test]
    fn test_result_envelope_renames_fields() {
        let event = json!({
            "systemMessage": { "data": { "result": {
                "data": [{ "a": 1 }], "schema": { "fields": [] }, "name": "q", "executionTime": "9ms"
            } } }
        });

        let adapted = adapt_event(&event);

        assert_eq!(adapted[RESULT]["rows"], json!([{ "a": 1 }]));
        assert_eq!(adapted[RESULT]["execution_time"], "9ms");
        assert!(adapted[RESULT].get("data").is_none());
    }

    #[test]
    fn test_chart_and_text_envelopes() {
        let chart = json!({
            "systemMessage": { "chart": { "result": { "vegaConfig": { "mark": "bar" }, "title": "T" } } }
        });
        let adapted = adapt_event(&chart);
        assert_eq!(adapted[CHART_SPEC], json!({ "mark": "bar" }));
        assert_eq!(adapted[CHART_TITLE], "T");

        let text = json!({ "systemMessage": { "text": { "parts": ["a", "b"] } } });
        assert_eq!(adapt_event(&text)[TEXT_PARTS], json!(["a", "b"]));
    }

    #[test]
    fn test_adapted_and_unknown_events_pass_through() {
        let adapted = json!({ "text_parts": ["x"] });
        assert_eq!(adapt_event(&adapted), adapted);

        let heartbeat = json!({ "status": "thinking" });
        assert_eq!(adapt_event(&heartbeat), heartbeat);
    }
}
