use querystream_cli::{build_state, commands, config::Config, config::LogFormat};
use querystream_core::FragmentLimits;
use serde_json::json;
use tempfile::tempdir;

fn test_config(dir: &std::path::Path) -> Config {
    Config {
        db_path: dir.join("test.db").to_string_lossy().to_string(),
        limits: FragmentLimits::default(),
        log_format: LogFormat::Text,
    }
}

fn capture() -> String {
    let rows: Vec<_> = (0..320).map(|i| json!({ "i": i })).collect();
    [
        json!({ "systemMessage": { "data": { "generatedSql": "SELECT i FROM t" } } }),
        json!({ "status": "thinking" }),
        json!({ "systemMessage": { "data": { "result": {
            "data": rows, "schema": { "fields": [{ "name": "i" }] }, "name": "t"
        } } } }),
        json!({ "systemMessage": { "text": { "parts": ["Summary", "File: t.pdf"] } } }),
    ]
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("\n")
}

#[tokio::test]
async fn record_show_summary_and_purge() {
    let tmp = tempdir().unwrap();
    let state = build_state(&test_config(tmp.path())).await.unwrap();

    let events = commands::parse_events(&capture());
    let report = commands::record(&state, "msg-a", events).await.unwrap();

    assert_eq!(report.chunks_classified, 3);
    assert_eq!(report.events_skipped, 1);
    assert_eq!(report.fragments_stored, 5);
    assert!(!report.is_degraded());

    let shown = commands::show(&state, "msg-a").unwrap();
    let chunks = shown["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0]["type"], "sql");
    assert_eq!(chunks[1]["type"], "data");
    assert_eq!(chunks[1]["data"]["rows"].as_array().unwrap().len(), 320);
    assert_eq!(chunks[1]["data"]["rows"][319]["i"], 319);
    assert_eq!(chunks[2]["data"]["documentReferences"][0]["filename"], "t.pdf");

    let summary = commands::summary(&state, "msg-a").unwrap();
    assert_eq!(summary.total_fragments, 5);
    assert_eq!(summary.total_groups, 3);
    assert!(summary.has_split_data);

    assert_eq!(commands::list(&state).unwrap(), vec!["msg-a".to_string()]);

    assert_eq!(commands::purge(&state, "msg-a").await.unwrap(), 5);
    let after = commands::show(&state, "msg-a").unwrap();
    assert_eq!(after["available"], false);
}

#[tokio::test]
async fn rerecording_the_same_capture_is_idempotent() {
    let tmp = tempdir().unwrap();
    let state = build_state(&test_config(tmp.path())).await.unwrap();

    for _ in 0..2 {
        let events = commands::parse_events(&capture());
        commands::record(&state, "msg-b", events).await.unwrap();
    }

    let summary = commands::summary(&state, "msg-b").unwrap();
    assert_eq!(summary.total_fragments, 5);

    let history = commands::history(&state).unwrap();
    assert_eq!(history.messages.len(), 1);
    assert!(history.failures.is_empty());
}
