//! Integration tests for the `patterns`, `parse` and `fetch` command handlers.
//!
//! Uses the shipped pattern files and small temp catalogs.

use std::fs;
use std::path::{Path, PathBuf};

use axum::Json;
use axum::Router;
use axum::routing::post;
use serde_json::{Value, json};
use tempfile::TempDir;

use logmirror_cli::cli::{FetchArgs, OutputFormat};
use logmirror_cli::commands::{fetch, parse, patterns};
use logmirror_cli::output::OutputWriter;
use logmirror_core::config::{CollectorConfig, MirrorConfig};
use logmirror_parse_engine::{CatalogLoader, ParseEngine};

fn shipped_patterns() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../patterns")
}

fn write_pattern(dir: &Path, file: &str, yaml: &str) {
    fs::write(dir.join(file), yaml).expect("should write pattern file");
}

async fn shipped_engine() -> ParseEngine {
    let catalog = CatalogLoader::load_directory(shipped_patterns())
        .await
        .expect("shipped patterns should load");
    ParseEngine::new(std::sync::Arc::new(catalog)).expect("shipped patterns should compile")
}

// ---- patterns ----

#[tokio::test]
async fn test_patterns_list_orders_by_priority() {
    let report = patterns::list(&shipped_patterns())
        .await
        .expect("list should succeed");

    assert_eq!(report.total, 5);
    let ids: Vec<i64> = report.patterns.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 4, 1, 5, 2]);
    assert!(report.patterns[0].fields.contains(&"action_description".to_owned()));
}

#[tokio::test]
async fn test_patterns_list_renders_json() {
    let report = patterns::list(&shipped_patterns()).await.unwrap();
    let mut buffer = Vec::new();
    OutputWriter::new(OutputFormat::Json)
        .render_to(&mut buffer, &report)
        .expect("json rendering should succeed");

    let parsed: Value = serde_json::from_slice(&buffer).expect("output should be JSON");
    assert_eq!(parsed["total"], 5);
    assert_eq!(parsed["patterns"][0]["role"], "system_action");
}

#[tokio::test]
async fn test_patterns_validate_shipped_catalog() {
    let report = patterns::validate(&shipped_patterns())
        .await
        .expect("validate should succeed");
    assert_eq!(report.total_files, 5);
    assert_eq!(report.valid, 5);
    assert_eq!(report.invalid, 0);
    assert_eq!(report.active, 5);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_patterns_validate_reports_every_bad_file() {
    let dir = TempDir::new().unwrap();
    write_pattern(dir.path(), "01-ok.yml", "id: 1\nname: ok\nregex: 'ok'\n");
    write_pattern(dir.path(), "02-bad-regex.yml", "id: 2\nname: bad\nregex: '(unclosed'\n");
    write_pattern(dir.path(), "03-not-yaml.yaml", "id: [\n");
    write_pattern(dir.path(), "README.txt", "ignored");

    let report = patterns::validate(dir.path()).await.unwrap();

    assert_eq!(report.total_files, 3);
    assert_eq!(report.valid, 1);
    assert_eq!(report.invalid, 2);
    let files: Vec<&str> = report.errors.iter().map(|e| e.file.as_str()).collect();
    assert_eq!(files, vec!["02-bad-regex.yml", "03-not-yaml.yaml"]);
}

#[tokio::test]
async fn test_patterns_validate_cross_file_duplicate_id() {
    let dir = TempDir::new().unwrap();
    write_pattern(dir.path(), "a.yml", "id: 9\nname: first\nregex: 'a'\n");
    write_pattern(dir.path(), "b.yml", "id: 9\nname: second\nregex: 'b'\n");

    let report = patterns::validate(dir.path()).await.unwrap();

    assert_eq!(report.valid, 2);
    assert_eq!(report.invalid, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].error.contains("duplicate pattern id 9"));
}

#[tokio::test]
async fn test_patterns_validate_missing_dir_is_error() {
    assert!(patterns::validate(Path::new("/nonexistent/logmirror/patterns")).await.is_err());
}

// ---- parse ----

#[tokio::test]
async fn test_parse_login_message() {
    let engine = shipped_engine().await;
    let report = parse::analyze(
        &engine,
        "User [alice] from [192.168.1.20] signed in to [NAS01] successfully via [password]",
    );

    assert!(report.matched);
    assert_eq!(report.pattern_id, Some(4));
    assert!(!report.system_action);
    let username = report.fields.iter().find(|f| f.name == "username").unwrap();
    assert_eq!(username.value, "alice");
    assert_eq!(report.fields[0].name, "event_type");
    assert_eq!(report.fields[0].value, "user_login");
}

#[tokio::test]
async fn test_parse_system_message() {
    let engine = shipped_engine().await;
    let report = parse::analyze(&engine, "SYSTEM: Volume 1 was expanded");

    assert_eq!(report.pattern_id, Some(3));
    assert!(report.system_action);
    let description = report
        .fields
        .iter()
        .find(|f| f.name == "action_description")
        .unwrap();
    assert_eq!(description.value, "Volume 1 was expanded");
}

#[tokio::test]
async fn test_parse_unmatched_message() {
    let engine = shipped_engine().await;
    let report = parse::analyze(&engine, "kernel: eth0 link up");

    assert!(!report.matched);
    assert!(report.pattern_id.is_none());
    assert!(report.fields.is_empty());

    let mut buffer = Vec::new();
    OutputWriter::new(OutputFormat::Text)
        .render_to(&mut buffer, &report)
        .unwrap();
    assert!(String::from_utf8(buffer).unwrap().contains("UNMATCHED"));
}

#[tokio::test]
async fn test_parse_missing_required_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_pattern(
        dir.path(),
        "alert.yml",
        "id: 20\nname: alert\nregex: 'ALERT'\nfields:\n  - name: code\n    regex: 'code=(\\d+)'\n    required: true\n",
    );
    let catalog = CatalogLoader::load_directory(dir.path()).await.unwrap();
    let engine = ParseEngine::new(std::sync::Arc::new(catalog)).unwrap();

    let report = parse::analyze(&engine, "ALERT raised without a code");

    assert!(report.matched);
    assert!(report.rejected.as_deref().unwrap().contains("code"));
}

// ---- fetch ----

async fn mock_collector() -> String {
    let app = Router::new().route(
        "/api/api.php",
        post(|Json(body): Json<Value>| async move {
            let last_id = body["last_id"].as_i64().unwrap_or(0);
            Json(json!({
                "success": true,
                "data": {
                    "records": [
                        {"id": last_id + 1, "hostname": "nas01", "facility": "user",
                         "message": "SYSTEM: disk2 was unmounted", "port": 514},
                        {"id": last_id + 2, "hostname": "nas01", "facility": "user",
                         "message": "kernel: hello", "port": 514}
                    ],
                    "next_last_id": last_id + 2
                }
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/api.php")
}

fn fetch_config(urls: &[String]) -> MirrorConfig {
    let mut config = MirrorConfig::default();
    config.catalog.pattern_dir = shipped_patterns().display().to_string();
    config.ingest.fetch_timeout_secs = 5;
    config.collectors = urls
        .iter()
        .enumerate()
        .map(|(idx, url)| CollectorConfig {
            id: idx as i64 + 1,
            name: format!("collector-{}", idx + 1),
            url: url.clone(),
            secret_key: "k".to_owned(),
            enabled: true,
            initial_last_id: 100,
        })
        .collect();
    config
}

#[tokio::test]
async fn test_fetch_dry_run_uses_memory_store() {
    let config = fetch_config(&[mock_collector().await]);
    let args = FetchArgs {
        collector: None,
        dry_run: true,
    };

    let report = fetch::run(&config, &args).await.expect("fetch should succeed");

    assert!(report.dry_run);
    assert_eq!(report.backend, "memory");
    assert!(report.summary.failures.is_empty());
    assert_eq!(report.summary.stored(), 2);
    assert_eq!(report.summary.system_actions(), 1);
    assert_eq!(report.summary.unmatched(), 1);
    assert_eq!(report.summary.collectors[0].checkpoint_before, 100);
    assert_eq!(report.summary.collectors[0].checkpoint_after, 102);
}

#[tokio::test]
async fn test_fetch_single_collector_filter() {
    let url = mock_collector().await;
    let config = fetch_config(&[url.clone(), url]);
    let args = FetchArgs {
        collector: Some(2),
        dry_run: true,
    };

    let report = fetch::run(&config, &args).await.unwrap();

    assert_eq!(report.summary.collectors.len(), 1);
    assert_eq!(report.summary.collectors[0].collector_id, 2);
}

#[tokio::test]
async fn test_fetch_unknown_collector_is_config_error() {
    let config = fetch_config(&["http://127.0.0.1:1/api/api.php".to_owned()]);
    let args = FetchArgs {
        collector: Some(42),
        dry_run: true,
    };

    let err = fetch::run(&config, &args).await.err().expect("should fail");
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_fetch_reports_unreachable_collector() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = fetch_config(&[mock_collector().await, format!("http://{addr}/api/api.php")]);
    let args = FetchArgs {
        collector: None,
        dry_run: true,
    };

    let report = fetch::run(&config, &args).await.unwrap();

    assert_eq!(report.summary.collectors.len(), 1);
    assert_eq!(report.summary.failures.len(), 1);
    assert_eq!(report.summary.failures[0].collector_id, 2);

    let mut buffer = Vec::new();
    OutputWriter::new(OutputFormat::Text)
        .render_to(&mut buffer, &report)
        .unwrap();
    let output = String::from_utf8(buffer).unwrap();
    assert!(output.contains("Failed collectors"));
    assert!(output.contains("collector-2"));
}
