use doc_dispatch::config::toml_config::TomlConfig;
use doc_dispatch::config::{ConsoleConfig, Overrides};
use doc_dispatch::core::export::{export_as_html, export_as_json, import_json};
use doc_dispatch::domain::ports::ConfigProvider;
use doc_dispatch::utils::validation::Validate;
use doc_dispatch::{
    Artifact, ConsoleEngine, DispatchOptions, DispatchRequest, DispatchResult, Dispatcher,
    ExportPlan, LocalStorage, ServiceOutcome,
};
use httpmock::prelude::*;
use serde_json::json;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[tokio::test]
async fn test_json_export_round_trip_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path());

    let mut result = DispatchResult::new().with_task_id(Some("task-1".to_string()));
    result.insert(ServiceOutcome::success(
        "document_slicer",
        Some(200),
        88,
        json!({"part_0": "Intro", "part_1": "Terms", "score": 0.25, "nested": [null, true]}),
    ));
    result.insert(
        ServiceOutcome::failure("ai_sb", None, 3, "connection failed").with_raw_body("<html/>"),
    );

    let location = export_as_json(&storage, &result, "exports/result.json")
        .await
        .unwrap();
    assert!(location.ends_with("result.json"));

    let restored: DispatchResult = import_json(&storage, "exports/result.json").await.unwrap();
    assert_eq!(restored, result);

    let text = std::fs::read_to_string(temp_dir.path().join("exports/result.json")).unwrap();
    assert!(text.contains("\n  \"task_id\": \"task-1\""));
}

#[tokio::test]
async fn test_html_export_is_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path());
    let fragment = "<table><tr><td>Проверка</td></tr></table>";

    export_as_html(&storage, fragment, "ai_sb.html").await.unwrap();

    let written = std::fs::read_to_string(temp_dir.path().join("ai_sb.html")).unwrap();
    assert_eq!(written, fragment);
}

#[tokio::test]
async fn test_console_session_from_toml_config() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/legal");
            then.status(200).json_body(json!({"html": "<p>legal</p>"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/accountant");
            then.status(200).json_body(json!({"document_html": "<p>acc</p>"}));
        })
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[console]
name = "Integration console"

[dispatch]
call_timeout_seconds = 5

[[services]]
id = "ai_legal"
endpoint = "{legal}"

[[services]]
id = "ai_accountant"
endpoint = "{accountant}"

[export]
output_path = "/should/be/overridden"
"#,
        legal = server.url("/legal"),
        accountant = server.url("/accountant"),
    )
    .unwrap();

    let overrides = Overrides {
        output_path: Some(temp_dir.path().display().to_string()),
        ..Default::default()
    };
    let config = ConsoleConfig::load(file.path().to_str().unwrap(), &overrides).unwrap();
    config.validate().unwrap();
    assert_eq!(config.name, "Integration console");

    let engine = ConsoleEngine::new(
        Dispatcher::from_config(&config).unwrap(),
        LocalStorage::new(config.output_path()),
    );
    let request = DispatchRequest::new(
        Artifact::new("contract.docx", b"body".to_vec()),
        config.service_ids(),
    )
    .unwrap();
    let plan = ExportPlan {
        result_name: "result.json".to_string(),
        ..Default::default()
    };

    let session = engine
        .run(&request, DispatchOptions::default(), &plan)
        .await
        .unwrap();

    assert_eq!(session.result.succeeded(), 2);
    assert_eq!(session.report_paths.len(), 2);
    assert!(temp_dir.path().join("ai_accountant_report.html").exists());
    assert!(temp_dir.path().join("ai_legal_report.html").exists());

    let saved = std::fs::read(temp_dir.path().join("result.json")).unwrap();
    let restored: DispatchResult = serde_json::from_slice(&saved).unwrap();
    assert_eq!(restored, session.result);
}

#[test]
fn test_example_config_file_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/dispatch.example.toml");
    let config = TomlConfig::from_file(path).unwrap();

    config.validate().unwrap();
    assert!(!config.service_endpoints().is_empty());
    assert!(config.gateway().is_some());
}
