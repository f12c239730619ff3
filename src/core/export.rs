use crate::core::normalizer::{display_name, extract_report};
use crate::domain::model::DispatchResult;
use crate::domain::ports::Storage;
use crate::utils::error::{DispatchError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn check_filename(filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(DispatchError::ExportError {
            filename: filename.to_string(),
            message: "file name cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// 以 2 格縮排寫出 JSON，返回實際位置
pub async fn export_as_json<S, T>(storage: &S, value: &T, filename: &str) -> Result<String>
where
    S: Storage,
    T: Serialize + ?Sized,
{
    check_filename(filename)?;
    let data = serde_json::to_vec_pretty(value)?;
    tracing::debug!("Writing {} ({} bytes)", filename, data.len());
    storage.write_file(filename, &data).await?;
    Ok(storage.location(filename))
}

pub async fn import_json<S, T>(storage: &S, filename: &str) -> Result<T>
where
    S: Storage,
    T: DeserializeOwned,
{
    let data = storage.read_file(filename).await?;
    Ok(serde_json::from_slice(&data)?)
}

/// 原樣寫出 HTML 片段
pub async fn export_as_html<S: Storage>(storage: &S, html: &str, filename: &str) -> Result<String> {
    check_filename(filename)?;
    storage.write_file(filename, html.as_bytes()).await?;
    Ok(storage.location(filename))
}

/// `<service_id><suffix>`；服務 ID 不可跳出輸出目錄
pub fn service_file_name(service_id: &str, suffix: &str) -> Result<String> {
    let unsafe_id = service_id.is_empty()
        || service_id == "."
        || service_id == ".."
        || service_id.contains(['/', '\\', '\0']);
    if unsafe_id {
        return Err(DispatchError::ExportError {
            filename: format!("{}{}", service_id, suffix),
            message: "service id cannot be used as a file name".to_string(),
        });
    }
    Ok(format!("{}{}", service_id, suffix))
}

/// 每個有報告的服務寫一個 `<service_id>_report.html`
pub async fn export_reports<S: Storage>(storage: &S, result: &DispatchResult) -> Result<Vec<String>> {
    let mut written = Vec::new();
    for outcome in result.iter() {
        if let Some(html) = outcome.payload().and_then(extract_report) {
            let filename = service_file_name(&outcome.service_id, "_report.html")?;
            written.push(export_as_html(storage, html, &filename).await?);
        }
    }
    Ok(written)
}

/// 把片段包成可直接開啟的完整文件
pub fn preview_document(title: &str, fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_text(title),
        fragment
    )
}

pub fn preview_for(result: &DispatchResult, service_id: &str) -> Option<String> {
    let html = result.get(service_id)?.payload().and_then(extract_report)?;
    Some(preview_document(display_name(service_id), html))
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// 預設檔名，例如 `dispatch_20261018T101500.json`
pub fn default_export_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("dispatch_{}.json", now.format("%Y%m%dT%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ServiceOutcome;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                DispatchError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("mem://{}", path)
        }
    }

    fn sample_result() -> DispatchResult {
        let mut result = DispatchResult::new().with_task_id(Some("demo-task".to_string()));
        result.insert(ServiceOutcome::success(
            "ai_legal",
            Some(200),
            120,
            json!({"html": "<p>ok</p>", "overall_score": 7.5, "sections": [{"number": 1}]}),
        ));
        result.insert(
            ServiceOutcome::failure("ai_econom", Some(500), 40, "HTTP 500")
                .with_raw_body("Internal Server Error"),
        );
        result
    }

    #[tokio::test]
    async fn test_json_export_round_trip() {
        let storage = MockStorage::default();
        let result = sample_result();

        let location = export_as_json(&storage, &result, "result.json").await.unwrap();
        assert_eq!(location, "mem://result.json");

        let restored: DispatchResult = import_json(&storage, "result.json").await.unwrap();
        assert_eq!(restored, result);
    }

    #[tokio::test]
    async fn test_json_export_is_pretty_printed() {
        let storage = MockStorage::default();
        export_as_json(&storage, &json!({"a": 1}), "a.json").await.unwrap();

        let data = storage.get_file("a.json").await.unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[tokio::test]
    async fn test_empty_filename_rejected() {
        let storage = MockStorage::default();
        let err = export_as_html(&storage, "<p/>", "  ").await.unwrap_err();
        assert!(matches!(err, DispatchError::ExportError { .. }));
    }

    #[tokio::test]
    async fn test_export_reports_only_for_outcomes_with_html() {
        let storage = MockStorage::default();
        let written = export_reports(&storage, &sample_result()).await.unwrap();

        assert_eq!(written, vec!["mem://ai_legal_report.html".to_string()]);
        let html = storage.get_file("ai_legal_report.html").await.unwrap();
        assert_eq!(html, b"<p>ok</p>");
    }

    #[tokio::test]
    async fn test_export_reports_rejects_ids_that_escape_the_directory() {
        let storage = MockStorage::default();
        let mut result = DispatchResult::new();
        result.insert(ServiceOutcome::success(
            "../../etc/ai_legal",
            Some(200),
            5,
            json!({"html": "<p>x</p>"}),
        ));

        let err = export_reports(&storage, &result).await.unwrap_err();
        assert!(matches!(err, DispatchError::ExportError { .. }));
        assert!(storage.files.lock().await.is_empty());
    }

    #[test]
    fn test_service_file_name() {
        assert_eq!(
            service_file_name("ai_legal", "_report.html").unwrap(),
            "ai_legal_report.html"
        );
        for bad in ["", ".", "..", "a/b", "a\\b", "../ai_sb"] {
            assert!(service_file_name(bad, "_report.html").is_err(), "id: {:?}", bad);
        }
    }

    #[test]
    fn test_preview_document_wraps_fragment() {
        let doc = preview_document("AI <Legal>", "<p>ok</p>");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>AI &lt;Legal&gt;</title>"));
        assert!(doc.contains("<body>\n<p>ok</p>\n</body>"));
    }

    #[test]
    fn test_preview_for_missing_report() {
        let result = sample_result();
        assert!(preview_for(&result, "ai_legal").unwrap().contains("<title>AI Legal</title>"));
        assert_eq!(preview_for(&result, "ai_econom"), None);
        assert_eq!(preview_for(&result, "unknown"), None);
    }

    #[test]
    fn test_default_export_name() {
        let now = chrono::Local.with_ymd_and_hms(2026, 10, 18, 10, 15, 0).unwrap();
        assert_eq!(default_export_name(now), "dispatch_20261018T101500.json");
    }
}
