use crate::utils::error::{DispatchError, Result};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

/// 單一端點呼叫的結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointResponse {
    pub status: u16,
    pub ok: bool,
    pub elapsed_ms: u64,
    /// JSON 解析失敗時保留原文字串
    pub body: Value,
}

/// 對 `base_url + path` 發一次請求；GET 不帶請求體
pub async fn call_endpoint(
    client: &Client,
    base_url: &str,
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Result<EndpointResponse> {
    if path.trim().is_empty() {
        return Err(DispatchError::InvalidRequest {
            message: "request path cannot be empty".to_string(),
        });
    }

    let url = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut request = client.request(method.clone(), &url);
    if method != Method::GET {
        request = request.json(body.unwrap_or(&Value::Object(Default::default())));
    }

    tracing::debug!("📡 {} {}", method, url);
    let started = Instant::now();
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let elapsed_ms = crate::core::fanout::elapsed_ms(started);

    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

    Ok(EndpointResponse {
        status: status.as_u16(),
        ok: status.is_success(),
        elapsed_ms,
        body,
    })
}
