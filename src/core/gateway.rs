//! 預先聚合的 gateway
//!
//! gateway 回傳以服務 ID 為鍵的 JSON 物件，外加可選的 `task_id`。
//! 每個條目可能是服務的原始回應，也可能是
//! `{url, status, response, error, elapsed_ms}` 的外層包裝。

use crate::core::direct::file_form;
use crate::core::fanout::{log_outcome, race, read_reply, transport_failure, Settled};
use crate::domain::endpoint::{DispatchMode, GatewayEndpoint};
use crate::domain::model::{DispatchRequest, DispatchResult, ServiceOutcome};
use crate::domain::ports::{CallContext, DispatchStrategy, OutcomeSink};
use crate::utils::error::{DispatchError, Result};
use reqwest::Client;
use serde_json::{Map, Value};

const TASK_ID_FIELD: &str = "task_id";

pub struct GatewayFanOut {
    client: Client,
    gateway: GatewayEndpoint,
}

impl GatewayFanOut {
    pub fn new(client: Client, gateway: GatewayEndpoint) -> Self {
        Self { client, gateway }
    }

    async fn call(&self, request: &DispatchRequest) -> Settled {
        let form = match file_form(request.artifact()) {
            Ok(form) => form.text("services", request.service_ids().join(",")),
            Err(settled) => return settled,
        };

        let mut builder = self.client.post(&self.gateway.endpoint).multipart(form);
        for (key, value) in &self.gateway.headers {
            builder = builder.header(key, value);
        }

        tracing::debug!(
            "📡 gateway: POST {} for {} services",
            self.gateway.endpoint,
            request.service_ids().len()
        );
        match builder.send().await {
            Ok(response) => read_reply(response).await,
            Err(e) => transport_failure(&e),
        }
    }

    /// 依 task_id 查詢 gateway 上的任務狀態
    pub async fn task_status(&self, task_id: &str) -> Result<DispatchResult> {
        let base = self
            .gateway
            .tasks_endpoint
            .as_deref()
            .ok_or_else(|| DispatchError::MissingConfigError {
                field: "gateway.tasks_endpoint".to_string(),
            })?;
        let url = format!("{}/{}", base.trim_end_matches('/'), task_id);

        let started = tokio::time::Instant::now();
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let reply: Value = response.json().await?;
        let elapsed = crate::core::fanout::elapsed_ms(started);

        let mut result = split_reply(None, reply, elapsed);
        if result.task_id.is_none() {
            result.task_id = Some(task_id.to_string());
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl DispatchStrategy for GatewayFanOut {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Gateway
    }

    async fn run(
        &self,
        request: &DispatchRequest,
        ctx: &CallContext,
        on_outcome: OutcomeSink<'_>,
    ) -> DispatchResult {
        let (settled, elapsed) = race(self.call(request), ctx).await;

        let result = match settled {
            Settled::Payload { value, .. } => {
                split_reply(Some(request.service_ids()), value, elapsed)
            }
            failed => {
                // gateway 本身失敗：每個服務都記一筆相同的失敗
                let mut result = DispatchResult::new();
                for service_id in request.service_ids() {
                    result.insert(failed.clone().into_outcome(service_id, elapsed));
                }
                result
            }
        };

        for outcome in result.iter() {
            log_outcome(outcome);
            on_outcome(outcome);
        }
        result
    }
}

/// 把 gateway 回應拆成各服務的結果；`requested` 為 None 時取所有物件型條目
pub fn split_reply(requested: Option<&[String]>, reply: Value, elapsed_ms: u64) -> DispatchResult {
    let mut entries = match reply {
        Value::Object(map) => map,
        other => {
            let mut result = DispatchResult::new();
            for service_id in requested.unwrap_or_default() {
                result.insert(
                    ServiceOutcome::failure(
                        service_id.as_str(),
                        None,
                        elapsed_ms,
                        "gateway reply is not a JSON object",
                    )
                    .with_raw_body(other.to_string()),
                );
            }
            return result;
        }
    };

    let task_id = take_task_id(&mut entries);
    let mut result = DispatchResult::new().with_task_id(task_id);

    match requested {
        Some(service_ids) => {
            for service_id in service_ids {
                let outcome = match entries.remove(service_id) {
                    None | Some(Value::Null) => ServiceOutcome::failure(
                        service_id.as_str(),
                        None,
                        elapsed_ms,
                        "gateway returned no result for this service",
                    ),
                    Some(entry) => entry_outcome(service_id, entry, elapsed_ms),
                };
                result.insert(outcome);
            }
        }
        None => {
            for (service_id, entry) in entries {
                if entry.is_object() {
                    result.insert(entry_outcome(&service_id, entry, elapsed_ms));
                }
            }
        }
    }

    result
}

fn take_task_id(entries: &mut Map<String, Value>) -> Option<String> {
    match entries.remove(TASK_ID_FIELD)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn entry_outcome(service_id: &str, entry: Value, fallback_elapsed: u64) -> ServiceOutcome {
    let elapsed_ms = entry
        .get("elapsed_ms")
        .and_then(Value::as_f64)
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .map(|ms| ms.round() as u64)
        .unwrap_or(fallback_elapsed);

    // 某些服務自己的 `status` 是 0/1，只有落在 HTTP 範圍內才當作狀態碼
    let http_status = entry
        .get("status")
        .and_then(Value::as_u64)
        .filter(|code| (100..=599).contains(code))
        .map(|code| code as u16);

    let error = entry
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if let Some(message) = error {
        return with_response_text(
            ServiceOutcome::failure(service_id, http_status, elapsed_ms, message),
            &entry,
        );
    }

    if let Some(code) = http_status.filter(|code| !(200..300).contains(code)) {
        return with_response_text(
            ServiceOutcome::failure(service_id, Some(code), elapsed_ms, format!("HTTP {}", code)),
            &entry,
        );
    }

    ServiceOutcome::success(service_id, http_status, elapsed_ms, entry)
}

fn with_response_text(outcome: ServiceOutcome, entry: &Value) -> ServiceOutcome {
    match entry.get("response") {
        Some(Value::String(text)) if !text.is_empty() => outcome.with_raw_body(text.clone()),
        Some(Value::Null) | None => outcome,
        Some(other) => outcome.with_raw_body(other.to_string()),
    }
}
