//! 扇出/匯合的共用部分
//!
//! 每個呼叫都與自己的截止時間和取消訊號競速，計時從第一次 poll 開始，
//! 到得知終態為止。匯合時逐一收下結果，完成順序不受限制。

use crate::domain::model::{DispatchResult, ServiceOutcome};
use crate::domain::ports::{CallContext, OutcomeSink};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::future::Future;
use tokio::time::Instant;

/// 單次 HTTP 交換的終態
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Payload {
        http_status: u16,
        value: Value,
    },
    Failed {
        http_status: Option<u16>,
        message: String,
        raw_body: Option<String>,
    },
}

impl Settled {
    pub fn failed(message: impl Into<String>) -> Self {
        Settled::Failed {
            http_status: None,
            message: message.into(),
            raw_body: None,
        }
    }

    pub fn into_outcome(self, service_id: &str, elapsed_ms: u64) -> ServiceOutcome {
        match self {
            Settled::Payload { http_status, value } => {
                ServiceOutcome::success(service_id, Some(http_status), elapsed_ms, value)
            }
            Settled::Failed {
                http_status,
                message,
                raw_body,
            } => {
                let outcome = ServiceOutcome::failure(service_id, http_status, elapsed_ms, message);
                match raw_body {
                    Some(body) => outcome.with_raw_body(body),
                    None => outcome,
                }
            }
        }
    }
}

pub fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// 讓呼叫與截止時間、取消訊號競速，返回終態與耗時
pub async fn race<F>(call: F, ctx: &CallContext) -> (Settled, u64)
where
    F: Future<Output = Settled>,
{
    let started = Instant::now();
    let call_deadline = match (ctx.deadline, ctx.call_timeout.map(|t| started + t)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    let expired = async {
        match call_deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    let cancelled = async {
        match &ctx.cancel {
            Some(signal) => signal.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    let settled = tokio::select! {
        settled = call => settled,
        _ = expired => Settled::failed(format!(
            "timed out after {} ms without a response",
            elapsed_ms(started)
        )),
        _ = cancelled => Settled::failed("cancelled before the service responded"),
    };

    (settled, elapsed_ms(started))
}

/// 讀取回應：非 2xx 或無法解析的內容都記為失敗，並保留原始內容
pub async fn read_reply(response: reqwest::Response) -> Settled {
    let status = response.status();
    let code = status.as_u16();

    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            return Settled::Failed {
                http_status: Some(code),
                message: format!("failed to read response body: {}", e),
                raw_body: None,
            }
        }
    };

    if !status.is_success() {
        let message = match error_detail(&text) {
            Some(detail) => format!("HTTP {}: {}", code, detail),
            None => format!("HTTP {}", code),
        };
        return Settled::Failed {
            http_status: Some(code),
            message,
            raw_body: non_empty(text),
        };
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Settled::Payload {
            http_status: code,
            value,
        },
        Err(e) => Settled::Failed {
            http_status: Some(code),
            message: format!("malformed JSON response: {}", e),
            raw_body: non_empty(text),
        },
    }
}

pub fn transport_failure(error: &reqwest::Error) -> Settled {
    let message = if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_timeout() {
        format!("request timed out: {}", error)
    } else {
        format!("request failed: {}", error)
    };
    Settled::Failed {
        http_status: error.status().map(|s| s.as_u16()),
        message,
        raw_body: None,
    }
}

/// FastAPI 風格的錯誤內容 `{"detail": "..."}`
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn log_outcome(outcome: &ServiceOutcome) {
    match outcome.error_message() {
        None => tracing::info!(
            service = %outcome.service_id,
            elapsed_ms = outcome.elapsed_ms,
            "✅ {} settled",
            outcome.service_id
        ),
        Some(message) => tracing::warn!(
            service = %outcome.service_id,
            elapsed_ms = outcome.elapsed_ms,
            "❌ {} failed: {}",
            outcome.service_id,
            message
        ),
    }
}

/// 同時推進所有呼叫，全部到達終態後才返回
pub async fn join_outcomes<I, F>(calls: I, on_outcome: OutcomeSink<'_>) -> DispatchResult
where
    I: IntoIterator<Item = F>,
    F: Future<Output = ServiceOutcome>,
{
    let mut in_flight: FuturesUnordered<F> = calls.into_iter().collect();
    let mut result = DispatchResult::new();

    while let Some(outcome) = in_flight.next().await {
        log_outcome(&outcome);
        on_outcome(&outcome);
        result.insert(outcome);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::cancel_pair;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_race_times_out_hanging_call() {
        let ctx = CallContext {
            call_timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        };

        let (settled, elapsed) = race(std::future::pending::<Settled>(), &ctx).await;

        match settled {
            Settled::Failed { message, .. } => assert!(message.contains("timed out")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(elapsed >= 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_prefers_earlier_deadline() {
        let ctx = CallContext {
            deadline: Some(Instant::now() + Duration::from_millis(50)),
            call_timeout: Some(Duration::from_secs(10)),
            cancel: None,
        };

        let (_, elapsed) = race(std::future::pending::<Settled>(), &ctx).await;
        assert!((50..1000).contains(&elapsed));
    }

    #[tokio::test]
    async fn test_race_observes_cancellation() {
        let (handle, signal) = cancel_pair();
        let ctx = CallContext {
            cancel: Some(signal),
            ..Default::default()
        };
        handle.cancel();

        let (settled, _) = race(std::future::pending::<Settled>(), &ctx).await;
        assert_eq!(
            settled,
            Settled::failed("cancelled before the service responded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_collects_out_of_order_completions() {
        let delays = [("slow", 120u64), ("fast", 40u64)];
        let calls = delays.iter().map(|(id, delay)| async move {
            let started = Instant::now();
            tokio::time::sleep(Duration::from_millis(*delay)).await;
            ServiceOutcome::success(*id, Some(200), elapsed_ms(started), Value::Null)
        });

        let mut order = Vec::new();
        let mut sink = |o: &ServiceOutcome| order.push(o.service_id.clone());
        let result = join_outcomes(calls, &mut sink).await;

        assert_eq!(result.len(), 2);
        assert_eq!(order, vec!["fast".to_string(), "slow".to_string()]);
        assert!(result.get("slow").unwrap().elapsed_ms >= 120);
        assert!(result.get("fast").unwrap().elapsed_ms >= 40);
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(
            error_detail(r#"{"detail": "Empty text"}"#),
            Some("Empty text".to_string())
        );
        assert_eq!(error_detail("Internal Server Error"), None);
        assert_eq!(error_detail(r#"{"detail": null}"#), None);
    }
}
