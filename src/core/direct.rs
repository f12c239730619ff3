use crate::core::fanout::{join_outcomes, race, read_reply, transport_failure, Settled};
use crate::domain::endpoint::{BodyMode, DispatchMode, ServiceEndpoint};
use crate::domain::model::{Artifact, DispatchRequest, DispatchResult};
use crate::domain::ports::{CallContext, DispatchStrategy, OutcomeSink};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

/// 直接扇出：每個服務一個並發請求
pub struct DirectFanOut {
    client: Client,
    services: Vec<ServiceEndpoint>,
}

impl DirectFanOut {
    pub fn new(client: Client, services: Vec<ServiceEndpoint>) -> Self {
        Self { client, services }
    }

    fn endpoint(&self, service_id: &str) -> Option<&ServiceEndpoint> {
        self.services.iter().find(|s| s.id == service_id)
    }

    fn build_request(&self, endpoint: &ServiceEndpoint, artifact: &Artifact) -> Result<RequestBuilder, Settled> {
        let mut request = self.client.post(&endpoint.endpoint);

        // 添加自定義標頭
        if let Some(headers) = &endpoint.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let request = match endpoint.body {
            BodyMode::Multipart => request.multipart(file_form(artifact)?),
            BodyMode::Json => request.json(&json_body(artifact)),
        };
        Ok(request)
    }

    async fn call(&self, service_id: &str, artifact: &Artifact) -> Settled {
        let Some(endpoint) = self.endpoint(service_id) else {
            return Settled::failed(format!(
                "no endpoint configured for service '{}'",
                service_id
            ));
        };

        let request = match self.build_request(endpoint, artifact) {
            Ok(request) => request,
            Err(settled) => return settled,
        };

        tracing::debug!("📡 {}: POST {}", service_id, endpoint.endpoint);
        match request.send().await {
            Ok(response) => read_reply(response).await,
            Err(e) => transport_failure(&e),
        }
    }
}

#[async_trait::async_trait]
impl DispatchStrategy for DirectFanOut {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Direct
    }

    async fn run(
        &self,
        request: &DispatchRequest,
        ctx: &CallContext,
        on_outcome: OutcomeSink<'_>,
    ) -> DispatchResult {
        let artifact = request.artifact();
        let calls = request.service_ids().iter().map(|service_id| async move {
            let (settled, elapsed) = race(self.call(service_id, artifact), ctx).await;
            settled.into_outcome(service_id, elapsed)
        });

        join_outcomes(calls, on_outcome).await
    }
}

/// 文件放在 `file` 欄位
pub fn file_form(artifact: &Artifact) -> Result<Form, Settled> {
    let part = Part::bytes(artifact.bytes().to_vec())
        .file_name(artifact.file_name().to_string())
        .mime_str(artifact.content_type())
        .map_err(|e| Settled::failed(format!("invalid content type: {}", e)))?;
    Ok(Form::new().part("file", part))
}

/// 文件本身是 JSON 就直接送出，否則包成 `{"text": ...}`
pub fn json_body(artifact: &Artifact) -> Value {
    match serde_json::from_slice::<Value>(artifact.bytes()) {
        Ok(value) => value,
        Err(_) => json!({ "text": String::from_utf8_lossy(artifact.bytes()) }),
    }
}
