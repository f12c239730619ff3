use crate::core::cancel::CancelSignal;
use crate::core::direct::DirectFanOut;
use crate::core::fanout::{elapsed_ms, join_outcomes, race, read_reply, transport_failure, Settled};
use crate::core::gateway::GatewayFanOut;
use crate::domain::catalog;
use crate::domain::endpoint::{DispatchMode, DispatchSettings, ServiceEndpoint};
use crate::domain::model::{Artifact, DispatchRequest, DispatchResult, ServiceOutcome};
use crate::domain::ports::{CallContext, ConfigProvider, DispatchStrategy};
use crate::utils::error::{DispatchError, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// 呼叫端附加的條件，與設定中的上限取較嚴者
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelSignal>,
}

impl DispatchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

pub struct Dispatcher {
    settings: DispatchSettings,
    client: Client,
    strategy: Box<dyn DispatchStrategy>,
}

impl Dispatcher {
    pub fn new(settings: DispatchSettings) -> Result<Self> {
        Self::with_client(settings, Client::new())
    }

    pub fn with_client(settings: DispatchSettings, client: Client) -> Result<Self> {
        let strategy: Box<dyn DispatchStrategy> = match settings.mode {
            DispatchMode::Direct => {
                Box::new(DirectFanOut::new(client.clone(), settings.services.clone()))
            }
            DispatchMode::Gateway => {
                let gateway = settings.gateway.clone().ok_or_else(|| {
                    DispatchError::MissingConfigError {
                        field: "gateway.endpoint".to_string(),
                    }
                })?;
                Box::new(GatewayFanOut::new(client.clone(), gateway))
            }
        };

        Ok(Self {
            settings,
            client,
            strategy,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let settings = DispatchSettings {
            mode: config.dispatch_mode(),
            services: config.service_endpoints().to_vec(),
            gateway: config.gateway(),
            dispatch_timeout: config.dispatch_timeout(),
            call_timeout: config.call_timeout(),
        };
        Self::new(settings)
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn mode(&self) -> DispatchMode {
        self.strategy.mode()
    }

    /// 把文件送往每個目標服務，全部到達終態後返回
    pub async fn dispatch(
        &self,
        artifact: &Artifact,
        service_ids: &[String],
    ) -> Result<DispatchResult> {
        let request = DispatchRequest::new(artifact.clone(), service_ids.iter().cloned())?;
        Ok(self.dispatch_with(&request, DispatchOptions::default()).await)
    }

    pub async fn dispatch_with(
        &self,
        request: &DispatchRequest,
        options: DispatchOptions,
    ) -> DispatchResult {
        self.dispatch_with_progress(request, options, |_| {}).await
    }

    /// 每個服務到達終態時呼叫 `on_outcome` 一次
    pub async fn dispatch_with_progress<F>(
        &self,
        request: &DispatchRequest,
        options: DispatchOptions,
        mut on_outcome: F,
    ) -> DispatchResult
    where
        F: FnMut(&ServiceOutcome) + Send,
    {
        let service_ids = request.service_ids();
        if service_ids.is_empty() {
            tracing::info!("No services requested, nothing to dispatch");
            return DispatchResult::new();
        }

        tracing::info!(
            "🚀 Dispatching '{}' ({} bytes) to {} services via {}",
            request.artifact().file_name(),
            request.artifact().len(),
            service_ids.len(),
            self.strategy.name()
        );

        let started = Instant::now();
        let ctx = self.call_context(options, started);
        let mut result = self.strategy.run(request, &ctx, &mut on_outcome).await;

        // 每個請求的 ID 恰好出現一次
        result
            .outcomes
            .retain(|service_id, _| service_ids.contains(service_id));
        for service_id in service_ids {
            if result.get(service_id).is_none() {
                let outcome = ServiceOutcome::failure(
                    service_id.as_str(),
                    None,
                    elapsed_ms(started),
                    "no outcome was recorded for this service",
                );
                on_outcome(&outcome);
                result.insert(outcome);
            }
        }

        tracing::info!(
            "📊 Dispatch finished in {} ms: {} succeeded, {} failed",
            elapsed_ms(started),
            result.succeeded(),
            result.failed()
        );
        result
    }

    /// 查詢 gateway 任務
    pub async fn task_status(&self, task_id: &str) -> Result<DispatchResult> {
        let gateway = self.settings.gateway.clone().ok_or_else(|| {
            DispatchError::MissingConfigError {
                field: "gateway.endpoint".to_string(),
            }
        })?;
        GatewayFanOut::new(self.client.clone(), gateway)
            .task_status(task_id)
            .await
    }

    /// 對每個服務的 health 端點做一次扇出
    pub async fn check_health(&self, service_ids: &[String]) -> DispatchResult {
        let started = Instant::now();
        let ctx = self.call_context(DispatchOptions::default(), started);

        let calls = service_ids.iter().map(|service_id| {
            let ctx = &ctx;
            async move {
                let (settled, elapsed) = race(self.health_call(service_id), ctx).await;
                settled.into_outcome(service_id, elapsed)
            }
        });

        let mut ignore = |_: &ServiceOutcome| {};
        join_outcomes(calls, &mut ignore).await
    }

    async fn health_call(&self, service_id: &str) -> Settled {
        let Some(url) = self.settings.service(service_id).and_then(health_url) else {
            return Settled::failed(format!(
                "no health endpoint configured for service '{}'",
                service_id
            ));
        };

        tracing::debug!("🩺 {}: GET {}", service_id, url);
        match self.client.get(url.as_str()).send().await {
            Ok(response) => read_reply(response).await,
            Err(e) => transport_failure(&e),
        }
    }

    fn call_context(&self, options: DispatchOptions, started: Instant) -> CallContext {
        let limit = match (options.timeout, self.settings.dispatch_timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        CallContext {
            deadline: limit.map(|limit| started + limit),
            call_timeout: self.settings.call_timeout,
            cancel: options.cancel,
        }
    }
}

/// 未設定 `health` 時，已知服務使用目錄中的預設路徑，接在 endpoint 的來源之後
pub fn health_url(service: &ServiceEndpoint) -> Option<String> {
    if let Some(health) = &service.health {
        return Some(health.clone());
    }
    let descriptor = catalog::lookup(&service.id)?;
    let base = Url::parse(&service.endpoint).ok()?;
    base.join(descriptor.health_path).ok().map(String::from)
}
