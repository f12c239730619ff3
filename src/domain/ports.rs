use crate::core::cancel::CancelSignal;
use crate::domain::endpoint::{DispatchMode, GatewayEndpoint, ServiceEndpoint};
use crate::domain::model::{DispatchRequest, DispatchResult, ServiceOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn dispatch_mode(&self) -> DispatchMode;
    fn service_endpoints(&self) -> &[ServiceEndpoint];
    fn gateway(&self) -> Option<GatewayEndpoint>;
    fn dispatch_timeout(&self) -> Option<Duration>;
    fn call_timeout(&self) -> Option<Duration>;
    fn output_path(&self) -> &str;
}

/// 每次派送的執行條件：截止時間與取消訊號
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub deadline: Option<Instant>,
    pub call_timeout: Option<Duration>,
    pub cancel: Option<CancelSignal>,
}

/// 每個服務到達終態時呼叫一次，順序不定
pub type OutcomeSink<'a> = &'a mut (dyn FnMut(&ServiceOutcome) + Send);

/// 派送策略：直接扇出或 gateway。結果必須涵蓋每個請求的 ID
#[async_trait]
pub trait DispatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn mode(&self) -> DispatchMode;

    async fn run(
        &self,
        request: &DispatchRequest,
        ctx: &CallContext,
        on_outcome: OutcomeSink<'_>,
    ) -> DispatchResult;
}
