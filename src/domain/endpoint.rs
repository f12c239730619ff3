use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMode {
    /// multipart/form-data，文件放在 `file` 欄位
    #[default]
    Multipart,
    /// JSON 請求體
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// 每個服務各發一次請求
    #[default]
    Direct,
    /// 單次呼叫預先聚合的 gateway
    Gateway,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub id: String,
    pub endpoint: String,
    #[serde(default)]
    pub body: BodyMode,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl ServiceEndpoint {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            body: BodyMode::Multipart,
            health: None,
            headers: None,
        }
    }

    pub fn with_body(mut self, body: BodyMode) -> Self {
        self.body = body;
        self
    }

    pub fn with_health(mut self, health: impl Into<String>) -> Self {
        self.health = Some(health.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEndpoint {
    pub endpoint: String,
    pub tasks_endpoint: Option<String>,
    pub headers: HashMap<String, String>,
}

impl GatewayEndpoint {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            tasks_endpoint: None,
            headers: HashMap::new(),
        }
    }
}

/// Dispatcher 的完整設定，在建構時一次傳入
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub mode: DispatchMode,
    pub services: Vec<ServiceEndpoint>,
    pub gateway: Option<GatewayEndpoint>,
    /// 整次派送的上限
    pub dispatch_timeout: Option<Duration>,
    /// 單一呼叫的上限
    pub call_timeout: Option<Duration>,
}

impl DispatchSettings {
    pub fn direct(services: Vec<ServiceEndpoint>) -> Self {
        Self {
            mode: DispatchMode::Direct,
            services,
            gateway: None,
            dispatch_timeout: None,
            call_timeout: None,
        }
    }

    pub fn gateway(gateway: GatewayEndpoint) -> Self {
        Self {
            mode: DispatchMode::Gateway,
            services: Vec::new(),
            gateway: Some(gateway),
            dispatch_timeout: None,
            call_timeout: None,
        }
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = Some(timeout);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn service(&self, service_id: &str) -> Option<&ServiceEndpoint> {
        self.services.iter().find(|s| s.id == service_id)
    }
}
