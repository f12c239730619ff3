use crate::utils::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// 上傳的文件，派送開始後不可變
#[derive(Debug, Clone)]
pub struct Artifact {
    file_name: String,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn guess_content_type(file_name: &str) -> &'static str {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("rtf") => "application/rtf",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// 一次派送：文件 + 目標服務（有序、不重複）
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    artifact: Artifact,
    service_ids: Vec<String>,
}

impl DispatchRequest {
    pub fn new<I, S>(artifact: Artifact, service_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if artifact.is_empty() {
            return Err(DispatchError::MissingArtifact);
        }

        let service_ids: Vec<String> = service_ids.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for id in &service_ids {
            if !seen.insert(id.as_str()) {
                return Err(DispatchError::InvalidRequest {
                    message: format!("service id '{}' listed more than once", id),
                });
            }
        }

        Ok(Self {
            artifact,
            service_ids,
        })
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn service_ids(&self) -> &[String] {
        &self.service_ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeKind {
    Success {
        payload: Value,
    },
    Failure {
        error_message: String,
        /// 無法解析時保留原始回應內容
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_body: Option<String>,
    },
}

/// 單一服務的終態結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOutcome {
    pub service_id: String,
    #[serde(default)]
    pub http_status: Option<u16>,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

impl ServiceOutcome {
    pub fn success(
        service_id: impl Into<String>,
        http_status: Option<u16>,
        elapsed_ms: u64,
        payload: Value,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            http_status,
            elapsed_ms,
            kind: OutcomeKind::Success { payload },
        }
    }

    pub fn failure(
        service_id: impl Into<String>,
        http_status: Option<u16>,
        elapsed_ms: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            http_status,
            elapsed_ms,
            kind: OutcomeKind::Failure {
                error_message: error_message.into(),
                raw_body: None,
            },
        }
    }

    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        if let OutcomeKind::Failure { raw_body, .. } = &mut self.kind {
            *raw_body = Some(body.into());
        }
        self
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.kind {
            OutcomeKind::Success { .. } => OutcomeStatus::Success,
            OutcomeKind::Failure { .. } => OutcomeStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == OutcomeStatus::Success
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.kind {
            OutcomeKind::Success { payload } => Some(payload),
            OutcomeKind::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.kind {
            OutcomeKind::Success { .. } => None,
            OutcomeKind::Failure { error_message, .. } => Some(error_message),
        }
    }

    pub fn raw_body(&self) -> Option<&str> {
        match &self.kind {
            OutcomeKind::Success { .. } => None,
            OutcomeKind::Failure { raw_body, .. } => raw_body.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub outcomes: BTreeMap<String, ServiceOutcome>,
}

impl DispatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_id(mut self, task_id: Option<String>) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn insert(&mut self, outcome: ServiceOutcome) {
        self.outcomes.insert(outcome.service_id.clone(), outcome);
    }

    pub fn get(&self, service_id: &str) -> Option<&ServiceOutcome> {
        self.outcomes.get(service_id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceOutcome> {
        self.outcomes.values()
    }

    pub fn succeeded(&self) -> usize {
        self.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}
