//! 結果正規化與內嵌 HTML 報告擷取
//!
//! 報告位置由一組有序的探測規則描述：先在外層物件依欄位順序檢查，
//! 再檢查巢狀的 `response` 物件。第一個非空字串即為報告。

use crate::domain::catalog;
use crate::domain::model::{DispatchResult, OutcomeStatus, ServiceOutcome};
use serde::Serialize;
use serde_json::Value;

/// 報告欄位，越前面優先權越高
pub const REPORT_FIELDS: [&str; 4] = ["html", "html_report", "report_html", "document_html"];

const NESTED_ENVELOPE: &str = "response";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeScope {
    Root,
    Nested(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub scope: ProbeScope,
    pub field: &'static str,
}

impl Probe {
    fn candidate<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        match self.scope {
            ProbeScope::Root => Some(payload),
            ProbeScope::Nested(key) => payload.get(key),
        }
    }

    pub fn apply<'a>(&self, payload: &'a Value) -> Option<&'a str> {
        self.candidate(payload)?
            .as_object()?
            .get(self.field)?
            .as_str()
            .filter(|s| !s.is_empty())
    }
}

/// 外層全部欄位在前，`response` 內的欄位在後
pub fn report_probes() -> Vec<Probe> {
    [ProbeScope::Root, ProbeScope::Nested(NESTED_ENVELOPE)]
        .into_iter()
        .flat_map(|scope| REPORT_FIELDS.into_iter().map(move |field| Probe { scope, field }))
        .collect()
}

pub fn extract_report_with<'a>(probes: &[Probe], payload: &'a Value) -> Option<&'a str> {
    probes.iter().find_map(|probe| probe.apply(payload))
}

/// 對任何輸入都不會失敗；找不到就返回 None
pub fn extract_report(payload: &Value) -> Option<&str> {
    extract_report_with(&report_probes(), payload)
}

pub fn display_name(service_id: &str) -> &str {
    catalog::display_name(service_id)
}

/// 給畫面與匯出使用的統一形狀
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOutcome {
    pub service_id: String,
    pub display_name: String,
    pub success: bool,
    pub http_status: Option<u16>,
    pub elapsed_ms: u64,
    pub error_message: Option<String>,
    pub report: Option<String>,
}

pub fn normalize_outcome(outcome: &ServiceOutcome) -> NormalizedOutcome {
    NormalizedOutcome {
        service_id: outcome.service_id.clone(),
        display_name: display_name(&outcome.service_id).to_string(),
        success: outcome.status() == OutcomeStatus::Success,
        http_status: outcome.http_status,
        elapsed_ms: outcome.elapsed_ms,
        error_message: outcome.error_message().map(str::to_string),
        report: outcome
            .payload()
            .and_then(extract_report)
            .map(str::to_string),
    }
}

pub fn normalize(result: &DispatchResult) -> Vec<NormalizedOutcome> {
    result.iter().map(normalize_outcome).collect()
}
