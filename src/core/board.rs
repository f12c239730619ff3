//! 畫面狀態：結果逐一抵達時累積，順序不定
//!
//! 更新都在同一個任務內依序進行，不需要鎖。

use crate::core::normalizer::{display_name, extract_report};
use crate::domain::model::{DispatchResult, ServiceOutcome};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEntry {
    Pending,
    Settled(ServiceOutcome),
}

#[derive(Debug, Clone, Default)]
pub struct ResultBoard {
    order: Vec<String>,
    entries: std::collections::HashMap<String, BoardEntry>,
    task_id: Option<String>,
}

impl ResultBoard {
    pub fn new(service_ids: &[String]) -> Self {
        Self {
            order: service_ids.to_vec(),
            entries: service_ids
                .iter()
                .map(|id| (id.clone(), BoardEntry::Pending))
                .collect(),
            task_id: None,
        }
    }

    /// 不在列表中的服務會附加到最後
    pub fn record(&mut self, outcome: &ServiceOutcome) {
        if !self.entries.contains_key(&outcome.service_id) {
            self.order.push(outcome.service_id.clone());
        }
        self.entries.insert(
            outcome.service_id.clone(),
            BoardEntry::Settled(outcome.clone()),
        );
    }

    pub fn absorb(&mut self, result: &DispatchResult) {
        if result.task_id.is_some() {
            self.task_id = result.task_id.clone();
        }
        for outcome in result.iter() {
            self.record(outcome);
        }
    }

    pub fn entry(&self, service_id: &str) -> Option<&BoardEntry> {
        self.entries.get(service_id)
    }

    pub fn pending(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| matches!(self.entry(id), Some(BoardEntry::Pending)))
            .map(String::as_str)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.pending().is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(task_id) = &self.task_id {
            let _ = writeln!(out, "task_id: {}", task_id);
        }

        for id in &self.order {
            let name = display_name(id);
            match self.entry(id) {
                Some(BoardEntry::Settled(outcome)) => {
                    let status = outcome
                        .http_status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    match outcome.error_message() {
                        None => {
                            let report = if outcome.payload().and_then(extract_report).is_some() {
                                "report"
                            } else {
                                "no report"
                            };
                            let _ = writeln!(
                                out,
                                "[OK]    {:<20} {:>4} {:>7} ms  {}",
                                name, status, outcome.elapsed_ms, report
                            );
                        }
                        Some(message) => {
                            let _ = writeln!(
                                out,
                                "[ERROR] {:<20} {:>4} {:>7} ms  {}",
                                name, status, outcome.elapsed_ms, message
                            );
                        }
                    }
                }
                _ => {
                    let _ = writeln!(out, "[...]   {:<20}", name);
                }
            }
        }
        out
    }
}
