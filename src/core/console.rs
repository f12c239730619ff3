use crate::core::board::ResultBoard;
use crate::core::dispatcher::{DispatchOptions, Dispatcher};
use crate::core::export::{
    default_export_name, export_as_html, export_as_json, export_reports, preview_for,
    service_file_name,
};
use crate::core::normalizer::{normalize, NormalizedOutcome};
use crate::domain::model::{DispatchRequest, DispatchResult};
use crate::domain::ports::Storage;
use crate::utils::error::{DispatchError, Result};

/// 一次派送結束後要寫出的檔案
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub result_name: String,
    pub reports: bool,
    pub preview: Option<String>,
}

impl Default for ExportPlan {
    fn default() -> Self {
        Self {
            result_name: default_export_name(chrono::Local::now()),
            reports: true,
            preview: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub result: DispatchResult,
    pub normalized: Vec<NormalizedOutcome>,
    pub summary: String,
    pub result_path: String,
    pub report_paths: Vec<String>,
    pub preview_path: Option<String>,
}

/// 派送、正規化、匯出一次完成
pub struct ConsoleEngine<S: Storage> {
    dispatcher: Dispatcher,
    storage: S,
}

impl<S: Storage> ConsoleEngine<S> {
    pub fn new(dispatcher: Dispatcher, storage: S) -> Self {
        Self {
            dispatcher,
            storage,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn run(
        &self,
        request: &DispatchRequest,
        options: DispatchOptions,
        plan: &ExportPlan,
    ) -> Result<SessionReport> {
        if let Some(service_id) = &plan.preview {
            if !request.service_ids().contains(service_id) {
                return Err(DispatchError::UnknownService {
                    service_id: service_id.clone(),
                });
            }
        }

        let mut board = ResultBoard::new(request.service_ids());
        let result = self
            .dispatcher
            .dispatch_with_progress(request, options, |outcome| {
                board.record(outcome);
                tracing::debug!("⏳ {} services still pending", board.pending().len());
            })
            .await;
        board.absorb(&result);

        let normalized = normalize(&result);
        let with_report = normalized.iter().filter(|n| n.report.is_some()).count();
        tracing::info!("🧾 {} of {} outcomes carry an HTML report", with_report, normalized.len());

        let result_path = export_as_json(&self.storage, &result, &plan.result_name).await?;
        tracing::info!("📁 Result saved to: {}", result_path);

        let report_paths = if plan.reports {
            export_reports(&self.storage, &result).await?
        } else {
            Vec::new()
        };

        let preview_path = match &plan.preview {
            Some(service_id) => match preview_for(&result, service_id) {
                Some(document) => {
                    let filename = service_file_name(service_id, "_preview.html")?;
                    Some(export_as_html(&self.storage, &document, &filename).await?)
                }
                None => {
                    tracing::warn!("⚠️ {} returned no HTML report to preview", service_id);
                    None
                }
            },
            None => None,
        };

        Ok(SessionReport {
            summary: board.render(),
            result,
            normalized,
            result_path,
            report_paths,
            preview_path,
        })
    }
}
