use crate::error::ReconError;
use crate::export;
use crate::models::{CategorySummary, ExtractionBatch, LoanKey, Manifest, ReconciliationReport};
use crate::service::{NotificationTarget, ReconcilerService};
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// 对账响应体
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub summary: Option<Vec<CategorySummary>>,
    pub report: Option<ReconciliationReport>,
}

/// 通知查询请求体
#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub loan_id: Value,
    pub category: String,
    #[serde(default)]
    pub records: ExtractionBatch,
}

/// 通知查询响应体
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub success: bool,
    pub message: String,
    pub target: Option<NotificationTarget>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 文档清单
pub async fn manifest(State(service): State<Arc<ReconcilerService>>) -> Json<Manifest> {
    Json(service.manifest().clone())
}

/// 对账接口
pub async fn reconcile(
    State(service): State<Arc<ReconcilerService>>,
    Path(rule_set): Path<String>,
    Json(batch): Json<ExtractionBatch>,
) -> Response {
    let records = batch.into_source_records();
    match service.reconcile(&rule_set, &records) {
        Ok(report) => {
            let response = ReconcileResponse {
                success: true,
                message: format!(
                    "Checked {} accounts, {} with incorrect data",
                    report.total_checked, report.total_with_discrepancy
                ),
                summary: Some(report.summary()),
                report: Some(report),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let status = status_for(&e);
            let response = ReconcileResponse {
                success: false,
                message: format!("Error: {}", e),
                summary: None,
                report: None,
            };
            (status, Json(response)).into_response()
        }
    }
}

/// 差异明细 CSV 导出
pub async fn export_report(
    State(service): State<Arc<ReconcilerService>>,
    Path(rule_set): Path<String>,
    Json(batch): Json<ExtractionBatch>,
) -> Response {
    let records = batch.into_source_records();
    let csv = service
        .reconcile(&rule_set, &records)
        .and_then(|report| export::report_to_csv(&report));

    match csv {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (status_for(&e), format!("Error: {}", e)).into_response(),
    }
}

/// 通知信息查询
pub async fn notification_target(
    State(service): State<Arc<ReconcilerService>>,
    Json(req): Json<NotificationRequest>,
) -> Response {
    let Some(loan_id) = LoanKey::from_value(&req.loan_id) else {
        let response = NotificationResponse {
            success: false,
            message: "Error: loan_id is empty".to_string(),
            target: None,
        };
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    };

    let records = req.records.into_source_records();
    let today = chrono::Local::now().date_naive();
    match service.notification_target(&records, &loan_id, &req.category, today) {
        Ok(target) => {
            let response = NotificationResponse {
                success: true,
                message: format!("Error in {} for account {}", target.category, target.loan_id),
                target: Some(target),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let response = NotificationResponse {
                success: false,
                message: format!("Error: {}", e),
                target: None,
            };
            (status_for(&e), Json(response)).into_response()
        }
    }
}

fn status_for(err: &ReconError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
