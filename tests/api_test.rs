//! HTTP 接口测试

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use disclosure_recon::{api, ReconcilerService};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    api::router(Arc::new(ReconcilerService::with_builtin_rules()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn batch() -> Value {
    json!({
        "disclosures": [
            { "path": "pdfs/L1.pdf", "fields": {
                "Account Number": "L1",
                "Annual Percentage Rate (APR)": "5.00%",
                "Finance Charge": "$100.00"
            }}
        ],
        "spreadsheet": [
            { "fields": { "Loan Id": "L1", "APR": 0.06, "Finance Charge": 100, "Borrower": "Pat Lee" } }
        ]
    })
}

#[tokio::test]
async fn health_check_responds_ok() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reconcile_returns_report() {
    let response = app()
        .oneshot(post_json("/api/reconcile/disclosure", batch()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["total_checked"], 1);
    assert_eq!(body["report"]["total_with_discrepancy"], 1);
    assert_eq!(body["summary"].as_array().unwrap().len(), 7);

    let entry = &body["report"]["categories"]["Annual Percentage Rate (APR)"][0];
    assert_eq!(entry["loan_id"], "L1");
    assert_eq!(entry["values"][1]["display"], "6%");
    assert_eq!(entry["values"][1]["normalized"], "6.00");
}

#[tokio::test]
async fn unknown_rule_set_is_bad_request() {
    let response = app()
        .oneshot(post_json("/api/reconcile/escrow", batch()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn export_returns_csv() {
    let response = app()
        .oneshot(post_json("/api/reconcile/disclosure/export", batch()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Annual Percentage Rate (APR),L1,pdfs/L1.pdf,5.00%,6%"));
}

#[tokio::test]
async fn notification_lookup() {
    let response = app()
        .oneshot(post_json(
            "/api/notification",
            json!({ "loan_id": "L1", "category": "Finance Charge", "records": batch() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["target"]["borrower"], "Pat Lee");
    assert_eq!(body["target"]["loan_id"], "L1");
}

#[tokio::test]
async fn notification_for_unknown_category_is_bad_request() {
    let response = app()
        .oneshot(post_json(
            "/api/notification",
            json!({ "loan_id": "L1", "category": "Escrow", "records": batch() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manifest_is_empty_by_default() {
    let response = app()
        .oneshot(Request::builder().uri("/api/manifest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["pdfs"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn request_logging_keeps_response_status() {
    let response = app()
        .oneshot(Request::builder().uri("/api/unknown").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app()
        .oneshot(Request::builder().uri("/api/reconcile/disclosure").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
