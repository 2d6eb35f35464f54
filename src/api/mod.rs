pub mod handlers;

pub use handlers::*;

use crate::service::ReconcilerService;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;

/// 构建路由
pub fn router(service: Arc<ReconcilerService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/manifest", get(handlers::manifest))
        .route("/api/reconcile/:rule_set", post(handlers::reconcile))
        .route("/api/reconcile/:rule_set/export", post(handlers::export_report))
        .route("/api/notification", post(handlers::notification_target))
        .layer(ServiceBuilder::new().layer(middleware::from_fn(log_request)))
        .with_state(service)
}

/// 请求日志：方法、路径、状态码、耗时
async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        "{} {} -> {} ({:.2?})",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}
