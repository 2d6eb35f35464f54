use disclosure_recon::{api, AppConfig, ReconcilerService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 清单和规则集在启动时校验，缺失/非法直接退出
    let manifest = config.load_manifest()?;
    info!(
        "Manifest loaded: {} disclosures, {} spreadsheets, {} servicing statements",
        manifest.pdfs.len(),
        manifest.excel.len(),
        manifest.loan.len()
    );

    let catalog = config.load_rules()?;
    for set in &catalog.rule_sets {
        info!("Rule set '{}': {} categories", set.name, set.rules.len());
    }

    let service = Arc::new(ReconcilerService::new(
        catalog,
        manifest,
        config.notification.clone(),
    ));
    let app = api::router(service);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/manifest                    - document catalog");
    info!("  POST /api/reconcile/:rule_set         - reconciliation report");
    info!("  POST /api/reconcile/:rule_set/export  - discrepancies as CSV");
    info!("  POST /api/notification                - borrower lookup for a discrepancy");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
