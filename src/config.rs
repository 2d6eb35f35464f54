use crate::error::Result;
use crate::models::{Manifest, RuleCatalog};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// 清单和规则文件位置；不配置时使用空清单和内置规则
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub manifest_path: Option<String>,
    #[serde(default)]
    pub rules_path: Option<String>,
}

/// 通知查询使用的字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub subject: String,
    /// 台账中的借款人字段
    pub borrower_field: String,
    /// 披露文件中的债权人字段
    pub creditor_field: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            subject: "Notification of Error Identified in TILA Reconciliation Process".to_string(),
            borrower_field: "Borrower".to_string(),
            creditor_field: "Creditor".to_string(),
        }
    }
}

impl AppConfig {
    /// 加载配置：默认值 -> recon.{toml,json,yaml} (可选) -> RECON_ 环境变量
    ///
    /// 例如 `RECON_SERVER__PORT=9000`、`RECON_CATALOG__MANIFEST_PATH=config.json`。
    pub fn load() -> Result<Self> {
        Self::load_from("recon")
    }

    pub fn load_from(file_stem: &str) -> Result<Self> {
        let defaults = AppConfig::default();
        let settings = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("notification.subject", defaults.notification.subject)?
            .set_default("notification.borrower_field", defaults.notification.borrower_field)?
            .set_default("notification.creditor_field", defaults.notification.creditor_field)?
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("RECON")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// 读取清单；配置了路径但文件缺失/非法时失败
    pub fn load_manifest(&self) -> Result<Manifest> {
        match &self.catalog.manifest_path {
            Some(path) => Manifest::load(Path::new(path)),
            None => Ok(Manifest::default()),
        }
    }

    /// 读取规则集；未配置时使用内置规则
    pub fn load_rules(&self) -> Result<RuleCatalog> {
        match &self.catalog.rules_path {
            Some(path) => RuleCatalog::load(Path::new(path)),
            None => Ok(RuleCatalog::builtin()),
        }
    }
}
