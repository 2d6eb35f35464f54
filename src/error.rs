use crate::models::SourceKind;
use thiserror::Error;

/// 对账服务错误
///
/// 数值解析失败、记录无法配对都不是错误（分别按 0 处理、跳过），
/// 只有配置缺失/非法和查询找不到目标才会返回给调用方。
#[derive(Error, Debug)]
pub enum ReconError {
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("invalid rule set '{rule_set}': {reason}")]
    InvalidRuleSet { rule_set: String, reason: String },

    #[error("unknown rule set: {0}")]
    UnknownRuleSet(String),

    #[error("unknown discrepancy category: {0}")]
    UnknownCategory(String),

    #[error("no {origin} record for loan {loan_id}")]
    RecordNotFound { loan_id: String, origin: SourceKind },

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconError {
    /// 调用方请求有误（而非服务端配置/IO 问题）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownRuleSet(_) | Self::UnknownCategory(_) | Self::RecordNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
