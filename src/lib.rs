pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod service;

pub use crate::config::AppConfig;
pub use error::{ReconError, Result};
pub use models::{ReconciliationReport, RuleCatalog, SourceKind, SourceRecord, SourceRecords};
pub use service::ReconcilerService;
