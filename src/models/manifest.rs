use crate::error::{ReconError, Result};
use crate::models::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 清单条目：文档路径 + 展示名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub path: String,
}

/// 待处理文档清单 (config.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// 披露文件
    #[serde(default)]
    pub pdfs: Vec<ManifestEntry>,
    /// 放款台账
    #[serde(default)]
    pub excel: Vec<ManifestEntry>,
    /// 贷后服务对账单
    #[serde(default)]
    pub loan: Vec<ManifestEntry>,
}

impl Manifest {
    /// 读取并校验清单；文件缺失或格式错误都视为配置缺失
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconError::MissingConfiguration(format!("manifest {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| ReconError::MissingConfiguration(format!("manifest {}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn entries(&self, kind: SourceKind) -> &[ManifestEntry] {
        match kind {
            SourceKind::Disclosure => &self.pdfs,
            SourceKind::Spreadsheet => &self.excel,
            SourceKind::Servicing => &self.loan,
        }
    }

    pub fn len(&self) -> usize {
        self.pdfs.len() + self.excel.len() + self.loan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<()> {
        for kind in [SourceKind::Disclosure, SourceKind::Spreadsheet, SourceKind::Servicing] {
            if let Some(entry) = self.entries(kind).iter().find(|e| e.path.trim().is_empty()) {
                return Err(ReconError::MissingConfiguration(format!(
                    "manifest entry '{}' ({}) has an empty path",
                    entry.name, kind
                )));
            }
        }
        Ok(())
    }
}
