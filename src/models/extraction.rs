use crate::models::{SourceKind, SourceRecord, SourceRecords};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 外部抽取服务对单个文档/表格行的返回结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub fields: Option<IndexMap<String, Value>>,
    /// 抽取失败时的错误信息
    #[serde(default)]
    pub error: Option<String>,
}

impl ExtractedDocument {
    pub fn new(path: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            path: Some(path.into()),
            fields: Some(fields),
            error: None,
        }
    }

    /// 转换为来源记录；抽取失败或没有字段的条目视为该来源无记录
    pub fn into_record(self, origin: SourceKind, index: usize) -> Option<SourceRecord> {
        let path = self
            .path
            .unwrap_or_else(|| format!("{}[{}]", origin, index));

        if let Some(err) = self.error {
            tracing::warn!("Extraction failed for {} {}: {}, treating as absent", origin, path, err);
            return None;
        }

        let Some(fields) = self.fields else {
            tracing::warn!("Extraction returned no fields for {} {}, treating as absent", origin, path);
            return None;
        };

        Some(SourceRecord { origin, path, fields })
    }
}

/// 一次对账请求携带的全部抽取结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionBatch {
    #[serde(default)]
    pub disclosures: Vec<ExtractedDocument>,
    #[serde(default)]
    pub spreadsheet: Vec<ExtractedDocument>,
    #[serde(default)]
    pub servicing: Vec<ExtractedDocument>,
}

impl ExtractionBatch {
    pub fn into_source_records(self) -> SourceRecords {
        fn convert(docs: Vec<ExtractedDocument>, origin: SourceKind) -> Vec<SourceRecord> {
            docs.into_iter()
                .enumerate()
                .filter_map(|(idx, doc)| doc.into_record(origin, idx))
                .collect()
        }

        SourceRecords {
            disclosures: convert(self.disclosures, SourceKind::Disclosure),
            spreadsheet: convert(self.spreadsheet, SourceKind::Spreadsheet),
            servicing: convert(self.servicing, SourceKind::Servicing),
        }
    }
}
