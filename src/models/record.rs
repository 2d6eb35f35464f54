use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 扫描的披露文件 (TILA)
    Disclosure,
    /// 放款台账行
    Spreadsheet,
    /// 贷后服务对账单
    Servicing,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disclosure => "disclosure",
            Self::Spreadsheet => "spreadsheet",
            Self::Servicing => "servicing",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 跨来源关联用的贷款号（统一为字符串形式）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanKey(String);

impl LoanKey {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// 把字符串或数字形式的标识统一成同一种字符串：
    /// `12345`、`12345.0`、`" 12345 "` 都得到 `"12345"`。
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(Self(i.to_string()));
                }
                if let Some(u) = n.as_u64() {
                    return Some(Self(u.to_string()));
                }
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                    Some(Self((f as i64).to_string()))
                } else {
                    Some(Self(f.to_string()))
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 单条来源记录：外部抽取服务给出的字段集合，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub origin: SourceKind,
    /// 文档路径或表格行号，用于追溯和界面跳转
    pub path: String,
    pub fields: IndexMap<String, Value>,
}

impl SourceRecord {
    pub fn new(origin: SourceKind, path: impl Into<String>) -> Self {
        Self {
            origin,
            path: path.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn key(&self, key_field: &str) -> Option<LoanKey> {
        self.field(key_field).and_then(LoanKey::from_value)
    }

    /// 字段的展示文本；空串、null、缺失都视为无值
    pub fn text(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(number_text(n)),
            other => Some(other.to_string()),
        }
    }
}

/// 数字的最短展示形式：`5.0` 显示为 `5`
pub(crate) fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
    }
}

/// 一次对账运行的全部输入，按来源分组
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecords {
    #[serde(default)]
    pub disclosures: Vec<SourceRecord>,
    #[serde(default)]
    pub spreadsheet: Vec<SourceRecord>,
    #[serde(default)]
    pub servicing: Vec<SourceRecord>,
}

impl SourceRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, kind: SourceKind, records: Vec<SourceRecord>) -> Self {
        match kind {
            SourceKind::Disclosure => self.disclosures = records,
            SourceKind::Spreadsheet => self.spreadsheet = records,
            SourceKind::Servicing => self.servicing = records,
        }
        self
    }

    pub fn records(&self, kind: SourceKind) -> &[SourceRecord] {
        match kind {
            SourceKind::Disclosure => &self.disclosures,
            SourceKind::Spreadsheet => &self.spreadsheet,
            SourceKind::Servicing => &self.servicing,
        }
    }

    /// 按贷款号查找某来源中的第一条记录
    pub fn find(&self, kind: SourceKind, key_field: &str, loan_id: &LoanKey) -> Option<&SourceRecord> {
        self.records(kind)
            .iter()
            .find(|r| r.key(key_field).as_ref() == Some(loan_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loan_key_coerces_numbers_and_strings() {
        assert_eq!(LoanKey::from_value(&json!(12345)), LoanKey::new("12345"));
        assert_eq!(LoanKey::from_value(&json!(12345.0)), LoanKey::new("12345"));
        assert_eq!(LoanKey::from_value(&json!(" 12345 ")), LoanKey::new("12345"));
        assert_eq!(LoanKey::from_value(&json!("L-1")).unwrap().as_str(), "L-1");
    }

    #[test]
    fn loan_key_rejects_empty_and_null() {
        assert!(LoanKey::from_value(&json!("  ")).is_none());
        assert!(LoanKey::from_value(&Value::Null).is_none());
        assert!(LoanKey::from_value(&json!(true)).is_none());
    }

    #[test]
    fn record_text_treats_empty_as_missing() {
        let record = SourceRecord::new(SourceKind::Spreadsheet, "row")
            .with_field("Borrower", json!(""))
            .with_field("Number of Payments", json!(36))
            .with_field("Booking Date", Value::Null)
            .with_field("APR", json!(5.0));
        assert_eq!(record.text("Borrower"), None);
        assert_eq!(record.text("Booking Date"), None);
        assert_eq!(record.text("Number of Payments").as_deref(), Some("36"));
        assert_eq!(record.text("APR").as_deref(), Some("5"));
        assert_eq!(record.text("Missing"), None);
    }
}
