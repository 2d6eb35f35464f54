use crate::config::NotificationConfig;
use crate::error::{ReconError, Result};
use crate::models::{LoanKey, RuleCatalog, SourceKind, SourceRecords};
use chrono::NaiveDate;
use serde::Serialize;

/// 通知外部系统组织客户信函所需的信息（本服务不发送通知）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationTarget {
    pub loan_id: String,
    pub category: String,
    pub borrower: Option<String>,
    pub creditor: Option<String>,
    /// 发现日期 dd/mm/yyyy
    pub identified_on: String,
    pub subject: String,
    /// 披露文件路径
    pub disclosure_path: Option<String>,
}

/// 按贷款号和差异类别查找借款人信息
///
/// 借款人和贷款号取自放款台账，债权人取自披露文件；台账中没有该贷款时报错。
pub fn lookup(
    catalog: &RuleCatalog,
    config: &NotificationConfig,
    records: &SourceRecords,
    loan_id: &LoanKey,
    category: &str,
    today: NaiveDate,
) -> Result<NotificationTarget> {
    let rule_set = catalog
        .rule_sets
        .iter()
        .find(|s| s.rule(category).is_some())
        .ok_or_else(|| ReconError::UnknownCategory(category.to_string()))?;

    let missing = |origin: SourceKind| ReconError::RecordNotFound {
        loan_id: loan_id.to_string(),
        origin,
    };

    if !rule_set.join.contains(SourceKind::Spreadsheet) {
        return Err(missing(SourceKind::Spreadsheet));
    }
    let row = records
        .find(SourceKind::Spreadsheet, rule_set.key_field(SourceKind::Spreadsheet), loan_id)
        .ok_or_else(|| missing(SourceKind::Spreadsheet))?;

    let disclosure = rule_set
        .join
        .contains(SourceKind::Disclosure)
        .then(|| {
            records.find(
                SourceKind::Disclosure,
                rule_set.key_field(SourceKind::Disclosure),
                loan_id,
            )
        })
        .flatten();

    if disclosure.is_none() {
        tracing::warn!("No disclosure found for loan {}, creditor unknown", loan_id);
    }

    Ok(NotificationTarget {
        loan_id: row
            .key(rule_set.key_field(SourceKind::Spreadsheet))
            .map(|k| k.to_string())
            .unwrap_or_else(|| loan_id.to_string()),
        category: category.to_string(),
        borrower: row.text(&config.borrower_field),
        creditor: disclosure.and_then(|d| d.text(&config.creditor_field)),
        identified_on: today.format("%d/%m/%Y").to_string(),
        subject: config.subject.clone(),
        disclosure_path: disclosure.map(|d| d.path.clone()),
    })
}
