use crate::config::NotificationConfig;
use crate::error::Result;
use crate::models::{LoanKey, Manifest, ReconciliationReport, RuleCatalog, SourceRecords};
use crate::service::notification::{self, NotificationTarget};
use crate::service::{aggregator, matcher};
use chrono::NaiveDate;

/// 对账服务
///
/// 只持有只读的规则集和清单；每次调用都基于传入的记录生成新的报告，不保存跨运行状态。
pub struct ReconcilerService {
    catalog: RuleCatalog,
    manifest: Manifest,
    notification: NotificationConfig,
}

impl ReconcilerService {
    pub fn new(catalog: RuleCatalog, manifest: Manifest, notification: NotificationConfig) -> Self {
        Self {
            catalog,
            manifest,
            notification,
        }
    }

    /// 内置规则集、空清单
    pub fn with_builtin_rules() -> Self {
        Self::new(RuleCatalog::builtin(), Manifest::default(), NotificationConfig::default())
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// 用指定规则集对一批记录对账
    pub fn reconcile(&self, rule_set: &str, records: &SourceRecords) -> Result<ReconciliationReport> {
        let rules = self.catalog.get(rule_set)?;

        tracing::info!(
            "[{}] 开始对账: {} {} / {} {}",
            rules.name,
            records.records(rules.join.primary).len(),
            rules.join.primary,
            records.records(rules.join.secondary).len(),
            rules.join.secondary
        );

        let matches = matcher::join(records, rules);
        Ok(aggregator::aggregate(&matches, rules))
    }

    /// 查找通知所需的借款人信息
    pub fn notification_target(
        &self,
        records: &SourceRecords,
        loan_id: &LoanKey,
        category: &str,
        today: NaiveDate,
    ) -> Result<NotificationTarget> {
        notification::lookup(&self.catalog, &self.notification, records, loan_id, category, today)
    }
}
