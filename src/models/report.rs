use crate::models::{LoanKey, SourceKind};
use crate::service::normalizer::NormalizedValue;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// 某一来源在一次比较中的取值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparedValue {
    pub source: SourceKind,
    /// 抽取服务给出的原始值
    pub raw: Option<Value>,
    /// 换算、舍入后的比较值
    pub normalized: NormalizedValue,
    /// 报告中的展示文本
    pub display: String,
}

/// 一条差异记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub loan_id: LoanKey,
    pub category: String,
    /// 按关联顺序排列的各来源取值
    pub values: Vec<ComparedValue>,
    /// 上下文列 (label -> 文本)
    pub context: IndexMap<String, String>,
    /// 主来源记录路径，用于界面跳转
    pub path: String,
}

impl Discrepancy {
    pub fn value(&self, source: SourceKind) -> Option<&ComparedValue> {
        self.values.iter().find(|v| v.source == source)
    }
}

/// 类别汇总行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
}

/// 对账报告：每次运行新建，不跨运行保存
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub rule_set: String,
    /// 参与比较的来源（展示列顺序）
    pub sources: Vec<SourceKind>,
    /// 上下文列标题
    pub context_labels: Vec<String>,
    /// 成功配对的记录数
    pub total_checked: usize,
    /// 至少有一条差异的记录数
    pub total_with_discrepancy: usize,
    /// 类别 -> 差异列表；所有类别都存在，顺序与规则一致
    pub categories: IndexMap<String, Vec<Discrepancy>>,
}

impl ReconciliationReport {
    /// 汇总视图：包括差异数为 0 的类别
    pub fn summary(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|(category, entries)| CategorySummary {
                category: category.clone(),
                count: entries.len(),
            })
            .collect()
    }

    /// 明细视图：只包括有差异的类别
    pub fn detail_tables(&self) -> impl Iterator<Item = (&str, &[Discrepancy])> {
        self.categories
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(category, entries)| (category.as_str(), entries.as_slice()))
    }

    pub fn entries(&self, category: &str) -> &[Discrepancy] {
        self.categories.get(category).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn total_discrepancies(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// 按贷款号和类别查找差异（供通知使用）
    pub fn find(&self, loan_id: &LoanKey, category: &str) -> Option<&Discrepancy> {
        self.entries(category).iter().find(|d| &d.loan_id == loan_id)
    }
}
