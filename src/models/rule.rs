use crate::error::{ReconError, Result};
use crate::models::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// 披露文件 vs 放款台账
pub const DISCLOSURE_RULE_SET: &str = "disclosure";
/// 贷后服务对账单 vs 披露文件 vs 放款台账
pub const SERVICING_RULE_SET: &str = "servicing";

/// 字段数值类型，决定展示格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Currency,
    Percentage,
    Count,
    PlainNumber,
}

/// 单位换算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// 小数比率 -> 百分数 (0.0525 -> 5.25)
    FractionToPercent,
}

impl Conversion {
    pub fn factor(&self) -> i64 {
        match self {
            Self::FractionToPercent => 100,
        }
    }
}

/// 作用于某一来源的单位换算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideConversion {
    pub source: SourceKind,
    pub conversion: Conversion,
}

/// 抑制规则：命中时不记录差异
///
/// 这些规则针对来源系统里已知的录入问题，按原样保留。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Suppression {
    /// 该来源的值为 NA
    MissingOn { source: SourceKind },
    /// `source` 恰好等于 `value` 且 `other` 恰好等于 `other_value`
    Pairing {
        source: SourceKind,
        value: f64,
        other: SourceKind,
        other_value: f64,
    },
}

impl Suppression {
    fn sources(&self) -> Vec<SourceKind> {
        match self {
            Self::MissingOn { source } => vec![*source],
            Self::Pairing { source, other, .. } => vec![*source, *other],
        }
    }
}

/// 报告中替换某一来源展示值的固定值（只影响展示，不影响比较）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOverride {
    pub source: SourceKind,
    pub value: f64,
}

/// 缺失值 (null / 缺字段 / 无对应记录) 的比较口径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// 按 0 参与比较
    Zero,
    /// 保留 NA，NA 只与 NA 相等
    NotAvailable,
}

/// 差异条目的展示风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStyle {
    /// 主来源展示原始文本，其他来源按最短小数加 `$`/`%`，空值为 `N/A`
    Annotated,
    /// 所有来源两位小数加 `$`/`%`，空值为 `NA`
    Fixed,
}

/// 各来源中的字段名
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldNames {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servicing: Option<String>,
}

impl FieldNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SourceKind, name: impl Into<String>) -> Self {
        let slot = match kind {
            SourceKind::Disclosure => &mut self.disclosure,
            SourceKind::Spreadsheet => &mut self.spreadsheet,
            SourceKind::Servicing => &mut self.servicing,
        };
        *slot = Some(name.into());
        self
    }

    /// 所有来源使用同一字段名
    pub fn same(name: &str, kinds: &[SourceKind]) -> Self {
        kinds.iter().fold(Self::new(), |acc, kind| acc.with(*kind, name))
    }

    pub fn get(&self, kind: SourceKind) -> Option<&str> {
        match kind {
            SourceKind::Disclosure => self.disclosure.as_deref(),
            SourceKind::Spreadsheet => self.spreadsheet.as_deref(),
            SourceKind::Servicing => self.servicing.as_deref(),
        }
        .filter(|name| !name.trim().is_empty())
    }
}

/// 关联方式：主来源逐条与次来源配对，可选地再按贷款号查找第三来源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub primary: SourceKind,
    pub secondary: SourceKind,
    #[serde(default)]
    pub lookup: Option<SourceKind>,
}

impl JoinPlan {
    /// 按展示顺序列出参与比较的来源
    pub fn sources(&self) -> Vec<SourceKind> {
        let mut sources = vec![self.primary, self.secondary];
        sources.extend(self.lookup);
        sources
    }

    pub fn contains(&self, kind: SourceKind) -> bool {
        self.sources().contains(&kind)
    }
}

/// 差异条目附带的上下文列（申请号、放款日期等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextField {
    pub label: String,
    pub source: SourceKind,
    pub field: String,
    pub fallback: String,
}

/// 单个比较字段的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRule {
    /// 规范字段名，同时作为差异类别
    pub category: String,
    pub kind: FieldKind,
    pub fields: FieldNames,
    #[serde(default)]
    pub conversion: Option<SideConversion>,
    #[serde(default)]
    pub suppressions: Vec<Suppression>,
    #[serde(default)]
    pub display_override: Option<DisplayOverride>,
}

impl ComparisonRule {
    pub fn new(category: impl Into<String>, kind: FieldKind, fields: FieldNames) -> Self {
        Self {
            category: category.into(),
            kind,
            fields,
            conversion: None,
            suppressions: Vec::new(),
            display_override: None,
        }
    }

    pub fn converting(mut self, source: SourceKind, conversion: Conversion) -> Self {
        self.conversion = Some(SideConversion { source, conversion });
        self
    }

    pub fn suppressing(mut self, suppression: Suppression) -> Self {
        self.suppressions.push(suppression);
        self
    }

    pub fn displaying(mut self, source: SourceKind, value: f64) -> Self {
        self.display_override = Some(DisplayOverride { source, value });
        self
    }
}

/// 一组比较规则及其关联方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub join: JoinPlan,
    pub display: DisplayStyle,
    pub missing: MissingPolicy,
    /// 各来源的贷款号字段
    pub key_fields: FieldNames,
    #[serde(default)]
    pub context_fields: Vec<ContextField>,
    pub rules: Vec<ComparisonRule>,
}

impl RuleSet {
    /// 披露文件 vs 放款台账：七个字段，APR 台账侧为小数比率
    pub fn disclosure_vs_spreadsheet() -> Self {
        use SourceKind::{Disclosure, Spreadsheet};
        let both = [Disclosure, Spreadsheet];

        let rules = vec![
            ComparisonRule::new(
                "Annual Percentage Rate (APR)",
                FieldKind::Percentage,
                FieldNames::new()
                    .with(Disclosure, "Annual Percentage Rate (APR)")
                    .with(Spreadsheet, "APR"),
            )
            .converting(Spreadsheet, Conversion::FractionToPercent),
            ComparisonRule::new("Finance Charge", FieldKind::Currency, FieldNames::same("Finance Charge", &both)),
            ComparisonRule::new("Amount Financed", FieldKind::Currency, FieldNames::same("Amount Financed", &both)),
            ComparisonRule::new("Total of Payments", FieldKind::Currency, FieldNames::same("Total of Payments", &both)),
            ComparisonRule::new("Number of Payments", FieldKind::Count, FieldNames::same("Number of Payments", &both)),
            ComparisonRule::new(
                "Monthly Payment Amount",
                FieldKind::Currency,
                FieldNames::new()
                    .with(Disclosure, "Monthly Payment Amount")
                    .with(Spreadsheet, "EMI Amount"),
            ),
            ComparisonRule::new("Origination Fee", FieldKind::Currency, FieldNames::same("Origination Fee", &both)),
        ];

        Self {
            name: DISCLOSURE_RULE_SET.to_string(),
            join: JoinPlan {
                primary: Disclosure,
                secondary: Spreadsheet,
                lookup: None,
            },
            display: DisplayStyle::Annotated,
            missing: MissingPolicy::Zero,
            key_fields: FieldNames::new()
                .with(Disclosure, "Account Number")
                .with(Spreadsheet, "Loan Id"),
            context_fields: vec![
                ContextField {
                    label: "Application Id".to_string(),
                    source: Spreadsheet,
                    field: "Application Id".to_string(),
                    fallback: "N/A".to_string(),
                },
                ContextField {
                    label: "Booking Date".to_string(),
                    source: Spreadsheet,
                    field: "Booking Date".to_string(),
                    fallback: "N/A".to_string(),
                },
            ],
            rules,
        }
    }

    /// 服务对账单 vs 披露文件 vs 放款台账：退款手续费、滞纳金
    ///
    /// 服务侧为 NA、服务侧 25 且台账侧 0 都不记差异；滞纳金的披露侧展示值固定为 7。
    /// 这两条是针对具体坏数据的处理，需要拿真实数据确认后再决定是否保留。
    pub fn servicing_three_way() -> Self {
        use SourceKind::{Disclosure, Servicing, Spreadsheet};

        let suppress_known_artifacts = |rule: ComparisonRule| {
            rule.suppressing(Suppression::MissingOn { source: Servicing })
                .suppressing(Suppression::Pairing {
                    source: Servicing,
                    value: 25.0,
                    other: Spreadsheet,
                    other_value: 0.0,
                })
        };

        let rules = vec![
            suppress_known_artifacts(ComparisonRule::new(
                "Returned Payment Fee",
                FieldKind::Currency,
                FieldNames::new()
                    .with(Disclosure, "Returned Payment Fee")
                    .with(Servicing, "Payment Return Amount")
                    .with(Spreadsheet, "Returned Payment Charges"),
            )),
            suppress_known_artifacts(ComparisonRule::new(
                "Late Charges",
                FieldKind::Currency,
                FieldNames::new()
                    .with(Disclosure, "Late Charges")
                    .with(Servicing, "Late Fee amount")
                    .with(Spreadsheet, "Late Fee Charges"),
            ))
            .displaying(Disclosure, 7.0),
        ];

        Self {
            name: SERVICING_RULE_SET.to_string(),
            join: JoinPlan {
                primary: Servicing,
                secondary: Disclosure,
                lookup: Some(Spreadsheet),
            },
            display: DisplayStyle::Fixed,
            missing: MissingPolicy::NotAvailable,
            key_fields: FieldNames::new()
                .with(Servicing, "Loan Id")
                .with(Disclosure, "Account Number")
                .with(Spreadsheet, "Loan Id"),
            context_fields: vec![
                ContextField {
                    label: "Booking Date".to_string(),
                    source: Spreadsheet,
                    field: "Booking Date".to_string(),
                    fallback: "NA".to_string(),
                },
                ContextField {
                    label: "Payment Month Date".to_string(),
                    source: Spreadsheet,
                    field: "Month Date".to_string(),
                    fallback: "NA".to_string(),
                },
            ],
            rules,
        }
    }

    pub fn rule(&self, category: &str) -> Option<&ComparisonRule> {
        self.rules.iter().find(|r| r.category == category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.category.as_str())
    }

    /// 贷款号字段（校验后必然存在）
    pub fn key_field(&self, kind: SourceKind) -> &str {
        self.key_fields.get(kind).unwrap_or_default()
    }

    /// 加载时校验：字段映射完整、类别唯一、引用的来源都在关联方式中
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| ReconError::InvalidRuleSet {
            rule_set: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("rule set name is empty".to_string()));
        }

        let sources = self.join.sources();
        let distinct: HashSet<_> = sources.iter().collect();
        if distinct.len() != sources.len() {
            return Err(invalid("join plan lists a source more than once".to_string()));
        }

        for kind in &sources {
            if self.key_fields.get(*kind).is_none() {
                return Err(invalid(format!("no key field for {}", kind)));
            }
        }

        if self.rules.is_empty() {
            return Err(invalid("no comparison rules".to_string()));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.category.trim().is_empty() {
                return Err(invalid("rule with empty category".to_string()));
            }
            if !seen.insert(rule.category.as_str()) {
                return Err(invalid(format!("duplicate category '{}'", rule.category)));
            }
            for kind in &sources {
                if rule.fields.get(*kind).is_none() {
                    return Err(invalid(format!("'{}' has no {} field", rule.category, kind)));
                }
            }

            let mut referenced = Vec::new();
            referenced.extend(rule.conversion.as_ref().map(|c| c.source));
            referenced.extend(rule.display_override.as_ref().map(|d| d.source));
            referenced.extend(rule.suppressions.iter().flat_map(|s| s.sources()));
            if let Some(kind) = referenced.into_iter().find(|k| !self.join.contains(*k)) {
                return Err(invalid(format!(
                    "'{}' references {} which is not joined",
                    rule.category, kind
                )));
            }
        }

        if let Some(ctx) = self.context_fields.iter().find(|c| !self.join.contains(c.source)) {
            return Err(invalid(format!(
                "context field '{}' references {} which is not joined",
                ctx.label, ctx.source
            )));
        }

        Ok(())
    }
}

/// 全部规则集（加载时校验）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCatalog {
    pub rule_sets: Vec<RuleSet>,
}

impl RuleCatalog {
    pub fn new(rule_sets: Vec<RuleSet>) -> Result<Self> {
        if rule_sets.is_empty() {
            return Err(ReconError::MissingConfiguration("rule catalog is empty".to_string()));
        }
        let mut names = HashSet::new();
        for set in &rule_sets {
            set.validate()?;
            if !names.insert(set.name.as_str()) {
                return Err(ReconError::InvalidRuleSet {
                    rule_set: set.name.clone(),
                    reason: "declared more than once".to_string(),
                });
            }
        }
        Ok(Self { rule_sets })
    }

    /// 内置规则集
    pub fn builtin() -> Self {
        Self {
            rule_sets: vec![RuleSet::disclosure_vs_spreadsheet(), RuleSet::servicing_three_way()],
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let catalog: RuleCatalog = serde_json::from_str(content)?;
        Self::new(catalog.rule_sets)
    }

    /// 从 JSON 文件加载规则集；文件缺失或无法解析视为配置缺失
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconError::MissingConfiguration(format!("rules {}: {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| match e {
            ReconError::Json(err) => {
                ReconError::MissingConfiguration(format!("rules {}: {}", path.display(), err))
            }
            other => other,
        })
    }

    pub fn get(&self, name: &str) -> Result<&RuleSet> {
        self.rule_sets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ReconError::UnknownRuleSet(name.to_string()))
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.rule_sets.iter().any(|s| s.rule(category).is_some())
    }
}
