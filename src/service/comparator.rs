use crate::models::record::number_text;
use crate::models::{
    ComparedValue, ComparisonRule, DisplayStyle, FieldKind, MissingPolicy, RuleSet, SourceKind, SourceRecord,
    Suppression,
};
use crate::service::matcher::MatchedRecords;
use crate::service::normalizer::{self, NormalizedValue};
use serde_json::Value;

/// 参与比较的一侧；记录缺失时 `record` 为空
#[derive(Debug, Clone, Copy)]
pub struct Side<'a> {
    pub source: SourceKind,
    pub record: Option<&'a SourceRecord>,
}

/// 单个字段的比较结果
#[derive(Debug, Clone, PartialEq)]
pub struct FieldComparison {
    pub category: String,
    /// 所有来源两两相等
    pub equal: bool,
    /// 不相等但命中抑制规则
    pub suppressed: bool,
    pub values: Vec<ComparedValue>,
}

impl FieldComparison {
    /// 需要记入报告
    pub fn is_discrepancy(&self) -> bool {
        !self.equal && !self.suppressed
    }

    pub fn value(&self, source: SourceKind) -> Option<&ComparedValue> {
        self.values.iter().find(|v| v.source == source)
    }
}

/// 按配对结果和关联方式取出各侧后比较
pub fn compare_matched(rule_set: &RuleSet, rule: &ComparisonRule, matched: &MatchedRecords<'_>) -> FieldComparison {
    let sides: Vec<Side<'_>> = rule_set
        .join
        .sources()
        .into_iter()
        .map(|source| Side {
            source,
            record: matched.side(&rule_set.join, source),
        })
        .collect();
    compare(rule_set, rule, &sides)
}

/// 比较一个字段
///
/// 取字段 -> 解析 -> 缺失口径 -> 单位换算 -> 两位舍入 -> 两两比较 -> 抑制规则 -> 展示格式。
pub fn compare(rule_set: &RuleSet, rule: &ComparisonRule, sides: &[Side<'_>]) -> FieldComparison {
    let normalized: Vec<(SourceKind, Option<&Value>, NormalizedValue)> = sides
        .iter()
        .map(|side| {
            let raw = side
                .record
                .zip(rule.fields.get(side.source))
                .and_then(|(record, field)| record.field(field));
            (side.source, raw, normalize_side(rule_set, rule, side.source, raw))
        })
        .collect();

    let equal = normalized
        .iter()
        .enumerate()
        .all(|(i, (_, _, a))| normalized[i + 1..].iter().all(|(_, _, b)| a == b));

    let suppressed = !equal
        && rule
            .suppressions
            .iter()
            .any(|s| suppression_applies(s, &normalized));

    let values = normalized
        .into_iter()
        .map(|(source, raw, value)| {
            let display = display_value(rule_set, rule, source, raw, &value, equal);
            ComparedValue {
                source,
                raw: raw.cloned(),
                normalized: value,
                display,
            }
        })
        .collect();

    FieldComparison {
        category: rule.category.clone(),
        equal,
        suppressed,
        values,
    }
}

fn normalize_side(
    rule_set: &RuleSet,
    rule: &ComparisonRule,
    source: SourceKind,
    raw: Option<&Value>,
) -> NormalizedValue {
    // 换算在舍入之前：0.0525 -> 5.25，而不是 0.05 -> 5.00
    let value = match rule.conversion.as_ref().filter(|c| c.source == source) {
        Some(conv) => normalizer::parse(raw)
            .scaled(conv.conversion.factor())
            .rounded(),
        None => normalizer::normalize(raw, rule.kind),
    };
    match rule_set.missing {
        MissingPolicy::Zero => value.or_zero(),
        MissingPolicy::NotAvailable => value,
    }
}

fn suppression_applies(
    suppression: &Suppression,
    values: &[(SourceKind, Option<&Value>, NormalizedValue)],
) -> bool {
    let value_of = |kind: SourceKind| {
        values
            .iter()
            .find(|(source, _, _)| *source == kind)
            .map(|(_, _, v)| v)
    };

    match suppression {
        Suppression::MissingOn { source } => {
            matches!(value_of(*source), Some(NormalizedValue::NotAvailable))
        }
        Suppression::Pairing {
            source,
            value,
            other,
            other_value,
        } => {
            value_of(*source).is_some_and(|v| v.equals(*value))
                && value_of(*other).is_some_and(|v| v.equals(*other_value))
        }
    }
}

fn display_value(
    rule_set: &RuleSet,
    rule: &ComparisonRule,
    source: SourceKind,
    raw: Option<&Value>,
    value: &NormalizedValue,
    equal: bool,
) -> String {
    let overridden = rule
        .display_override
        .as_ref()
        .filter(|o| o.source == source && !equal)
        .map(|o| NormalizedValue::from_f64(o.value));
    let shown = overridden.as_ref().unwrap_or(value);

    match rule_set.display {
        DisplayStyle::Fixed => normalizer::format_fixed(shown, rule.kind),
        DisplayStyle::Annotated if source == rule_set.join.primary && overridden.is_none() => {
            let text = raw_display(raw);
            if rule.kind == FieldKind::Percentage && text != "N/A" && !text.trim_end().ends_with('%') {
                format!("{}%", text.trim_end())
            } else {
                text
            }
        }
        DisplayStyle::Annotated => normalizer::format_compact(shown, rule.kind),
    }
}

/// 原始文本展示；空串、null、0、缺失显示为 `N/A`
fn raw_display(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => number_text(n),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn disclosure(fields: &[(&str, Value)]) -> SourceRecord {
        fields
            .iter()
            .fold(SourceRecord::new(SourceKind::Disclosure, "d.pdf"), |r, (k, v)| {
                r.with_field(*k, v.clone())
            })
    }

    fn spreadsheet(fields: &[(&str, Value)]) -> SourceRecord {
        fields
            .iter()
            .fold(SourceRecord::new(SourceKind::Spreadsheet, "row0"), |r, (k, v)| {
                r.with_field(*k, v.clone())
            })
    }

    fn servicing(fields: &[(&str, Value)]) -> SourceRecord {
        fields
            .iter()
            .fold(SourceRecord::new(SourceKind::Servicing, "s.pdf"), |r, (k, v)| {
                r.with_field(*k, v.clone())
            })
    }

    fn two_way(d: &SourceRecord, s: &SourceRecord, category: &str) -> FieldComparison {
        let rules = RuleSet::disclosure_vs_spreadsheet();
        let rule = rules.rule(category).unwrap();
        compare(
            &rules,
            rule,
            &[
                Side { source: SourceKind::Disclosure, record: Some(d) },
                Side { source: SourceKind::Spreadsheet, record: Some(s) },
            ],
        )
    }

    fn three_way(
        s: Option<&SourceRecord>,
        d: Option<&SourceRecord>,
        x: Option<&SourceRecord>,
        category: &str,
    ) -> FieldComparison {
        let rules = RuleSet::servicing_three_way();
        let rule = rules.rule(category).unwrap();
        compare(
            &rules,
            rule,
            &[
                Side { source: SourceKind::Servicing, record: s },
                Side { source: SourceKind::Disclosure, record: d },
                Side { source: SourceKind::Spreadsheet, record: x },
            ],
        )
    }

    const APR: &str = "Annual Percentage Rate (APR)";

    #[test]
    fn apr_fraction_matches_whole_percent() {
        let d = disclosure(&[(APR, json!("5.25"))]);
        let s = spreadsheet(&[("APR", json!(0.0525))]);
        let cmp = two_way(&d, &s, APR);
        assert!(cmp.equal);
        assert!(!cmp.is_discrepancy());
    }

    #[test]
    fn apr_mismatch_formats_spreadsheet_side_as_percent() {
        let d = disclosure(&[(APR, json!("5.30%"))]);
        let s = spreadsheet(&[("APR", json!(0.0525))]);
        let cmp = two_way(&d, &s, APR);
        assert!(cmp.is_discrepancy());
        assert_eq!(cmp.value(SourceKind::Disclosure).unwrap().display, "5.30%");
        assert_eq!(cmp.value(SourceKind::Spreadsheet).unwrap().display, "5.25%");
        assert_eq!(cmp.value(SourceKind::Spreadsheet).unwrap().normalized.to_string(), "5.25");
    }

    #[test]
    fn bare_disclosure_percentage_gets_percent_sign() {
        let d = disclosure(&[(APR, json!("5.30"))]);
        let s = spreadsheet(&[("APR", json!(0.0525))]);
        let cmp = two_way(&d, &s, APR);
        assert!(cmp.is_discrepancy());
        assert_eq!(cmp.value(SourceKind::Disclosure).unwrap().display, "5.30%");
        assert_eq!(cmp.value(SourceKind::Spreadsheet).unwrap().display, "5.25%");

        // 非百分比字段保持原文
        let d = disclosure(&[("Number of Payments", json!("36"))]);
        let s = spreadsheet(&[("Number of Payments", json!(35))]);
        let cmp = two_way(&d, &s, "Number of Payments");
        assert_eq!(cmp.value(SourceKind::Disclosure).unwrap().display, "36");
    }

    #[test]
    fn monthly_payment_uses_emi_amount_column() {
        let d = disclosure(&[("Monthly Payment Amount", json!("$1,250.00"))]);
        let s = spreadsheet(&[("EMI Amount", json!(1250))]);
        assert!(two_way(&d, &s, "Monthly Payment Amount").equal);

        let s = spreadsheet(&[("EMI Amount", json!(1249.5))]);
        let cmp = two_way(&d, &s, "Monthly Payment Amount");
        assert!(cmp.is_discrepancy());
        assert_eq!(cmp.value(SourceKind::Spreadsheet).unwrap().display, "$1249.5");
    }

    #[test]
    fn two_way_missing_values_compare_as_zero() {
        let d = disclosure(&[("Origination Fee", Value::Null)]);
        let s = spreadsheet(&[]);
        let cmp = two_way(&d, &s, "Origination Fee");
        assert!(cmp.equal);

        let d = disclosure(&[]);
        let s = spreadsheet(&[("Number of Payments", json!(36))]);
        let cmp = two_way(&d, &s, "Number of Payments");
        assert!(cmp.is_discrepancy());
        assert_eq!(cmp.value(SourceKind::Disclosure).unwrap().display, "N/A");
        assert_eq!(cmp.value(SourceKind::Spreadsheet).unwrap().display, "36");
    }

    #[test]
    fn three_way_mismatch_on_any_pair() {
        let s = servicing(&[("Late Fee amount", json!(15))]);
        let d = disclosure(&[("Late Charges", json!("$15.00"))]);
        let x = spreadsheet(&[("Late Fee Charges", json!(20))]);
        let cmp = three_way(Some(&s), Some(&d), Some(&x), "Late Charges");
        assert!(cmp.is_discrepancy());
    }

    #[test]
    fn three_way_servicing_na_is_suppressed() {
        let s = servicing(&[("Late Fee amount", Value::Null)]);
        let d = disclosure(&[("Late Charges", json!("$15.00"))]);
        let x = spreadsheet(&[("Late Fee Charges", json!(20))]);
        let cmp = three_way(Some(&s), Some(&d), Some(&x), "Late Charges");
        assert!(!cmp.equal);
        assert!(cmp.suppressed);
        assert!(!cmp.is_discrepancy());
    }

    #[test]
    fn three_way_sentinel_pairing_is_suppressed() {
        let s = servicing(&[("Payment Return Amount", json!("25"))]);
        let d = disclosure(&[("Returned Payment Fee", json!("$30.00"))]);
        let x = spreadsheet(&[("Returned Payment Charges", json!(0))]);
        let cmp = three_way(Some(&s), Some(&d), Some(&x), "Returned Payment Fee");
        assert!(cmp.suppressed);

        // 台账侧缺失 (NA) 不等于 0，不命中
        let cmp = three_way(Some(&s), Some(&d), None, "Returned Payment Fee");
        assert!(cmp.is_discrepancy());
        assert_eq!(cmp.value(SourceKind::Spreadsheet).unwrap().display, "NA");
    }

    #[test]
    fn late_charges_disclosure_display_is_overridden() {
        let s = servicing(&[("Late Fee amount", json!(15))]);
        let d = disclosure(&[("Late Charges", json!("5% of payment"))]);
        let x = spreadsheet(&[("Late Fee Charges", json!(15))]);
        let cmp = three_way(Some(&s), Some(&d), Some(&x), "Late Charges");
        assert!(cmp.is_discrepancy());
        assert_eq!(cmp.value(SourceKind::Disclosure).unwrap().display, "$7.00");
        assert_eq!(cmp.value(SourceKind::Disclosure).unwrap().normalized.to_string(), "5.00");
        assert_eq!(cmp.value(SourceKind::Servicing).unwrap().display, "$15.00");
    }

    #[test]
    fn three_way_all_equal() {
        let s = servicing(&[("Payment Return Amount", json!(30))]);
        let d = disclosure(&[("Returned Payment Fee", json!("$30"))]);
        let x = spreadsheet(&[("Returned Payment Charges", json!("30.00"))]);
        assert!(three_way(Some(&s), Some(&d), Some(&x), "Returned Payment Fee").equal);
    }
}
