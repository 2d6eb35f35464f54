use crate::models::{Discrepancy, ReconciliationReport, RuleSet};
use crate::service::comparator;
use crate::service::matcher::MatchedRecords;
use indexmap::IndexMap;

/// 汇总所有配对记录的比较结果
///
/// 未配对的记录不计入 `total_checked`，也不产生差异。类别顺序与规则顺序一致，
/// 同一类别内按记录顺序追加，同样的输入总是得到同样的报告。
pub fn aggregate(matches: &[MatchedRecords<'_>], rule_set: &RuleSet) -> ReconciliationReport {
    let mut categories: IndexMap<String, Vec<Discrepancy>> = rule_set
        .categories()
        .map(|category| (category.to_string(), Vec::new()))
        .collect();

    let mut total_checked = 0;
    let mut total_with_discrepancy = 0;

    for matched in matches.iter().filter(|m| m.is_matched()) {
        total_checked += 1;
        let mut flagged = false;

        for rule in &rule_set.rules {
            let comparison = comparator::compare_matched(rule_set, rule, matched);
            if comparison.suppressed {
                tracing::debug!(
                    "[{}] {} {}: mismatch suppressed",
                    rule_set.name, matched.loan_id, rule.category
                );
            }
            if !comparison.is_discrepancy() {
                continue;
            }

            flagged = true;
            let discrepancy = Discrepancy {
                loan_id: matched.loan_id.clone(),
                category: rule.category.clone(),
                values: comparison.values,
                context: context_for(rule_set, matched),
                path: matched.primary.path.clone(),
            };
            categories
                .entry(rule.category.clone())
                .or_default()
                .push(discrepancy);
        }

        if flagged {
            total_with_discrepancy += 1;
        }
    }

    let report = ReconciliationReport {
        rule_set: rule_set.name.clone(),
        sources: rule_set.join.sources(),
        context_labels: rule_set.context_fields.iter().map(|c| c.label.clone()).collect(),
        total_checked,
        total_with_discrepancy,
        categories,
    };

    tracing::info!(
        "[{}] 对账完成: 已检查 {}, 有差异 {}, 差异条目 {}",
        report.rule_set,
        report.total_checked,
        report.total_with_discrepancy,
        report.total_discrepancies()
    );

    report
}

fn context_for(rule_set: &RuleSet, matched: &MatchedRecords<'_>) -> IndexMap<String, String> {
    rule_set
        .context_fields
        .iter()
        .map(|ctx| {
            let value = matched
                .side(&rule_set.join, ctx.source)
                .and_then(|record| record.text(&ctx.field))
                .unwrap_or_else(|| ctx.fallback.clone());
            (ctx.label.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceKind, SourceRecord, SourceRecords};
    use crate::service::matcher;
    use serde_json::json;

    fn disclosure(path: &str, loan: &str, apr: &str) -> SourceRecord {
        SourceRecord::new(SourceKind::Disclosure, path)
            .with_field("Account Number", json!(loan))
            .with_field("Annual Percentage Rate (APR)", json!(apr))
            .with_field("Finance Charge", json!("$1,000.00"))
    }

    fn row(loan: &str, apr: f64) -> SourceRecord {
        SourceRecord::new(SourceKind::Spreadsheet, format!("row-{}", loan))
            .with_field("Loan Id", json!(loan))
            .with_field("Application Id", json!(format!("APP-{}", loan)))
            .with_field("APR", json!(apr))
            .with_field("Finance Charge", json!(1000))
    }

    fn records() -> SourceRecords {
        SourceRecords::new()
            .with_records(
                SourceKind::Disclosure,
                vec![
                    disclosure("a.pdf", "A", "5.00%"),
                    disclosure("b.pdf", "B", "4.00%"),
                    disclosure("z.pdf", "Z", "4.00%"),
                ],
            )
            .with_records(SourceKind::Spreadsheet, vec![row("A", 0.06), row("B", 0.04)])
    }

    #[test]
    fn unmatched_records_are_not_checked() {
        let rules = RuleSet::disclosure_vs_spreadsheet();
        let records = records();
        let matches = matcher::join(&records, &rules);
        let report = aggregate(&matches, &rules);

        assert_eq!(report.total_checked, 2);
        assert_eq!(report.total_with_discrepancy, 1);
        let apr = report.entries("Annual Percentage Rate (APR)");
        assert_eq!(apr.len(), 1);
        assert_eq!(apr[0].loan_id.as_str(), "A");
        assert_eq!(apr[0].path, "a.pdf");
        assert_eq!(apr[0].context["Application Id"], "APP-A");
        assert_eq!(apr[0].context["Booking Date"], "N/A");
    }

    #[test]
    fn zero_count_categories_are_kept() {
        let rules = RuleSet::disclosure_vs_spreadsheet();
        let records = records();
        let report = aggregate(&matcher::join(&records, &rules), &rules);

        let summary = report.summary();
        assert_eq!(summary.len(), 7);
        assert_eq!(summary[0].count, 1);
        assert!(summary[1..].iter().all(|s| s.count == 0));
        assert_eq!(report.detail_tables().count(), 1);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let rules = RuleSet::disclosure_vs_spreadsheet();
        let records = records();
        let first = aggregate(&matcher::join(&records, &rules), &rules);
        let second = aggregate(&matcher::join(&records, &rules), &rules);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn record_with_several_mismatches_counts_once() {
        let rules = RuleSet::disclosure_vs_spreadsheet();
        let records = SourceRecords::new()
            .with_records(SourceKind::Disclosure, vec![disclosure("a.pdf", "A", "5.00%")])
            .with_records(
                SourceKind::Spreadsheet,
                vec![row("A", 0.06).with_field("Finance Charge", json!(999))],
            );
        let report = aggregate(&matcher::join(&records, &rules), &rules);
        assert_eq!(report.total_checked, 1);
        assert_eq!(report.total_with_discrepancy, 1);
        assert_eq!(report.total_discrepancies(), 2);
    }
}
