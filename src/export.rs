use crate::error::Result;
use crate::models::ReconciliationReport;
use csv::Writer;
use std::io::Write;

/// 导出差异明细为 CSV
///
/// 列：category, loan_id, path, 各来源展示值（按关联顺序）, 上下文列。
pub fn write_report_csv<W: Write>(report: &ReconciliationReport, out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);

    let mut header = vec!["category".to_string(), "loan_id".to_string(), "path".to_string()];
    header.extend(report.sources.iter().map(|s| format!("{}_value", s)));
    header.extend(report.context_labels.iter().cloned());
    writer.write_record(&header)?;

    for (category, entries) in report.detail_tables() {
        for entry in entries {
            let mut row = vec![
                category.to_string(),
                entry.loan_id.to_string(),
                entry.path.clone(),
            ];
            row.extend(report.sources.iter().map(|source| {
                entry
                    .value(*source)
                    .map(|v| v.display.clone())
                    .unwrap_or_default()
            }));
            row.extend(
                report
                    .context_labels
                    .iter()
                    .map(|label| entry.context.get(label).cloned().unwrap_or_default()),
            );
            writer.write_record(&row)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// 导出为字符串
pub fn report_to_csv(report: &ReconciliationReport) -> Result<String> {
    let mut buf = Vec::new();
    write_report_csv(report, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
