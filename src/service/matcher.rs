use crate::models::{JoinPlan, LoanKey, RuleSet, SourceKind, SourceRecord, SourceRecords};
use indexmap::IndexMap;

/// 某来源按贷款号建立的索引
///
/// 同一贷款号出现多次时只保留第一条，其余计入 `duplicates` 并记录告警。
#[derive(Debug)]
pub struct RecordIndex<'a> {
    origin: Option<SourceKind>,
    by_key: IndexMap<LoanKey, &'a SourceRecord>,
    duplicates: usize,
    unkeyed: usize,
}

impl<'a> RecordIndex<'a> {
    pub fn build(records: &'a [SourceRecord], key_field: &str) -> Self {
        let mut by_key: IndexMap<LoanKey, &'a SourceRecord> = IndexMap::with_capacity(records.len());
        let mut duplicates = 0;
        let mut unkeyed = 0;

        for record in records {
            let Some(key) = record.key(key_field) else {
                unkeyed += 1;
                tracing::warn!(
                    "{} record {} has no '{}', cannot be matched",
                    record.origin, record.path, key_field
                );
                continue;
            };

            if let Some(first) = by_key.get(&key) {
                duplicates += 1;
                tracing::warn!(
                    "Duplicate {} key {}: keeping {}, ignoring {}",
                    record.origin, key, first.path, record.path
                );
                continue;
            }
            by_key.insert(key, record);
        }

        Self {
            origin: records.first().map(|r| r.origin),
            by_key,
            duplicates,
            unkeyed,
        }
    }

    pub fn get(&self, key: &LoanKey) -> Option<&'a SourceRecord> {
        self.by_key.get(key).copied()
    }

    /// 按首次出现顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&LoanKey, &'a SourceRecord)> + '_ {
        self.by_key.iter().map(|(k, r)| (k, *r))
    }

    pub fn origin(&self) -> Option<SourceKind> {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}

/// 主来源记录及其在其他来源中的对应记录
#[derive(Debug, Clone)]
pub struct MatchedRecords<'a> {
    pub loan_id: LoanKey,
    pub primary: &'a SourceRecord,
    pub secondary: Option<&'a SourceRecord>,
    pub lookup: Option<&'a SourceRecord>,
}

impl<'a> MatchedRecords<'a> {
    /// 主、次来源都存在
    pub fn is_matched(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn side(&self, plan: &JoinPlan, kind: SourceKind) -> Option<&'a SourceRecord> {
        if kind == plan.primary {
            Some(self.primary)
        } else if kind == plan.secondary {
            self.secondary
        } else if Some(kind) == plan.lookup {
            self.lookup
        } else {
            None
        }
    }
}

/// 两来源配对：每条主记录找贷款号相同的次记录，找不到时 `secondary` 为空
pub fn match_records<'a>(
    primary: &'a [SourceRecord],
    secondary: &'a [SourceRecord],
    primary_key: &str,
    secondary_key: &str,
) -> Vec<MatchedRecords<'a>> {
    let primary_index = RecordIndex::build(primary, primary_key);
    let secondary_index = RecordIndex::build(secondary, secondary_key);

    primary_index
        .iter()
        .map(|(key, record)| MatchedRecords {
            loan_id: key.clone(),
            primary: record,
            secondary: secondary_index.get(key),
            lookup: None,
        })
        .collect()
}

/// 按规则集的关联方式配对
///
/// 三来源时先做主 -> 次配对，再独立按贷款号查找第三来源；第三来源缺失不影响配对。
pub fn join<'a>(records: &'a SourceRecords, rules: &RuleSet) -> Vec<MatchedRecords<'a>> {
    let plan = &rules.join;
    let mut matches = match_records(
        records.records(plan.primary),
        records.records(plan.secondary),
        rules.key_field(plan.primary),
        rules.key_field(plan.secondary),
    );

    if let Some(lookup_kind) = plan.lookup {
        let lookup_index = RecordIndex::build(records.records(lookup_kind), rules.key_field(lookup_kind));
        for m in matches.iter_mut() {
            m.lookup = lookup_index.get(&m.loan_id);
        }
    }

    let matched = matches.iter().filter(|m| m.is_matched()).count();
    tracing::debug!(
        "[{}] {} {} records, {} matched with {}",
        rules.name,
        matches.len(),
        plan.primary,
        matched,
        plan.secondary
    );

    matches
}
