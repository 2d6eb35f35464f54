pub mod extraction;
pub mod manifest;
pub mod record;
pub mod report;
pub mod rule;

pub use extraction::{ExtractedDocument, ExtractionBatch};
pub use manifest::{Manifest, ManifestEntry};
pub use record::{LoanKey, SourceKind, SourceRecord, SourceRecords};
pub use report::{CategorySummary, ComparedValue, Discrepancy, ReconciliationReport};
pub use rule::{
    ComparisonRule, ContextField, Conversion, DisplayOverride, DisplayStyle, FieldKind, FieldNames,
    JoinPlan, MissingPolicy, RuleCatalog, RuleSet, SideConversion, Suppression,
    DISCLOSURE_RULE_SET, SERVICING_RULE_SET,
};
