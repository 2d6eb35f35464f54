pub mod aggregator;
pub mod comparator;
pub mod matcher;
pub mod normalizer;
pub mod notification;
pub mod reconciler;

pub use aggregator::aggregate;
pub use comparator::{compare, FieldComparison, Side};
pub use matcher::{join, match_records, MatchedRecords, RecordIndex};
pub use normalizer::{normalize, NormalizedValue};
pub use notification::NotificationTarget;
pub use reconciler::ReconcilerService;
