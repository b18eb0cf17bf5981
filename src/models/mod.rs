pub mod batch;
pub mod loaders;
pub mod response;
pub mod test_item;
pub mod verdict;

pub use batch::{BatchStatus, TaskOrigin, ValidationBatch, ValidationResult};
pub use loaders::{load_all_toml_files, load_test_items, parse_test_items};
pub use response::{EquipmentCommand, EquipmentResponse, ResponseStatus, TelemetryValue};
pub use test_item::{EquipmentType, TestCategory, TestCondition, TestItem};
pub use verdict::{JudgmentSource, ReviewStatus, Verdict, VerdictKind, FALLBACK_CONFIDENCE};
