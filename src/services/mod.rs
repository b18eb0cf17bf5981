pub mod fallback_rules;
pub mod judgment;
pub mod report_writer;
pub mod result_analyzer;

pub use judgment::{JudgmentPrompt, JudgmentService};
pub use report_writer::ReportWriter;
pub use result_analyzer::ResultAnalyzer;
