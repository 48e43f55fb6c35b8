//! Output formats for experiment results

pub mod csv_export;
pub mod json_export;
pub mod report;
pub mod text_log;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
pub use report::{ReportEmitter, ReportOutcome};
pub use text_log::ResponseLog;
