pub mod connectors;
pub mod dataset;
pub mod report;

pub use connectors::{CsvConnector, CsvOptions, DataValidator};
pub use dataset::Dataset;
pub use report::ReportWriter;
