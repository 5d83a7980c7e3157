//! Report output

mod report;

pub use report::{render, OutputFormat, ReportContext};
