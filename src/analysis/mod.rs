//! Analysis stages.
//!
//! Normalization of the combined table, column capability detection,
//! the generic grouping machinery and the report definitions built on it.

pub mod aggregator;
pub mod normalizer;
pub mod reports;
pub mod schema;

pub use normalizer::normalize;
pub use reports::{build_reports, ReportContext, ReportOutput};
pub use schema::Capabilities;
