//! Prometheus Adapters
//!
//! Builders for the prometheus metric kinds, an in-crate summary
//! collector and the axum exporter serving `/metrics` and `/live`.

pub mod builders;
pub mod exporter;
pub mod summary;

pub use builders::{install_defaults, BuildError};
pub use exporter::MetricsExporter;
pub use summary::{Summary, SummaryOpts, SummaryVec};
