//! promgroup - Declarative Prometheus Metric Groups
//!
//! Declare metrics as fields of a struct, bind the struct once at
//! startup, then call each field to get the labelled metric instance.
//!
//! ```
//! use promgroup::{label_set, metric_group, Initializer, Metric};
//!
//! label_set! {
//!     #[derive(Default)]
//!     pub struct Status {
//!         #[meta(label = "code", default = "200")]
//!         pub code: i32,
//!     }
//! }
//!
//! metric_group! {
//!     pub struct Http {
//!         #[meta(name = "requests_total", help = "Requests by status")]
//!         pub requests: Metric<Status, prometheus::IntCounter>,
//!     }
//! }
//!
//! let registry = prometheus::Registry::new();
//! let mut http = Http::default();
//! Initializer::with_default_builders(&registry).must_bind(&mut http, "web");
//!
//! http.requests.with(&Status { code: 404 }).inc();
//! assert_eq!(registry.gather()[0].get_name(), "web_requests_total");
//! ```
//!
//! Layout follows the hexagonal split:
//! - `domain`: metadata and label schemas
//! - `ports`: builder and registrar interfaces
//! - `usecases`: builder registry, walker, accessor synthesis, initializer
//! - `adapters`: prometheus builders, summary collector, HTTP exporter
//! - `config`: exporter binary configuration

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod usecases;

mod macros;

#[doc(hidden)]
#[path = "private.rs"]
pub mod __private;

pub use adapters::metrics::{Summary, SummaryOpts, SummaryVec};
pub use domain::labels::{
    LabelArg, LabelDescriptor, LabelKind, LabelScalar, LabelSchema, LabelSet, LabelValue,
    LabelValues, SchemaBuilder,
};
pub use domain::meta::Meta;
pub use error::{BindError, BindErrorKind, BoxError, LabelError, RegistryError};
pub use ports::builder::{Builder, Built, MetricOutput, MetricSpec, ValueFactory};
pub use ports::registrar::Registrar;
pub use usecases::accessor::{Accessor, Metric};
pub use usecases::initializer::Initializer;
pub use usecases::registry::BuilderRegistry;
pub use usecases::walker::{FieldDecl, GroupField, MetricGroup, Walker};
