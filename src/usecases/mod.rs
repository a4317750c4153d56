//! Use Cases Layer - Binding Engine
//!
//! - `registry`: output type → builder dispatch
//! - `walker`: recursive traversal of metric groups
//! - `accessor`: metric slots and their synthesized implementations
//! - `initializer`: the engine facade tying the above together

pub mod accessor;
pub mod initializer;
pub mod registry;
pub mod walker;

pub use accessor::{Accessor, Metric};
pub use initializer::Initializer;
pub use registry::BuilderRegistry;
pub use walker::{FieldDecl, GroupField, MetricGroup, Walker};
