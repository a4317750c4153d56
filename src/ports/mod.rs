//! Ports - Interfaces to External Collaborators
//!
//! The binding core talks to the metrics backend only through these
//! traits: builders construct backend metrics, the registrar accepts
//! their collectors.

pub mod builder;
pub mod registrar;

pub use builder::{Builder, Built, MetricOutput, MetricSpec, ValueFactory};
pub use registrar::Registrar;
