//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Concrete implementations against the `prometheus` crate:
//! - `metrics`: default builders, the summary collector and the HTTP
//!   scrape endpoint

pub mod metrics;
