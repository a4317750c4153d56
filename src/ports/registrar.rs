//! Registrar Port - Collector Registration
//!
//! The engine reports every successfully built collector exactly once.
//! A rejection aborts the declaration's binding.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::Registry;

/// External registry of collectors.
pub trait Registrar {
    /// Register `collector`. Errors commonly signal a metric name that
    /// is already registered.
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()>;
}

impl Registrar for Registry {
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()> {
        Self::register(self, collector)
    }
}

impl<R: Registrar + ?Sized> Registrar for &R {
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()> {
        (**self).register(collector)
    }
}

impl<R: Registrar + ?Sized> Registrar for Arc<R> {
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()> {
        (**self).register(collector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let registry = Registry::new();
        let first = prometheus::Gauge::new("metric", "first gauge").unwrap();
        let second = prometheus::Gauge::new("metric", "name duplicates the previous one").unwrap();

        Registrar::register(&registry, Box::new(first)).unwrap();
        assert!(Registrar::register(&registry, Box::new(second)).is_err());
    }

    #[test]
    fn test_shared_registry() {
        let registry = Arc::new(Registry::new());
        let gauge = prometheus::Gauge::new("shared", "help").unwrap();
        assert!(Registrar::register(&registry, Box::new(gauge)).is_ok());
    }
}
