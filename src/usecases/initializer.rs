//! Initializer - Binding Engine Facade
//!
//! Owns the builder registry and the registrar, and binds metric groups.
//! There is no global instance: construct one at startup, add builders,
//! then bind every group before any accessor is invoked.

use std::any::type_name;
use std::fmt;

use tracing::{info, instrument, warn};

use crate::adapters::metrics::builders;
use crate::error::{BindError, BindErrorKind, RegistryError};
use crate::ports::builder::{Builder, MetricOutput};
use crate::ports::registrar::Registrar;
use crate::usecases::registry::BuilderRegistry;
use crate::usecases::walker::{MetricGroup, Walker};

/// Binds declared metric groups against a registrar.
pub struct Initializer<R: Registrar> {
    registrar: R,
    builders: BuilderRegistry,
}

impl<R: Registrar> Initializer<R> {
    /// Create an initializer with no builders.
    pub fn new(registrar: R) -> Self {
        Self {
            registrar,
            builders: BuilderRegistry::new(),
        }
    }

    /// Create an initializer with the prometheus builders installed for
    /// `Counter`, `IntCounter`, `Gauge`, `IntGauge`, `Histogram` and
    /// [`Summary`](crate::adapters::metrics::summary::Summary).
    pub fn with_default_builders(registrar: R) -> Self {
        let mut initializer = Self::new(registrar);
        builders::install_defaults(&mut initializer.builders);
        initializer
    }

    /// Register `builder` for slots whose output is `M`.
    ///
    /// # Errors
    /// `DuplicateBuilder` if `M` already has a builder.
    pub fn add_builder<M, B>(&mut self, builder: B) -> Result<(), RegistryError>
    where
        M: MetricOutput,
        B: Builder<M>,
    {
        self.builders.add::<M, B>(builder)
    }

    /// [`add_builder`](Self::add_builder), aborting on error.
    ///
    /// # Panics
    /// If `M` already has a builder.
    pub fn must_add_builder<M, B>(&mut self, builder: B)
    where
        M: MetricOutput,
        B: Builder<M>,
    {
        if let Err(e) = self.add_builder::<M, B>(builder) {
            panic!("add builder for `{}`: {e}", type_name::<M>());
        }
    }

    /// Bind every slot of `group` under the `namespace` root.
    ///
    /// All-or-nothing: on error every slot of the group is reset to
    /// unbound and the group must be discarded. Collectors registered
    /// before the failure stay registered.
    ///
    /// # Errors
    /// `AlreadyBound` if any slot of `group` is bound, leaving it intact.
    /// Otherwise the first declaration, builder or registration error.
    #[instrument(skip(self, group), fields(group_type = type_name::<G>()))]
    pub fn bind<G: MetricGroup + ?Sized>(&self, group: &mut G, namespace: &str) -> Result<(), BindError> {
        if group.any_bound() {
            let err = BindError::new(
                String::new(),
                BindErrorKind::AlreadyBound {
                    type_name: type_name::<G>(),
                },
            );
            warn!(error = %err, "Metric group left untouched");
            return Err(err);
        }

        let mut walker = Walker::new(&self.builders, &self.registrar, namespace);

        match group.bind_fields(&mut walker) {
            Ok(()) => {
                info!(registered = walker.registered(), "Metric group bound");
                Ok(())
            }
            Err(e) => {
                group.unbind_fields();
                warn!(
                    error = %e,
                    registered = walker.registered(),
                    "Metric group failed to bind"
                );
                Err(e)
            }
        }
    }

    /// [`bind`](Self::bind), aborting on error.
    ///
    /// # Panics
    /// If the group fails to bind.
    pub fn must_bind<G: MetricGroup + ?Sized>(&self, group: &mut G, namespace: &str) {
        if let Err(e) = self.bind(group, namespace) {
            panic!("bind metrics in namespace `{namespace}`: {e}");
        }
    }

    pub fn registrar(&self) -> &R {
        &self.registrar
    }

    pub fn builders(&self) -> &BuilderRegistry {
        &self.builders
    }
}

impl<R: Registrar> fmt::Debug for Initializer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initializer")
            .field("builders", &self.builders)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    crate::metric_group! {
        struct Empty {}
    }

    crate::metric_group! {
        struct OneGauge {
            #[meta(name = "gauge", help = "help")]
            metric: crate::Metric<(), prometheus::Gauge>,
        }
    }

    #[test]
    fn test_must_add_builder_adds() {
        let mut initializer = Initializer::new(Registry::new());
        initializer.must_add_builder::<prometheus::Gauge, _>(builders::build_gauge);

        let mut metrics = OneGauge::default();
        assert!(initializer.bind(&mut metrics, "namespace").is_ok());
        assert!(metrics.metric.is_bound());
    }

    #[test]
    #[should_panic(expected = "already has a builder")]
    fn test_same_builder_twice_panics() {
        let mut initializer = Initializer::new(Registry::new());
        initializer.must_add_builder::<prometheus::Gauge, _>(builders::build_gauge);
        initializer.must_add_builder::<prometheus::Gauge, _>(builders::build_gauge);
    }

    #[test]
    fn test_same_builder_twice_fails() {
        let mut initializer = Initializer::new(Registry::new());
        assert!(initializer.add_builder::<prometheus::Gauge, _>(builders::build_gauge).is_ok());
        assert!(initializer.add_builder::<prometheus::Gauge, _>(builders::build_gauge).is_err());
    }

    #[test]
    fn test_must_bind_empty_group() {
        let initializer = Initializer::new(Registry::new());
        initializer.must_bind(&mut Empty::default(), "namespace");
    }

    #[test]
    #[should_panic(expected = "bind metrics in namespace `namespace`")]
    fn test_must_bind_panics_without_builder() {
        let initializer = Initializer::new(Registry::new());
        initializer.must_bind(&mut OneGauge::default(), "namespace");
    }

    #[test]
    fn test_second_bind_keeps_bound_group() {
        let initializer = Initializer::with_default_builders(Registry::new());
        let mut metrics = OneGauge::default();
        initializer.must_bind(&mut metrics, "namespace");
        metrics.metric.get().set(3.0);

        let err = initializer.bind(&mut metrics, "namespace").unwrap_err();
        assert!(matches!(err.kind(), BindErrorKind::AlreadyBound { .. }));
        assert_eq!(err.path(), "");
        assert!(metrics.metric.is_bound());
        assert_eq!(metrics.metric.get().get(), 3.0);
    }

    #[test]
    fn test_default_builders_installed() {
        let initializer = Initializer::with_default_builders(Registry::new());
        assert_eq!(initializer.builders().len(), 6);
    }
}
