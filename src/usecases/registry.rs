//! Builder Registry - Output Type → Builder Dispatch
//!
//! Open dispatch table keyed by the `TypeId` of a slot's output type.
//! New metric kinds plug in by registering a builder for a new output
//! type; the walker and synthesizer never change.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::ports::builder::{Builder, MetricOutput};

struct Entry {
    type_name: &'static str,
    /// Always an `Arc<dyn Builder<M>>` for the keyed `M`.
    builder: Box<dyn Any + Send + Sync>,
}

/// At most one builder per output type.
#[derive(Default)]
pub struct BuilderRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `builder` as the constructor for outputs of type `M`.
    ///
    /// # Errors
    /// `DuplicateBuilder` if `M` already has a builder; the registry is
    /// left unchanged.
    pub fn add<M, B>(&mut self, builder: B) -> Result<(), RegistryError>
    where
        M: MetricOutput,
        B: Builder<M>,
    {
        if self.contains::<M>() {
            return Err(RegistryError::DuplicateBuilder {
                type_name: type_name::<M>(),
            });
        }

        self.insert::<M, B>(builder);
        Ok(())
    }

    /// Register `builder` for `M`, replacing any previous one.
    ///
    /// Returns whether a builder was replaced.
    pub fn insert<M, B>(&mut self, builder: B) -> bool
    where
        M: MetricOutput,
        B: Builder<M>,
    {
        let builder: Arc<dyn Builder<M>> = Arc::new(builder);
        self.entries
            .insert(
                TypeId::of::<M>(),
                Entry {
                    type_name: type_name::<M>(),
                    builder: Box::new(builder),
                },
            )
            .is_some()
    }

    /// The builder registered for `M`, if any.
    pub fn lookup<M: MetricOutput>(&self) -> Option<Arc<dyn Builder<M>>> {
        self.entries
            .get(&TypeId::of::<M>())
            .and_then(|entry| entry.builder.downcast_ref::<Arc<dyn Builder<M>>>())
            .cloned()
    }

    pub fn contains<M: MetricOutput>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<M>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.entries.values().map(|e| e.type_name).collect();
        types.sort_unstable();
        f.debug_struct("BuilderRegistry").field("types", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::ports::builder::{Built, MetricSpec};

    fn gauge_builder(spec: &MetricSpec<'_>) -> Result<Built<prometheus::Gauge>, BoxError> {
        let gauge = prometheus::Gauge::new(spec.fq_name(), spec.help)?;
        let handle = gauge.clone();
        Ok(Built::new(move |_| handle.clone(), gauge))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut registry = BuilderRegistry::new();
        registry.add::<prometheus::Gauge, _>(gauge_builder).unwrap();

        assert!(registry.contains::<prometheus::Gauge>());
        assert!(registry.lookup::<prometheus::Gauge>().is_some());
        assert!(registry.lookup::<prometheus::Counter>().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_builder_is_rejected() {
        let mut registry = BuilderRegistry::new();
        registry.add::<prometheus::Gauge, _>(gauge_builder).unwrap();

        let err = registry.add::<prometheus::Gauge, _>(gauge_builder).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateBuilder { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_replaces() {
        let mut registry = BuilderRegistry::new();
        assert!(!registry.insert::<prometheus::Gauge, _>(gauge_builder));
        assert!(registry.insert::<prometheus::Gauge, _>(gauge_builder));
        assert_eq!(registry.len(), 1);
    }
}
