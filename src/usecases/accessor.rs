//! Accessor Synthesizer - Metric Slots and Their Bound Implementations
//!
//! A [`Metric<L, M>`] slot starts unbound. Binding validates the
//! declaration, derives the label schema of `L`, builds the backend metric
//! with the builder registered for `M`, registers its collector and stores
//! the resulting accessor in the slot.
//!
//! Calls on a bound slot only read immutable state and delegate to the
//! builder's value factory, so a bound group can be shared across threads.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::domain::labels::{LabelArg, LabelSchema, LabelValues};
use crate::domain::meta;
use crate::error::{BindError, BindErrorKind, LabelError};
use crate::ports::builder::{MetricOutput, MetricSpec, ValueFactory};
use crate::usecases::walker::{FieldDecl, GroupField, Walker};

/// The callable implementation installed into a bound slot.
pub struct Accessor<L, M> {
    schema: LabelSchema,
    label_names: Vec<String>,
    factory: ValueFactory<M>,
    _labels: PhantomData<fn(&L)>,
}

impl<L: LabelArg, M> Accessor<L, M> {
    /// Render `labels` and produce the metric instance for them.
    pub fn call(&self, labels: &L) -> M {
        let values = LabelValues::new(&self.label_names, self.schema.render(labels));
        (self.factory)(&values)
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }
}

/// A metric slot taking labels `L` and yielding a metric instance `M`.
///
/// `L` is `()` for label-less metrics or a [`label_set!`](crate::label_set)
/// record. `M` selects the builder, e.g. `prometheus::Counter`.
pub struct Metric<L, M> {
    accessor: Option<Arc<Accessor<L, M>>>,
}

impl<L, M> Metric<L, M> {
    /// An unbound slot.
    pub const fn new() -> Self {
        Self { accessor: None }
    }

    pub const fn is_bound(&self) -> bool {
        self.accessor.is_some()
    }
}

impl<L: LabelArg, M> Metric<L, M> {
    /// The metric instance for `labels`.
    ///
    /// # Panics
    /// If the slot was never bound or its group failed to bind.
    pub fn with(&self, labels: &L) -> M {
        match &self.accessor {
            Some(accessor) => accessor.call(labels),
            None => panic!(
                "metric accessor `{}` invoked before binding",
                type_name::<Self>()
            ),
        }
    }

    /// The metric instance for `labels`, or `None` while unbound.
    pub fn try_with(&self, labels: &L) -> Option<M> {
        self.accessor.as_ref().map(|accessor| accessor.call(labels))
    }

    pub fn accessor(&self) -> Option<&Accessor<L, M>> {
        self.accessor.as_deref()
    }
}

impl<M> Metric<(), M> {
    /// The single instance of a label-less metric.
    ///
    /// # Panics
    /// If the slot is unbound.
    pub fn get(&self) -> M {
        self.with(&())
    }
}

impl<L, M> Default for Metric<L, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L, M> Clone for Metric<L, M> {
    fn clone(&self) -> Self {
        Self {
            accessor: self.accessor.clone(),
        }
    }
}

impl<L, M> fmt::Debug for Metric<L, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("labels", &type_name::<L>())
            .field("output", &type_name::<M>())
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl<L: LabelArg, M: MetricOutput> GroupField for Metric<L, M> {
    fn bind_field(&mut self, decl: &FieldDecl<'_>, walker: &mut Walker<'_>) -> Result<(), BindError> {
        let accessor = synthesize::<L, M>(decl, walker)?;
        self.accessor = Some(Arc::new(accessor));
        Ok(())
    }

    fn unbind_field(&mut self) {
        self.accessor = None;
    }

    fn is_field_bound(&self) -> bool {
        self.is_bound()
    }
}

/// Build the accessor for one metric declaration.
///
/// Steps, each aborting with its own error kind: `name`/`help` metadata,
/// parameter and return arity, label schema, builder lookup, build,
/// registration.
pub fn synthesize<L: LabelArg, M: MetricOutput>(
    decl: &FieldDecl<'_>,
    walker: &mut Walker<'_>,
) -> Result<Accessor<L, M>, BindError> {
    let (name, help) = metric_tags(decl, walker)?;
    check_arity(L::PARAMS, M::RETURN_VALUES, walker)?;

    let schema = LabelSchema::extract::<L>().map_err(|e| walker.error(e.into()))?;
    let label_names = schema.names();

    let builder = walker.builders().lookup::<M>().ok_or_else(|| {
        walker.error(BindErrorKind::NoBuilderForType {
            type_name: type_name::<M>(),
        })
    })?;

    let namespace = walker.namespace();
    let spec = MetricSpec {
        name,
        help,
        namespace: &namespace,
        label_names: &label_names,
        meta: decl.meta,
    };

    let built = builder.build(&spec).map_err(|source| {
        walker.error(BindErrorKind::BuilderFailed {
            metric: name.to_string(),
            source,
        })
    })?;

    walker.register(built.collector).map_err(|source| {
        walker.error(BindErrorKind::RegistrationFailed {
            metric: spec.fq_name(),
            source,
        })
    })?;

    debug!(
        metric = %spec.fq_name(),
        labels = ?label_names,
        output = type_name::<M>(),
        "Metric bound"
    );

    Ok(Accessor {
        schema,
        label_names,
        factory: built.factory,
        _labels: PhantomData,
    })
}

/// Error for a slot whose output `M` has no [`MetricOutput`] impl, so no
/// builder can exist for it. Earlier steps of [`synthesize`] report first.
pub fn unknown_output_error<L: LabelArg, M>(decl: &FieldDecl<'_>, walker: &Walker<'_>) -> BindError {
    let checked = metric_tags(decl, walker)
        .and_then(|_| check_arity(L::PARAMS, 1, walker))
        .and_then(|()| LabelSchema::extract::<L>().map_err(|e| walker.error(e.into())));

    match checked {
        Ok(_) => walker.error(BindErrorKind::NoBuilderForType {
            type_name: type_name::<M>(),
        }),
        Err(e) => e,
    }
}

/// Error for a slot whose parameter `L` is not `()`, a label record or a
/// tuple. `return_values` is the arity of the slot's output.
pub fn non_record_labels_error<L>(decl: &FieldDecl<'_>, walker: &Walker<'_>, return_values: usize) -> BindError {
    match metric_tags(decl, walker).and_then(|_| check_arity(1, return_values, walker)) {
        Ok(()) => walker.error(
            LabelError::NotAStruct {
                type_name: type_name::<L>(),
            }
            .into(),
        ),
        Err(e) => e,
    }
}

fn metric_tags<'m>(decl: &FieldDecl<'m>, walker: &Walker<'_>) -> Result<(&'m str, &'m str), BindError> {
    let name = decl
        .meta
        .get(meta::NAME)
        .ok_or_else(|| walker.error(BindErrorKind::MissingNameTag))?;
    let help = decl
        .meta
        .get(meta::HELP)
        .ok_or_else(|| walker.error(BindErrorKind::MissingHelpTag))?;
    Ok((name, help))
}

fn check_arity(params: usize, return_values: usize, walker: &Walker<'_>) -> Result<(), BindError> {
    if params > 1 {
        return Err(walker.error(BindErrorKind::TooManyParameters { count: params }));
    }
    if return_values > 1 {
        return Err(walker.error(BindErrorKind::TooManyReturnValues { count: return_values }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::meta::Meta;
    use crate::usecases::registry::BuilderRegistry;
    use prometheus::Registry;

    fn counter_registry() -> BuilderRegistry {
        let mut builders = BuilderRegistry::new();
        builders
            .add::<prometheus::Counter, _>(crate::adapters::metrics::builders::build_counter)
            .unwrap();
        builders
    }

    #[test]
    fn test_unbound_slot() {
        let slot: Metric<(), prometheus::Counter> = Metric::default();
        assert!(!slot.is_bound());
        assert!(slot.try_with(&()).is_none());
    }

    #[test]
    #[should_panic(expected = "invoked before binding")]
    fn test_unbound_slot_panics_on_call() {
        let slot: Metric<(), prometheus::Counter> = Metric::new();
        slot.get();
    }

    #[test]
    fn test_bind_label_less_counter() {
        let builders = counter_registry();
        let registry = Registry::new();
        let mut walker = Walker::new(&builders, &registry, "svc");

        let mut slot: Metric<(), prometheus::Counter> = Metric::new();
        let decl = FieldDecl::new("no_labels", Meta::new(&[("name", "no_labels"), ("help", "No labels")]));
        walker.field(&decl, &mut slot).unwrap();

        slot.get().inc_by(2.0);
        assert_eq!(slot.get().get(), 2.0);
        assert_eq!(walker.registered(), 1);

        let families = registry.gather();
        assert_eq!(families[0].get_name(), "svc_no_labels");
    }

    #[test]
    fn test_missing_help() {
        let builders = counter_registry();
        let registry = Registry::new();
        let mut walker = Walker::new(&builders, &registry, "svc");

        let mut slot: Metric<(), prometheus::Counter> = Metric::new();
        let decl = FieldDecl::new("nohelp", Meta::new(&[("name", "nohelp")]));
        let err = walker.field(&decl, &mut slot).unwrap_err();

        assert!(matches!(err.kind(), BindErrorKind::MissingHelpTag));
        assert_eq!(err.path(), "nohelp");
        assert!(!slot.is_bound());
    }

    #[test]
    fn test_too_many_parameters() {
        let builders = counter_registry();
        let registry = Registry::new();
        let mut walker = Walker::new(&builders, &registry, "svc");

        let mut slot: Metric<(String, String), prometheus::Counter> = Metric::new();
        let decl = FieldDecl::new("foo", Meta::new(&[("name", "foo"), ("help", "only labels are accepted")]));
        let err = walker.field(&decl, &mut slot).unwrap_err();

        assert!(matches!(err.kind(), BindErrorKind::TooManyParameters { count: 2 }));
    }

    #[test]
    fn test_too_many_return_values() {
        let builders = counter_registry();
        let registry = Registry::new();
        let mut walker = Walker::new(&builders, &registry, "svc");

        let mut slot: Metric<(), (prometheus::Gauge, prometheus::Counter)> = Metric::new();
        let decl = FieldDecl::new("foo", Meta::new(&[("name", "foo"), ("help", "what is this?")]));
        let err = walker.field(&decl, &mut slot).unwrap_err();

        assert!(matches!(err.kind(), BindErrorKind::TooManyReturnValues { count: 2 }));
    }

    #[test]
    fn test_no_builder_for_type() {
        let builders = counter_registry();
        let registry = Registry::new();
        let mut walker = Walker::new(&builders, &registry, "svc");

        let mut slot: Metric<(), prometheus::Gauge> = Metric::new();
        let decl = FieldDecl::new("gauge", Meta::new(&[("name", "gauge"), ("help", "Gauge is not registered")]));
        let err = walker.field(&decl, &mut slot).unwrap_err();

        assert!(matches!(err.kind(), BindErrorKind::NoBuilderForType { .. }));
        assert_eq!(walker.registered(), 0);
    }

    #[test]
    fn test_labels_not_a_struct() {
        let builders = counter_registry();
        let registry = Registry::new();
        let mut walker = Walker::new(&builders, &registry, "svc");

        let mut slot: Metric<String, prometheus::Counter> = Metric::new();
        let decl = FieldDecl::new("with_labels", Meta::new(&[("name", "with_labels"), ("help", "Labels are not a struct")]));
        let err = walker.field(&decl, &mut slot).unwrap_err();

        assert!(matches!(
            err.kind(),
            BindErrorKind::Labels(crate::error::LabelError::NotAStruct { .. })
        ));
    }
}
