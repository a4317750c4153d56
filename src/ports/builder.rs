//! Builder Port - Pluggable Metric Constructors
//!
//! A builder turns one declaration's metadata into a backend metric: a
//! typed value factory used by the accessor at call time, plus the
//! collector the engine registers. Builders are keyed by the output type
//! they produce, so one type has exactly one builder per engine.

use prometheus::core::Collector;

use crate::domain::labels::LabelValues;
use crate::domain::meta::Meta;
use crate::error::BoxError;

/// Everything a builder knows about the declaration it builds.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec<'a> {
    /// Metric name from the `name` metadata.
    pub name: &'a str,
    /// Help text from the `help` metadata.
    pub help: &'a str,
    /// Group namespace path joined with `_`; empty at the root.
    pub namespace: &'a str,
    /// Label names, in the order values are handed to the factory.
    pub label_names: &'a [String],
    /// The declaration's raw metadata, for backend-specific keys.
    pub meta: Meta<'a>,
}

impl MetricSpec<'_> {
    /// Label names as `&str`, as most backend constructors expect.
    pub fn label_name_refs(&self) -> Vec<&str> {
        self.label_names.iter().map(String::as_str).collect()
    }

    /// Fully-qualified metric name, `namespace_name` or just `name`.
    pub fn fq_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}_{}", self.namespace, self.name)
        }
    }
}

/// Maps rendered label values to a metric instance of type `M`.
pub type ValueFactory<M> = Box<dyn Fn(&LabelValues<'_>) -> M + Send + Sync>;

/// Output of a successful build.
pub struct Built<M> {
    pub factory: ValueFactory<M>,
    pub collector: Box<dyn Collector>,
}

impl<M> Built<M> {
    pub fn new<F, C>(factory: F, collector: C) -> Self
    where
        F: Fn(&LabelValues<'_>) -> M + Send + Sync + 'static,
        C: Collector + 'static,
    {
        Self {
            factory: Box::new(factory),
            collector: Box::new(collector),
        }
    }
}

/// Constructs metrics whose accessor output is `M`.
///
/// Implemented for every `Fn(&MetricSpec) -> Result<Built<M>, BoxError>`,
/// so plain functions register directly.
pub trait Builder<M>: Send + Sync + 'static {
    fn build(&self, spec: &MetricSpec<'_>) -> Result<Built<M>, BoxError>;
}

impl<M, F> Builder<M> for F
where
    F: Fn(&MetricSpec<'_>) -> Result<Built<M>, BoxError> + Send + Sync + 'static,
{
    fn build(&self, spec: &MetricSpec<'_>) -> Result<Built<M>, BoxError> {
        self(spec)
    }
}

/// Output capability of a metric slot.
///
/// Implement this (usually with an empty body) for any type a custom
/// builder produces. Tuples declare several return values and are
/// rejected when binding.
pub trait MetricOutput: Send + Sync + 'static {
    const RETURN_VALUES: usize = 1;
}

impl MetricOutput for prometheus::Counter {}
impl MetricOutput for prometheus::IntCounter {}
impl MetricOutput for prometheus::Gauge {}
impl MetricOutput for prometheus::IntGauge {}
impl MetricOutput for prometheus::Histogram {}

macro_rules! tuple_output {
    ($($count:literal => ($($name:ident),+)),* $(,)?) => {
        $(
            impl<$($name: MetricOutput),+> MetricOutput for ($($name,)+) {
                const RETURN_VALUES: usize = $count;
            }
        )*
    };
}

tuple_output!(
    2 => (A, B),
    3 => (A, B, C),
    4 => (A, B, C, D),
    5 => (A, B, C, D, E),
    6 => (A, B, C, D, E, F),
    7 => (A, B, C, D, E, F, G),
    8 => (A, B, C, D, E, F, G, H),
    9 => (A, B, C, D, E, F, G, H, I),
    10 => (A, B, C, D, E, F, G, H, I, J),
    11 => (A, B, C, D, E, F, G, H, I, J, K),
    12 => (A, B, C, D, E, F, G, H, I, J, K, L),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fq_name() {
        let names = Vec::new();
        let mut spec = MetricSpec {
            name: "hits_total",
            help: "Hits",
            namespace: "svc_server",
            label_names: &names,
            meta: Meta::empty(),
        };
        assert_eq!(spec.fq_name(), "svc_server_hits_total");

        spec.namespace = "";
        assert_eq!(spec.fq_name(), "hits_total");
    }

    #[test]
    fn test_return_value_counts() {
        assert_eq!(<prometheus::Counter as MetricOutput>::RETURN_VALUES, 1);
        assert_eq!(<(prometheus::Gauge, prometheus::Counter) as MetricOutput>::RETURN_VALUES, 2);
    }
}
