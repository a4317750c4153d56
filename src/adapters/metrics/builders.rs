//! Default Builders - Prometheus Metric Kinds
//!
//! One builder per supported output type. Each builds the labelled vector
//! metric for a declaration, returns it as the collector to register and
//! hands out per-label-values children through the value factory.
//!
//! Histogram and summary builders read extra metadata keys:
//!
//! | key          | applies to | absent                      | `""`            |
//! |--------------|------------|-----------------------------|-----------------|
//! | `buckets`    | histogram  | `prometheus::DEFAULT_BUCKETS` | only `+Inf`   |
//! | `objectives` | summary    | [`default_objectives`]      | no quantiles    |
//! | `max_age`    | summary    | 10 minutes                  | error           |

use std::num::ParseFloatError;
use std::time::Duration;

use prometheus::{
    Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter,
    IntCounterVec, IntGauge, IntGaugeVec, Opts, DEFAULT_BUCKETS,
};
use thiserror::Error;

use super::summary::{Summary, SummaryOpts, SummaryVec, DEFAULT_MAX_AGE};
use crate::domain::meta::Meta;
use crate::error::BoxError;
use crate::ports::builder::{Built, MetricSpec};
use crate::usecases::registry::BuilderRegistry;

/// Metadata key holding comma-separated histogram bucket bounds.
pub const BUCKETS: &str = "buckets";
/// Metadata key holding comma-separated summary quantiles.
pub const OBJECTIVES: &str = "objectives";
/// Metadata key holding the summary window length.
pub const MAX_AGE: &str = "max_age";

/// Malformed builder-specific metadata.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid bucket `{value}`: {source}")]
    InvalidBucket {
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("buckets must be strictly increasing, got {previous} then {next}")]
    NonIncreasingBuckets { previous: f64, next: f64 },

    #[error("invalid objective `{value}`: {source}")]
    InvalidObjective {
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("objective {quantile} is outside [0, 1]")]
    ObjectiveOutOfRange { quantile: f64 },

    #[error("invalid max_age `{value}`: {source}")]
    InvalidMaxAge {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("max_age must be positive")]
    ZeroMaxAge,
}

/// Install the six default builders, replacing any already registered
/// for the same output types.
pub fn install_defaults(builders: &mut BuilderRegistry) {
    builders.insert::<Counter, _>(build_counter);
    builders.insert::<IntCounter, _>(build_int_counter);
    builders.insert::<Gauge, _>(build_gauge);
    builders.insert::<IntGauge, _>(build_int_gauge);
    builders.insert::<Histogram, _>(build_histogram);
    builders.insert::<Summary, _>(build_summary);
}

fn opts(spec: &MetricSpec<'_>) -> Opts {
    Opts::new(spec.name, spec.help).namespace(spec.namespace)
}

// ── Counters and gauges ─────────────────────────────────────

pub fn build_counter(spec: &MetricSpec<'_>) -> Result<Built<Counter>, BoxError> {
    let vec = CounterVec::new(opts(spec), &spec.label_name_refs())?;
    let children = vec.clone();
    Ok(Built::new(move |labels| children.with_label_values(&labels.values()), vec))
}

pub fn build_int_counter(spec: &MetricSpec<'_>) -> Result<Built<IntCounter>, BoxError> {
    let vec = IntCounterVec::new(opts(spec), &spec.label_name_refs())?;
    let children = vec.clone();
    Ok(Built::new(move |labels| children.with_label_values(&labels.values()), vec))
}

pub fn build_gauge(spec: &MetricSpec<'_>) -> Result<Built<Gauge>, BoxError> {
    let vec = GaugeVec::new(opts(spec), &spec.label_name_refs())?;
    let children = vec.clone();
    Ok(Built::new(move |labels| children.with_label_values(&labels.values()), vec))
}

pub fn build_int_gauge(spec: &MetricSpec<'_>) -> Result<Built<IntGauge>, BoxError> {
    let vec = IntGaugeVec::new(opts(spec), &spec.label_name_refs())?;
    let children = vec.clone();
    Ok(Built::new(move |labels| children.with_label_values(&labels.values()), vec))
}

// ── Observers ───────────────────────────────────────────────

pub fn build_histogram(spec: &MetricSpec<'_>) -> Result<Built<Histogram>, BoxError> {
    let buckets = buckets_from_meta(&spec.meta)?;
    let opts = HistogramOpts::new(spec.name, spec.help)
        .namespace(spec.namespace)
        .buckets(buckets);

    let vec = HistogramVec::new(opts, &spec.label_name_refs())?;
    let children = vec.clone();
    Ok(Built::new(move |labels| children.with_label_values(&labels.values()), vec))
}

pub fn build_summary(spec: &MetricSpec<'_>) -> Result<Built<Summary>, BoxError> {
    let max_age = max_age_from_meta(&spec.meta)?;
    let objectives = objectives_from_meta(&spec.meta)?;
    let opts = SummaryOpts::new(spec.name, spec.help)
        .namespace(spec.namespace)
        .objectives(objectives)
        .max_age(max_age);

    let vec = SummaryVec::new(opts, &spec.label_name_refs())?;
    let children = vec.clone();
    Ok(Built::new(move |labels| children.with_label_values(&labels.values()), vec))
}

// ── Metadata parsing ────────────────────────────────────────

/// Histogram upper bounds from the `buckets` entry.
///
/// An empty entry yields only the `+Inf` bound, which `prometheus` treats
/// as implicit, so the histogram ends up with no explicit buckets.
pub fn buckets_from_meta(meta: &Meta<'_>) -> Result<Vec<f64>, BuildError> {
    let Some(raw) = meta.get(BUCKETS) else {
        return Ok(DEFAULT_BUCKETS.to_vec());
    };
    if raw.is_empty() {
        return Ok(vec![f64::INFINITY]);
    }

    let buckets = raw
        .split(',')
        .map(|value| {
            value.parse::<f64>().map_err(|source| BuildError::InvalidBucket {
                value: value.to_string(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(pair) = buckets.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(BuildError::NonIncreasingBuckets {
            previous: pair[0],
            next: pair[1],
        });
    }
    Ok(buckets)
}

/// Summary objectives from the `objectives` entry, each quantile paired
/// with its [`abs_error`].
pub fn objectives_from_meta(meta: &Meta<'_>) -> Result<Vec<(f64, f64)>, BuildError> {
    let Some(raw) = meta.get(OBJECTIVES) else {
        return Ok(default_objectives());
    };
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    raw.split(',')
        .map(|value| {
            let quantile = value.parse::<f64>().map_err(|source| BuildError::InvalidObjective {
                value: value.to_string(),
                source,
            })?;
            if !(0.0..=1.0).contains(&quantile) {
                return Err(BuildError::ObjectiveOutOfRange { quantile });
            }
            Ok((quantile, abs_error(quantile)))
        })
        .collect()
}

/// Summary window length from the `max_age` entry.
pub fn max_age_from_meta(meta: &Meta<'_>) -> Result<Duration, BuildError> {
    let Some(raw) = meta.get(MAX_AGE) else {
        return Ok(DEFAULT_MAX_AGE);
    };

    let max_age = humantime::parse_duration(raw).map_err(|source| BuildError::InvalidMaxAge {
        value: raw.to_string(),
        source,
    })?;
    if max_age.is_zero() {
        return Err(BuildError::ZeroMaxAge);
    }
    Ok(max_age)
}

/// Allowed absolute error for quantile `q`, rounded to 3 decimals.
///
/// Lower quantiles tolerate more error.
pub fn abs_error(q: f64) -> f64 {
    (0.1 * (1.0 - q) * 1000.0).round() / 1000.0
}

/// Objectives used when a summary declares none.
pub fn default_objectives() -> Vec<(f64, f64)> {
    vec![(0.5, 0.05), (0.9, 0.01), (0.99, 0.001)]
}
