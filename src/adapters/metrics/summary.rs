//! Summary Collector - Sliding-Window Quantiles
//!
//! The `prometheus` crate ships no summary type, so this module provides
//! one shaped like its vector metrics: a [`SummaryVec`] collector keyed by
//! label values, handing out cheap [`Summary`] handles.
//!
//! Each child keeps the observations of the last `max_age` (capped at
//! `max_samples`) for quantile estimation, plus cumulative sum and count.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, LabelPair, MetricFamily, MetricType};
use prometheus::Opts;

use crate::ports::builder::MetricOutput;

/// Default sliding window length.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Default cap on retained observations per child.
pub const DEFAULT_MAX_SAMPLES: usize = 4096;

/// Options for a [`SummaryVec`].
#[derive(Debug, Clone)]
pub struct SummaryOpts {
    pub common_opts: Opts,
    /// `(quantile, allowed absolute error)` pairs, reported in order.
    pub objectives: Vec<(f64, f64)>,
    pub max_age: Duration,
    pub max_samples: usize,
}

impl SummaryOpts {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, help: S2) -> Self {
        Self {
            common_opts: Opts::new(name, help),
            objectives: Vec::new(),
            max_age: DEFAULT_MAX_AGE,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }

    #[must_use]
    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.common_opts.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn objectives(mut self, objectives: Vec<(f64, f64)>) -> Self {
        self.objectives = objectives;
        self
    }

    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }
}

struct Settings {
    objectives: Vec<(f64, f64)>,
    max_age: Duration,
    max_samples: usize,
}

#[derive(Default)]
struct Window {
    samples: VecDeque<(Instant, f64)>,
    sum: f64,
    count: u64,
}

impl Window {
    fn expire(&mut self, now: Instant, max_age: Duration) {
        while let Some(&(at, _)) = self.samples.front() {
            if now.saturating_duration_since(at) <= max_age {
                break;
            }
            self.samples.pop_front();
        }
    }
}

struct SummaryCore {
    label_pairs: Vec<LabelPair>,
    settings: Arc<Settings>,
    window: Mutex<Window>,
}

/// One labelled summary. Clones share state.
#[derive(Clone)]
pub struct Summary {
    core: Arc<SummaryCore>,
}

impl Summary {
    fn new(label_pairs: Vec<LabelPair>, settings: Arc<Settings>) -> Self {
        Self {
            core: Arc::new(SummaryCore {
                label_pairs,
                settings,
                window: Mutex::new(Window::default()),
            }),
        }
    }

    /// Record one observation.
    pub fn observe(&self, value: f64) {
        self.observe_at(Instant::now(), value);
    }

    pub(crate) fn observe_at(&self, now: Instant, value: f64) {
        let settings = &self.core.settings;
        let mut window = self.window();

        window.expire(now, settings.max_age);
        window.samples.push_back((now, value));
        if window.samples.len() > settings.max_samples {
            window.samples.pop_front();
        }
        window.sum += value;
        window.count += 1;
    }

    /// Total number of observations.
    pub fn get_sample_count(&self) -> u64 {
        self.window().count
    }

    /// Sum of all observations.
    pub fn get_sample_sum(&self) -> f64 {
        self.window().sum
    }

    /// The `q` quantile over the current window, `NaN` when it is empty.
    pub fn quantile(&self, q: f64) -> f64 {
        self.quantile_at(Instant::now(), q)
    }

    pub(crate) fn quantile_at(&self, now: Instant, q: f64) -> f64 {
        rank_quantile(&self.snapshot(now).sorted, q)
    }

    /// Expire old samples and read count, sum and the sorted window under
    /// one lock.
    pub(crate) fn snapshot(&self, now: Instant) -> Snapshot {
        let mut window = self.window();
        window.expire(now, self.core.settings.max_age);

        let mut sorted: Vec<f64> = window.samples.iter().map(|&(_, v)| v).collect();
        sorted.sort_by(f64::total_cmp);
        Snapshot {
            count: window.count,
            sum: window.sum,
            sorted,
        }
    }

    fn window(&self) -> std::sync::MutexGuard<'_, Window> {
        self.core.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn metric(&self) -> proto::Metric {
        let snapshot = self.snapshot(Instant::now());

        let mut summary = proto::Summary::default();
        summary.set_sample_count(snapshot.count);
        summary.set_sample_sum(snapshot.sum);
        for &(q, _) in &self.core.settings.objectives {
            let mut quantile = proto::Quantile::default();
            quantile.set_quantile(q);
            quantile.set_value(rank_quantile(&snapshot.sorted, q));
            summary.mut_quantile().push(quantile);
        }

        let mut metric = proto::Metric::default();
        for pair in &self.core.label_pairs {
            metric.mut_label().push(pair.clone());
        }
        metric.set_summary(summary);
        metric
    }
}

impl MetricOutput for Summary {}

/// One consistent read of a summary's state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Snapshot {
    pub count: u64,
    pub sum: f64,
    /// Samples still inside the window, ascending.
    pub sorted: Vec<f64>,
}

/// Sample of 1-based rank `ceil(q·n)` in `sorted`.
fn rank_quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let n = sorted.len();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let rank = (q * n as f64).ceil().max(1.0) as usize;
    sorted[rank.min(n) - 1]
}

/// A summary partitioned by label values.
#[derive(Clone)]
pub struct SummaryVec {
    desc: Arc<Desc>,
    settings: Arc<Settings>,
    children: Arc<RwLock<HashMap<Vec<String>, Summary>>>,
}

impl SummaryVec {
    /// # Errors
    /// Invalid metric or label names, as reported by [`Desc::new`].
    pub fn new(opts: SummaryOpts, label_names: &[&str]) -> prometheus::Result<Self> {
        let desc = Desc::new(
            opts.common_opts.fq_name(),
            opts.common_opts.help.clone(),
            label_names.iter().map(|name| (*name).to_string()).collect(),
            HashMap::new(),
        )?;

        Ok(Self {
            desc: Arc::new(desc),
            settings: Arc::new(Settings {
                objectives: opts.objectives,
                max_age: opts.max_age,
                max_samples: opts.max_samples.max(1),
            }),
            children: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// The child for `values`, created on first use.
    ///
    /// # Errors
    /// `InconsistentCardinality` if the value count differs from the
    /// label name count.
    pub fn get_metric_with_label_values(&self, values: &[&str]) -> prometheus::Result<Summary> {
        let expect = self.desc.variable_labels.len();
        if values.len() != expect {
            return Err(prometheus::Error::InconsistentCardinality {
                expect,
                got: values.len(),
            });
        }

        let key: Vec<String> = values.iter().map(|v| (*v).to_string()).collect();
        if let Some(child) = self.children.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(child.clone());
        }

        let mut children = self.children.write().unwrap_or_else(PoisonError::into_inner);
        let child = children
            .entry(key)
            .or_insert_with_key(|key| Summary::new(self.label_pairs(key), Arc::clone(&self.settings)));
        Ok(child.clone())
    }

    /// [`get_metric_with_label_values`](Self::get_metric_with_label_values)
    /// for callers that know the label count.
    ///
    /// # Panics
    /// On a label count mismatch.
    pub fn with_label_values(&self, values: &[&str]) -> Summary {
        match self.get_metric_with_label_values(values) {
            Ok(summary) => summary,
            Err(e) => panic!("summary `{}`: {e}", self.desc.fq_name),
        }
    }

    fn label_pairs(&self, values: &[String]) -> Vec<LabelPair> {
        let mut pairs: Vec<LabelPair> = self
            .desc
            .variable_labels
            .iter()
            .zip(values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            })
            .collect();
        pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        pairs
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut family = MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);

        let children = self.children.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<_> = children.keys().collect();
        keys.sort();
        for key in keys {
            family.mut_metric().push(children[key].metric());
        }

        vec![family]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_vec(labels: &[&str]) -> SummaryVec {
        let opts = SummaryOpts::new("latency_seconds", "Latency")
            .namespace("svc")
            .objectives(vec![(0.5, 0.05), (0.9, 0.01)])
            .max_age(Duration::from_secs(60));
        SummaryVec::new(opts, labels).unwrap()
    }

    #[test]
    fn test_rank_quantile() {
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(rank_quantile(&sorted, 0.5), 5.0);
        assert_eq!(rank_quantile(&sorted, 0.9), 9.0);
        assert_eq!(rank_quantile(&sorted, 0.99), 10.0);
        assert_eq!(rank_quantile(&sorted, 0.0), 1.0);
        assert!(rank_quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_children_share_state() {
        let vec = summary_vec(&["route"]);
        vec.with_label_values(&["/a"]).observe(1.0);
        vec.with_label_values(&["/a"]).observe(3.0);
        vec.with_label_values(&["/b"]).observe(10.0);

        let a = vec.with_label_values(&["/a"]);
        assert_eq!(a.get_sample_count(), 2);
        assert_eq!(a.get_sample_sum(), 4.0);
        assert_eq!(vec.with_label_values(&["/b"]).get_sample_count(), 1);
    }

    #[test]
    fn test_cardinality_mismatch() {
        let vec = summary_vec(&["route"]);
        assert!(vec.get_metric_with_label_values(&[]).is_err());
        assert!(vec.get_metric_with_label_values(&["/a", "GET"]).is_err());
    }

    #[test]
    fn test_window_expiry_keeps_totals() {
        let vec = summary_vec(&[]);
        let summary = vec.with_label_values(&[]);
        let start = Instant::now();

        summary.observe_at(start, 2.0);
        assert_eq!(summary.quantile_at(start, 0.5), 2.0);

        let later = start + Duration::from_secs(61);
        assert!(summary.quantile_at(later, 0.5).is_nan());
        assert_eq!(summary.get_sample_count(), 1);
        assert_eq!(summary.get_sample_sum(), 2.0);
    }

    #[test]
    fn test_snapshot_is_consistent_under_writers() {
        let summary = summary_vec(&[]).with_label_values(&[]);

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let summary = summary.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        summary.observe(1.0);
                    }
                })
            })
            .collect();

        for _ in 0..200 {
            let snapshot = summary.snapshot(Instant::now());
            assert_eq!(snapshot.count as usize, snapshot.sorted.len());
            assert_eq!(snapshot.sum, snapshot.sorted.iter().sum::<f64>());
        }
        for writer in writers {
            writer.join().unwrap();
        }

        let metric = summary.metric();
        assert_eq!(metric.get_summary().get_sample_count(), 2000);
        assert_eq!(metric.get_summary().get_sample_sum(), 2000.0);
    }

    #[test]
    fn test_sample_cap() {
        let opts = SummaryOpts::new("capped", "Capped").max_samples(2);
        let summary = SummaryVec::new(opts, &[]).unwrap().with_label_values(&[]);
        for v in [1.0, 2.0, 3.0] {
            summary.observe(v);
        }
        assert_eq!(summary.quantile(0.0), 2.0);
        assert_eq!(summary.get_sample_count(), 3);
    }

    #[test]
    fn test_collect_summary_family() {
        let vec = summary_vec(&["route"]);
        vec.with_label_values(&["/a"]).observe(0.25);

        let families = vec.collect();
        assert_eq!(families.len(), 1);
        let family = &families[0];
        assert_eq!(family.get_name(), "svc_latency_seconds");
        assert_eq!(family.get_field_type(), MetricType::SUMMARY);

        let metric = &family.get_metric()[0];
        assert_eq!(metric.get_label()[0].get_name(), "route");
        assert_eq!(metric.get_label()[0].get_value(), "/a");

        let summary = metric.get_summary();
        assert_eq!(summary.get_sample_count(), 1);
        let quantiles: Vec<f64> = summary.get_quantile().iter().map(|q| q.get_quantile()).collect();
        assert_eq!(quantiles, vec![0.5, 0.9]);
        assert_eq!(summary.get_quantile()[0].get_value(), 0.25);
    }

    #[test]
    fn test_registers_and_gathers() {
        let registry = prometheus::Registry::new();
        let vec = summary_vec(&[]);
        registry.register(Box::new(vec.clone())).unwrap();
        vec.with_label_values(&[]).observe(1.0);

        let families = registry.gather();
        assert_eq!(families[0].get_name(), "svc_latency_seconds");
    }
}
