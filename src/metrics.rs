//! Process-wide metrics registry.
//!
//! Counters are cumulative and monotone; gauges are read through a closure at
//! scrape time. The registry renders the prometheus text exposition format so
//! a status endpoint can serve it directly.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Cumulative event counter, shared between the instrumented component and
/// the registry.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter by one.
    pub fn inc(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current cumulative count.
    pub fn value(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// A registered metric: either a shared counter or a closure-backed gauge
/// sampled at render time.
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Box<dyn Fn() -> i64 + Send + Sync>),
}

/// Registry of named metrics.
///
/// Names use dotted notation (`decoding.queue.in`); rendering maps dots to
/// underscores and suffixes counters with `_total`.
#[derive(Default)]
pub struct Metrics {
    metrics: Mutex<BTreeMap<String, Metric>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide shared registry.
    pub fn shared() -> &'static Metrics {
        static SHARED: OnceLock<Metrics> = OnceLock::new();
        SHARED.get_or_init(Metrics::new)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Metric>> {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a metric under a stable name, replacing any previous
    /// registration of the same name.
    pub fn register(&self, name: &str, metric: Metric) {
        self.lock().insert(name.to_string(), metric);
    }

    /// Creates a counter, registers it, and returns a handle for incrementing.
    pub fn counter(&self, name: &str) -> Arc<Counter> {
        let counter = Arc::new(Counter::new());
        self.register(name, Metric::Counter(counter.clone()));
        counter
    }

    /// Registers a gauge backed by the given closure.
    pub fn register_gauge<F>(&self, name: &str, f: F)
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.register(name, Metric::Gauge(Box::new(f)));
    }

    /// Renders all metrics in the prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out =
            String::from("# https://prometheus.io/docs/instrumenting/exposition_formats/\n");
        for (name, metric) in self.lock().iter() {
            let key = name.replace('.', "_");
            match metric {
                Metric::Counter(counter) => {
                    let _ = writeln!(out, "{}_total {}", key, counter.value());
                }
                Metric::Gauge(f) => {
                    let _ = writeln!(out, "{} {}", key, f());
                }
            }
        }
        out
    }
}
