//! Label-keyed metrics registry with Prometheus text exposition.
//!
//! Each family is a `DashMap` from an immutable label tuple to an
//! `Arc`-shared primitive. Maps only ever grow: a series, once created, lives
//! as long as its registry, so handles returned to callers stay valid and
//! `export` never races a removal. Creation goes through the shard-locked
//! `entry` API, so two requests racing on a new label tuple agree on a single
//! instance.
//!
//! Label values are written verbatim; methods and path templates are assumed
//! not to contain `"` or newlines.

use std::fmt::Write;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::Result;
use crate::metrics::primitives::{validate_buckets, Counter, Gauge, Histogram, DEFAULT_BUCKETS};

/// Default application name (metric prefix).
pub const DEFAULT_APP_NAME: &str = "apistrap";

/// `(method, path_template, status)`
pub type StatusKey = (String, String, u16);
/// `(method, path_template)`
pub type RouteKey = (String, String);
/// `(method, path_template, error_type)`
pub type ErrorKey = (String, String, String);

pub struct MetricsRegistry {
    app_name: String,
    latency_buckets: Box<[f64]>,
    request_count: DashMap<StatusKey, Arc<Counter>>,
    request_latency: DashMap<RouteKey, Arc<Histogram>>,
    in_progress: DashMap<RouteKey, Arc<Gauge>>,
    error_count: DashMap<ErrorKey, Arc<Counter>>,
    app_info: RwLock<Vec<(String, String)>>,
}

impl MetricsRegistry {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::build(app_name.into(), DEFAULT_BUCKETS.into())
    }

    /// Registry whose latency histograms use custom boundaries.
    pub fn with_latency_buckets(app_name: impl Into<String>, buckets: &[f64]) -> Result<Self> {
        validate_buckets(buckets)?;
        Ok(Self::build(app_name.into(), buckets.into()))
    }

    fn build(app_name: String, latency_buckets: Box<[f64]>) -> Self {
        Self {
            app_name,
            latency_buckets,
            request_count: DashMap::new(),
            request_latency: DashMap::new(),
            in_progress: DashMap::new(),
            error_count: DashMap::new(),
            app_info: RwLock::new(Vec::new()),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn latency_buckets(&self) -> &[f64] {
        &self.latency_buckets
    }

    /// Static labels for the `<app>_app_info` line. Replaces any previous set.
    pub fn set_app_info<I, K, V>(&self, labels: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        *self.app_info.write() = labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    }

    pub fn request_count(&self, method: &str, path: &str, status: u16) -> Arc<Counter> {
        get_or_create(&self.request_count, (method.to_owned(), path.to_owned(), status), Counter::new)
    }

    pub fn request_latency(&self, method: &str, path: &str) -> Arc<Histogram> {
        get_or_create(&self.request_latency, (method.to_owned(), path.to_owned()), || {
            Histogram::from_validated(self.latency_buckets.clone())
        })
    }

    pub fn requests_in_progress(&self, method: &str, path: &str) -> Arc<Gauge> {
        get_or_create(&self.in_progress, (method.to_owned(), path.to_owned()), Gauge::new)
    }

    pub fn error_count(&self, method: &str, path: &str, error_type: &str) -> Arc<Counter> {
        get_or_create(
            &self.error_count,
            (method.to_owned(), path.to_owned(), error_type.to_owned()),
            Counter::new,
        )
    }

    /// Render all families in Prometheus text format (0.0.4).
    ///
    /// Series are sorted by label tuple so output is stable across scrapes.
    pub fn export(&self) -> String {
        let app = &self.app_name;
        let mut out = String::new();

        let info = self.app_info.read().clone();
        if !info.is_empty() {
            let name = format!("{app}_app_info");
            family_header(&mut out, &name, "Application information", "gauge");
            let labels = info
                .iter()
                .map(|(k, v)| format!("{k}=\"{v}\""))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(out, "{name}{{{labels}}} 1");
            let _ = writeln!(out);
        }

        let counts = sorted_series(&self.request_count);
        if !counts.is_empty() {
            let name = format!("{app}_http_requests_total");
            family_header(&mut out, &name, "Total HTTP requests", "counter");
            for ((method, path, status), counter) in counts {
                let _ = writeln!(
                    out,
                    "{name}{{method=\"{method}\",path=\"{path}\",status=\"{status}\"}} {}",
                    counter.value()
                );
            }
            let _ = writeln!(out);
        }

        let latencies = sorted_series(&self.request_latency);
        if !latencies.is_empty() {
            let name = format!("{app}_http_request_duration_seconds");
            family_header(&mut out, &name, "HTTP request duration", "histogram");
            for ((method, path), histogram) in latencies {
                let snap = histogram.snapshot();
                let labels = format!("method=\"{method}\",path=\"{path}\"");
                for (le, count) in &snap.buckets {
                    let _ = writeln!(out, "{name}_bucket{{{labels},le=\"{}\"}} {count}", fmt_float(*le));
                }
                let _ = writeln!(out, "{name}_bucket{{{labels},le=\"+Inf\"}} {}", snap.count);
                let _ = writeln!(out, "{name}_sum{{{labels}}} {}", fmt_float(snap.sum));
                let _ = writeln!(out, "{name}_count{{{labels}}} {}", snap.count);
            }
            let _ = writeln!(out);
        }

        let gauges = sorted_series(&self.in_progress);
        if !gauges.is_empty() {
            let name = format!("{app}_http_requests_in_progress");
            family_header(&mut out, &name, "Current in-progress requests", "gauge");
            for ((method, path), gauge) in gauges {
                let _ = writeln!(
                    out,
                    "{name}{{method=\"{method}\",path=\"{path}\"}} {}",
                    fmt_float(gauge.value())
                );
            }
            let _ = writeln!(out);
        }

        let errors = sorted_series(&self.error_count);
        if !errors.is_empty() {
            let name = format!("{app}_http_errors_total");
            family_header(&mut out, &name, "Total HTTP errors", "counter");
            for ((method, path, error_type), counter) in errors {
                let _ = writeln!(
                    out,
                    "{name}{{method=\"{method}\",path=\"{path}\",error_type=\"{error_type}\"}} {}",
                    counter.value()
                );
            }
            let _ = writeln!(out);
        }

        // Families are blank-line separated; the last one keeps a single newline.
        if out.ends_with("\n\n") {
            out.pop();
        }
        out
    }
}

fn get_or_create<K, V>(map: &DashMap<K, Arc<V>>, key: K, make: impl FnOnce() -> V) -> Arc<V>
where
    K: Eq + Hash,
{
    if let Some(existing) = map.get(&key) {
        return Arc::clone(existing.value());
    }
    let entry = map.entry(key).or_insert_with(|| Arc::new(make()));
    Arc::clone(entry.value())
}

/// Point-in-time copy of a family, sorted by key. Shard locks are released
/// before any primitive lock is taken.
fn sorted_series<K, V>(map: &DashMap<K, Arc<V>>) -> Vec<(K, Arc<V>)>
where
    K: Eq + Hash + Ord + Clone,
{
    let mut series: Vec<(K, Arc<V>)> = map
        .iter()
        .map(|e| (e.key().clone(), Arc::clone(e.value())))
        .collect();
    series.sort_by(|a, b| a.0.cmp(&b.0));
    series
}

fn family_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

/// Shortest round-trip float rendering, keeping `.0` on integral values.
pub fn fmt_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v.is_infinite() {
        let inf = if v > 0.0 { "+Inf" } else { "-Inf" };
        inf.to_owned()
    } else {
        format!("{v:?}")
    }
}

static REGISTRIES: OnceLock<DashMap<String, Arc<MetricsRegistry>>> = OnceLock::new();

fn registries() -> &'static DashMap<String, Arc<MetricsRegistry>> {
    REGISTRIES.get_or_init(DashMap::new)
}

/// Process-wide registry for `app_name`, created on first use.
pub fn registry(app_name: &str) -> Arc<MetricsRegistry> {
    if let Some(existing) = registries().get(app_name) {
        return Arc::clone(existing.value());
    }
    let entry = registries()
        .entry(app_name.to_owned())
        .or_insert_with(|| Arc::new(MetricsRegistry::new(app_name)));
    Arc::clone(entry.value())
}

/// Like [`registry`], but a registry created by this call uses `buckets` for
/// its latency histograms. An existing registry is returned unchanged.
pub fn registry_with_buckets(app_name: &str, buckets: &[f64]) -> Result<Arc<MetricsRegistry>> {
    if let Some(existing) = registries().get(app_name) {
        return Ok(Arc::clone(existing.value()));
    }
    let fresh = Arc::new(MetricsRegistry::with_latency_buckets(app_name, buckets)?);
    let entry = registries().entry(app_name.to_owned()).or_insert(fresh);
    Ok(Arc::clone(entry.value()))
}

/// Drop every process-wide registry. Test isolation only; production code
/// never calls this. Handles already held by callers keep working but are no
/// longer reachable through [`registry`].
pub fn reset_registries() {
    if let Some(table) = REGISTRIES.get() {
        table.clear();
    }
}
