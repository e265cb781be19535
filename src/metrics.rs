use std::sync::Arc;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

// ---------------------------------------------------------------------------
// Label types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BuildLabels {
    pub outcome: BuildOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum BuildOutcome {
    Success,
    Failure,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ListingLabels {
    pub outcome: ListingOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum ListingOutcome {
    Ok,
    InvalidVersion,
    UnknownVersion,
}

// ---------------------------------------------------------------------------
// Metrics struct
// ---------------------------------------------------------------------------

/// Every Prometheus metric exposed by the service.
pub struct Metrics {
    pub builds_total: Family<BuildLabels, Counter>,
    pub build_duration_seconds: Histogram,
    pub builds_in_flight: Gauge,
    pub validation_failures: Counter,
    pub module_listings_total: Family<ListingLabels, Counter>,
}

impl Metrics {
    /// Create a new [`Metrics`] instance and register every metric with the
    /// supplied `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let builds_total = Family::<BuildLabels, Counter>::default();
        registry.register(
            "prebid_bundler_builds",
            "Bundle builds by outcome",
            builds_total.clone(),
        );

        // Builds typically take seconds to a few minutes.
        let build_duration_seconds = Histogram::new(exponential_buckets(0.5, 2.0, 12));
        registry.register(
            "prebid_bundler_build_duration_seconds",
            "Wall-clock time spent waiting on the build tool",
            build_duration_seconds.clone(),
        );

        let builds_in_flight: Gauge = Gauge::default();
        registry.register(
            "prebid_bundler_builds_in_flight",
            "Build subprocesses currently running",
            builds_in_flight.clone(),
        );

        let validation_failures = Counter::default();
        registry.register(
            "prebid_bundler_validation_failures",
            "Download requests rejected before a build was attempted",
            validation_failures.clone(),
        );

        let module_listings_total = Family::<ListingLabels, Counter>::default();
        registry.register(
            "prebid_bundler_module_listings",
            "Module listing requests by outcome",
            module_listings_total.clone(),
        );

        Self {
            builds_total,
            build_duration_seconds,
            builds_in_flight,
            validation_failures,
            module_listings_total,
        }
    }

    pub fn record_build(&self, outcome: BuildOutcome) {
        self.builds_total.get_or_create(&BuildLabels { outcome }).inc();
    }

    pub fn record_listing(&self, outcome: ListingOutcome) {
        self.module_listings_total
            .get_or_create(&ListingLabels { outcome })
            .inc();
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Thread-safe wrapper for the metrics registry, used in [`AppState`].
///
/// [`AppState`]: crate::AppState
#[derive(Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
}

impl MetricsRegistry {
    /// Build a fresh registry and pre-register all service metrics.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let metrics = Metrics::new(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(metrics),
        }
    }

    /// Render the registry in OpenMetrics text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
