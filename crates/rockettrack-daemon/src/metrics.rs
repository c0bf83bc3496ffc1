//! Prometheus metrics for ingest observability.
//!
//! # Metric Families
//!
//! | Metric | Type | Description | Labels |
//! |--------|------|-------------|--------|
//! | `rockettrack_messages_total` | Counter | Ingested messages | `outcome` |
//! | `rockettrack_rockets_tracked` | Gauge | Materialized rockets | none |
//!
//! The `outcome` label carries the engine's stable outcome string
//! (`applied`, `buffered`, `duplicate`, `rejected_stale`,
//! `rejected_transition`) plus `invalid` for requests that never reached
//! the engine.
//!
//! Metrics are registered on a dedicated registry (never the process
//! default), so every daemon instance (and every test) owns its own.

use std::sync::Arc;

use prometheus::{CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Failed to register a metric with Prometheus.
    #[error("failed to register metric: {0}")]
    RegistrationFailed(#[from] prometheus::Error),

    /// Failed to encode metrics output.
    #[error("failed to encode metrics: {0}")]
    EncodingFailed(String),
}

/// Ingest metrics, safe to share across threads.
#[derive(Clone)]
pub struct IngestMetrics {
    /// Total ingested messages by outcome.
    messages_total: CounterVec,
    /// Number of currently materialized rockets.
    rockets_tracked: IntGauge,
}

impl IngestMetrics {
    /// Creates the ingest metrics and registers them with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register (e.g. duplicate
    /// name on the same registry).
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let messages_total = CounterVec::new(
            Opts::new(
                "rockettrack_messages_total",
                "Total ingested messages by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(messages_total.clone()))?;

        let rockets_tracked = IntGauge::new(
            "rockettrack_rockets_tracked",
            "Number of currently materialized rockets",
        )?;
        registry.register(Box::new(rockets_tracked.clone()))?;

        Ok(Self {
            messages_total,
            rockets_tracked,
        })
    }

    /// Records one ingested message with its outcome label.
    pub fn message(&self, outcome: &str) {
        self.messages_total.with_label_values(&[outcome]).inc();
    }

    /// Updates the materialized-rocket gauge.
    #[allow(clippy::cast_possible_wrap)] // rocket counts stay far below i64::MAX
    pub fn set_rockets_tracked(&self, count: usize) {
        self.rockets_tracked.set(count as i64);
    }
}

/// A metrics registry paired with the daemon's metric families.
pub struct MetricsRegistry {
    registry: Registry,
    ingest: IngestMetrics,
}

/// Shared handle to the metrics registry.
pub type SharedMetricsRegistry = Arc<MetricsRegistry>;

impl MetricsRegistry {
    /// Creates a registry with all metric families registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let ingest = IngestMetrics::new(&registry)?;
        Ok(Self { registry, ingest })
    }

    /// The ingest metric family.
    #[must_use]
    pub const fn ingest(&self) -> &IngestMetrics {
        &self.ingest
    }

    /// Encodes all metrics in Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or produces invalid UTF-8.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::EncodingFailed(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingFailed(e.to_string()))
    }
}

/// Creates a new shared metrics registry.
///
/// # Errors
///
/// Returns an error if a metric fails to register.
pub fn new_shared_registry() -> Result<SharedMetricsRegistry, MetricsError> {
    Ok(Arc::new(MetricsRegistry::new()?))
}
