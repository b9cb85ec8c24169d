//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `billing_charges_total` - Successful renewal charges
//! - `billing_charge_failures_total{reason}` - Declined/failed charge attempts
//! - `billing_subscriptions_created_total` - Subscriptions ever created
//! - `billing_active_subscriptions` - Currently Active subscriptions
//! - `billing_one_time_payments_total` - One-time payments recorded
//! - `billing_refunds_total` - Merchant refunds executed
//! - `billing_batch_size` - Histogram of batch charge sizes

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Successful renewal charges
    pub charges_total: IntCounter,

    /// Failed charge attempts, by reason
    pub charge_failures_total: IntCounterVec,

    /// Subscriptions ever created
    pub subscriptions_created_total: IntCounter,

    /// Currently Active subscriptions
    pub active_subscriptions: IntGauge,

    /// One-time payments recorded
    pub one_time_payments_total: IntCounter,

    /// Merchant refunds executed
    pub refunds_total: IntCounter,

    /// Batch charge size histogram
    pub batch_size: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let charges_total = IntCounter::with_opts(Opts::new(
            "billing_charges_total",
            "Successful renewal charges",
        ))?;
        registry.register(Box::new(charges_total.clone()))?;

        let charge_failures_total = IntCounterVec::new(
            Opts::new(
                "billing_charge_failures_total",
                "Declined or failed charge attempts",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(charge_failures_total.clone()))?;

        let subscriptions_created_total = IntCounter::with_opts(Opts::new(
            "billing_subscriptions_created_total",
            "Subscriptions ever created",
        ))?;
        registry.register(Box::new(subscriptions_created_total.clone()))?;

        let active_subscriptions = IntGauge::with_opts(Opts::new(
            "billing_active_subscriptions",
            "Currently Active subscriptions",
        ))?;
        registry.register(Box::new(active_subscriptions.clone()))?;

        let one_time_payments_total = IntCounter::with_opts(Opts::new(
            "billing_one_time_payments_total",
            "One-time payments recorded",
        ))?;
        registry.register(Box::new(one_time_payments_total.clone()))?;

        let refunds_total = IntCounter::with_opts(Opts::new(
            "billing_refunds_total",
            "Merchant refunds executed",
        ))?;
        registry.register(Box::new(refunds_total.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("billing_batch_size", "Histogram of batch charge sizes")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        Ok(Self {
            charges_total,
            charge_failures_total,
            subscriptions_created_total,
            active_subscriptions,
            one_time_payments_total,
            refunds_total,
            batch_size,
            registry,
        })
    }

    /// Record a successful renewal charge
    pub fn record_charge(&self) {
        self.charges_total.inc();
    }

    /// Record a declined or failed charge attempt
    pub fn record_charge_failure(&self, reason: &str) {
        self.charge_failures_total.with_label_values(&[reason]).inc();
    }

    /// Record a batch charge invocation
    pub fn record_batch(&self, size: usize) {
        self.batch_size.observe(size as f64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
