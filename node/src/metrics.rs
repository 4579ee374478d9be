//! Prometheus metrics for the arbiter.
//!
//! Exposes counters, gauges, and histograms covering request intake,
//! consensus, slashing, and challenge activity. The [`ArbiterMetrics`]
//! struct owns a dedicated [`Registry`] that can be encoded into the
//! Prometheus text exposition format with [`ArbiterMetrics::encode`].

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all arbiter-level Prometheus metrics.
pub struct ArbiterMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub requests_opened: IntCounter,
    /// Accepted validator submissions.
    pub submissions: IntCounter,
    pub finalized_verified: IntCounter,
    pub finalized_rejected: IntCounter,
    /// Individual slashes, across finalization and upheld challenges.
    pub slashes: IntCounter,
    pub challenges_opened: IntCounter,
    pub challenges_upheld: IntCounter,
    pub challenges_rejected: IntCounter,
    pub refunds: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Requests still collecting submissions.
    pub open_requests: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time spent settling a request once quorum is reached, in microseconds.
    pub finalize_time_us: Histogram,
}

impl ArbiterMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_opened = register_int_counter_with_registry!(
            Opts::new("poi_requests_opened_total", "Verification requests opened"),
            registry
        )?;
        let submissions = register_int_counter_with_registry!(
            Opts::new("poi_submissions_total", "Validator submissions accepted"),
            registry
        )?;
        let finalized_verified = register_int_counter_with_registry!(
            Opts::new("poi_finalized_verified_total", "Requests finalized as verified"),
            registry
        )?;
        let finalized_rejected = register_int_counter_with_registry!(
            Opts::new("poi_finalized_rejected_total", "Requests finalized as rejected"),
            registry
        )?;
        let slashes = register_int_counter_with_registry!(
            Opts::new("poi_slashes_total", "Validator slashes applied"),
            registry
        )?;
        let challenges_opened = register_int_counter_with_registry!(
            Opts::new("poi_challenges_opened_total", "Challenges opened"),
            registry
        )?;
        let challenges_upheld = register_int_counter_with_registry!(
            Opts::new("poi_challenges_upheld_total", "Challenges upheld by an arbitrator"),
            registry
        )?;
        let challenges_rejected = register_int_counter_with_registry!(
            Opts::new("poi_challenges_rejected_total", "Challenges rejected by an arbitrator"),
            registry
        )?;
        let refunds = register_int_counter_with_registry!(
            Opts::new("poi_refunds_total", "Reward escrows refunded to agents"),
            registry
        )?;

        let open_requests = register_int_gauge_with_registry!(
            Opts::new("poi_open_requests", "Requests still collecting submissions"),
            registry
        )?;

        let finalize_time_us = register_histogram_with_registry!(
            HistogramOpts::new(
                "poi_finalize_time_us",
                "Time spent settling a request after quorum, in microseconds"
            )
            .buckets(vec![
                10.0, 50.0, 100.0, 500.0, 1_000.0, 5_000.0, 10_000.0, 50_000.0
            ]),
            registry
        )?;

        Ok(Self {
            registry,
            requests_opened,
            submissions,
            finalized_verified,
            finalized_rejected,
            slashes,
            challenges_opened,
            challenges_upheld,
            challenges_rejected,
            refunds,
            open_requests,
            finalize_time_us,
        })
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
