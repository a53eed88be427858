//! Observability for sweep runs
//!
//! Provides:
//! - Prometheus metrics (regions reachable, inventory size, degraded enrichments, deletions)
//! - Structured audit events with tracing

use crate::models::{DeletionOutcome, DeletionStatus, EnrichmentStep, ResourceKind};
use crate::region::RegionObservation;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for delete call latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once); `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<SweepMetricsInner>> = OnceLock::new();

struct SweepMetricsInner {
    registry: Registry,
    regions_reachable: IntGauge,
    region_scan_failures: IntCounter,
    resources_inventoried: IntCounter,
    degraded_enrichments: IntCounterVec,
    deletions: IntCounterVec,
    deletion_latency_seconds: Histogram,
}

impl SweepMetricsInner {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("cloud_sweep".to_string()), None)?;

        let regions_reachable = IntGauge::new(
            "regions_reachable",
            "Regions that answered the reachability probe",
        )?;
        let region_scan_failures = IntCounter::new(
            "region_scan_failures_total",
            "Regions whose listing failed or timed out",
        )?;
        let resources_inventoried = IntCounter::new(
            "resources_inventoried_total",
            "Records produced by the inventory collector",
        )?;
        let degraded_enrichments = IntCounterVec::new(
            Opts::new(
                "degraded_enrichments_total",
                "Enrichment steps that fell back to a default",
            ),
            &["step"],
        )?;
        let deletions = IntCounterVec::new(
            Opts::new("deletions_total", "Deletion outcomes by status"),
            &["status", "dry_run"],
        )?;
        let deletion_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "deletion_latency_seconds",
                "Time spent in delete calls, retries included",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(regions_reachable.clone()))?;
        registry.register(Box::new(region_scan_failures.clone()))?;
        registry.register(Box::new(resources_inventoried.clone()))?;
        registry.register(Box::new(degraded_enrichments.clone()))?;
        registry.register(Box::new(deletions.clone()))?;
        registry.register(Box::new(deletion_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            regions_reachable,
            region_scan_failures,
            resources_inventoried,
            degraded_enrichments,
            deletions,
            deletion_latency_seconds,
        })
    }
}

/// Sweep metrics for Prometheus exposition
///
/// Lightweight handle to the process-wide metrics. Clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct SweepMetrics {
    _private: (),
}

impl Default for SweepMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepMetrics {
    /// Create a handle, registering the metrics on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match SweepMetricsInner::new() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register metrics, continuing without them");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&SweepMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn set_regions_reachable(&self, count: usize) {
        if let Some(inner) = self.inner() {
            inner.regions_reachable.set(count as i64);
        }
    }

    pub fn inc_region_scan_failures(&self) {
        if let Some(inner) = self.inner() {
            inner.region_scan_failures.inc();
        }
    }

    pub fn add_resources_inventoried(&self, count: usize) {
        if let Some(inner) = self.inner() {
            inner.resources_inventoried.inc_by(count as u64);
        }
    }

    pub fn inc_degraded(&self, step: EnrichmentStep) {
        if let Some(inner) = self.inner() {
            inner
                .degraded_enrichments
                .with_label_values(&[&step.to_string()])
                .inc();
        }
    }

    /// Record one deletion outcome
    pub fn record_deletion(&self, status: DeletionStatus, dry_run: bool, duration_secs: f64) {
        if let Some(inner) = self.inner() {
            inner
                .deletions
                .with_label_values(&[status.as_str(), if dry_run { "true" } else { "false" }])
                .inc();
            if !dry_run {
                inner.deletion_latency_seconds.observe(duration_secs);
            }
        }
    }

    /// Prometheus text exposition of every sweep metric
    pub fn render(&self) -> String {
        let Some(inner) = self.inner() else {
            return String::new();
        };
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&inner.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Structured logger for audit events
///
/// One event per region observation, deletion intent, and outcome, plus a
/// run summary, each tagged with the account and run mode.
#[derive(Clone)]
pub struct AuditLogger {
    account_id: String,
    kind: ResourceKind,
    dry_run: bool,
}

impl AuditLogger {
    pub fn new(account_id: impl Into<String>, kind: ResourceKind, dry_run: bool) -> Self {
        Self {
            account_id: account_id.into(),
            kind,
            dry_run,
        }
    }

    fn mode(&self) -> &'static str {
        if self.dry_run {
            "dry_run"
        } else {
            "live"
        }
    }

    /// Log a region reachability observation
    pub fn log_region(&self, observation: &RegionObservation) {
        if observation.is_reachable() {
            info!(
                event = "region_observed",
                account = %self.account_id,
                kind = %self.kind,
                region = %observation.region,
                reachable = true,
                "Region reachable"
            );
        } else {
            warn!(
                event = "region_observed",
                account = %self.account_id,
                kind = %self.kind,
                region = %observation.region,
                reachable = false,
                reason = observation.message.as_deref().unwrap_or(""),
                "Region not reachable"
            );
        }
    }

    /// Log the intent to delete one resource
    pub fn log_intent(&self, id: &str, region: &str, monthly_cost: f64) {
        info!(
            event = "deletion_intent",
            account = %self.account_id,
            kind = %self.kind,
            mode = self.mode(),
            id = %id,
            region = %region,
            monthly_cost = monthly_cost,
            "Deleting resource"
        );
    }

    /// Log the outcome of one deletion
    pub fn log_outcome(&self, outcome: &DeletionOutcome) {
        match outcome.status {
            DeletionStatus::Failed => warn!(
                event = "deletion_outcome",
                account = %self.account_id,
                kind = %self.kind,
                mode = self.mode(),
                id = %outcome.id,
                region = %outcome.region,
                status = outcome.status.as_str(),
                attempts = outcome.attempts,
                error = outcome.error.as_deref().unwrap_or(""),
                "Deletion failed"
            ),
            _ => info!(
                event = "deletion_outcome",
                account = %self.account_id,
                kind = %self.kind,
                mode = self.mode(),
                id = %outcome.id,
                region = %outcome.region,
                status = outcome.status.as_str(),
                attempts = outcome.attempts,
                cost_recovered = outcome.cost_recovered,
                "Deletion succeeded"
            ),
        }
    }

    /// Log the run summary
    pub fn log_summary(&self, removed: usize, failed: usize, monthly_savings: f64, cancelled: bool) {
        info!(
            event = "run_summary",
            account = %self.account_id,
            kind = %self.kind,
            mode = self.mode(),
            removed = removed,
            failed = failed,
            monthly_savings = monthly_savings,
            annual_savings = monthly_savings * 12.0,
            cancelled = cancelled,
            "Sweep finished"
        );
    }
}
