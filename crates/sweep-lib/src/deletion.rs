//! Deletion execution
//!
//! Deletes the selected records one at a time. Each item is isolated: a
//! failure is recorded and the batch moves on. Throttling is retried with
//! exponential backoff; nothing else is.

use crate::config::PipelineConfig;
use crate::error::ProviderError;
use crate::models::{DeletionOutcome, DeletionStatus, ResourceRecord};
use crate::observability::SweepMetrics;
use crate::provider::{CloudProvider, DeleteOptions, Session};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{info, warn};

/// Executor settings for one run
#[derive(Debug, Clone)]
pub struct DeletionConfig {
    /// Skip the provider call and report what would be deleted
    pub dry_run: bool,
    /// Wait after each real delete call, except the last
    pub delay: Duration,
    /// Delete calls per id, first call included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub call_timeout: Duration,
    pub options: DeleteOptions,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default(), false)
    }
}

impl DeletionConfig {
    pub fn from_pipeline(config: &PipelineConfig, dry_run: bool) -> Self {
        Self {
            dry_run,
            delay: config.deletion_delay,
            max_attempts: config.max_delete_attempts.max(1),
            initial_backoff: config.initial_backoff,
            call_timeout: config.call_timeout,
            options: DeleteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DeleteOptions) -> Self {
        self.options = options;
        self
    }
}

/// Progress callbacks, invoked in order for every processed item
pub trait DeletionObserver: Send + Sync {
    fn on_intent(&self, _record: &ResourceRecord, _position: usize, _total: usize) {}

    fn on_outcome(&self, _outcome: &DeletionOutcome) {}
}

impl DeletionObserver for () {}

/// Outcomes of a deletion batch with totals over successful ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub outcomes: Vec<DeletionOutcome>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub removed_count: usize,
    pub failed_count: usize,
    pub monthly_savings: f64,
    pub annual_savings: f64,
}

impl DeletionReport {
    pub fn new(outcomes: Vec<DeletionOutcome>, dry_run: bool, cancelled: bool) -> Self {
        let removed_count = outcomes.iter().filter(|o| o.status.is_success()).count();
        let failed_count = outcomes.len() - removed_count;
        let monthly_savings: f64 = outcomes.iter().map(|o| o.cost_recovered).sum();
        Self {
            outcomes,
            dry_run,
            cancelled,
            removed_count,
            failed_count,
            monthly_savings,
            annual_savings: monthly_savings * 12.0,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeletionOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeletionStatus::Failed)
    }
}

/// Deletes records through the provider
pub struct DeletionExecutor {
    provider: Arc<dyn CloudProvider>,
    session: Session,
    config: DeletionConfig,
    cancelled: Arc<AtomicBool>,
    metrics: SweepMetrics,
}

impl DeletionExecutor {
    pub fn new(provider: Arc<dyn CloudProvider>, session: Session, config: DeletionConfig) -> Self {
        Self {
            provider,
            session,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
            metrics: SweepMetrics::new(),
        }
    }

    /// Share an externally owned cancellation flag
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Flag that stops the batch before the next item once set
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &DeletionConfig {
        &self.config
    }

    /// Process `targets` in order
    pub async fn execute(
        &self,
        targets: &[&ResourceRecord],
        observer: &dyn DeletionObserver,
    ) -> DeletionReport {
        let total = targets.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, record) in targets.iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                warn!(remaining = total - index, "Cancellation requested, stopping deletions");
                cancelled = true;
                break;
            }

            observer.on_intent(record, index + 1, total);
            info!(
                id = %record.id,
                region = %record.region,
                kind = %record.kind,
                dry_run = self.config.dry_run,
                "Deleting resource"
            );

            let started = Instant::now();
            let outcome = if self.config.dry_run {
                DeletionOutcome {
                    id: record.id.clone(),
                    region: record.region.clone(),
                    status: DeletionStatus::Deleted,
                    error: None,
                    cost_recovered: record.monthly_cost_estimate,
                    attempts: 0,
                }
            } else {
                self.delete_with_retry(record).await
            };

            self.metrics.record_deletion(
                outcome.status,
                self.config.dry_run,
                started.elapsed().as_secs_f64(),
            );
            observer.on_outcome(&outcome);
            outcomes.push(outcome);

            if !self.config.dry_run && index + 1 < total && !self.config.delay.is_zero() {
                sleep(self.config.delay).await;
            }
        }

        let report = DeletionReport::new(outcomes, self.config.dry_run, cancelled);
        info!(
            removed = report.removed_count,
            failed = report.failed_count,
            monthly_savings = report.monthly_savings,
            dry_run = report.dry_run,
            cancelled = report.cancelled,
            "Deletion batch complete"
        );
        report
    }

    async fn delete_with_retry(&self, record: &ResourceRecord) -> DeletionOutcome {
        let mut backoff = self.config.initial_backoff;
        let mut attempts = 0u32;

        let result = loop {
            attempts += 1;
            let call = self.provider.delete_resource(
                &self.session,
                record.kind,
                &record.id,
                &record.region,
                self.config.options,
            );
            let result = match timeout(self.config.call_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.config.call_timeout)),
            };

            match result {
                Err(e) if e.is_retryable() && attempts < self.config.max_attempts => {
                    warn!(
                        id = %record.id,
                        region = %record.region,
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Delete throttled, backing off"
                    );
                    sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                other => break other,
            }
        };

        let (status, error) = match result {
            Ok(()) => (DeletionStatus::Deleted, None),
            Err(e) if e.is_not_found() => (DeletionStatus::AlreadyGone, None),
            Err(e) => (DeletionStatus::Failed, Some(e.to_string())),
        };

        DeletionOutcome {
            id: record.id.clone(),
            region: record.region.clone(),
            status,
            error,
            cost_recovered: if status.is_success() {
                record.monthly_cost_estimate
            } else {
                0.0
            },
            attempts,
        }
    }
}
