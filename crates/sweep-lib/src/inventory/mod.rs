//! Inventory collection
//!
//! Scans every reachable region, folds composite members into their groups,
//! and enriches each entry with cost, utilization and a risk verdict. A region
//! that fails to list contributes nothing; a resource whose enrichment fails
//! keeps its record with default values.

mod grouping;

pub use grouping::{group_listing, ListedResource};

use crate::config::PipelineConfig;
use crate::cost::{CostModel, UNPRICED_MEMBER_MONTHLY_COST};
use crate::error::{settle, Degraded, Enriched};
use crate::models::{Degradation, EnrichmentStep, ResourceKind, ResourceRecord};
use crate::observability::SweepMetrics;
use crate::provider::{with_timeout, CloudProvider, Session};
use crate::risk::{RiskClassifier, RiskSubject};
use crate::usage::UsageMetricsProbe;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A region whose listing failed or timed out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionScanFailure {
    pub region: String,
    pub reason: String,
}

/// Count and cost of one group of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub count: usize,
    pub monthly_cost: f64,
}

/// Enriched records of one kind, in discovery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub kind: ResourceKind,
    pub records: Vec<ResourceRecord>,
    pub regions_scanned: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RegionScanFailure>,
    pub collected_at: DateTime<Utc>,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ResourceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn total_monthly_cost(&self) -> f64 {
        self.records.iter().map(|r| r.monthly_cost_estimate).sum()
    }

    pub fn total_annual_cost(&self) -> f64 {
        self.total_monthly_cost() * 12.0
    }

    pub fn risky_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_risky()).count()
    }

    pub fn inactive_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_inactive()).count()
    }

    pub fn degraded_count(&self) -> usize {
        self.records.iter().filter(|r| !r.degradations.is_empty()).count()
    }

    /// Records grouped by variant ("unknown" when absent)
    pub fn by_variant(&self) -> BTreeMap<String, Breakdown> {
        self.breakdown(|r| r.variant().unwrap_or("unknown").to_string())
    }

    pub fn by_region(&self) -> BTreeMap<String, Breakdown> {
        self.breakdown(|r| r.region.clone())
    }

    fn breakdown<F>(&self, key: F) -> BTreeMap<String, Breakdown>
    where
        F: Fn(&ResourceRecord) -> String,
    {
        let mut groups: BTreeMap<String, Breakdown> = BTreeMap::new();
        for record in &self.records {
            let entry = groups.entry(key(record)).or_default();
            entry.count += 1;
            entry.monthly_cost += record.monthly_cost_estimate;
        }
        groups
    }
}

/// Monthly cost of a listed entry; composites sum their members
pub fn price(model: &CostModel, listed: &ListedResource, region: &str) -> Enriched<f64> {
    match listed {
        ListedResource::Standalone(resource) => {
            let cost = model.estimate(&resource.shape, region);
            match resource.shape.shape_tag() {
                Some(tag) if model.table().is_known_shape(tag) => Ok(cost),
                Some(tag) => Err(Degraded::new(
                    cost,
                    format!("unrecognized shape '{}', priced at the fallback rate", tag),
                )),
                None => Err(Degraded::new(cost, "no shape tag, priced at the fallback rate")),
            }
        }
        ListedResource::Composite { group, members } if members.is_empty() => {
            Ok(model.estimate(&group.shape, region))
        }
        ListedResource::Composite { members, .. } => {
            let mut total = 0.0;
            let mut unpriced = Vec::new();
            for (id, member) in members {
                match member.as_ref().filter(|m| m.shape.shape_tag().is_some()) {
                    Some(member) => total += model.estimate(&member.shape, region),
                    None => {
                        total += UNPRICED_MEMBER_MONTHLY_COST;
                        unpriced.push(id.as_str());
                    }
                }
            }
            if unpriced.is_empty() {
                Ok(total)
            } else {
                Err(Degraded::new(
                    total,
                    format!(
                        "no shape for members {}, priced at ${:.2}/month each",
                        unpriced.join(", "),
                        UNPRICED_MEMBER_MONTHLY_COST
                    ),
                ))
            }
        }
    }
}

/// Builds an [`Inventory`] from the reachable regions
#[derive(Clone)]
pub struct InventoryCollector {
    provider: Arc<dyn CloudProvider>,
    session: Session,
    config: Arc<PipelineConfig>,
    usage: UsageMetricsProbe,
    classifier: Arc<RiskClassifier>,
    metrics: SweepMetrics,
}

impl InventoryCollector {
    pub fn new(provider: Arc<dyn CloudProvider>, session: Session, config: PipelineConfig) -> Self {
        let usage = UsageMetricsProbe::new(
            Arc::clone(&provider),
            session.clone(),
            config.window(),
            config.call_timeout,
        );
        Self {
            provider,
            session,
            config: Arc::new(config),
            usage,
            classifier: Arc::new(RiskClassifier::default()),
            metrics: SweepMetrics::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: RiskClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Scan `regions` concurrently; records keep region order, then listing order
    pub async fn collect(&self, kind: ResourceKind, regions: &[String]) -> Inventory {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_regions.max(1)));
        let mut tasks = JoinSet::new();

        for (index, region) in regions.iter().enumerate() {
            let collector = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let region = region.clone();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => collector.scan_region(kind, &region).await,
                    Err(e) => Err(anyhow!("scan slot unavailable: {}", e)),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Vec<ResourceRecord>>>> =
            (0..regions.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "Region scan task failed"),
            }
        }

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (slot, region) in slots.into_iter().zip(regions) {
            match slot.unwrap_or_else(|| Err(anyhow!("scan task aborted"))) {
                Ok(found) => {
                    info!(region = %region, kind = %kind, count = found.len(), "Region scanned");
                    records.extend(found);
                }
                Err(e) => {
                    warn!(region = %region, kind = %kind, error = %e, "Region scan failed");
                    self.metrics.inc_region_scan_failures();
                    failures.push(RegionScanFailure {
                        region: region.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.metrics.add_resources_inventoried(records.len());
        Inventory {
            kind,
            records,
            regions_scanned: regions.to_vec(),
            failures,
            collected_at: Utc::now(),
        }
    }

    async fn scan_region(&self, kind: ResourceKind, region: &str) -> Result<Vec<ResourceRecord>> {
        let listing = with_timeout(
            self.config.call_timeout,
            self.provider.list_resources(&self.session, kind, region),
        )
        .await?;
        debug!(region = %region, kind = %kind, raw = listing.len(), "Listed raw resources");

        let model = CostModel::for_kind(kind);
        let now = Utc::now();
        let mut records = Vec::new();
        for listed in group_listing(listing) {
            records.push(self.enrich(kind, region, listed, &model, now).await);
        }
        Ok(records)
    }

    async fn enrich(
        &self,
        kind: ResourceKind,
        region: &str,
        listed: ListedResource,
        model: &CostModel,
        now: DateTime<Utc>,
    ) -> ResourceRecord {
        let mut degradations = Vec::new();

        let (monthly_cost_estimate, cost_note) = settle(price(model, &listed, region));
        if let Some(reason) = cost_note {
            degradations.push(Degradation {
                step: EnrichmentStep::Cost,
                reason,
            });
        }

        let (metrics, metrics_note) =
            settle(self.usage.observe(kind, listed.metrics_target(), region).await);
        if let Some(reason) = metrics_note {
            degradations.push(Degradation {
                step: EnrichmentStep::Metrics,
                reason,
            });
        }

        for degradation in &degradations {
            self.metrics.inc_degraded(degradation.step);
        }

        let member_ids = listed.member_ids();
        let is_composite = matches!(listed, ListedResource::Composite { .. });
        let resource = match listed {
            ListedResource::Standalone(resource) => resource,
            ListedResource::Composite { group, .. } => group,
        };

        let risk = self.classifier.classify(
            &RiskSubject {
                id: &resource.id,
                shape: &resource.shape,
                metrics: &metrics,
                created_at: resource.created_at,
            },
            now,
        );

        ResourceRecord {
            id: resource.id,
            region: region.to_string(),
            kind,
            created_at: resource.created_at,
            shape: resource.shape,
            is_composite,
            member_ids,
            metrics,
            monthly_cost_estimate,
            risk,
            degradations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawResource, ShapeAttributes, ShapeKey, UtilizationSnapshot};
    use crate::provider::{AccountSnapshot, RegionSnapshot, SnapshotProvider};
    use chrono::Duration;

    fn shape(tag: &str, variant: &str) -> ShapeAttributes {
        ShapeAttributes::new()
            .with_text(ShapeKey::ShapeTag, tag)
            .with_text(ShapeKey::Variant, variant)
    }

    fn old() -> DateTime<Utc> {
        Utc::now() - Duration::days(120)
    }

    fn collector(document: AccountSnapshot) -> InventoryCollector {
        InventoryCollector::new(
            Arc::new(SnapshotProvider::from_document(document)),
            Session::new(None, "123456789012"),
            PipelineConfig::default(),
        )
    }

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failed_region_contributes_nothing() {
        let kind = ResourceKind::CacheCluster;
        let mut document = AccountSnapshot {
            account_id: "123456789012".into(),
            ..Default::default()
        };
        for (region, id) in [("us-east-1", "a"), ("eu-west-1", "b"), ("us-west-2", "c")] {
            let mut snapshot = RegionSnapshot::default();
            snapshot
                .resources
                .insert(kind, vec![RawResource::new(id, old(), shape("cache.t3.micro", "redis"))]);
            document.regions.insert(region.into(), snapshot);
        }
        document.regions.get_mut("eu-west-1").unwrap().list_error = Some("AccessDenied".into());

        let inventory = collector(document)
            .collect(kind, &regions(&["us-east-1", "eu-west-1", "us-west-2"]))
            .await;

        let ids: Vec<&str> = inventory.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(inventory.failures.len(), 1);
        assert_eq!(inventory.failures[0].region, "eu-west-1");
        assert!(inventory.failures[0].reason.contains("AccessDenied"));
    }

    #[tokio::test]
    async fn test_composite_cost_is_sum_of_members() {
        let kind = ResourceKind::CacheCluster;
        let mut snapshot = RegionSnapshot::default();
        snapshot.resources.insert(
            kind,
            vec![
                RawResource::new("sessions", old(), shape("cache.r5.large", "redis")).composite_of(
                    vec!["sessions-001".into(), "sessions-002".into()],
                    Some("sessions-001".into()),
                ),
                RawResource::new("sessions-001", old(), shape("cache.r5.large", "redis"))
                    .member_of("sessions"),
                RawResource::new("sessions-002", old(), shape("cache.t3.micro", "redis"))
                    .member_of("sessions"),
            ],
        );
        snapshot.utilization.insert(
            "sessions-001".into(),
            UtilizationSnapshot::from_signals(5.0, 9.0, 20_000, 10),
        );
        let mut document = AccountSnapshot {
            account_id: "123456789012".into(),
            ..Default::default()
        };
        document.regions.insert("us-east-1".into(), snapshot);

        let inventory = collector(document).collect(kind, &regions(&["us-east-1"])).await;
        assert_eq!(inventory.len(), 1);

        let record = &inventory.records[0];
        let model = CostModel::for_kind(kind);
        let expected = model.monthly_cost("cache.r5.large", Some("redis"), "us-east-1", None)
            + model.monthly_cost("cache.t3.micro", Some("redis"), "us-east-1", None);
        assert!((record.monthly_cost_estimate - expected).abs() < 1e-9);
        assert!(record.is_composite);
        assert_eq!(record.member_ids, vec!["sessions-001", "sessions-002"]);
        // Primary member's activity stands for the group
        assert!(!record.is_inactive());
        assert!(record.risk.warnings.iter().any(|w| w.starts_with("Active:")));
        assert!(record.degradations.is_empty());
    }

    #[test]
    fn test_missing_member_uses_flat_cost() {
        let model = CostModel::for_kind(ResourceKind::DbInstance);
        let listed = ListedResource::Composite {
            group: RawResource::new("analytics", old(), ShapeAttributes::new()),
            members: vec![
                (
                    "analytics-1".into(),
                    Some(RawResource::new("analytics-1", old(), shape("db.r5.large", "aurora-mysql"))),
                ),
                ("analytics-2".into(), None),
            ],
        };
        let degraded = price(&model, &listed, "us-east-1").unwrap_err();
        let expected = model.monthly_cost("db.r5.large", Some("aurora-mysql"), "us-east-1", None)
            + UNPRICED_MEMBER_MONTHLY_COST;
        assert!((degraded.fallback - expected).abs() < 1e-9);
        assert!(degraded.reason.contains("analytics-2"));
    }

    #[tokio::test]
    async fn test_metrics_failure_degrades_but_keeps_record() {
        let kind = ResourceKind::DbInstance;
        let mut snapshot = RegionSnapshot::default();
        snapshot
            .resources
            .insert(kind, vec![RawResource::new("reports-db", old(), shape("db.t3.small", "postgres"))]);
        snapshot
            .utilization_errors
            .insert("reports-db".into(), "InternalFailure".into());
        let mut document = AccountSnapshot {
            account_id: "123456789012".into(),
            ..Default::default()
        };
        document.regions.insert("eu-west-1".into(), snapshot);

        let inventory = collector(document).collect(kind, &regions(&["eu-west-1"])).await;
        let record = inventory.get("reports-db").unwrap();
        assert_eq!(record.metrics, UtilizationSnapshot::zero());
        assert_eq!(record.degradations.len(), 1);
        assert_eq!(record.degradations[0].step, EnrichmentStep::Metrics);
        assert_eq!(inventory.degraded_count(), 1);
    }

    #[test]
    fn test_unknown_shape_is_degraded_at_fallback_price() {
        let model = CostModel::for_kind(ResourceKind::CacheCluster);
        let listed = ListedResource::Standalone(RawResource::new(
            "odd",
            old(),
            shape("cache.z9.mega", "redis"),
        ));
        let degraded = price(&model, &listed, "us-east-1").unwrap_err();
        assert!(degraded.fallback > 0.0);
    }

    #[tokio::test]
    async fn test_aggregates() {
        let kind = ResourceKind::DbInstance;
        let mut snapshot = RegionSnapshot::default();
        snapshot.resources.insert(
            kind,
            vec![
                RawResource::new("prod-orders", old(), shape("db.r5.large", "postgres")),
                RawResource::new("scratch", old(), shape("db.t3.micro", "mysql")),
                RawResource::new("scratch-2", old(), shape("db.t3.micro", "mysql")),
            ],
        );
        let mut document = AccountSnapshot {
            account_id: "123456789012".into(),
            ..Default::default()
        };
        document.regions.insert("us-east-1".into(), snapshot);

        let inventory = collector(document).collect(kind, &regions(&["us-east-1"])).await;
        assert_eq!(inventory.risky_count(), 1);
        assert_eq!(inventory.inactive_count(), 3);

        let variants = inventory.by_variant();
        assert_eq!(variants["mysql"].count, 2);
        assert_eq!(variants["postgres"].count, 1);
        assert_eq!(inventory.by_region()["us-east-1"].count, 3);
        assert!((inventory.total_annual_cost() - inventory.total_monthly_cost() * 12.0).abs() < 1e-9);
    }
}
