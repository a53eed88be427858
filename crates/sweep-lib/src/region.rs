//! Region reachability probing
//!
//! Each candidate region gets one read-only round trip. Regions that fail or
//! time out are excluded for this run; only an empty result is fatal.

use crate::error::SweepError;
use crate::models::ResourceKind;
use crate::provider::{with_timeout, CloudProvider, Session};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Default per-region probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Reachability of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    Reachable,
    Unreachable,
}

/// One reachable/unreachable observation, reported to the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionObservation {
    pub region: String,
    pub status: RegionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RegionObservation {
    pub fn reachable(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            status: RegionStatus::Reachable,
            message: None,
        }
    }

    pub fn unreachable(region: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            status: RegionStatus::Unreachable,
            message: Some(message.into()),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.status == RegionStatus::Reachable
    }
}

/// Observations for every candidate, in candidate order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub observations: Vec<RegionObservation>,
}

impl ProbeReport {
    pub fn reachable_regions(&self) -> Vec<String> {
        self.observations
            .iter()
            .filter(|o| o.is_reachable())
            .map(|o| o.region.clone())
            .collect()
    }

    /// Reachable regions, or the fatal error when there are none
    pub fn require_reachable(&self, kind: ResourceKind) -> Result<Vec<String>, SweepError> {
        let regions = self.reachable_regions();
        if regions.is_empty() {
            return Err(SweepError::NoReachableRegions {
                kind,
                tried: self.observations.iter().map(|o| o.region.clone()).collect(),
            });
        }
        Ok(regions)
    }
}

/// Probes candidate regions concurrently
pub struct RegionProbe {
    provider: Arc<dyn CloudProvider>,
    session: Session,
    timeout: Duration,
}

impl RegionProbe {
    pub fn new(provider: Arc<dyn CloudProvider>, session: Session) -> Self {
        Self {
            provider,
            session,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe every candidate once; never fails
    pub async fn observe(&self, kind: ResourceKind, candidates: &[String]) -> ProbeReport {
        let mut tasks = JoinSet::new();

        for (index, region) in candidates.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let session = self.session.clone();
            let region = region.clone();
            let limit = self.timeout;

            tasks.spawn(async move {
                let result = with_timeout(limit, provider.probe_region(&session, kind, &region)).await;
                let observation = match result {
                    Ok(true) => RegionObservation::reachable(&region),
                    Ok(false) => RegionObservation::unreachable(&region, "not accessible"),
                    Err(e) => RegionObservation::unreachable(&region, e.to_string()),
                };
                (index, observation)
            });
        }

        let mut slots: Vec<Option<RegionObservation>> = vec![None; candidates.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, observation)) => slots[index] = Some(observation),
                Err(e) => warn!(error = %e, "Region probe task failed"),
            }
        }

        let observations = slots
            .into_iter()
            .zip(candidates)
            .map(|(slot, region)| {
                slot.unwrap_or_else(|| RegionObservation::unreachable(region, "probe task aborted"))
            })
            .collect::<Vec<_>>();

        for observation in &observations {
            match &observation.message {
                None => info!(region = %observation.region, kind = %kind, "Region reachable"),
                Some(message) => warn!(
                    region = %observation.region,
                    kind = %kind,
                    reason = %message,
                    "Region not reachable"
                ),
            }
        }

        ProbeReport { observations }
    }

    /// Probe and return the reachable subset, failing when it is empty
    pub async fn reachable(
        &self,
        kind: ResourceKind,
        candidates: &[String],
    ) -> Result<(Vec<String>, ProbeReport), SweepError> {
        let report = self.observe(kind, candidates).await;
        let regions = report.require_reachable(kind)?;
        Ok((regions, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AccountSnapshot, RegionSnapshot, SnapshotProvider};

    fn provider_with(regions: &[(&str, bool)]) -> Arc<dyn CloudProvider> {
        let mut document = AccountSnapshot {
            account_id: "123456789012".into(),
            ..Default::default()
        };
        for (name, reachable) in regions {
            document.regions.insert(
                name.to_string(),
                RegionSnapshot {
                    reachable: *reachable,
                    ..Default::default()
                },
            );
        }
        Arc::new(SnapshotProvider::from_document(document))
    }

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_partial_reachability_is_not_an_error() {
        let provider = provider_with(&[("us-east-1", true), ("eu-west-1", false)]);
        let probe = RegionProbe::new(provider, Session::new(None, "123456789012"));

        let (regions, report) = probe
            .reachable(
                ResourceKind::CacheCluster,
                &candidates(&["us-east-1", "eu-west-1", "ap-south-1"]),
            )
            .await
            .unwrap();

        assert_eq!(regions, vec!["us-east-1"]);
        assert_eq!(report.observations.len(), 3);
        assert_eq!(report.observations[0].status, RegionStatus::Reachable);
        assert_eq!(report.observations[1].status, RegionStatus::Unreachable);
        assert_eq!(report.observations[2].region, "ap-south-1");
    }

    #[tokio::test]
    async fn test_no_reachable_regions_is_fatal() {
        let provider = provider_with(&[("us-east-1", false)]);
        let probe = RegionProbe::new(provider, Session::new(None, "123456789012"));

        let err = probe
            .reachable(ResourceKind::DbInstance, &candidates(&["us-east-1", "eu-west-1"]))
            .await
            .unwrap_err();

        match err {
            SweepError::NoReachableRegions { kind, tried } => {
                assert_eq!(kind, ResourceKind::DbInstance);
                assert_eq!(tried, vec!["us-east-1", "eu-west-1"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
