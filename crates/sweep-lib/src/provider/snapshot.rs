//! Provider backed by an account export document
//!
//! The document describes, per region, whether the region answers, the raw
//! resources of each kind, their utilization, and any faults a delete call
//! should report. Deletions are tracked in memory only.

use super::{async_trait, CloudProvider, DeleteOptions, Session, DEFAULT_CANDIDATE_REGIONS};
use crate::error::{ProviderError, SweepError};
use crate::models::{LookbackWindow, RawResource, ResourceKind, UtilizationSnapshot};
use anyhow::{bail, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Fault a delete call reports instead of succeeding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteFault {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    /// Fail only the first `times` calls, then succeed
    #[serde(default)]
    pub times: Option<u32>,
}

/// State of one region in the account document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    #[serde(default = "default_reachable")]
    pub reachable: bool,
    /// Listing fails with this message when set
    #[serde(default)]
    pub list_error: Option<String>,
    #[serde(default)]
    pub resources: BTreeMap<ResourceKind, Vec<RawResource>>,
    #[serde(default)]
    pub utilization: BTreeMap<String, UtilizationSnapshot>,
    #[serde(default)]
    pub utilization_errors: BTreeMap<String, String>,
    #[serde(default)]
    pub delete_faults: BTreeMap<String, DeleteFault>,
}

fn default_reachable() -> bool {
    true
}

impl Default for RegionSnapshot {
    fn default() -> Self {
        Self {
            reachable: true,
            list_error: None,
            resources: BTreeMap::new(),
            utilization: BTreeMap::new(),
            utilization_errors: BTreeMap::new(),
            delete_faults: BTreeMap::new(),
        }
    }
}

/// Account export document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: String,
    /// Regions to probe; defaults to the standard candidate list
    #[serde(default)]
    pub candidate_regions: Option<Vec<String>>,
    #[serde(default)]
    pub regions: BTreeMap<String, RegionSnapshot>,
}

/// [`CloudProvider`] serving an [`AccountSnapshot`]
pub struct SnapshotProvider {
    document: AccountSnapshot,
    /// id -> region of resources deleted during this process
    deleted: DashMap<String, String>,
    /// delete calls issued per id
    attempts: DashMap<String, u32>,
    delete_calls: AtomicUsize,
}

impl SnapshotProvider {
    pub fn from_document(document: AccountSnapshot) -> Self {
        Self {
            document,
            deleted: DashMap::new(),
            attempts: DashMap::new(),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Load an account document from a JSON file
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SweepError::AccountDocument(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, SweepError> {
        let document: AccountSnapshot = serde_json::from_str(content)
            .map_err(|e| SweepError::AccountDocument(e.to_string()))?;
        Ok(Self::from_document(document))
    }

    /// Resolve the session for `profile`; fails when the document has no account
    pub fn session(&self, profile: Option<String>) -> Result<Session, SweepError> {
        if self.document.account_id.trim().is_empty() {
            return Err(SweepError::Credentials {
                profile: profile.unwrap_or_else(|| "default".to_string()),
                reason: "account document carries no account id".to_string(),
            });
        }
        Ok(Session::new(profile, self.document.account_id.clone()))
    }

    pub fn account_id(&self) -> &str {
        &self.document.account_id
    }

    /// Number of delete calls issued against this provider
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Whether `id` was deleted through this provider
    pub fn is_deleted(&self, id: &str) -> bool {
        self.deleted.contains_key(id)
    }

    fn region(&self, region: &str) -> Option<&RegionSnapshot> {
        self.document.regions.get(region)
    }

    fn find(&self, kind: ResourceKind, region: &str, id: &str) -> Option<&RawResource> {
        self.region(region)?
            .resources
            .get(&kind)?
            .iter()
            .find(|r| r.id == id)
    }
}

#[async_trait]
impl CloudProvider for SnapshotProvider {
    fn list_region_candidates(&self, _kind: ResourceKind) -> Vec<String> {
        match &self.document.candidate_regions {
            Some(regions) => regions.clone(),
            None => DEFAULT_CANDIDATE_REGIONS.iter().map(|r| r.to_string()).collect(),
        }
    }

    async fn probe_region(&self, _session: &Session, _kind: ResourceKind, region: &str) -> Result<bool> {
        Ok(self.region(region).map(|r| r.reachable).unwrap_or(false))
    }

    async fn list_resources(
        &self,
        _session: &Session,
        kind: ResourceKind,
        region: &str,
    ) -> Result<Vec<RawResource>> {
        let Some(snapshot) = self.region(region) else {
            bail!("no endpoint for region {}", region);
        };
        if !snapshot.reachable {
            bail!("region {} is not reachable", region);
        }
        if let Some(message) = &snapshot.list_error {
            bail!("{}", message);
        }

        let resources: Vec<RawResource> = snapshot
            .resources
            .get(&kind)
            .map(|all| {
                all.iter()
                    .filter(|r| !self.deleted.contains_key(&r.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(region = %region, kind = %kind, count = resources.len(), "Listed resources");
        Ok(resources)
    }

    async fn describe_utilization(
        &self,
        _session: &Session,
        _kind: ResourceKind,
        id: &str,
        region: &str,
        _window: LookbackWindow,
    ) -> Result<UtilizationSnapshot> {
        let Some(snapshot) = self.region(region) else {
            bail!("no metrics endpoint for region {}", region);
        };
        if let Some(message) = snapshot.utilization_errors.get(id) {
            bail!("{}", message);
        }
        // No datapoints reads as an idle resource
        Ok(snapshot.utilization.get(id).cloned().unwrap_or_default())
    }

    async fn delete_resource(
        &self,
        _session: &Session,
        kind: ResourceKind,
        id: &str,
        region: &str,
        options: DeleteOptions,
    ) -> std::result::Result<(), ProviderError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut entry = self.attempts.entry(id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        if self.deleted.contains_key(id) || self.find(kind, region, id).is_none() {
            return Err(ProviderError::NotFound {
                kind,
                id: id.to_string(),
            });
        }

        if let Some(fault) = self.region(region).and_then(|r| r.delete_faults.get(id)) {
            let active = fault.times.map(|times| attempt <= times).unwrap_or(true);
            if active {
                return Err(ProviderError::classify(
                    kind,
                    id,
                    fault.code.as_deref(),
                    &fault.message,
                ));
            }
        }

        debug!(
            region = %region,
            kind = %kind,
            id = %id,
            final_snapshot = options.final_snapshot,
            "Deleted resource"
        );
        self.deleted.insert(id.to_string(), region.to_string());
        Ok(())
    }
}
