//! Cloud capability interface
//!
//! The pipeline consumes exactly these operations from a provider. Every call
//! receives the caller's [`Session`] explicitly; providers hold no ambient
//! account state.

mod snapshot;

pub use snapshot::{AccountSnapshot, DeleteFault, RegionSnapshot, SnapshotProvider};

use crate::error::ProviderError;
use crate::models::{LookbackWindow, RawResource, ResourceKind, UtilizationSnapshot};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

pub use async_trait::async_trait;

/// Regions probed when neither the provider nor configuration supplies a list
pub const DEFAULT_CANDIDATE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-2",
    "ap-south-1",
    "ap-southeast-1",
    "eu-west-1",
    "eu-central-1",
];

/// Immutable handle to the account context a run operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Profile name the credentials were resolved from
    pub profile: Option<String>,
    pub account_id: String,
}

impl Session {
    pub fn new(profile: Option<String>, account_id: impl Into<String>) -> Self {
        Self {
            profile,
            account_id: account_id.into(),
        }
    }

    pub fn profile_name(&self) -> &str {
        self.profile.as_deref().unwrap_or("default")
    }
}

/// Options forwarded to the delete call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Ask the service to take a final backup before deleting
    pub final_snapshot: bool,
}

/// Per-kind cloud operations consumed by the pipeline
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Regions worth probing for this kind
    fn list_region_candidates(&self, kind: ResourceKind) -> Vec<String> {
        let _ = kind;
        DEFAULT_CANDIDATE_REGIONS.iter().map(|r| r.to_string()).collect()
    }

    /// Lightweight read-only check (e.g. list at most one item)
    async fn probe_region(&self, session: &Session, kind: ResourceKind, region: &str) -> Result<bool>;

    /// List every raw resource of `kind` in `region`, composites and members included
    async fn list_resources(
        &self,
        session: &Session,
        kind: ResourceKind,
        region: &str,
    ) -> Result<Vec<RawResource>>;

    /// Aggregate utilization over `window`
    async fn describe_utilization(
        &self,
        session: &Session,
        kind: ResourceKind,
        id: &str,
        region: &str,
        window: LookbackWindow,
    ) -> Result<UtilizationSnapshot>;

    /// Delete one resource
    async fn delete_resource(
        &self,
        session: &Session,
        kind: ResourceKind,
        id: &str,
        region: &str,
        options: DeleteOptions,
    ) -> std::result::Result<(), ProviderError>;
}

/// Bound a provider call by `limit`
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("timed out after {:?}", limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_secs(1), async { Ok(7u32) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_session_profile_name() {
        assert_eq!(Session::new(None, "123").profile_name(), "default");
        assert_eq!(Session::new(Some("dev".into()), "123").profile_name(), "dev");
    }
}
