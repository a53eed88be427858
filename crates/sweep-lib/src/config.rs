//! Pipeline configuration

use crate::models::LookbackWindow;
use crate::provider::DEFAULT_CANDIDATE_REGIONS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Regions to probe instead of the provider's candidate list
    pub candidate_regions: Option<Vec<String>>,
    /// Per-region probe timeout (default: 10 seconds)
    #[serde(with = "duration_secs")]
    pub probe_timeout: Duration,
    /// Timeout for any other provider call (default: 30 seconds)
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,
    /// Regions scanned at once (default: 4)
    pub max_concurrent_regions: usize,
    /// Wait after each real delete call (default: 3 seconds)
    #[serde(with = "duration_secs")]
    pub deletion_delay: Duration,
    /// Delete calls per id before giving up on throttling (default: 3)
    pub max_delete_attempts: u32,
    /// First throttling backoff, doubled per retry (default: 1 second)
    #[serde(with = "duration_secs")]
    pub initial_backoff: Duration,
    /// Utilization lookback in days (default: 30)
    pub lookback_days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            candidate_regions: None,
            probe_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
            max_concurrent_regions: 4,
            deletion_delay: Duration::from_secs(3),
            max_delete_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            lookback_days: LookbackWindow::DEFAULT_DAYS,
        }
    }
}

impl PipelineConfig {
    pub fn window(&self) -> LookbackWindow {
        LookbackWindow::days(self.lookback_days)
    }

    /// Configured candidates, else the provider's, else the built-in list
    pub fn candidates_or(&self, provider_candidates: Vec<String>) -> Vec<String> {
        if let Some(regions) = self.candidate_regions.as_ref().filter(|r| !r.is_empty()) {
            return regions.clone();
        }
        if !provider_candidates.is_empty() {
            return provider_candidates;
        }
        DEFAULT_CANDIDATE_REGIONS.iter().map(|r| r.to_string()).collect()
    }
}

/// Durations as whole or fractional seconds in configuration files
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
