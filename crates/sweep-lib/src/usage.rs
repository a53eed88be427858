//! Utilization lookup
//!
//! Utilization is advisory: a failed or slow metrics query yields the idle
//! snapshot marked as degraded, never an error.

use crate::error::{Degraded, Enriched};
use crate::models::{LookbackWindow, ResourceKind, UtilizationSnapshot};
use crate::provider::{with_timeout, CloudProvider, Session};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fetches utilization snapshots through the provider
#[derive(Clone)]
pub struct UsageMetricsProbe {
    provider: Arc<dyn CloudProvider>,
    session: Session,
    window: LookbackWindow,
    call_timeout: Duration,
}

impl UsageMetricsProbe {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        session: Session,
        window: LookbackWindow,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            session,
            window,
            call_timeout,
        }
    }

    pub fn window(&self) -> LookbackWindow {
        self.window
    }

    /// Utilization of `id` over the lookback window
    pub async fn observe(&self, kind: ResourceKind, id: &str, region: &str) -> Enriched<UtilizationSnapshot> {
        let call = self
            .provider
            .describe_utilization(&self.session, kind, id, region, self.window);

        match with_timeout(self.call_timeout, call).await {
            Ok(snapshot) => Ok(snapshot.normalized()),
            Err(e) => {
                debug!(id = %id, region = %region, error = %e, "Utilization unavailable");
                Err(Degraded::new(
                    UtilizationSnapshot::zero(),
                    format!("metrics unavailable for {} in {}: {}", id, region, e),
                ))
            }
        }
    }
}
