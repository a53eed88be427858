//! Core data models for the cleanup pipeline

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Category of cloud-managed object a pipeline run targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Cache clusters; replication groups are the composite
    CacheCluster,
    /// Managed database instances; database clusters are the composite
    DbInstance,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::CacheCluster, ResourceKind::DbInstance];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::CacheCluster => "cache-cluster",
            ResourceKind::DbInstance => "db-instance",
        }
    }

    /// Human-readable singular noun
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::CacheCluster => "cache cluster",
            ResourceKind::DbInstance => "database",
        }
    }

    /// Noun used for composite records of this kind
    pub fn group_noun(&self) -> &'static str {
        match self {
            ResourceKind::CacheCluster => "replication group",
            ResourceKind::DbInstance => "database cluster",
        }
    }

    /// Selection keywords that filter by the `variant` attribute
    pub fn variant_keywords(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::CacheCluster => &["redis", "memcached", "valkey"],
            ResourceKind::DbInstance => &[
                "aurora",
                "mysql",
                "postgres",
                "mariadb",
                "oracle",
                "sqlserver",
            ],
        }
    }

    /// Service fault codes meaning the resource no longer exists
    pub fn not_found_codes(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::CacheCluster => &[
                "CacheClusterNotFound",
                "CacheClusterNotFoundFault",
                "ReplicationGroupNotFoundFault",
            ],
            ResourceKind::DbInstance => &[
                "DBInstanceNotFound",
                "DBInstanceNotFoundFault",
                "DBClusterNotFoundFault",
            ],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cache-cluster" | "cache" | "elasticache" => Ok(ResourceKind::CacheCluster),
            "db-instance" | "db" | "rds" => Ok(ResourceKind::DbInstance),
            other => Err(format!("unknown resource kind '{}'", other)),
        }
    }
}

/// Named shape attributes the pipeline knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKey {
    /// Node type / instance class used for pricing
    ShapeTag,
    /// Engine or flavour of the shape (redis, postgres, oracle-ee, ...)
    Variant,
    /// Node or replica count billed at the unit price
    Quantity,
    /// Private network the resource is attached to
    NetworkId,
    AtRestEncryption,
    InTransitEncryption,
    BackupRetentionDays,
    MultiAz,
    ReplicaCount,
    Status,
}

/// Value stored under a [`ShapeKey`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeValue {
    Flag(bool),
    Count(u32),
    Text(String),
}

/// Typed attribute bag describing a resource's shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeAttributes {
    #[serde(default)]
    pub attributes: BTreeMap<ShapeKey, ShapeValue>,
    /// Kind-specific attributes the pipeline never interprets
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ShapeAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: ShapeKey, value: ShapeValue) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn with_text(self, key: ShapeKey, value: impl Into<String>) -> Self {
        self.with(key, ShapeValue::Text(value.into()))
    }

    pub fn with_flag(self, key: ShapeKey, value: bool) -> Self {
        self.with(key, ShapeValue::Flag(value))
    }

    pub fn with_count(self, key: ShapeKey, value: u32) -> Self {
        self.with(key, ShapeValue::Count(value))
    }

    pub fn text(&self, key: ShapeKey) -> Option<&str> {
        match self.attributes.get(&key) {
            Some(ShapeValue::Text(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Missing or non-boolean values read as `false`
    pub fn flag(&self, key: ShapeKey) -> bool {
        matches!(self.attributes.get(&key), Some(ShapeValue::Flag(true)))
    }

    pub fn count(&self, key: ShapeKey) -> Option<u32> {
        match self.attributes.get(&key) {
            Some(ShapeValue::Count(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn shape_tag(&self) -> Option<&str> {
        self.text(ShapeKey::ShapeTag)
    }

    pub fn variant(&self) -> Option<&str> {
        self.text(ShapeKey::Variant)
    }

    pub fn quantity(&self) -> Option<u32> {
        self.count(ShapeKey::Quantity)
    }
}

/// Composite membership declared by a group record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeInfo {
    /// Identifiers of the member resources
    #[serde(default)]
    pub members: Vec<String>,
    /// Member whose utilization stands for the whole group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_member: Option<String>,
}

/// Resource as returned by a provider listing, before enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResource {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub shape: ShapeAttributes,
    /// Set on members of a composite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Set on the composite itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeInfo>,
}

impl RawResource {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, shape: ShapeAttributes) -> Self {
        Self {
            id: id.into(),
            created_at,
            shape,
            group_id: None,
            composite: None,
        }
    }

    pub fn member_of(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn composite_of(mut self, members: Vec<String>, primary_member: Option<String>) -> Self {
        self.composite = Some(CompositeInfo {
            members,
            primary_member,
        });
        self
    }
}

/// Fixed interval over which utilization is aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackWindow {
    pub days: u32,
}

impl LookbackWindow {
    pub const DEFAULT_DAYS: u32 = 30;

    pub fn days(days: u32) -> Self {
        Self { days }
    }

    /// (start, end) of the window ending at `now`
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - Duration::days(i64::from(self.days)), now)
    }
}

impl Default for LookbackWindow {
    fn default() -> Self {
        Self::days(Self::DEFAULT_DAYS)
    }
}

/// Aggregated utilization over the lookback window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSnapshot {
    #[serde(default)]
    pub average_connections: f64,
    #[serde(default)]
    pub peak_connections: f64,
    #[serde(default)]
    pub cumulative_hits: u64,
    #[serde(default)]
    pub cumulative_misses: u64,
    /// Average CPU utilization in percent
    #[serde(default)]
    pub average_cpu_percent: f64,
    #[serde(default)]
    pub peak_cpu_percent: f64,
    #[serde(default)]
    pub has_observed_activity: bool,
}

impl UtilizationSnapshot {
    /// Snapshot used when no signal could be read
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_signals(
        average_connections: f64,
        peak_connections: f64,
        cumulative_hits: u64,
        cumulative_misses: u64,
    ) -> Self {
        Self {
            average_connections,
            peak_connections,
            cumulative_hits,
            cumulative_misses,
            average_cpu_percent: 0.0,
            peak_cpu_percent: 0.0,
            has_observed_activity: false,
        }
        .normalized()
    }

    /// Attach CPU signals and recompute the activity flag
    pub fn with_cpu(mut self, average_percent: f64, peak_percent: f64) -> Self {
        self.average_cpu_percent = average_percent;
        self.peak_cpu_percent = peak_percent;
        self.normalized()
    }

    /// Clamp negative or NaN signals to zero and recompute the activity flag
    pub fn normalized(mut self) -> Self {
        self.average_connections = non_negative(self.average_connections);
        self.peak_connections = non_negative(self.peak_connections);
        self.average_cpu_percent = non_negative(self.average_cpu_percent);
        self.peak_cpu_percent = non_negative(self.peak_cpu_percent);
        self.has_observed_activity = self.average_connections > 0.0
            || self.peak_connections > 0.0
            || self.cumulative_hits > 0
            || self.cumulative_misses > 0
            || self.average_cpu_percent > IDLE_CPU_PERCENT;
        self
    }
}

/// Average CPU at or below this reads as background noise, not activity
pub const IDLE_CPU_PERCENT: f64 = 1.0;

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Heuristic safety classification of a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub is_risky: bool,
    pub warnings: Vec<String>,
    pub age_in_days: i64,
}

/// Enrichment step that can fall back to a default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStep {
    Cost,
    Metrics,
}

impl fmt::Display for EnrichmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentStep::Cost => f.write_str("cost"),
            EnrichmentStep::Metrics => f.write_str("metrics"),
        }
    }
}

/// Record of an enrichment step that used its fallback value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub step: EnrichmentStep,
    pub reason: String,
}

/// One fully enriched inventory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub region: String,
    pub kind: ResourceKind,
    pub created_at: DateTime<Utc>,
    pub shape: ShapeAttributes,
    #[serde(default)]
    pub is_composite: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_ids: Vec<String>,
    pub metrics: UtilizationSnapshot,
    pub monthly_cost_estimate: f64,
    pub risk: RiskVerdict,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
}

impl ResourceRecord {
    pub fn is_risky(&self) -> bool {
        self.risk.is_risky
    }

    pub fn is_inactive(&self) -> bool {
        !self.metrics.has_observed_activity
    }

    pub fn variant(&self) -> Option<&str> {
        self.shape.variant()
    }

    pub fn annual_cost_estimate(&self) -> f64 {
        self.monthly_cost_estimate * 12.0
    }
}

/// Result of one deletion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    Deleted,
    AlreadyGone,
    Failed,
}

impl DeletionStatus {
    /// Deleted and AlreadyGone both count as removed
    pub fn is_success(&self) -> bool {
        !matches!(self, DeletionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStatus::Deleted => "deleted",
            DeletionStatus::AlreadyGone => "already_gone",
            DeletionStatus::Failed => "failed",
        }
    }
}

/// Per-id outcome produced by the deletion executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub id: String,
    pub region: String,
    pub status: DeletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cost_recovered: f64,
    /// Number of delete calls issued (0 in dry-run)
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_activity_recomputed() {
        let idle = UtilizationSnapshot::from_signals(0.0, 0.0, 0, 0);
        assert!(!idle.has_observed_activity);

        let misses_only = UtilizationSnapshot::from_signals(0.0, 0.0, 0, 3);
        assert!(misses_only.has_observed_activity);

        let lying = UtilizationSnapshot {
            has_observed_activity: true,
            ..Default::default()
        }
        .normalized();
        assert!(!lying.has_observed_activity);
    }

    #[test]
    fn test_cpu_alone_counts_as_activity() {
        let busy = UtilizationSnapshot::from_signals(0.0, 0.0, 0, 0).with_cpu(35.0, 80.0);
        assert!(busy.has_observed_activity);
        assert_eq!(busy.peak_cpu_percent, 80.0);

        let background = UtilizationSnapshot::zero().with_cpu(1.0, 4.0);
        assert!(!background.has_observed_activity);

        let parsed: UtilizationSnapshot =
            serde_json::from_str(r#"{ "average_cpu_percent": 12.5 }"#).unwrap();
        assert!(parsed.normalized().has_observed_activity);
    }

    #[test]
    fn test_snapshot_clamps_negative_signals() {
        let snapshot = UtilizationSnapshot::from_signals(-2.0, f64::NAN, 0, 0);
        assert_eq!(snapshot.average_connections, 0.0);
        assert_eq!(snapshot.peak_connections, 0.0);
        assert!(!snapshot.has_observed_activity);
    }

    #[test]
    fn test_shape_attribute_accessors() {
        let shape = ShapeAttributes::new()
            .with_text(ShapeKey::ShapeTag, "cache.t3.micro")
            .with_text(ShapeKey::NetworkId, "")
            .with_flag(ShapeKey::AtRestEncryption, true)
            .with_count(ShapeKey::Quantity, 3);

        assert_eq!(shape.shape_tag(), Some("cache.t3.micro"));
        assert_eq!(shape.text(ShapeKey::NetworkId), None);
        assert!(shape.flag(ShapeKey::AtRestEncryption));
        assert!(!shape.flag(ShapeKey::InTransitEncryption));
        assert_eq!(shape.quantity(), Some(3));
    }

    #[test]
    fn test_shape_attributes_json() {
        let json = r#"{
            "attributes": {
                "shape_tag": "db.t3.micro",
                "variant": "postgres",
                "multi_az": true,
                "backup_retention_days": 7
            },
            "extra": { "engine_version": "14.7" }
        }"#;

        let shape: ShapeAttributes = serde_json::from_str(json).unwrap();
        assert_eq!(shape.variant(), Some("postgres"));
        assert!(shape.flag(ShapeKey::MultiAz));
        assert_eq!(shape.count(ShapeKey::BackupRetentionDays), Some(7));
        assert_eq!(shape.extra.get("engine_version").map(String::as_str), Some("14.7"));
    }

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!("cache-cluster".parse::<ResourceKind>(), Ok(ResourceKind::CacheCluster));
        assert_eq!("RDS".parse::<ResourceKind>(), Ok(ResourceKind::DbInstance));
        assert!("lambda".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_lookback_bounds() {
        let now = Utc::now();
        let (start, end) = LookbackWindow::default().bounds(now);
        assert_eq!(end, now);
        assert_eq!((end - start).num_days(), 30);
    }
}
