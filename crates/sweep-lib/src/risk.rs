//! Heuristic risk classification
//!
//! Checks run in a fixed order and each appends its own warnings; nothing is
//! deduplicated. A verdict only informs the operator, it never blocks deletion.

use crate::models::{RiskVerdict, ShapeAttributes, ShapeKey, UtilizationSnapshot};
use chrono::{DateTime, Utc};

/// Identity tokens suggesting an important resource
pub const SENSITIVE_TOKENS: &[&str] = &[
    "prod",
    "production",
    "live",
    "main",
    "primary",
    "master",
    "critical",
    "session",
    "backup",
    "replica",
    "standby",
];

/// Average connections above which a resource counts as in use
pub const ACTIVE_CONNECTION_THRESHOLD: f64 = 1.0;

/// Cumulative hits above which a resource counts as in use
pub const ACTIVE_HIT_THRESHOLD: u64 = 1000;

/// Average CPU percent above which a resource counts as busy
pub const ACTIVE_CPU_PERCENT: f64 = 5.0;

/// Resources this young are flagged as recently created
pub const RECENT_CREATION_DAYS: i64 = 7;

/// Everything the classifier reads about one resource
#[derive(Debug, Clone, Copy)]
pub struct RiskSubject<'a> {
    pub id: &'a str,
    pub shape: &'a ShapeAttributes,
    pub metrics: &'a UtilizationSnapshot,
    pub created_at: DateTime<Utc>,
}

/// Stateless risk classifier
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    tokens: Vec<String>,
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(SENSITIVE_TOKENS.iter().map(|t| t.to_string()).collect())
    }
}

impl RiskClassifier {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Classify a resource as of `now`
    pub fn classify(&self, subject: &RiskSubject<'_>, now: DateTime<Utc>) -> RiskVerdict {
        let age_in_days = age_in_days(subject.created_at, now);
        let mut warnings = Vec::new();

        self.check_identity(subject.id, &mut warnings);
        check_activity(subject.metrics, &mut warnings);
        check_topology(subject.shape, &mut warnings);
        if age_in_days <= RECENT_CREATION_DAYS {
            warnings.push(format!("Recently created ({} days ago)", age_in_days));
        }

        RiskVerdict {
            is_risky: !warnings.is_empty(),
            warnings,
            age_in_days,
        }
    }

    fn check_identity(&self, id: &str, warnings: &mut Vec<String>) {
        let id = id.to_lowercase();
        for token in &self.tokens {
            if id.contains(token.as_str()) {
                warnings.push(format!("Name contains '{}' - might be important", token));
            }
        }
    }
}

fn check_activity(metrics: &UtilizationSnapshot, warnings: &mut Vec<String>) {
    if !metrics.has_observed_activity {
        return;
    }
    if metrics.average_connections > ACTIVE_CONNECTION_THRESHOLD {
        warnings.push(format!(
            "Active: {:.1} avg connections",
            metrics.average_connections
        ));
    }
    if metrics.average_cpu_percent > ACTIVE_CPU_PERCENT {
        warnings.push(format!(
            "CPU usage: {:.1}% average",
            metrics.average_cpu_percent
        ));
    }
    if metrics.cumulative_hits > ACTIVE_HIT_THRESHOLD {
        warnings.push(format!(
            "Cache hits: {} in last 30 days",
            metrics.cumulative_hits
        ));
    }
}

fn check_topology(shape: &ShapeAttributes, warnings: &mut Vec<String>) {
    if let Some(network) = shape.text(ShapeKey::NetworkId) {
        warnings.push(format!("Resource in private network ({})", network));
    }
    if shape.flag(ShapeKey::AtRestEncryption) {
        warnings.push("Encryption at rest enabled".to_string());
    }
    if shape.flag(ShapeKey::InTransitEncryption) {
        warnings.push("Encryption in transit enabled".to_string());
    }
    if let Some(days) = shape.count(ShapeKey::BackupRetentionDays).filter(|d| *d > 0) {
        warnings.push(format!("Automated backups enabled ({} day retention)", days));
    }
    if shape.flag(ShapeKey::MultiAz) {
        warnings.push("Multi-AZ deployment (high availability)".to_string());
    }
    if let Some(replicas) = shape.count(ShapeKey::ReplicaCount).filter(|n| *n > 0) {
        warnings.push(format!("Has {} replicas", replicas));
    }
}

/// Whole days between creation and `now`, clamped at zero for clock skew
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}
