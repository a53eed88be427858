//! Error types for the cleanup pipeline
//!
//! Fatal conditions abort a run before inventory begins. Everything else is
//! scoped to one region, one resource, or one deletion and is reported
//! without stopping the batch.

use crate::models::ResourceKind;
use std::time::Duration;
use thiserror::Error;

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("No reachable regions for {kind} (tried: {})", tried.join(", "))]
    NoReachableRegions {
        kind: ResourceKind,
        tried: Vec<String>,
    },

    #[error("No valid credentials for profile '{profile}': {reason}")]
    Credentials { profile: String, reason: String },

    #[error("Invalid account document: {0}")]
    AccountDocument(String),
}

/// Classified failure of a single provider call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The resource does not exist (already deleted or never existed)
    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },

    /// Rate limit exceeded, retryable with backoff
    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    /// Any other service error
    #[error("{}", format_service_error(code.as_deref(), message))]
    Service {
        code: Option<String>,
        message: String,
    },
}

fn format_service_error(code: Option<&str>, message: &str) -> String {
    match code {
        Some(code) => format!("{}: {}", code, message),
        None => message.to_string(),
    }
}

/// Service codes for throttling / rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Throttled(_))
    }

    /// Classify a service fault by its code
    pub fn classify(kind: ResourceKind, id: &str, code: Option<&str>, message: &str) -> Self {
        match code {
            Some(c) if kind.not_found_codes().contains(&c) => ProviderError::NotFound {
                kind,
                id: id.to_string(),
            },
            Some(c) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled(message.to_string()),
            _ => ProviderError::Service {
                code: code.map(|c| c.to_string()),
                message: message.to_string(),
            },
        }
    }
}

/// Default value of an enrichment step that could not be computed
#[derive(Debug, Clone, PartialEq)]
pub struct Degraded<T> {
    pub fallback: T,
    pub reason: String,
}

impl<T> Degraded<T> {
    pub fn new(fallback: T, reason: impl Into<String>) -> Self {
        Self {
            fallback,
            reason: reason.into(),
        }
    }
}

/// Outcome of an enrichment step: the real value, or a documented default
pub type Enriched<T> = Result<T, Degraded<T>>;

/// Collapse an [`Enriched`] value into the value to use plus the degradation reason
pub fn settle<T>(enriched: Enriched<T>) -> (T, Option<String>) {
    match enriched {
        Ok(value) => (value, None),
        Err(degraded) => (degraded.fallback, Some(degraded.reason)),
    }
}
