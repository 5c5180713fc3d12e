//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and clap handle syntactic)
//! - Parse every backend into a canonical URL
//! - Validate value ranges (interval > 0, ceilings > 0)
//! - Keep every retry and failover inside the whole-request timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Only plain `http` upstreams are accepted; TLS is out of scope

use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("invalid backend url {url:?}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("backend {url:?} uses unsupported scheme {scheme:?} (only http is supported)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("backend {url:?} has no host")]
    MissingHost { url: String },

    #[error("health_check.interval_secs must be greater than zero")]
    ZeroProbeInterval,

    #[error("retries.{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("timeouts.upstream_ms must be greater than zero")]
    ZeroUpstreamTimeout,

    #[error(
        "worst-case retries take {worst_case_ms}ms, longer than timeouts.request_secs ({request_ms}ms)"
    )]
    TimeoutBudget { worst_case_ms: u64, request_ms: u64 },
}

/// Parse a configured backend address into its canonical URL.
pub fn parse_backend_url(raw: &str) -> Result<Url, ValidationError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| ValidationError::InvalidBackendUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            url: trimmed.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::MissingHost {
            url: trimmed.to_string(),
        });
    }
    Ok(url)
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    for raw in &config.backends {
        if let Err(e) = parse_backend_url(raw) {
            errors.push(e);
        }
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroProbeInterval);
    }
    if config.retries.retry_limit == 0 {
        errors.push(ValidationError::ZeroLimit("retry_limit"));
    }
    if config.retries.attempt_limit == 0 {
        errors.push(ValidationError::ZeroLimit("attempt_limit"));
    }

    if config.timeouts.upstream_ms == 0 {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }
    let worst_case_ms = worst_case_dispatch_ms(config);
    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    if worst_case_ms > request_ms {
        errors.push(ValidationError::TimeoutBudget {
            worst_case_ms,
            request_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Longest a request can spend on upstream exchanges and backoff before the
/// retry and attempt ceilings stop it.
fn worst_case_dispatch_ms(config: &BalancerConfig) -> u64 {
    let forwards = u64::from(config.retries.retry_limit)
        .saturating_mul(u64::from(config.retries.attempt_limit));
    let per_forward = config
        .timeouts
        .upstream_ms
        .saturating_add(config.retries.max_backoff_ms.max(config.retries.backoff_ms));
    forwards.saturating_mul(per_forward)
}
