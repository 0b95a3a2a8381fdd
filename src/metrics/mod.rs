//! Metrics module
//!
//! Prometheus counters for authorizer decisions, key lookups and presigns.
//! Lambda has no scrape endpoint, so the registry is rendered with
//! [`gather_text`] and written to the log when the binaries run locally.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

lazy_static! {
    // Authorizer metrics
    pub static ref AUTH_DECISIONS: CounterVec = register_counter_vec!(
        "kagi_auth_decisions_total",
        "Authorizer decisions",
        &["outcome", "reason"]
    ).unwrap();

    pub static ref KEY_CACHE_LOOKUPS: CounterVec = register_counter_vec!(
        "kagi_key_cache_lookups_total",
        "Signing key cache lookups",
        &["result"]  // "hit" or "miss"
    ).unwrap();

    pub static ref JWKS_FETCHES: CounterVec = register_counter_vec!(
        "kagi_jwks_fetches_total",
        "Key set downloads",
        &["status"]
    ).unwrap();

    // Uploader metrics
    pub static ref PRESIGNS_TOTAL: CounterVec = register_counter_vec!(
        "kagi_presigns_total",
        "Presigned upload requests",
        &["status"]
    ).unwrap();
}

/// Record an authorizer decision
///
/// `reason` is the internal failure kind for denials and is never part of
/// the response.
pub fn record_auth_decision(outcome: &str, reason: Option<&str>) {
    AUTH_DECISIONS
        .with_label_values(&[outcome, reason.unwrap_or("none")])
        .inc();
}

/// Record a signing key cache lookup
pub fn record_key_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    KEY_CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

/// Record a key set download
pub fn record_jwks_fetch(status: &str) {
    JWKS_FETCHES.with_label_values(&[status]).inc();
}

/// Record a presign request
pub fn record_presign(status: &str) {
    PRESIGNS_TOTAL.with_label_values(&[status]).inc();
}

/// Render the default registry in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_auth_decision() {
        let before = AUTH_DECISIONS
            .with_label_values(&["deny", "invalid_token"])
            .get();
        record_auth_decision("deny", Some("invalid_token"));
        let after = AUTH_DECISIONS
            .with_label_values(&["deny", "invalid_token"])
            .get();
        assert!(after >= before + 1.0);
    }

    #[test]
    fn test_record_key_cache() {
        let hits = KEY_CACHE_LOOKUPS.with_label_values(&["hit"]).get();
        let misses = KEY_CACHE_LOOKUPS.with_label_values(&["miss"]).get();

        record_key_cache(true);
        record_key_cache(false);

        assert!(KEY_CACHE_LOOKUPS.with_label_values(&["hit"]).get() >= hits + 1.0);
        assert!(KEY_CACHE_LOOKUPS.with_label_values(&["miss"]).get() >= misses + 1.0);
    }

    #[test]
    fn test_gather_text_contains_counters() {
        record_jwks_fetch("success");
        record_presign("success");

        let text = gather_text();
        assert!(text.contains("kagi_jwks_fetches_total"));
        assert!(text.contains("kagi_presigns_total"));
    }
}
