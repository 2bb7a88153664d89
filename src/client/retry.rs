//! Retry policy and SRI message classification.

use std::time::Duration;

/// Bounded linear backoff: `max_attempts` tries, a fixed `backoff`
/// delay between each.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn submit() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(3),
        }
    }

    pub const fn poll() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(3),
        }
    }

    /// Shorter budget for out-of-band `lookup` calls.
    pub const fn lookup() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(2),
        }
    }

    /// Per-call SOAP timeout, fixed across all policies.
    pub const fn per_call_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

/// Heuristic classification of an SRI-returned message/identifier as a
/// transient ("temporal") failure worth retrying, vs a permanent one.
pub fn is_temporal_message(text: &str) -> bool {
    let upper = text.to_uppercase();
    ["TIMEOUT", "CONEXION", "SERVICIO"]
        .iter()
        .any(|kw| upper.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_timeout_keywords_as_temporal() {
        assert!(is_temporal_message("ERROR DE CONEXION CON EL SERVICIO"));
        assert!(is_temporal_message("request timeout"));
        assert!(!is_temporal_message("COMPROBANTE NO CUMPLE ESTRUCTURA XML"));
    }

    #[test]
    fn retry_policies_match_spec_budgets() {
        assert_eq!(RetryPolicy::submit().max_attempts, 3);
        assert_eq!(RetryPolicy::poll().max_attempts, 5);
        assert_eq!(RetryPolicy::lookup().max_attempts, 2);
    }
}
