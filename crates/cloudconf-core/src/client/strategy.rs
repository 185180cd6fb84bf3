//! Failover policy across several server URIs

use serde::{Deserialize, Serialize};

use super::transport::TransportError;

/// When the client moves on to the next configured server URI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MultipleUriStrategy {
    /// Advance on any failure
    #[default]
    #[serde(alias = "always")]
    Always,
    /// Advance only when no response was received at all (DNS, connect, timeout)
    #[serde(alias = "connection-timeout-only", alias = "connection_timeout_only")]
    ConnectionTimeoutOnly,
}

impl MultipleUriStrategy {
    pub fn is_always(&self) -> bool {
        matches!(self, MultipleUriStrategy::Always)
    }

    /// Whether a failed attempt should be retried against the next URI
    pub fn should_advance(&self, error: &TransportError) -> bool {
        match self {
            MultipleUriStrategy::Always => true,
            MultipleUriStrategy::ConnectionTimeoutOnly => !error.received_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_advances_on_any_error() {
        let status = TransportError::status("http://a", 500, "boom");
        let timeout = TransportError::no_response("http://a", "timed out", true);
        assert!(MultipleUriStrategy::Always.should_advance(&status));
        assert!(MultipleUriStrategy::Always.should_advance(&timeout));
    }

    #[test]
    fn test_connection_timeout_only() {
        let strategy = MultipleUriStrategy::ConnectionTimeoutOnly;
        assert!(!strategy.should_advance(&TransportError::status("http://a", 500, "boom")));
        assert!(strategy.should_advance(&TransportError::no_response("http://a", "timed out", true)));
        assert!(strategy.should_advance(&TransportError::no_response("http://a", "refused", false)));
    }

    #[test]
    fn test_serde_names() {
        let parsed: MultipleUriStrategy = serde_yaml::from_str("CONNECTION_TIMEOUT_ONLY").unwrap();
        assert_eq!(parsed, MultipleUriStrategy::ConnectionTimeoutOnly);
        let parsed: MultipleUriStrategy = serde_yaml::from_str("always").unwrap();
        assert_eq!(parsed, MultipleUriStrategy::Always);
    }
}
