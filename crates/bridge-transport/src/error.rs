//! Transport-layer errors: everything that can go wrong talking to the
//! broker or the core API, as opposed to `bridge_core::BridgeCoreError`
//! which covers template/routing structure only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The core never produced an HTTP response (connection refused, DNS
    /// failure, timeout, ...). Surfaced to callers as `bridge_error /
    /// CoreUnreachable`.
    #[error("core API unreachable: {0}")]
    CoreUnreachable(String),

    /// Failed to publish or subscribe on the MQTT connection.
    #[error("MQTT client error: {0}")]
    Mqtt(String),
}

impl TransportError {
    /// The `bridge_error` kind tag this variant is published under.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::CoreUnreachable(_) => "CoreUnreachable",
            TransportError::Mqtt(_) => "Mqtt",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::CoreUnreachable(err.to_string())
    }
}

impl From<rumqttc::ClientError> for TransportError {
    fn from(err: rumqttc::ClientError) -> Self {
        TransportError::Mqtt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_stable() {
        let e = TransportError::CoreUnreachable("connection refused".to_string());
        assert_eq!(e.to_string(), "core API unreachable: connection refused");
    }

    #[test]
    fn kind_tags_match_the_published_bridge_error_kind() {
        assert_eq!(TransportError::CoreUnreachable("x".to_string()).kind(), "CoreUnreachable");
        assert_eq!(TransportError::Mqtt("x".to_string()).kind(), "Mqtt");
    }
}
