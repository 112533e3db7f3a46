//! The standard JSON envelope published on response topics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome classification of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    BridgeError,
    RestError,
    OtherError,
}

/// A single `[kind, message]` error pair.
pub type ErrorEntry = (String, String);

/// The envelope published on every response topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    pub data: Value,
    pub errors: Vec<ErrorEntry>,
    pub rest_status: Option<u16>,
    pub rest_reason: Option<String>,
    pub published_at: i64,
}

impl Envelope {
    /// A successful dispatch. `raw_body` is parsed as JSON when possible;
    /// otherwise it is carried through as a JSON string.
    pub fn success(raw_body: &str, rest_status: u16, rest_reason: Option<String>) -> Self {
        Self {
            status: Status::Success,
            data: parse_or_raw(raw_body),
            errors: Vec::new(),
            rest_status: Some(rest_status),
            rest_reason,
            published_at: now(),
        }
    }

    /// A non-2xx HTTP response from the core.
    pub fn rest_error(raw_body: &str, rest_status: u16, rest_reason: Option<String>) -> Self {
        Self {
            status: Status::RestError,
            data: parse_or_raw(raw_body),
            errors: Vec::new(),
            rest_status: Some(rest_status),
            rest_reason,
            published_at: now(),
        }
    }

    /// A fault that never produced an HTTP response: no route found,
    /// invalid payload, transport failure, or any other caught exception.
    pub fn bridge_error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Status::BridgeError,
            data: Value::Null,
            errors: vec![(kind.into(), message.into())],
            rest_status: None,
            rest_reason: None,
            published_at: now(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Envelope always serializes")
    }
}

fn parse_or_raw(raw_body: &str) -> Value {
    serde_json::from_str(raw_body).unwrap_or_else(|_| Value::String(raw_body.to_string()))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_parses_json_body() {
        let env = Envelope::success(r#"{"ok":true}"#, 200, None);
        assert_eq!(env.status, Status::Success);
        assert_eq!(env.data, serde_json::json!({"ok": true}));
        assert_eq!(env.rest_status, Some(200));
    }

    #[test]
    fn rest_error_falls_back_to_raw_string_on_non_json() {
        let env = Envelope::rest_error("boom", 500, Some("Internal Server Error".to_string()));
        assert_eq!(env.status, Status::RestError);
        assert_eq!(env.data, Value::String("boom".to_string()));
        assert_eq!(env.rest_status, Some(500));
    }

    #[test]
    fn bridge_error_carries_kind_and_message() {
        let env = Envelope::bridge_error("NoBridgeRouteFound", "no route for topic 'x'");
        assert_eq!(env.status, Status::BridgeError);
        assert_eq!(
            env.errors,
            vec![(
                "NoBridgeRouteFound".to_string(),
                "no route for topic 'x'".to_string()
            )]
        );
        assert!(env.data.is_null());
    }

    #[test]
    fn status_serializes_to_expected_tag() {
        let env = Envelope::success("{}", 200, None);
        let json = env.to_json();
        assert!(json.contains("\"status\":\"success\""));
    }

    #[test]
    fn envelope_is_always_valid_json() {
        for env in [
            Envelope::success("{}", 200, None),
            Envelope::rest_error("boom", 500, None),
            Envelope::bridge_error("InvalidPayload", "bad json"),
        ] {
            let json = env.to_json();
            let parsed: Value = serde_json::from_str(&json).unwrap();
            assert!(parsed.get("status").is_some());
        }
    }
}
