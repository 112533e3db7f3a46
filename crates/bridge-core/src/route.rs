//! `Route`: an immutable record of one HTTP operation and its MQTT topics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods a `Route` can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Parse an HTTP method name case-insensitively (as they appear as
    /// keys in an OpenAPI document or as lowercase MQTT topic suffixes).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "PUT" => Some(Self::Put),
            "POST" => Some(Self::Post),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// The lowercase form used as the final MQTT topic segment.
    pub fn as_topic_segment(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_topic_segment().to_ascii_uppercase())
    }
}

/// One `(placeholder, concrete_value)` pair collected while matching a
/// concrete topic against a template, in root-to-leaf order.
pub type Binding = (String, String);

/// An immutable description of one HTTP operation and its MQTT topics.
///
/// `rebind` substitutes bindings into `http_path`, `request_topic`, and
/// `response_topic`, replacing the first remaining occurrence of each
/// `{name}` left-to-right in binding order. This makes the substitution
/// deterministic even when the same placeholder name appears more than
/// once in a single template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub http_path: String,
    pub request_topic: String,
    pub response_topic: String,
    pub http_method: HttpMethod,
}

impl Route {
    /// Construct a route, defaulting `response_topic` to
    /// `request_topic + "/_response"` when not given explicitly.
    pub fn new(
        http_path: impl Into<String>,
        request_topic: impl Into<String>,
        response_topic: Option<String>,
        http_method: HttpMethod,
    ) -> Self {
        let request_topic = request_topic.into();
        let response_topic =
            response_topic.unwrap_or_else(|| format!("{request_topic}/_response"));
        Self {
            http_path: http_path.into(),
            request_topic,
            response_topic,
            http_method,
        }
    }

    /// Produce a new `Route` with every `(name, value)` binding substituted
    /// into each of the three string fields, one replacement per
    /// placeholder occurrence, left to right.
    pub fn rebind(&self, bindings: &[Binding]) -> Route {
        Route {
            http_path: apply_bindings(&self.http_path, bindings),
            request_topic: apply_bindings(&self.request_topic, bindings),
            response_topic: apply_bindings(&self.response_topic, bindings),
            http_method: self.http_method,
        }
    }
}

fn apply_bindings(field: &str, bindings: &[Binding]) -> String {
    let mut out = field.to_string();
    for (name, value) in bindings {
        let token = format!("{{{name}}}");
        if let Some(pos) = out.find(&token) {
            out.replace_range(pos..pos + token.len(), value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_topic_defaults() {
        let r = Route::new("/api/v1/health", "wlan-pi/d1/api/v1/health/get", None, HttpMethod::Get);
        assert_eq!(r.response_topic, "wlan-pi/d1/api/v1/health/get/_response");
    }

    #[test]
    fn rebind_is_noop_without_placeholders() {
        let r = Route::new("/api/v1/health", "wlan-pi/d1/api/v1/health/get", None, HttpMethod::Get);
        let rebound = r.rebind(&[]);
        assert_eq!(r, rebound);
    }

    #[test]
    fn rebind_substitutes_all_three_fields() {
        let r = Route::new(
            "/api/v1/iface/{name}/stats",
            "wlan-pi/d1/api/v1/iface/{name}/stats/get",
            None,
            HttpMethod::Get,
        );
        let rebound = r.rebind(&[("name".to_string(), "eth0".to_string())]);
        assert_eq!(rebound.http_path, "/api/v1/iface/eth0/stats");
        assert_eq!(rebound.request_topic, "wlan-pi/d1/api/v1/iface/eth0/stats/get");
        assert_eq!(
            rebound.response_topic,
            "wlan-pi/d1/api/v1/iface/eth0/stats/get/_response"
        );
    }

    #[test]
    fn rebind_consumes_repeated_placeholder_left_to_right() {
        let r = Route::new("/a/{x}/b/{x}", "t/a/{x}/b/{x}", None, HttpMethod::Get);
        let rebound = r.rebind(&[
            ("x".to_string(), "first".to_string()),
            ("x".to_string(), "second".to_string()),
        ]);
        assert_eq!(rebound.http_path, "/a/first/b/second");
    }

    #[test]
    fn http_method_parses_case_insensitively() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("POST"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("bogus"), None);
    }
}
