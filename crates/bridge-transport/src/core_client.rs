//! `CoreClient`: an HTTP client for the local core API.
//!
//! `GET` requests send bindings/payload as query parameters; all other
//! methods send the JSON payload as the request body. `Accept:
//! application/json` is sent on every request. The OpenAPI document is
//! always fetched from `<base>/api/v1/openapi.json`.

use bridge_core::HttpMethod;
use serde_json::Value;

use crate::error::TransportError;

/// The raw outcome of an HTTP call against the core: the bridge does not
/// interpret the body beyond trying to parse it as JSON (that happens in
/// `bridge_core::Envelope`), it just carries the status/reason/text
/// through.
pub struct CoreResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub body_text: String,
}

impl CoreResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client wrapper around `reqwest` for calling the core API.
pub struct CoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoreClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn api_url(&self) -> String {
        format!("{}/api/v1", self.base_url.trim_end_matches('/'))
    }

    /// Fetch and parse the OpenAPI document from `<base>/api/v1/openapi.json`.
    pub async fn get_openapi_definition(&self) -> Result<Value, TransportError> {
        let url = format!("{}/openapi.json", self.api_url());
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(TransportError::from)?;
        response.json::<Value>().await.map_err(TransportError::from)
    }

    /// Execute one HTTP request against the core. `http_path` is joined
    /// directly onto `base_url`, not onto `api_url()` — OpenAPI-derived
    /// routes already carry their full path (including any `/api/v1`
    /// prefix the core's document declares), so adding another prefix
    /// here would double it. Only `get_openapi_definition`, which needs
    /// the document's own well-known location, uses `api_url()`.
    pub async fn execute_request(
        &self,
        method: HttpMethod,
        http_path: &str,
        payload: Option<&Value>,
    ) -> Result<CoreResponse, TransportError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), http_path);
        let reqwest_method = to_reqwest_method(method);

        let mut builder = self
            .http
            .request(reqwest_method, &url)
            .header("Accept", "application/json");

        builder = match (method, payload) {
            (HttpMethod::Get, Some(Value::Object(map))) => {
                let query: Vec<(String, String)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_query_string(v)))
                    .collect();
                builder.query(&query)
            }
            (HttpMethod::Get, _) => builder,
            (_, Some(body)) => builder.json(body),
            (_, None) => builder,
        };

        let response = builder.send().await.map_err(TransportError::from)?;
        let status = response.status().as_u16();
        let reason = response.status().canonical_reason().map(str::to_string);
        let body_text = response.text().await.map_err(TransportError::from)?;

        Ok(CoreResponse {
            status,
            reason,
            body_text,
        })
    }
}

fn value_to_query_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_trims_trailing_slash_on_base() {
        let client = CoreClient::new("http://127.0.0.1:31415/");
        assert_eq!(client.api_url(), "http://127.0.0.1:31415/api/v1");
    }

    #[test]
    fn core_response_classifies_2xx_as_success() {
        let resp = CoreResponse {
            status: 200,
            reason: None,
            body_text: String::new(),
        };
        assert!(resp.is_success());

        let resp = CoreResponse {
            status: 500,
            reason: Some("Internal Server Error".into()),
            body_text: "boom".into(),
        };
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn execute_request_does_not_double_the_api_v1_prefix() {
        let mut core = bridge_test_harness::MockCore::new(19090);
        core.start().await.unwrap();

        let client = CoreClient::new(core.base_url());
        client
            .execute_request(HttpMethod::Get, "/api/v1/health", None)
            .await
            .unwrap();

        let requests = core.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/health");

        core.stop();
    }
}
