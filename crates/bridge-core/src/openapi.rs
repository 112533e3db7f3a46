//! `OpenApiIngestor`: walks a parsed OpenAPI document and emits one local
//! and one shared [`Route`] per (path, HTTP method) pair.

use serde_json::Value;

use crate::error::BridgeCoreError;
use crate::route::{HttpMethod, Route};

/// A pair of routes emitted for one (path, method) entry: the
/// device-local route and the shared/broadcast route. Both are inserted
/// into the trie; both are registered with the subscription planner.
pub struct RoutePair {
    pub local: Route,
    pub shared: Route,
}

/// Walks `openapi_definition["paths"]` and emits a [`RoutePair`] for every
/// `(http_path, method)` entry, constructing topics under the device-local
/// prefix (`wlan-pi/<device_id>`) and the shared prefix (`wlan-pi/all`).
///
/// The shared route's response is deliberately targeted at the
/// device-local response topic, so that a broadcast command still
/// produces a per-device answer.
pub struct OpenApiIngestor<'a> {
    device_id: &'a str,
}

impl<'a> OpenApiIngestor<'a> {
    pub fn new(device_id: &'a str) -> Self {
        Self { device_id }
    }

    pub fn ingest(&self, openapi_definition: &Value) -> Result<Vec<RoutePair>, BridgeCoreError> {
        let paths = openapi_definition
            .get("paths")
            .and_then(Value::as_object)
            .ok_or(BridgeCoreError::MissingPaths)?;

        let mut pairs = Vec::new();
        for (http_path, methods) in paths {
            let methods = methods
                .as_object()
                .ok_or_else(|| BridgeCoreError::MalformedPathEntry(http_path.clone()))?;

            for method_key in methods.keys() {
                let Some(method) = HttpMethod::parse(method_key) else {
                    continue;
                };
                pairs.push(self.route_pair(http_path, method));
            }
        }
        Ok(pairs)
    }

    fn route_pair(&self, http_path: &str, method: HttpMethod) -> RoutePair {
        let suffix = method.as_topic_segment();
        let local_topic = format!("wlan-pi/{}{}/{}", self.device_id, http_path, suffix);
        let shared_topic = format!("wlan-pi/all{}/{}", http_path, suffix);
        let response_topic = format!("{local_topic}/_response");

        let local = Route::new(http_path, local_topic, Some(response_topic.clone()), method);
        let shared = Route::new(http_path, shared_topic, Some(response_topic), method);
        RoutePair { local, shared }
    }
}
