//! `MockCore`: a stand-in for the core HTTP API, for exercising
//! `bridge-transport::CoreClient` and the full dispatcher without a real
//! core process.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::Json,
    routing::{any, get},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
pub struct MockCoreState {
    pub openapi: RwLock<serde_json::Value>,
    pub requests: RwLock<Vec<RecordedRequest>>,
    pub responses: RwLock<HashMap<String, MockResponse>>,
}

/// One request the mock core observed, for test assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<String>,
}

/// A canned response to serve for a given `http_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: r#"{"status":"ok"}"#.to_string(),
        }
    }
}

/// An in-process axum server standing in for the core API: serves
/// `/api/v1/openapi.json` and records + replies to every other
/// `/api/v1/*path` call.
pub struct MockCore {
    state: Arc<MockCoreState>,
    port: u16,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockCore {
    pub fn new(port: u16) -> Self {
        Self {
            state: Arc::new(MockCoreState::default()),
            port,
            shutdown_tx: None,
        }
    }

    /// Set the OpenAPI document served at `/api/v1/openapi.json`.
    pub async fn set_openapi_definition(&self, definition: serde_json::Value) {
        *self.state.openapi.write().await = definition;
    }

    /// Configure the response the mock returns for a given `http_path`
    /// (e.g. `/api/v1/iface/eth0/stats`).
    pub async fn mock_response(&self, http_path: impl Into<String>, response: MockResponse) {
        self.state.responses.write().await.insert(http_path.into(), response);
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.read().await.clone()
    }

    pub async fn clear_requests(&self) {
        self.state.requests.write().await.clear();
    }

    pub async fn start(&mut self) -> Result<(), std::io::Error> {
        let state = self.state.clone();
        let port = self.port;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let app = Router::new()
            .route("/api/v1/openapi.json", get(openapi_handler))
            .route("/api/v1/*path", any(api_handler))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}")).await?;
        info!(port, "mock core started");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

async fn openapi_handler(State(state): State<Arc<MockCoreState>>) -> Json<serde_json::Value> {
    Json(state.openapi.read().await.clone())
}

async fn api_handler(
    State(state): State<Arc<MockCoreState>>,
    method: Method,
    Path(path): Path<String>,
    body: Option<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let http_path = format!("/{path}");

    state.requests.write().await.push(RecordedRequest {
        method: method.to_string(),
        path: http_path.clone(),
        body: body.clone(),
    });

    if let Some(mock) = state.responses.read().await.get(&http_path) {
        let status = StatusCode::from_u16(mock.status).unwrap_or(StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&mock.body).unwrap_or_default();
        return (status, Json(body));
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({"path": http_path, "method": method.to_string()})),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_configured_openapi_document() {
        let mut core = MockCore::new(18080);
        core.set_openapi_definition(serde_json::json!({"paths": {}})).await;
        core.start().await.unwrap();

        let body = reqwest::get(format!("{}/api/v1/openapi.json", core.base_url()))
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({"paths": {}}));

        core.stop();
    }

    #[tokio::test]
    async fn records_requests_against_arbitrary_paths() {
        let mut core = MockCore::new(18081);
        core.start().await.unwrap();

        reqwest::get(format!("{}/api/v1/health", core.base_url())).await.unwrap();

        let requests = core.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/health");
        assert_eq!(requests[0].method, "GET");

        core.stop();
    }

    #[tokio::test]
    async fn serves_configured_mock_response_for_path() {
        let mut core = MockCore::new(18082);
        core.mock_response(
            "/iface/eth0/stats",
            MockResponse { status: 201, body: r#"{"created":true}"#.to_string() },
        )
        .await;
        core.start().await.unwrap();

        let response = reqwest::get(format!("{}/api/v1/iface/eth0/stats", core.base_url()))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);

        core.stop();
    }
}
