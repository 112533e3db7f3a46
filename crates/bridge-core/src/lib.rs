//! # Bridge Core
//!
//! The topic-to-route dispatch engine: template parsing, the route trie,
//! subscription planning, OpenAPI ingestion, and the response envelope.
//! This crate does no I/O — it is the pure data structure and algorithm
//! that `bridge-server` wires up to a live MQTT connection and HTTP
//! client.

pub mod envelope;
pub mod error;
pub mod openapi;
pub mod path;
pub mod route;
pub mod subscription;
pub mod trie;

pub use envelope::{Envelope, ErrorEntry, Status};
pub use error::BridgeCoreError;
pub use openapi::{OpenApiIngestor, RoutePair};
pub use path::{Segment, TemplatePath};
pub use route::{Binding, HttpMethod, Route};
pub use subscription::plan_subscriptions;
pub use trie::RouteTrie;
