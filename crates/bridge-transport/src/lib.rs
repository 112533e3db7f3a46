//! # Bridge Transport
//!
//! The two external collaborators the dispatch engine is wired to: an
//! async MQTT client (`rumqttc`) and an HTTP client for the core API
//! (`reqwest`).

pub mod core_client;
pub mod error;
pub mod mqtt;

pub use core_client::{CoreClient, CoreResponse};
pub use error::TransportError;
pub use mqtt::{LastWillConfig, MqttClient, MqttClientConfig, MqttEvent, MqttHandle, MqttMessage, MqttQos, TlsConfig};
