//! `Dispatcher`: the orchestrator wiring the MQTT client, the core HTTP
//! client, and the route trie together.

use std::sync::Arc;

use arc_swap::ArcSwap;
use bridge_core::{Envelope, HttpMethod, OpenApiIngestor, RouteTrie, TemplatePath, plan_subscriptions};
use bridge_transport::{CoreClient, LastWillConfig, MqttClient, MqttClientConfig, MqttEvent, MqttHandle, MqttQos};
use serde_json::Value;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One endpoint the dispatcher polls on every periodic-poll cycle and
/// republishes as a `_current` snapshot.
#[derive(Debug, Clone)]
pub struct MonitoredEndpoint {
    pub http_path: String,
    pub retain: bool,
}

/// A bridge-internal virtual topic whose payload is computed rather than
/// fetched from the core (health data such as interface addresses). The
/// default configuration has none; this is purely an extension point.
pub trait AutoPublishedTopic: Send + Sync {
    fn topic(&self, device_id: &str) -> String;
    fn payload(&self) -> String;
}

/// The dispatcher's connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Init,
    Connecting,
    Connected,
    Stopped,
}

pub struct DispatcherConfig {
    pub device_id: String,
    pub mqtt: MqttClientConfig,
    pub core_base_url: String,
    pub monitored_endpoints: Vec<MonitoredEndpoint>,
    pub poll_interval: Duration,
}

/// Orchestrates the bridge: owns the route trie (behind an `ArcSwap` so
/// lookups in `on_message` never block on the OpenAPI-ingest rebuild),
/// the MQTT client, and the core HTTP client.
pub struct Dispatcher {
    config: DispatcherConfig,
    core: CoreClient,
    trie: Arc<ArcSwap<RouteTrie>>,
    auto_published: Vec<Box<dyn AutoPublishedTopic>>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(mut config: DispatcherConfig) -> Self {
        config.mqtt.last_will = Some(LastWillConfig {
            topic: status_topic(&config.device_id),
            payload: "Abnormally Disconnected".to_string(),
            qos: MqttQos::AtLeastOnce,
            retain: true,
        });

        Self {
            core: CoreClient::new(config.core_base_url.clone()),
            trie: Arc::new(ArcSwap::from_pointee(RouteTrie::new())),
            auto_published: Vec::new(),
            cancel: CancellationToken::new(),
            config,
        }
    }

    pub fn with_auto_published(mut self, topics: Vec<Box<dyn AutoPublishedTopic>>) -> Self {
        self.auto_published = topics;
        self
    }

    /// Connect, ingest routes, start the periodic-poll loop, and process
    /// inbound messages until cancelled.
    ///
    /// Takes `self` behind an `Arc` so that each inbound message can be
    /// dispatched on its own spawned task: one slow HTTP call to the core
    /// must not stall the event loop from servicing the next MQTT event
    /// or the poll timer.
    pub async fn run(self: Arc<Self>) -> Result<(), anyhow::Error> {
        let mut state = ConnectionState::Connecting;
        info!(device_id = %self.config.device_id, "starting dispatcher");

        let mut mqtt = MqttClient::connect(self.config.mqtt.clone(), self.cancel.child_token()).await?;
        let handle = mqtt.handle();

        let mut poll_timer = time::interval(self.config.poll_interval);
        poll_timer.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    state = ConnectionState::Stopped;
                    self.on_stop(&mqtt).await;
                    break;
                }
                event = mqtt.recv() => {
                    match event {
                        Some(MqttEvent::Connected) => {
                            state = ConnectionState::Connected;
                            self.on_connected(&handle).await;
                        }
                        Some(MqttEvent::Disconnected) => {
                            state = ConnectionState::Connecting;
                            warn!("broker connection dropped, awaiting reconnect");
                        }
                        Some(MqttEvent::Message(msg)) => {
                            let dispatcher = Arc::clone(&self);
                            let handle = handle.clone();
                            tokio::spawn(async move {
                                dispatcher.on_message(&handle, &msg.topic, &msg.payload).await;
                            });
                        }
                        None => {
                            warn!("MQTT event stream closed");
                            break;
                        }
                    }
                }
                _ = poll_timer.tick(), if state == ConnectionState::Connected => {
                    self.periodic_poll(&handle).await;
                }
            }
        }

        Ok(())
    }

    async fn on_connected(&self, mqtt: &MqttHandle) {
        info!("broker connected, ingesting OpenAPI document");

        match self.core.get_openapi_definition().await {
            Ok(definition) => {
                if let Err(e) = self.rebuild_routes(mqtt, &definition).await {
                    error!(error = %e, "failed to install routes from OpenAPI document");
                }
                self.publish_retained(mqtt, &openapi_topic(&self.config.device_id), definition.to_string())
                    .await;
            }
            Err(e) => {
                error!(error = %e, "OpenAPI fetch failed; remaining connected without routes");
            }
        }

        self.publish_retained(mqtt, &status_topic(&self.config.device_id), "Connected".to_string())
            .await;

        self.periodic_poll(mqtt).await;
    }

    /// (Re-)install routes from a parsed OpenAPI document: rebuild the
    /// trie off to the side and swap it in atomically, then subscribe to
    /// the resulting wildcard topics. Public so integration tests can
    /// drive route installation without waiting on a live broker's
    /// `ConnAck`.
    pub async fn rebuild_routes(&self, mqtt: &MqttHandle, definition: &Value) -> Result<(), anyhow::Error> {
        let ingestor = OpenApiIngestor::new(&self.config.device_id);
        let pairs = ingestor.ingest(definition)?;

        let mut trie = RouteTrie::new();
        let mut templates = Vec::new();
        for pair in pairs {
            let local_template = TemplatePath::parse(&pair.local.request_topic)?;
            let shared_template = TemplatePath::parse(&pair.shared.request_topic)?;
            trie.insert(&local_template, pair.local);
            trie.insert(&shared_template, pair.shared);
            templates.push(local_template);
            templates.push(shared_template);
        }

        self.trie.store(Arc::new(trie));

        for topic in plan_subscriptions(&templates) {
            if let Err(e) = mqtt.subscribe(&topic, MqttQos::AtLeastOnce).await {
                error!(topic = %topic, error = %e, "subscribe failed");
            }
        }

        Ok(())
    }

    /// Look up `topic` in the current trie and dispatch the HTTP call, or
    /// publish a `bridge_error` on the `/_response` fallback if nothing
    /// matches.
    pub async fn on_message(&self, mqtt: &MqttHandle, topic: &str, payload: &[u8]) {
        let segments: Vec<&str> = topic.trim_start_matches('/').split('/').collect();
        let trie = self.trie.load();

        let Some((route, _bindings)) = trie.lookup(&segments) else {
            debug!(topic = %topic, "no bridge route found");
            let envelope = Envelope::bridge_error("NoBridgeRouteFound", format!("no route for topic '{topic}'"));
            self.publish_envelope(mqtt, &format!("{topic}/_response"), &envelope, false).await;
            return;
        };

        let parsed_payload = if payload.is_empty() {
            None
        } else {
            match serde_json::from_slice::<Value>(payload) {
                Ok(value) => Some(value),
                Err(e) if route.http_method == HttpMethod::Get => {
                    debug!(error = %e, "non-JSON payload on GET, passed through as raw string");
                    Some(Value::String(String::from_utf8_lossy(payload).into_owned()))
                }
                Err(e) => {
                    warn!(error = %e, topic = %topic, "invalid JSON payload on non-GET request");
                    let envelope = Envelope::bridge_error("InvalidPayload", e.to_string());
                    self.publish_envelope(mqtt, &route.response_topic, &envelope, false).await;
                    return;
                }
            }
        };

        let envelope = match self
            .core
            .execute_request(route.http_method, &route.http_path, parsed_payload.as_ref())
            .await
        {
            Ok(response) if response.is_success() => {
                Envelope::success(&response.body_text, response.status, response.reason)
            }
            Ok(response) => Envelope::rest_error(&response.body_text, response.status, response.reason),
            Err(e) => Envelope::bridge_error(e.kind(), e.to_string()),
        };

        self.publish_envelope(mqtt, &route.response_topic, &envelope, false).await;
    }

    /// Poll every configured monitored endpoint and republish its
    /// snapshot, then publish any auto-published virtual topics.
    pub async fn periodic_poll(&self, mqtt: &MqttHandle) {
        for endpoint in &self.config.monitored_endpoints {
            let envelope = match self.core.execute_request(HttpMethod::Get, &endpoint.http_path, None).await {
                Ok(response) if response.is_success() => {
                    Envelope::success(&response.body_text, response.status, response.reason)
                }
                Ok(response) => Envelope::rest_error(&response.body_text, response.status, response.reason),
                Err(e) => {
                    warn!(endpoint = %endpoint.http_path, error = %e, "monitored endpoint poll failed");
                    Envelope::bridge_error(e.kind(), e.to_string())
                }
            };

            let topic = format!(
                "wlan-pi/{}{}/_current",
                self.config.device_id, endpoint.http_path
            );
            self.publish_envelope(mqtt, &topic, &envelope, endpoint.retain).await;
        }

        for topic in &self.auto_published {
            let name = topic.topic(&self.config.device_id);
            let payload = topic.payload();
            if let Err(e) = mqtt.publish(&name, payload, MqttQos::AtLeastOnce, true).await {
                warn!(topic = %name, error = %e, "auto-published topic publish failed");
            }
        }
    }

    async fn on_stop(&self, mqtt: &MqttClient) {
        self.publish_retained(mqtt, &status_topic(&self.config.device_id), "Disconnected".to_string())
            .await;
        if let Err(e) = mqtt.disconnect().await {
            warn!(error = %e, "error during MQTT disconnect");
        }
    }

    /// Signal the run loop to stop; `stop()` in the spec's terms.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn publish_envelope(&self, mqtt: &MqttHandle, topic: &str, envelope: &Envelope, retain: bool) {
        if let Err(e) = mqtt.publish(topic, envelope.to_json(), MqttQos::AtLeastOnce, retain).await {
            warn!(topic = %topic, error = %e, "envelope publish failed");
        }
    }

    async fn publish_retained(&self, mqtt: &MqttHandle, topic: &str, payload: String) {
        if let Err(e) = mqtt.publish(topic, payload, MqttQos::AtLeastOnce, true).await {
            warn!(topic = %topic, error = %e, "retained publish failed");
        }
    }
}

fn status_topic(device_id: &str) -> String {
    format!("wlan-pi/{device_id}/status")
}

fn openapi_topic(device_id: &str) -> String {
    format!("wlan-pi/{device_id}/openapi")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_openapi_topics_are_namespaced_by_device() {
        assert_eq!(status_topic("d1"), "wlan-pi/d1/status");
        assert_eq!(openapi_topic("d1"), "wlan-pi/d1/openapi");
    }

    #[test]
    fn connection_state_equality() {
        assert_eq!(ConnectionState::Init, ConnectionState::Init);
        assert_ne!(ConnectionState::Init, ConnectionState::Connected);
    }
}
