//! MQTT client wrapper.
//!
//! Thin wrapper around `rumqttc` for broker connectivity, last-will, and
//! automatic reconnection. `bridge-server`'s `Dispatcher` drives this: it
//! reacts to `MqttEvent::Connected` by re-ingesting the OpenAPI document
//! and re-subscribing, and to `MqttEvent::Message` by looking the topic
//! up in the route trie.

use std::time::Duration;

use bytes::Bytes;
use rumqttc::{AsyncClient, Event, Incoming, LastWill, MqttOptions, QoS, TlsConfiguration, Transport};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// MQTT QoS levels. The bridge always publishes at [`MqttQos::AtLeastOnce`]
/// (QoS 1), per the spec's external interface contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MqttQos {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl Default for MqttQos {
    fn default() -> Self {
        MqttQos::AtLeastOnce
    }
}

impl From<MqttQos> for QoS {
    fn from(qos: MqttQos) -> Self {
        match qos {
            MqttQos::AtMostOnce => QoS::AtMostOnce,
            MqttQos::AtLeastOnce => QoS::AtLeastOnce,
            MqttQos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

impl From<QoS> for MqttQos {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => MqttQos::AtMostOnce,
            QoS::AtLeastOnce => MqttQos::AtLeastOnce,
            QoS::ExactlyOnce => MqttQos::ExactlyOnce,
        }
    }
}

/// MQTT client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttClientConfig {
    /// Client ID (must be unique per connection).
    pub client_id: String,
    /// Broker host.
    pub host: String,
    /// Broker port.
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Keep alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Last-will topic, payload, qos, retain — published by the broker if
    /// this client disconnects without a clean `DISCONNECT`.
    #[serde(default)]
    pub last_will: Option<LastWillConfig>,
    /// TLS transport settings, if the broker connection is secured.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS settings for the broker connection: a CA bundle and, for mutual
/// TLS, a client certificate/key pair. Mirrors the original bridge's
/// `TLSConfig` dataclass fields that actually affect the wire connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub ca_cert_path: String,
    pub client_cert_path: Option<String>,
    pub client_key_path: Option<String>,
}

impl TlsConfig {
    fn into_transport(self) -> Result<Transport, std::io::Error> {
        let ca = std::fs::read(&self.ca_cert_path)?;
        let client_auth = match (&self.client_cert_path, &self.client_key_path) {
            (Some(cert), Some(key)) => Some((std::fs::read(cert)?, std::fs::read(key)?)),
            _ => None,
        };
        Ok(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth,
        }))
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    60
}

/// Configuration for the MQTT last-will message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastWillConfig {
    pub topic: String,
    pub payload: String,
    #[serde(default)]
    pub qos: MqttQos,
    #[serde(default)]
    pub retain: bool,
}

/// A received MQTT message.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Bytes,
    pub qos: MqttQos,
    pub retain: bool,
}

/// Connection-lifecycle and inbound-message events surfaced to the
/// dispatcher.
#[derive(Debug)]
pub enum MqttEvent {
    /// The broker acknowledged the connection — time to (re-)ingest the
    /// OpenAPI document and (re-)subscribe.
    Connected,
    /// The connection dropped; `rumqttc` will attempt to reconnect on its
    /// own and a fresh `Connected` event will follow.
    Disconnected,
    Message(MqttMessage),
}

/// A cheaply-cloneable publish/subscribe handle, decoupled from the
/// connection's owned event receiver so it can be handed to spawned
/// tasks that dispatch one inbound message each, independently of the
/// main event loop.
#[derive(Clone)]
pub struct MqttHandle {
    client: AsyncClient,
}

impl MqttHandle {
    /// Publish a message.
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        qos: MqttQos,
        retain: bool,
    ) -> Result<(), rumqttc::ClientError> {
        self.client.publish(topic, qos.into(), retain, payload.into()).await
    }

    /// Subscribe to a topic (a concrete MQTT wildcard subscription, as
    /// produced by `bridge_core::plan_subscriptions`).
    pub async fn subscribe(&self, topic: &str, qos: MqttQos) -> Result<(), rumqttc::ClientError> {
        self.client.subscribe(topic, qos.into()).await
    }
}

/// MQTT client wrapper owning the publish handle and the background
/// event-loop task.
pub struct MqttClient {
    client: AsyncClient,
    event_rx: mpsc::Receiver<MqttEvent>,
    cancel: CancellationToken,
}

impl MqttClient {
    /// Connect to the broker and spawn the background event-loop task.
    pub async fn connect(
        config: MqttClientConfig,
        cancel: CancellationToken,
    ) -> Result<Self, crate::error::TransportError> {
        info!(
            client_id = %config.client_id,
            host = %config.host,
            port = config.port,
            "Connecting to MQTT broker"
        );

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        if let Some(will) = &config.last_will {
            options.set_last_will(LastWill::new(
                &will.topic,
                will.payload.clone(),
                will.qos.into(),
                will.retain,
            ));
        }

        if let Some(tls) = config.tls.clone() {
            let transport = tls
                .into_transport()
                .map_err(|e| crate::error::TransportError::Mqtt(format!("failed to load TLS materials: {e}")))?;
            options.set_transport(transport);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);
        let (event_tx, event_rx) = mpsc::channel(1000);

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_clone.cancelled() => {
                        info!("MQTT event loop cancelled");
                        break;
                    }
                    event = eventloop.poll() => {
                        let forwarded = match event {
                            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                                let msg = MqttMessage {
                                    topic: publish.topic.clone(),
                                    payload: Bytes::from(publish.payload.to_vec()),
                                    qos: publish.qos.into(),
                                    retain: publish.retain,
                                };
                                debug!(topic = %msg.topic, size = msg.payload.len(), "received MQTT message");
                                Some(MqttEvent::Message(msg))
                            }
                            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                                info!("MQTT connected");
                                Some(MqttEvent::Connected)
                            }
                            Ok(Event::Incoming(Incoming::Disconnect)) => {
                                warn!("MQTT disconnected");
                                Some(MqttEvent::Disconnected)
                            }
                            Ok(_) => None,
                            Err(e) => {
                                error!(error = %e, "MQTT connection error");
                                tokio::time::sleep(Duration::from_secs(5)).await;
                                None
                            }
                        };

                        if let Some(event) = forwarded {
                            if event_tx.send(event).await.is_err() {
                                warn!("event channel closed");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            client,
            event_rx,
            cancel,
        })
    }

    /// A cloneable handle for publishing/subscribing from spawned tasks,
    /// independent of this client's owned event receiver.
    pub fn handle(&self) -> MqttHandle {
        MqttHandle { client: self.client.clone() }
    }

    /// Publish a message.
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        qos: MqttQos,
        retain: bool,
    ) -> Result<(), rumqttc::ClientError> {
        self.client.publish(topic, qos.into(), retain, payload.into()).await
    }

    /// Subscribe to a topic (a concrete MQTT wildcard subscription, as
    /// produced by `bridge_core::plan_subscriptions`).
    pub async fn subscribe(&self, topic: &str, qos: MqttQos) -> Result<(), rumqttc::ClientError> {
        self.client.subscribe(topic, qos.into()).await
    }

    /// Receive the next connection or message event.
    pub async fn recv(&mut self) -> Option<MqttEvent> {
        self.event_rx.recv().await
    }

    /// Disconnect from the broker and stop the event loop.
    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        self.cancel.cancel();
        self.client.disconnect().await
    }
}
