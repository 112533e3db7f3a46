//! wlanpi-mqtt-bridge — MQTT-to-core-API bridge, entry point.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use bridge_server::config::{BridgeConfig, Cli};
use bridge_server::dispatcher::{Dispatcher, DispatcherConfig, MonitoredEndpoint};
use bridge_transport::{MqttClientConfig, TlsConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "wlanpi_mqtt_bridge={default_directive},bridge_server={default_directive},bridge_transport={default_directive},bridge_core={default_directive}"
                ))
            }),
        )
        .with_target(true)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting wlanpi-mqtt-bridge");

    let config = BridgeConfig::load(&PathBuf::from(&cli.config), &cli)?;
    tracing::info!(
        server = %config.mqtt_server,
        port = config.mqtt_port,
        identifier = %config.identifier,
        core_base_url = %config.core_base_url,
        "configuration loaded"
    );

    let tls = if config.mqtt_tls.use_tls {
        match &config.mqtt_tls.ca_certs {
            Some(ca_cert_path) => Some(TlsConfig {
                ca_cert_path: ca_cert_path.clone(),
                client_cert_path: config.mqtt_tls.certfile.clone(),
                client_key_path: config.mqtt_tls.keyfile.clone(),
            }),
            None => {
                tracing::warn!("[MQTT_TLS] use_tls is set but ca_certs is missing; connecting without TLS");
                None
            }
        }
    } else {
        None
    };

    let dispatcher_config = DispatcherConfig {
        device_id: config.identifier.clone(),
        mqtt: MqttClientConfig {
            client_id: format!("wlanpi-mqtt-bridge-{}", config.identifier),
            host: config.mqtt_server.clone(),
            port: config.mqtt_port,
            keep_alive_secs: 60,
            last_will: None,
            tls,
        },
        core_base_url: config.core_base_url.clone(),
        monitored_endpoints: vec![MonitoredEndpoint {
            http_path: "/api/v1/network_config/ethernet/vlans".to_string(),
            retain: true,
        }],
        poll_interval: Duration::from_secs(30),
    };

    let dispatcher = std::sync::Arc::new(Dispatcher::new(dispatcher_config));
    let run_handle = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.run().await })
    };

    let mut sighup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
            dispatcher.stop();
        }
        _ = sighup.recv() => {
            tracing::info!("received SIGHUP, shutting down for restart");
            dispatcher.stop();
        }
    }

    if let Err(e) = run_handle.await? {
        tracing::error!(error = %e, "dispatcher exited with an error");
    }

    tracing::info!("wlanpi-mqtt-bridge stopped");
    Ok(())
}
