//! Configuration loading: a TOML file with `[MQTT]`/`[MQTT_TLS]` tables,
//! overridden by CLI flags.

use std::path::Path;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/wlanpi-mqtt-bridge/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// TLS options for the MQTT connection, mirroring the `[MQTT_TLS]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MqttTlsConfig {
    #[serde(default)]
    pub use_tls: bool,
    pub ca_certs: Option<String>,
    pub certfile: Option<String>,
    pub keyfile: Option<String>,
    pub cert_reqs: Option<i32>,
    pub tls_version: Option<String>,
    pub ciphers: Option<String>,
    pub keyfile_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct MqttTable {
    #[serde(default = "default_server")]
    server: String,
    #[serde(default = "default_port")]
    port: u16,
}

fn default_server() -> String {
    "<gateway>".to_string()
}

fn default_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Deserialize, Default)]
struct TomlFile {
    #[serde(rename = "MQTT", default)]
    mqtt: MqttTable,
    #[serde(rename = "MQTT_TLS", default)]
    mqtt_tls: MqttTlsConfig,
}

/// Fully-resolved bridge configuration: TOML file contents with CLI
/// overrides already applied.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mqtt_server: String,
    pub mqtt_port: u16,
    pub mqtt_tls: MqttTlsConfig,
    pub identifier: String,
    pub core_base_url: String,
    pub debug: bool,
}

/// CLI flags, matching the original bridge's argument parser.
#[derive(Debug, Parser)]
#[command(name = "wlanpi-mqtt-bridge", version, about = "MQTT-to-core-API bridge")]
pub struct Cli {
    #[arg(long, short = 'd', default_value_t = false)]
    pub debug: bool,

    #[arg(long, short = 's')]
    pub server: Option<String>,

    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    #[arg(long)]
    pub identifier: Option<String>,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[arg(long, default_value = "http://127.0.0.1:31415")]
    pub core_base_url: String,
}

impl BridgeConfig {
    /// Load the TOML file at `path` (treating a missing file as all
    /// defaults, matching the original's `ConfigParser` fallback
    /// behavior), then apply CLI overrides.
    pub fn load(path: &Path, cli: &Cli) -> Result<Self, ConfigError> {
        let file = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            TomlFile::default()
        };

        let mut mqtt_server = file.mqtt.server;
        if let Some(server) = &cli.server {
            mqtt_server = server.clone();
        }
        if mqtt_server == "<gateway>" {
            mqtt_server = resolve_gateway_address();
        }

        let mqtt_port = cli.port.unwrap_or(file.mqtt.port);
        let identifier = cli.identifier.clone().unwrap_or_else(default_device_id);

        Ok(Self {
            mqtt_server,
            mqtt_port,
            mqtt_tls: file.mqtt_tls,
            identifier,
            core_base_url: cli.core_base_url.clone(),
            debug: cli.debug,
        })
    }
}

/// Resolve `"<gateway>"` to a concrete broker address. The spec lists
/// host-environment probes (default route lookup) as an external
/// collaborator, not part of the dispatch engine — this is a narrow,
/// swappable stand-in, never consulted by the trie or dispatcher.
fn resolve_gateway_address() -> String {
    std::env::var("WLANPI_MQTT_BRIDGE_GATEWAY").unwrap_or_else(|_| "wi.fi".to_string())
}

/// Default per-instance identifier (normally the primary interface's MAC
/// address). Same caveat as `resolve_gateway_address`.
fn default_device_id() -> String {
    std::env::var("WLANPI_MQTT_BRIDGE_ID").unwrap_or_else(|_| "unknown-device".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(server: Option<&str>, port: Option<u16>, identifier: Option<&str>) -> Cli {
        Cli {
            debug: false,
            server: server.map(String::from),
            port,
            identifier: identifier.map(String::from),
            config: "/nonexistent/config.toml".to_string(),
            core_base_url: "http://127.0.0.1:31415".to_string(),
        }
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let cli = cli(None, None, Some("d1"));
        let config = BridgeConfig::load(Path::new("/nonexistent/config.toml"), &cli).unwrap();
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.identifier, "d1");
    }

    #[test]
    fn cli_overrides_win_over_file_and_defaults() {
        let cli = cli(Some("broker.example.com"), Some(8883), Some("d2"));
        let config = BridgeConfig::load(Path::new("/nonexistent/config.toml"), &cli).unwrap();
        assert_eq!(config.mqtt_server, "broker.example.com");
        assert_eq!(config.mqtt_port, 8883);
        assert_eq!(config.identifier, "d2");
    }

    #[test]
    fn parses_mqtt_and_tls_tables_from_file() {
        let dir = std::env::temp_dir().join(format!("bridge-cfg-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
            [MQTT]
            server = "broker.local"
            port = 8883

            [MQTT_TLS]
            use_tls = true
            ca_certs = "/etc/ssl/ca.pem"
            "#,
        )
        .unwrap();

        let cli = cli(None, None, Some("d3"));
        let config = BridgeConfig::load(&path, &cli).unwrap();
        assert_eq!(config.mqtt_server, "broker.local");
        assert_eq!(config.mqtt_port, 8883);
        assert!(config.mqtt_tls.use_tls);
        assert_eq!(config.mqtt_tls.ca_certs.as_deref(), Some("/etc/ssl/ca.pem"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
