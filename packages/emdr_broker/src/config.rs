use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

// =============================================================================
// File config (figment-deserialized from defaults / emdr.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   emdr.toml:       [server]
//                    port = 4100
//
//   env var:         EMDR_SERVER__PORT=4100   (double underscore = nesting)
//
//   CLI flag:        emdr --port 4100         (highest priority)

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "emdr.toml";

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub session: SessionFileConfig,
    #[serde(default)]
    pub websocket: WebSocketFileConfig,
}

/// Listener settings (lives under `[server]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Session settings (lives under `[session]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionFileConfig {
    /// Page the host shares with clients; the session id is appended as `sid`.
    #[serde(default = "default_join_url_base")]
    pub join_url_base: String,
}

impl Default for SessionFileConfig {
    fn default() -> Self {
        Self {
            join_url_base: default_join_url_base(),
        }
    }
}

/// WebSocket tuning knobs (lives under `[websocket]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebSocketFileConfig {
    #[serde(default = "default_send_channel_capacity")]
    pub send_channel_capacity: usize,
    #[serde(default = "default_max_message_kb")]
    pub max_message_kb: usize,
}

impl Default for WebSocketFileConfig {
    fn default() -> Self {
        Self {
            send_channel_capacity: default_send_channel_capacity(),
            max_message_kb: default_max_message_kb(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    4000
}
fn default_join_url_base() -> String {
    "http://localhost:5173/client".to_string()
}
fn default_send_channel_capacity() -> usize {
    64
}
fn default_max_message_kb() -> usize {
    64
}

/// Build a figment that layers: defaults → emdr.toml (or `path`) → EMDR_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `EMDR_SERVER__HOST=0.0.0.0`  →  `server.host = "0.0.0.0"`
pub fn load_config(path: Option<&Path>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("EMDR_").split("__"))
}

/// Command-line values that win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub join_url_base: Option<String>,
}

impl FileConfig {
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(base) = overrides.join_url_base {
            self.session.join_url_base = base;
        }
        self
    }
}

// =============================================================================
// Runtime config (derived from FileConfig, used throughout the broker)
// =============================================================================

#[derive(Clone, Debug)]
pub struct BrokerConfig {
    pub bind_addr: SocketAddr,
    pub session: SessionConfig,
    pub websocket: WebSocketConfig,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub join_url_base: String,
}

#[derive(Clone, Debug)]
pub struct WebSocketConfig {
    /// Outbound frames queued per connection before new ones are dropped
    pub send_channel_capacity: usize,
    /// Largest inbound message accepted, in bytes
    pub max_message_bytes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], default_port()).into(),
            session: SessionConfig {
                join_url_base: default_join_url_base(),
            },
            websocket: WebSocketConfig {
                send_channel_capacity: default_send_channel_capacity(),
                max_message_bytes: default_max_message_kb() * 1024,
            },
        }
    }
}

impl BrokerConfig {
    pub fn from_file(fc: &FileConfig) -> Result<Self> {
        let bind_addr = format!("{}:{}", fc.server.host, fc.server.port)
            .parse::<SocketAddr>()
            .with_context(|| {
                format!(
                    "invalid listen address {}:{}",
                    fc.server.host, fc.server.port
                )
            })?;
        Ok(Self {
            bind_addr,
            session: SessionConfig {
                join_url_base: fc.session.join_url_base.clone(),
            },
            websocket: WebSocketConfig {
                send_channel_capacity: fc.websocket.send_channel_capacity.max(1),
                max_message_bytes: fc.websocket.max_message_kb * 1024,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ────────────────────────────────────────────────────────

    #[test]
    fn test_file_config_defaults() {
        let d = FileConfig::default();
        assert_eq!(d.server.host, "127.0.0.1");
        assert_eq!(d.server.port, 4000);
        assert_eq!(d.session.join_url_base, "http://localhost:5173/client");
        assert_eq!(d.websocket.send_channel_capacity, 64);
        assert_eq!(d.websocket.max_message_kb, 64);
    }

    #[test]
    fn test_broker_config_default() {
        let c = BrokerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(c.websocket.max_message_bytes, 64 * 1024);
    }

    // ── BrokerConfig::from_file ─────────────────────────────────────────

    #[test]
    fn test_from_file_rejects_bad_host() {
        let fc = FileConfig {
            server: ServerFileConfig {
                host: "not a host".to_string(),
                port: 4000,
            },
            ..Default::default()
        };
        assert!(BrokerConfig::from_file(&fc).is_err());
    }

    #[test]
    fn test_from_file_zero_capacity_is_clamped() {
        let fc = FileConfig {
            websocket: WebSocketFileConfig {
                send_channel_capacity: 0,
                max_message_kb: 1,
            },
            ..Default::default()
        };
        let c = BrokerConfig::from_file(&fc).unwrap();
        assert_eq!(c.websocket.send_channel_capacity, 1);
        assert_eq!(c.websocket.max_message_bytes, 1024);
    }

    // ── overrides ───────────────────────────────────────────────────────

    #[test]
    fn test_overrides_win() {
        let fc = FileConfig::default().apply(Overrides {
            host: Some("0.0.0.0".to_string()),
            port: Some(9000),
            join_url_base: None,
        });
        assert_eq!(fc.server.host, "0.0.0.0");
        assert_eq!(fc.server.port, 9000);
        assert_eq!(fc.session.join_url_base, "http://localhost:5173/client");
    }

    // ── load_config ─────────────────────────────────────────────────────

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let fc: FileConfig = load_config(Some(&tmp.path().join("absent.toml")))
            .extract()
            .unwrap();
        assert_eq!(fc.server.port, 4000);
    }

    #[test]
    fn test_load_config_toml_sets_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("emdr.toml");
        std::fs::write(
            &path,
            "[server]\nport = 4100\n\n[session]\njoin_url_base = \"https://emdr.example/client\"\n",
        )
        .unwrap();
        let fc: FileConfig = load_config(Some(&path)).extract().unwrap();
        assert_eq!(fc.server.port, 4100);
        assert_eq!(fc.server.host, "127.0.0.1");
        assert_eq!(fc.session.join_url_base, "https://emdr.example/client");
    }

    #[test]
    fn test_load_config_then_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("emdr.toml");
        std::fs::write(&path, "[server]\nport = 4100\n").unwrap();
        let fc: FileConfig = load_config(Some(&path)).extract().unwrap();
        let fc = fc.apply(Overrides {
            port: Some(4200),
            ..Default::default()
        });
        assert_eq!(fc.server.port, 4200);
    }
}
