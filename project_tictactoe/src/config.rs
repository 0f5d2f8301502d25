use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use engine_core::TickConfig;
use net::{ConnectionLimits, NetSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetSection {
    pub host: String,
    pub port: u16,
    /// Serve the HTTP status page on `port + 1`.
    pub status_page: bool,
    pub max_line_length: usize,
    pub send_retries: u32,
    pub write_queue: usize,
}

impl Default for NetSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 27015,
            status_page: true,
            max_line_length: 4096,
            send_retries: 10,
            write_queue: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub max_connections_total: usize,
    pub max_connections_per_ip: usize,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            max_connections_total: 1000,
            max_connections_per_ip: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickSection {
    pub poll_timeout_ms: u64,
    pub budget_us: u64,
}

impl Default for TickSection {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 10,
            budget_us: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LobbySection {
    pub count: u32,
}

impl Default for LobbySection {
    fn default() -> Self {
        Self { count: 3 }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetSection,
    pub security: SecuritySection,
    pub tick: TickSection,
    pub lobby: LobbySection,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path. A path that does
    /// not exist yields the defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_string(),
                    source,
                })?;
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_string(),
                    source,
                })?
            }
            Some(path) => {
                tracing::warn!(path, "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn game_addr(&self) -> String {
        format!("{}:{}", self.net.host, self.net.port)
    }

    /// Status page address, one port above the game port.
    pub fn status_addr(&self) -> Option<String> {
        let port = self.net.port.checked_add(1)?;
        Some(format!("{}:{}", self.net.host, port))
    }

    pub fn to_tick_config(&self) -> TickConfig {
        TickConfig {
            poll_timeout: Duration::from_millis(self.tick.poll_timeout_ms),
            budget_us: u128::from(self.tick.budget_us),
            max_ticks: 0,
        }
    }

    pub fn to_net_settings(&self) -> NetSettings {
        NetSettings {
            max_line_length: self.net.max_line_length,
            send_retries: self.net.send_retries,
            write_queue: self.net.write_queue,
            limits: ConnectionLimits {
                max_connections_total: self.security.max_connections_total,
                max_connections_per_ip: self.security.max_connections_per_ip,
            },
        }
    }
}

/// Command-line options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<String>,
    pub port: Option<u16>,
}

/// Supports: --config <path>, --port <n>
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let val = args.get(i + 1).ok_or("--config requires a path argument")?;
                cli.config_path = Some(val.clone());
                i += 2;
            }
            "--port" => {
                let val = args.get(i + 1).ok_or("--port requires a number")?;
                let port = val
                    .parse()
                    .map_err(|_| format!("invalid port: {}", val))?;
                cli.port = Some(port);
                i += 2;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(cli)
}

/// Parse CLI arguments and load config. Exits the process on error.
pub fn parse_cli_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut config = match ServerConfig::load(cli.config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = cli.port {
        config.net.port = port;
    }
    config
}
