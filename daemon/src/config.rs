//! Bridge configuration, loaded once at startup from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub machine: MachineSection,
    #[serde(default)]
    pub server: ServerSection,
    pub general: GeneralSection,
    #[serde(default)]
    pub mes_files: MesSection,
    #[serde(default)]
    pub watcher: WatcherSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Which machines to bring up.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineSection {
    #[serde(default = "default_true")]
    pub bhx: bool,
}

impl Default for MachineSection {
    fn default() -> Self {
        Self { bhx: true }
    }
}

/// Endpoint the protocol server binds.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_ip")]
    pub ip_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            ip_address: default_server_ip(),
            port: default_server_port(),
        }
    }
}

/// BHX connection and log location.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSection {
    /// Machine address for program-load commands.
    pub ip_address: String,
    pub port: u16,
    pub bhx_logfolder: PathBuf,
    pub bhx_logfile: String,
    /// Width of the space-padded program field in a command.
    pub tcp_string_length: usize,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl GeneralSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Full path of the watched log file.
    pub fn logfile_path(&self) -> PathBuf {
        self.bhx_logfolder.join(&self.bhx_logfile)
    }
}

/// MES handoff files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MesSection {
    #[serde(default)]
    pub write_mes_files: bool,
    #[serde(default)]
    pub mes_input_folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatcherSection {
    /// How often the watcher loop checks for cancellation.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WatcherSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Default tracing directive, e.g. `info` or `bhxd=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_server_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    4840
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_write_timeout_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BridgeConfig {
    /// Default location: `<config dir>/bhx-bridge/bridge.toml`.
    pub fn default_path() -> Result<PathBuf, Error> {
        let dir = dirs::config_dir().ok_or(Error::NoConfigDir)?;
        Ok(dir.join("bhx-bridge").join("bridge.toml"))
    }

    /// Load from `path`, or from [`BridgeConfig::default_path`] if `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if !path.exists() {
            return Err(Error::ConfigNotFound(path));
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.general.tcp_string_length == 0 {
            return Err(Error::ConfigParse(
                "general.tcp_string_length must be greater than 0".to_string(),
            ));
        }
        if self.general.bhx_logfile.is_empty() {
            return Err(Error::ConfigParse(
                "general.bhx_logfile must not be empty".to_string(),
            ));
        }
        if self.mes_files.write_mes_files && self.mes_files.mes_input_folder.as_os_str().is_empty()
        {
            return Err(Error::ConfigParse(
                "mes_files.mes_input_folder is required when write_mes_files is set".to_string(),
            ));
        }
        Ok(())
    }
}
