use std::{env, fmt, fs, path};

use alivemon::{EngineConfig, MacAddr, PortRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFailed(std::io::Error),
    #[error("Failed to write config file: {0}")]
    WriteFailed(std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("No config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub database: DatabaseConfig,
    pub id_pool: IdPoolConfig,
    pub api: ApiConfig,
    pub interfaces: Vec<InterfaceConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: path::PathBuf,
    pub pool_size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IdPoolConfig {
    pub low: u32,
    pub high: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
    pub port: u16,
}

/// Static inventory entry for one interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub mac: Option<MacAddr>,
    pub dpn_id: Option<u64>,
    pub port_no: Option<u32>,
    pub lport_tag: Option<u32>,
}

impl InterfaceConfig {
    /// Switch port, when both halves are configured
    pub fn port(&self) -> Option<PortRef> {
        Some(PortRef { dpn_id: self.dpn_id?, port_no: self.port_no? })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "alivemon.db".into(), pool_size: 8 }
    }
}

impl Default for IdPoolConfig {
    fn default() -> Self {
        Self { low: 1, high: 65535 }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1".into(), port: 8181 }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/alivemon/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("alivemon/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Engine")?;
        write_1(f, "Lock Timeout (ms)", &self.engine.lock_timeout_ms)?;
        write_1(f, "Control Lock Timeout (ms)", &self.engine.control_lock_timeout_ms)?;
        write_1(f, "Tick Workers", &self.engine.tick_workers)?;
        write_1(f, "Packet Workers", &self.engine.packet_workers)?;
        write_1(f, "ARP Table", &self.engine.arp_table_id)?;
        write_1(f, "LLDP Sequence Wrap", &self.engine.lldp_sequence_wrap)?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path.display())?;
        write_1(f, "Pool Size", &self.database.pool_size)?;
        write_title_1(f, "ID Pool")?;
        write_1(f, "Range", &format!("{}..={}", self.id_pool.low, self.id_pool.high))?;
        write_title_1(f, "API")?;
        write_1(f, "Bind Address", &self.api.bind)?;
        write_1(f, "Port", &self.api.port)?;
        write_title_1(f, "Interfaces")?;
        for interface in &self.interfaces {
            let mac = interface.mac.map(|mac| mac.to_string()).unwrap_or_else(|| "-".into());
            let port = interface.port().map(|port| port.to_string()).unwrap_or_else(|| "-".into());
            write_1(f, &interface.name, &format!("mac {mac}, port {port}"))?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/alivemon/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(Error::WriteFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.api.port, 8181);
        assert!(dir.path().join("nested/config.toml").exists());

        let reloaded = Config::from_config(Some(&path)).unwrap();
        assert_eq!(reloaded.engine, config.engine);
    }

    #[test]
    fn test_partial_file_with_interfaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [engine]
            lock_timeout_ms = 100

            [[interfaces]]
            name = "tap0"
            mac = "02:00:00:00:00:01"
            dpn_id = 1
            port_no = 3
            lport_tag = 42

            [[interfaces]]
            name = "tap1"
            "#,
        )
        .unwrap();

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.engine.lock_timeout_ms, 100);
        assert_eq!(config.engine.tick_workers, EngineConfig::default().tick_workers);
        assert_eq!(config.interfaces.len(), 2);
        assert_eq!(config.interfaces[0].port(), Some(PortRef { dpn_id: 1, port_no: 3 }));
        assert_eq!(config.interfaces[1].port(), None);
    }

    #[test]
    fn test_invalid_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\nport = \"not a port\"").unwrap();

        assert!(matches!(Config::from_config(Some(&path)), Err(Error::ParseFailed(_))));
    }
}
