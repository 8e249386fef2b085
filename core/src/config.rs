// core/src/config.rs
use crate::rpc::PROTOCOL_VERSION;
use crate::version::Version;
use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

/// Abstract socket name the daemon listens on.
pub const DEFAULT_SOCKET_NAME: &str = "mbtool.daemon";

/// Oldest daemon that provides the core operations.
pub const DEFAULT_MINIMUM_VERSION: Version = Version::new(9, 3, 0);

/// Where the daemon's socket lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketAddress {
    /// Linux abstract namespace name (no leading NUL).
    Abstract(String),
    Path(PathBuf),
}

/// Everything the handshake needs, passed explicitly at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub address: SocketAddress,
    pub protocol_version: i32,
    pub minimum_version: Version,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: SocketAddress::Abstract(DEFAULT_SOCKET_NAME.to_string()),
            protocol_version: PROTOCOL_VERSION,
            minimum_version: DEFAULT_MINIMUM_VERSION,
        }
    }
}

/// On-disk client configuration (JSON).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ClientConfig {
    #[serde(rename = "sock-name")]
    pub sock_name: Option<String>,
    #[serde(rename = "sock-path")] // Takes precedence over sock-name
    pub sock_path: Option<String>,
    #[serde(rename = "protocol-version")]
    pub protocol_version: Option<i32>,
    #[serde(rename = "minimum-version")]
    pub minimum_version: Option<String>,
    #[serde(rename = "bug-level")]
    pub bug_level: Option<String>,
    #[serde(rename = "log-path")]
    pub log_path: Option<String>,
    /// Command that reinstalls and relaunches the daemon.
    #[serde(rename = "replace-command")]
    pub replace_command: Option<String>,
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads `path` if given, else `default.json` in the current directory
    /// when it exists, else the built-in defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow!("Config file not found at {}", path.display()));
                }
                Self::load(path)
            }
            None => {
                let current_dir =
                    std::env::current_dir().context("Failed to get current directory")?;
                let candidate = current_dir.join("default.json");
                if candidate.exists() {
                    Self::load(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let address = match (&self.sock_path, &self.sock_name) {
            (Some(path), _) => SocketAddress::Path(PathBuf::from(path)),
            (None, Some(name)) => SocketAddress::Abstract(name.clone()),
            (None, None) => SocketAddress::Abstract(DEFAULT_SOCKET_NAME.to_string()),
        };
        let minimum_version = match &self.minimum_version {
            Some(text) => text
                .parse()
                .with_context(|| format!("Invalid minimum-version '{}'", text))?,
            None => DEFAULT_MINIMUM_VERSION,
        };
        Ok(ConnectionConfig {
            address,
            protocol_version: self.protocol_version.unwrap_or(PROTOCOL_VERSION),
            minimum_version,
        })
    }

    pub fn log_level(&self) -> LevelFilter {
        crate::utils::logging::parse_level(self.bug_level.as_deref().unwrap_or("info"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_point_at_the_abstract_socket() -> Result<()> {
        let config = ClientConfig::default().connection_config()?;
        assert_eq!(config, ConnectionConfig::default());
        assert_eq!(
            config.address,
            SocketAddress::Abstract("mbtool.daemon".to_string())
        );
        assert_eq!(config.protocol_version, 3);
        Ok(())
    }

    #[test]
    fn file_overrides_defaults() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"sock-path": "/tmp/mb.sock", "minimum-version": "10.0.0-rc2", "bug-level": "debug"}}"#
        )?;
        let config = ClientConfig::load(file.path())?;
        assert_eq!(config.log_level(), LevelFilter::Debug);

        let connection = config.connection_config()?;
        assert_eq!(
            connection.address,
            SocketAddress::Path(PathBuf::from("/tmp/mb.sock"))
        );
        assert_eq!(connection.minimum_version, Version::pre_release(10, 0, 0, 2));
        Ok(())
    }

    #[test]
    fn bad_minimum_version_is_reported() {
        let config = ClientConfig {
            minimum_version: Some("nine".to_string()),
            ..Default::default()
        };
        assert!(config.connection_config().is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(ClientConfig::discover(Some(Path::new("/nonexistent/mbclient.json"))).is_err());
    }
}
