use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Name of the shared namespace used when a request names none.
    pub default_namespace: String,
    pub max_request_body_bytes: usize,
    /// Upper bound for a whole remote URL fetch.
    pub fetch_timeout_secs: u64,
}

impl ServerConfig {
    /// Reads a TOML file; keys it leaves out keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_namespace.is_empty() {
            return Err(Error::Config("default_namespace cannot be empty".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("filekeep.db")
    }

    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join(".admin_token")
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            default_namespace: "default".to_string(),
            max_request_body_bytes: 64 * 1024 * 1024,
            fetch_timeout_secs: 30,
        }
    }
}
