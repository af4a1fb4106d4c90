//! Server configuration
//!
//! Settings come from built-in defaults, then an optional JSON file named by
//! `LAPLINE_CONFIG`, then individual environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Names a JSON config file to read
pub const CONFIG_ENV: &str = "LAPLINE_CONFIG";
/// Overrides [`ServerConfig::telemetry_file`]
pub const TELEMETRY_FILE_ENV: &str = "LAPLINE_TELEMETRY_FILE";
/// Overrides [`ServerConfig::host`]
pub const HOST_ENV: &str = "LAPLINE_HOST";
/// Overrides [`ServerConfig::port`]
pub const PORT_ENV: &str = "LAPLINE_PORT";

/// Where to read telemetry and where to listen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Long-format telemetry CSV to serve
    pub telemetry_file: PathBuf,
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            telemetry_file: PathBuf::from("data/telemetry.csv"),
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(file) = lookup(TELEMETRY_FILE_ENV) {
            config.telemetry_file = PathBuf::from(file);
        }
        if let Some(host) = lookup(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {PORT_ENV} value '{port}'"))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve(lookup_from(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lapline.json");
        std::fs::write(&path, r#"{"telemetry_file": "/srv/R2.csv"}"#).unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.telemetry_file, PathBuf::from("/srv/R2.csv"));
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lapline.json");
        std::fs::write(&path, r#"{"host": "127.0.0.1", "port": 9000}"#).unwrap();
        let path = path.to_string_lossy().into_owned();

        let config = ServerConfig::resolve(lookup_from(&[
            (CONFIG_ENV, path.as_str()),
            (PORT_ENV, "9100"),
        ]))
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_bad_port_is_error() {
        let err = ServerConfig::resolve(lookup_from(&[(PORT_ENV, "eighty")])).unwrap_err();
        assert!(err.to_string().contains(PORT_ENV));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let lookup = lookup_from(&[(CONFIG_ENV, "/nonexistent/lapline.json")]);
        assert!(ServerConfig::resolve(lookup).is_err());
    }
}
