use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address used until one has been saved or scanned.
    #[serde(default = "default_address")]
    pub default_address: String,
    /// Port appended to bare-host addresses.
    #[serde(default = "default_port")]
    pub default_port: u16,
}

/// External QR capture command. Its first non-empty stdout line is the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_scanner_command")]
    pub command: String,
    #[serde(default = "default_scanner_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiConfig {
    /// Show chords instead of lyrics when a song opens.
    #[serde(default)]
    pub musician_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where the last-used server address is persisted.
    #[serde(default = "default_server_state_file")]
    pub server_state_file: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_address: default_address(),
            default_port: default_port(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: default_scanner_command(),
            args: default_scanner_args(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            server_state_file: default_server_state_file(),
            log_file: default_log_file(),
        }
    }
}

fn default_address() -> String {
    platform::DEFAULT_SERVER_HOST.to_string()
}

fn default_port() -> u16 {
    platform::DEFAULT_SERVER_PORT
}

fn default_scanner_command() -> String {
    "zbarcam".to_string()
}

fn default_scanner_args() -> Vec<String> {
    vec!["--oneshot".to_string(), "--raw".to_string()]
}

fn default_server_state_file() -> PathBuf {
    platform::server_state_file()
}

fn default_log_file() -> PathBuf {
    platform::data_dir().join("echo.log")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.default_port, 5000);
        assert_eq!(config.server.default_address, "192.168.10.8");
        assert_eq!(config.scanner.command, "zbarcam");
        assert!(!config.ui.musician_mode);
        assert!(config.paths.server_state_file.ends_with("echo/server.toml"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            default_address = "10.1.1.1"

            [ui]
            musician_mode = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.default_address, "10.1.1.1");
        assert_eq!(config.server.default_port, 5000);
        assert!(config.ui.musician_mode);
        assert_eq!(config.scanner.args, vec!["--oneshot", "--raw"]);
    }
}
