//! Server address resolution and the persisted connection directory.
//!
//! A `ServerAddress` is whatever the user typed or scanned: either a bare host
//! (`10.0.0.5`, optionally `10.0.0.5:8080`) or a fully qualified URL
//! (`http://myserver.local`). Every network call derives the canonical
//! endpoint from it at call time, so changing the address takes effect on the
//! next request without any reconnect bookkeeping.

use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::socketio::ENGINE_IO_VERSION;

/// A scanned or typed payload that cannot be used as a server address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a usable server address: {payload:?}")]
pub struct InvalidAddress {
    pub payload: String,
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error(transparent)]
    Invalid(#[from] InvalidAddress),
    #[error("failed to persist server address: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode server address: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerAddress(String);

impl ServerAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    /// Accept a payload only if it is an `http(s)://` URL with a host.
    pub fn parse_url(payload: &str) -> Result<Self, InvalidAddress> {
        let trimmed = payload.trim();
        let invalid = || InvalidAddress {
            payload: payload.to_string(),
        };
        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(invalid());
        }
        let addr = Self(trimmed.to_string());
        Ok(Self(addr.qualified().ok_or_else(invalid)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the address already carries an `http(s)` scheme, in any case.
    pub fn is_qualified(&self) -> bool {
        self.qualified().is_some()
    }

    /// The address with its scheme lowercased, if it has one.
    fn qualified(&self) -> Option<String> {
        let (scheme, rest) = self.0.split_once("://")?;
        let scheme = scheme.to_ascii_lowercase();
        matches!(scheme.as_str(), "http" | "https").then(|| format!("{scheme}://{rest}"))
    }

    /// Canonical base URL for REST calls.
    ///
    /// Qualified addresses are returned unchanged; bare hosts become
    /// `http://<host>:<default_port>` unless they already name a port.
    pub fn endpoint(&self, default_port: u16) -> String {
        if let Some(url) = self.qualified() {
            return url;
        }
        if has_explicit_port(&self.0) {
            format!("http://{}", self.0)
        } else {
            format!("http://{}:{}", self.0, default_port)
        }
    }

    /// Socket.IO websocket URL (`ws(s)://host:port/socket.io/?EIO=4&transport=websocket`).
    pub fn realtime_url(&self, default_port: u16) -> Result<Url, InvalidAddress> {
        let invalid = || InvalidAddress {
            payload: self.0.clone(),
        };
        let mut url = Url::parse(&self.endpoint(default_port)).map_err(|_| invalid())?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| invalid())?;
        url.set_path("/socket.io/");
        url.set_query(Some(&format!("EIO={ENGINE_IO_VERSION}&transport=websocket")));
        Ok(url)
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn has_explicit_port(host: &str) -> bool {
    match host.rsplit_once(':') {
        Some((h, port)) => !h.is_empty() && !h.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// On-disk shape of the persisted address.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedServer {
    server_address: ServerAddress,
}

/// Owns the current server address and keeps it persisted across restarts.
#[derive(Debug)]
pub struct ConnectionDirectory {
    path: PathBuf,
    current: ServerAddress,
    default_port: u16,
}

impl ConnectionDirectory {
    /// Load the last persisted address, falling back to `default_address`
    /// when nothing was saved yet or the file is unreadable.
    pub fn load(path: impl Into<PathBuf>, default_address: &str, default_port: u16) -> Self {
        let path = path.into();
        let current = match read_persisted(&path) {
            Some(addr) => {
                info!("server address loaded from {}: {}", path.display(), addr);
                addr
            }
            None => ServerAddress::new(default_address),
        };
        Self {
            path,
            current,
            default_port,
        }
    }

    pub fn current(&self) -> &ServerAddress {
        &self.current
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    /// Canonical REST base for the current address.
    pub fn endpoint(&self) -> String {
        self.current.endpoint(self.default_port)
    }

    /// Replace the address with a manual entry and persist it.
    pub fn save(&mut self, addr: ServerAddress) -> Result<(), AddressError> {
        if addr.is_empty() {
            return Err(InvalidAddress {
                payload: String::new(),
            }
            .into());
        }
        self.current = addr;
        self.persist()
    }

    /// Accept a scanned payload if it is a URL; otherwise leave the address
    /// untouched and report `InvalidAddress`.
    pub fn set_from_scan(&mut self, payload: &str) -> Result<ServerAddress, AddressError> {
        let addr = ServerAddress::parse_url(payload)?;
        self.current = addr.clone();
        self.persist()?;
        Ok(addr)
    }

    fn persist(&self) -> Result<(), AddressError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(&PersistedServer {
            server_address: self.current.clone(),
        })?;
        std::fs::write(&self.path, content)?;
        debug!("server address persisted: {}", self.current);
        Ok(())
    }
}

fn read_persisted(path: &Path) -> Option<ServerAddress> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<PersistedServer>(&content) {
        Ok(p) if !p.server_address.is_empty() => Some(p.server_address),
        Ok(_) => None,
        Err(e) => {
            warn!("ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_scheme_and_default_port() {
        let addr = ServerAddress::new("10.0.0.5");
        assert_eq!(addr.endpoint(5000), "http://10.0.0.5:5000");
    }

    #[test]
    fn test_qualified_url_is_used_verbatim() {
        let addr = ServerAddress::new("http://myserver.local");
        assert_eq!(addr.endpoint(5000), "http://myserver.local");
        let again = ServerAddress::new(addr.endpoint(5000));
        assert_eq!(again.endpoint(5000), addr.endpoint(5000));
    }

    #[test]
    fn test_bare_host_with_port_keeps_its_port() {
        let addr = ServerAddress::new("10.0.0.5:8080");
        assert_eq!(addr.endpoint(5000), "http://10.0.0.5:8080");
    }

    #[test]
    fn test_uppercase_scheme_is_still_qualified() {
        let addr = ServerAddress::new("HTTPS://Echo.local:5001");
        assert!(addr.is_qualified());
        assert_eq!(addr.endpoint(5000), "https://Echo.local:5001");
        assert_eq!(
            addr.realtime_url(5000).unwrap().as_str(),
            "wss://echo.local:5001/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_scanned_uppercase_scheme_is_stored_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut directory = ConnectionDirectory::load(&path, "192.168.10.8", 5000);

        let addr = directory.set_from_scan("HTTP://10.0.0.9:5000").unwrap();
        assert_eq!(addr.as_str(), "http://10.0.0.9:5000");
        assert_eq!(directory.endpoint(), "http://10.0.0.9:5000");

        let reloaded = ConnectionDirectory::load(&path, "192.168.10.8", 5000);
        assert_eq!(reloaded.endpoint(), "http://10.0.0.9:5000");
    }

    #[test]
    fn test_realtime_url_switches_scheme() {
        let plain = ServerAddress::new("10.0.0.5").realtime_url(5000).unwrap();
        assert_eq!(
            plain.as_str(),
            "ws://10.0.0.5:5000/socket.io/?EIO=4&transport=websocket"
        );
        let tls = ServerAddress::new("https://echo.example.org")
            .realtime_url(5000)
            .unwrap();
        assert_eq!(tls.scheme(), "wss");
        assert_eq!(tls.path(), "/socket.io/");
    }

    #[test]
    fn test_parse_url_rejects_non_urls() {
        assert!(ServerAddress::parse_url("http://10.0.0.9:5000").is_ok());
        assert!(ServerAddress::parse_url("not-a-url").is_err());
        assert!(ServerAddress::parse_url("ftp://10.0.0.9").is_err());
        assert!(ServerAddress::parse_url("httpfoo").is_err());
    }

    #[test]
    fn test_directory_defaults_when_nothing_saved() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ConnectionDirectory::load(dir.path().join("server.toml"), "192.168.10.8", 5000);
        assert_eq!(directory.current().as_str(), "192.168.10.8");
        assert_eq!(directory.endpoint(), "http://192.168.10.8:5000");
    }

    #[test]
    fn test_scan_updates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut directory = ConnectionDirectory::load(&path, "192.168.10.8", 5000);

        let addr = directory.set_from_scan("http://10.0.0.9:5000").unwrap();
        assert_eq!(addr.as_str(), "http://10.0.0.9:5000");

        let reloaded = ConnectionDirectory::load(&path, "192.168.10.8", 5000);
        assert_eq!(reloaded.current().as_str(), "http://10.0.0.9:5000");
    }

    #[test]
    fn test_invalid_scan_leaves_address_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut directory = ConnectionDirectory::load(&path, "192.168.10.8", 5000);

        let err = directory.set_from_scan("not-a-url").unwrap_err();
        assert!(matches!(err, AddressError::Invalid(_)));
        assert_eq!(directory.current().as_str(), "192.168.10.8");
        assert!(!path.exists());
    }

    #[test]
    fn test_manual_save_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("server.toml");
        let mut directory = ConnectionDirectory::load(&path, "192.168.10.8", 5000);
        directory.save(ServerAddress::new("  10.0.0.7 ")).unwrap();

        let reloaded = ConnectionDirectory::load(&path, "192.168.10.8", 5000);
        assert_eq!(reloaded.current().as_str(), "10.0.0.7");
    }

    #[test]
    fn test_empty_manual_entry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut directory = ConnectionDirectory::load(dir.path().join("server.toml"), "192.168.10.8", 5000);
        assert!(directory.save(ServerAddress::new("   ")).is_err());
        assert_eq!(directory.current().as_str(), "192.168.10.8");
    }
}
