//! QR capture through an external command.
//!
//! Decoding is somebody else's job: the configured program (by default
//! `zbarcam --oneshot --raw`) opens the camera and prints the decoded payload.
//! The first non-empty stdout line is taken as the scan result.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use echo_proto::config::ScannerConfig;
use echo_proto::platform;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no scanner available")]
    Unavailable,
    #[error("scanner failed to run: {0}")]
    Io(#[from] std::io::Error),
    #[error("scanner exited without a payload")]
    NoPayload,
}

#[async_trait]
pub trait CodeScanner: Send + Sync {
    /// Whether a scan may start at all.
    fn permission(&self) -> bool;

    /// Capture one code and return its raw payload.
    async fn scan(&self) -> Result<String, ScanError>;
}

pub struct ExternalScanner {
    program: Option<PathBuf>,
    args: Vec<String>,
}

impl ExternalScanner {
    pub fn new(program: Option<PathBuf>, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        let program = platform::find_scanner_binary(&config.command);
        match &program {
            Some(p) => info!("scanner: {}", p.display()),
            None => info!("scanner {:?} not found; QR scan disabled", config.command),
        }
        Self::new(program, config.args.clone())
    }
}

#[async_trait]
impl CodeScanner for ExternalScanner {
    fn permission(&self) -> bool {
        self.program.is_some()
    }

    async fn scan(&self) -> Result<String, ScanError> {
        let program = self.program.as_ref().ok_or(ScanError::Unavailable)?;
        debug!("spawning {} {:?}", program.display(), self.args);
        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or(ScanError::NoPayload)?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                let _ = child.start_kill();
                return Ok(line.to_string());
            }
        }
        let _ = child.wait().await;
        Err(ScanError::NoPayload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_closes_the_gate() {
        let scanner = ExternalScanner::new(None, Vec::new());
        assert!(!scanner.permission());
    }

    #[tokio::test]
    async fn test_scan_without_program_is_unavailable() {
        let scanner = ExternalScanner::new(None, Vec::new());
        assert!(matches!(scanner.scan().await, Err(ScanError::Unavailable)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_first_non_empty_line_is_the_payload() {
        let scanner = ExternalScanner::new(
            Some(PathBuf::from("/bin/sh")),
            vec![
                "-c".into(),
                "echo; echo '  http://10.0.0.9:5000  '; echo ignored".into(),
            ],
        );
        assert_eq!(scanner.scan().await.unwrap(), "http://10.0.0.9:5000");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_program_yields_no_payload() {
        let scanner = ExternalScanner::new(
            Some(PathBuf::from("/bin/sh")),
            vec!["-c".into(), "exit 0".into()],
        );
        assert!(matches!(scanner.scan().await, Err(ScanError::NoPayload)));
    }
}
