// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoolgateError};

/// Runtime settings for the print agent.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Address the HTTP API binds to.
    pub listen_addr: String,
    /// Largest accepted print payload in bytes (default 10 MiB).
    pub max_payload_bytes: usize,
    /// Timeout for a full printer directory query.
    pub directory_timeout_secs: u64,
    /// Timeout for a single-printer status probe.
    pub probe_timeout_secs: u64,
    /// Grace period for in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Log file appended to alongside stdout.
    pub log_file: PathBuf,
    /// Structured query tool.
    pub powershell: String,
    /// Legacy tabular query tool.
    pub wmic: String,
    /// Document name shown in the spooler queue.
    pub document_name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8081".into(),
            max_payload_bytes: 10 * 1024 * 1024,
            directory_timeout_secs: 15,
            probe_timeout_secs: 5,
            shutdown_timeout_secs: 10,
            log_file: PathBuf::from("spoolgate.log"),
            powershell: "powershell".into(),
            wmic: "wmic".into(),
            document_name: crate::types::DEFAULT_DOCUMENT_NAME.into(),
        }
    }
}

impl AgentConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.max_payload_bytes == 0 {
            return Err(SpoolgateError::Config("max_payload_bytes must be non-zero".into()));
        }
        if self.directory_timeout_secs == 0 || self.probe_timeout_secs == 0 {
            return Err(SpoolgateError::Config("query timeouts must be non-zero".into()));
        }
        if self.powershell.trim().is_empty() || self.wmic.trim().is_empty() {
            return Err(SpoolgateError::Config("query tool names must not be empty".into()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| SpoolgateError::Config(format!("listen_addr {:?}: {e}", self.listen_addr)))
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AgentConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.max_payload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.directory_timeout(), Duration::from_secs(15));
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"listen_addr":"0.0.0.0:9000","probe_timeout_secs":2}}"#).expect("write");

        let config = AgentConfig::load(file.path()).expect("load");
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.probe_timeout_secs, 2);
        assert_eq!(config.directory_timeout_secs, 15);
        assert_eq!(config.powershell, "powershell");
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = AgentConfig {
            probe_timeout_secs: 0,
            ..AgentConfig::default()
        };
        assert!(matches!(config.validate(), Err(SpoolgateError::Config(_))));
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let config = AgentConfig {
            listen_addr: "localhost".into(),
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_is_a_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        assert!(matches!(
            AgentConfig::load(file.path()),
            Err(SpoolgateError::Serialization(_))
        ));
    }
}
