// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Spoolgate.

use std::fmt;

use thiserror::Error;

/// The native spooler call that was in flight when a transmission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoolStep {
    Open,
    StartDocument,
    StartPage,
    Write,
}

impl fmt::Display for SpoolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "OpenPrinter",
            Self::StartDocument => "StartDocPrinter",
            Self::StartPage => "StartPagePrinter",
            Self::Write => "WritePrinter",
        };
        f.write_str(name)
    }
}

/// Top-level error type for all Spoolgate operations.
#[derive(Debug, Error)]
pub enum SpoolgateError {
    // -- Discovery / status --
    #[error("printer directory unavailable: {0}")]
    DiscoveryUnavailable(String),

    #[error("printer not found: {0}")]
    DeviceNotFound(String),

    #[error("printer is offline: {0}")]
    DeviceOffline(String),

    // -- Transmission --
    #[error("{step} failed for {printer}: {source}")]
    Transmission {
        printer: String,
        step: SpoolStep,
        #[source]
        source: std::io::Error,
    },

    #[error("incomplete write to {printer}: wrote {written} of {expected} bytes")]
    ShortWrite {
        printer: String,
        written: usize,
        expected: usize,
    },

    #[error("print task for {printer} aborted before completing: {reason}")]
    TaskAborted { printer: String, reason: String },

    // -- Input --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SpoolgateError {
    /// Whether this error came out of the native spooler protocol.
    pub fn is_transmission_failure(&self) -> bool {
        matches!(self, Self::Transmission { .. } | Self::ShortWrite { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpoolgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmission_message_names_the_native_call() {
        let err = SpoolgateError::Transmission {
            printer: "Zebra".into(),
            step: SpoolStep::StartPage,
            source: std::io::Error::other("access denied"),
        };
        assert_eq!(
            err.to_string(),
            "StartPagePrinter failed for Zebra: access denied"
        );
        assert!(err.is_transmission_failure());
    }

    #[test]
    fn short_write_is_a_transmission_failure() {
        let err = SpoolgateError::ShortWrite {
            printer: "Zebra".into(),
            written: 3,
            expected: 10,
        };
        assert!(err.is_transmission_failure());
        assert!(err.to_string().contains("wrote 3 of 10"));
        assert!(!SpoolgateError::InvalidInput("x".into()).is_transmission_failure());
    }

    #[test]
    fn aborted_task_does_not_blame_a_native_call() {
        let err = SpoolgateError::TaskAborted {
            printer: "Zebra".into(),
            reason: "task panicked".into(),
        };
        assert!(!err.is_transmission_failure());
        assert!(!err.to_string().contains("WritePrinter"));
    }
}
