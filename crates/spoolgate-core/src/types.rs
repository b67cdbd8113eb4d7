// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Spoolgate print agent.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Document name announced to the spooler for every raw job.
pub const DEFAULT_DOCUMENT_NAME: &str = "Spoolgate Raw Job";

/// Spooler data type for untransformed byte streams.
pub const RAW_DATA_TYPE: &str = "RAW";

/// Prefix that marks a `\\host\share` network printer path.
const UNC_PREFIX: &str = r"\\";

/// Unique identifier for a print job, used for log correlation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One printer as reported by the OS printer directory.
///
/// Field names follow the `Get-Printer` property names so the structured
/// query output deserializes directly. PowerShell emits `null` for unset
/// strings, which is read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PrinterRecord {
    #[serde(rename = "Name", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "Shared", default, deserialize_with = "null_as_default")]
    pub is_shared: bool,
    #[serde(rename = "ComputerName", default, deserialize_with = "null_as_default")]
    pub host_name: String,
    #[serde(rename = "ShareName", default, deserialize_with = "null_as_default")]
    pub share_name: String,
    #[serde(rename = "WorkOffline", default, deserialize_with = "null_as_default")]
    pub is_working_offline: bool,
}

impl PrinterRecord {
    /// A plain local printer with no sharing information.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalized printer target: a bare local name or a `\\host\share` path.
///
/// Once built this string is passed through unchanged to the status probe
/// and the spooler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrinterIdentifier(String);

impl PrinterIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive the identifier for a directory record.
    pub fn from_record(record: &PrinterRecord) -> Self {
        if record.is_shared && !record.host_name.is_empty() && !record.share_name.is_empty() {
            Self(format!(r"\\{}\{}", record.host_name, record.share_name))
        } else {
            Self(record.name.clone())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Network printers are addressed by UNC path and skip local probing.
    pub fn is_unc(&self) -> bool {
        self.0.starts_with(UNC_PREFIX)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for PrinterIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrinterIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PrinterIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Live connectivity of a local printer. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfflineStatus {
    Online,
    Offline,
    NotFound,
}

/// A raw job for the duration of one submission.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: JobId,
    pub target: PrinterIdentifier,
    pub payload: Vec<u8>,
    pub document_name: String,
    pub data_type: &'static str,
}

impl PrintJob {
    pub fn new(target: PrinterIdentifier, payload: Vec<u8>) -> Self {
        Self {
            id: JobId::new(),
            target,
            payload,
            document_name: DEFAULT_DOCUMENT_NAME.into(),
            data_type: RAW_DATA_TYPE,
        }
    }

    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = name.into();
        self
    }
}
