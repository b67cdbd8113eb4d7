// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer directory: which printers can take a raw job right now.
//
// The primary source is PowerShell `Get-Printer` serialized as JSON.  When it
// fails, times out, prints nothing, or prints something we cannot parse, the
// legacy `wmic ... /format:csv` listing is used instead.  Both sources feed
// the same filter: virtual printers (PDF, XPS, fax, ...) are dropped unless
// shared, offline printers are dropped, and shared printers are addressed by
// their UNC path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use spoolgate_core::error::{Result, SpoolgateError};
use spoolgate_core::types::{PrinterIdentifier, PrinterRecord};

use crate::executor::{QueryError, QueryExecutor};

/// Name fragments of software printers that cannot take raw jobs.
const VIRTUAL_PRINTER_KEYWORDS: &[&str] = &[
    "pdf",
    "xps",
    "onenote",
    "fax",
    "writer",
    "send to",
    "microsoft print",
];

const LIST_SCRIPT: &str =
    "Get-Printer | Select Name,Shared,ComputerName,ShareName,WorkOffline | ConvertTo-Json -Depth 2";

/// Minimum CSV fields for a usable row (`Node,Name`).
const MIN_CSV_FIELDS: usize = 2;

/// Why the structured query was abandoned for the tabular one.
#[derive(Debug)]
enum FallbackCause {
    Query(QueryError),
    EmptyOutput,
    Unparsable(serde_json::Error),
}

/// Lists printable targets through the OS query tools.
pub struct DirectoryResolver {
    executor: Arc<dyn QueryExecutor>,
    powershell: String,
    wmic: String,
    timeout: Duration,
}

impl DirectoryResolver {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        powershell: impl Into<String>,
        wmic: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            powershell: powershell.into(),
            wmic: wmic.into(),
            timeout,
        }
    }

    /// Enumerate printable targets, in the order the OS reports them.
    ///
    /// Only a failure of the fallback query is reported; everything before
    /// it is absorbed.
    pub async fn list(&self) -> Result<Vec<PrinterIdentifier>> {
        let records = match self.query_primary().await {
            Ok(records) => records,
            Err(cause) => {
                match &cause {
                    FallbackCause::Query(e) if e.is_timeout() => {
                        warn!(error = %e, "printer query timed out, falling back to WMIC")
                    }
                    FallbackCause::Query(e) => {
                        warn!(error = %e, "printer query failed, falling back to WMIC")
                    }
                    FallbackCause::EmptyOutput => {
                        warn!("printer query returned nothing, falling back to WMIC")
                    }
                    FallbackCause::Unparsable(e) => {
                        warn!(error = %e, "cannot parse printer query output, falling back to WMIC")
                    }
                }
                self.query_fallback().await?
            }
        };

        let printers = normalize(&records);
        debug!(
            discovered = records.len(),
            printable = printers.len(),
            "printer directory resolved"
        );
        Ok(printers)
    }

    async fn query_primary(&self) -> std::result::Result<Vec<PrinterRecord>, FallbackCause> {
        let args = [
            "-NoProfile".to_owned(),
            "-NonInteractive".to_owned(),
            "-Command".to_owned(),
            LIST_SCRIPT.to_owned(),
        ];
        let output = self
            .executor
            .run(&self.powershell, &args, self.timeout)
            .await
            .map_err(FallbackCause::Query)?;

        if output.stdout.trim().is_empty() {
            return Err(FallbackCause::EmptyOutput);
        }
        parse_structured(&output.stdout).map_err(FallbackCause::Unparsable)
    }

    async fn query_fallback(&self) -> Result<Vec<PrinterRecord>> {
        let args = [
            "printer".to_owned(),
            "get".to_owned(),
            "Name,ServerName,ShareName,Shared,WorkOffline".to_owned(),
            "/format:csv".to_owned(),
        ];
        let output = self
            .executor
            .run(&self.wmic, &args, self.timeout)
            .await
            .map_err(|e| SpoolgateError::DiscoveryUnavailable(e.to_string()))?;
        Ok(parse_tabular(&output.stdout))
    }
}

/// Parse `ConvertTo-Json` output: an array, a lone object, or `null`.
pub fn parse_structured(text: &str) -> std::result::Result<Vec<PrinterRecord>, serde_json::Error> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<PrinterRecord>),
        One(PrinterRecord),
    }

    let parsed: Option<OneOrMany> = serde_json::from_str(text.trim())?;
    Ok(match parsed {
        None => Vec::new(),
        Some(OneOrMany::Many(records)) => records,
        Some(OneOrMany::One(record)) => vec![record],
    })
}

/// Column positions in a WMIC CSV listing.
#[derive(Debug, Clone, Copy)]
struct CsvColumns {
    name: usize,
    server: Option<usize>,
    share: Option<usize>,
    shared: Option<usize>,
    offline: Option<usize>,
}

impl CsvColumns {
    /// `Node,Name,WorkOffline`, used when no header row is seen.
    const LEGACY: Self = Self {
        name: 1,
        server: None,
        share: None,
        shared: None,
        offline: Some(2),
    };

    fn from_header(fields: &[&str]) -> Self {
        let find = |column: &str| fields.iter().position(|f| f.eq_ignore_ascii_case(column));
        Self {
            name: find("Name").unwrap_or(Self::LEGACY.name),
            server: find("ServerName"),
            share: find("ShareName"),
            shared: find("Shared"),
            offline: find("WorkOffline"),
        }
    }
}

/// Parse `wmic printer get ... /format:csv` output.
///
/// Blank lines and anything before the `Node,...` header are skipped; rows
/// that are too short or have no name are dropped without error.
pub fn parse_tabular(text: &str) -> Vec<PrinterRecord> {
    let mut columns: Option<CsvColumns> = None;
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields[0].eq_ignore_ascii_case("node") {
            columns = Some(CsvColumns::from_header(&fields));
            continue;
        }
        // First non-blank line without a header is a banner.
        if columns.is_none() && index == 0 {
            continue;
        }
        if fields.len() < MIN_CSV_FIELDS {
            continue;
        }

        let cols = columns.unwrap_or(CsvColumns::LEGACY);
        let cell = |at: Option<usize>| at.and_then(|i| fields.get(i)).copied().unwrap_or("");
        let flag = |at: Option<usize>| cell(at).eq_ignore_ascii_case("true");

        let name = cell(Some(cols.name));
        if name.is_empty() {
            continue;
        }

        records.push(PrinterRecord {
            name: name.to_owned(),
            is_shared: flag(cols.shared),
            host_name: cell(cols.server).trim_start_matches('\\').to_owned(),
            share_name: cell(cols.share).to_owned(),
            is_working_offline: flag(cols.offline),
        });
    }

    records
}

/// Whether a lowercased printer name looks like a software printer.
pub fn is_virtual_printer(name_lower: &str) -> bool {
    VIRTUAL_PRINTER_KEYWORDS
        .iter()
        .any(|keyword| name_lower.contains(keyword))
}

/// Apply the printable-target filter and derive identifiers.
pub fn normalize(records: &[PrinterRecord]) -> Vec<PrinterIdentifier> {
    records
        .iter()
        .filter(|record| {
            if record.name.is_empty() {
                return false;
            }
            if !record.is_shared && is_virtual_printer(&record.name.to_lowercase()) {
                debug!(printer = %record.name, "skipping virtual printer");
                return false;
            }
            if record.is_working_offline {
                info!(printer = %record.name, "skipping offline printer");
                return false;
            }
            true
        })
        .map(PrinterIdentifier::from_record)
        .collect()
}
