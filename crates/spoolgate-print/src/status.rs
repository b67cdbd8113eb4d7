// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live online/offline probe for a single local printer.
//
// A failed status check must never block printing.  Anything short of a
// conclusive "offline" or "not found" answer resolves to online: an
// unexpected reply, a PowerShell failure followed by a WMIC failure, all of
// it.  UNC printers are never probed; the agent skips them.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use spoolgate_core::error::{Result, SpoolgateError};
use spoolgate_core::types::{OfflineStatus, PrinterIdentifier};

use crate::executor::QueryExecutor;

/// Printed by the probe script when `Get-Printer` cannot find the device.
const NOT_FOUND_SENTINEL: &str = "NOTFOUND";

/// One interpretation of the probe script's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeReading {
    Offline,
    Online,
    NotFound,
    /// Anything else; resolved to online by the prober.
    Inconclusive,
}

impl ProbeReading {
    pub fn parse(stdout: &str) -> Self {
        let text = stdout.trim().to_ascii_lowercase();
        match text.as_str() {
            "true" => Self::Offline,
            "false" => Self::Online,
            _ if text.contains(&NOT_FOUND_SENTINEL.to_ascii_lowercase()) => Self::NotFound,
            _ => Self::Inconclusive,
        }
    }
}

/// Quote a printer name for a PowerShell single-quoted string.
pub fn escape_powershell(name: &str) -> String {
    name.replace('\'', "''")
}

/// Quote a printer name for a WQL `Name='...'` clause.
pub fn escape_wql(name: &str) -> String {
    name.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Parse `wmic ... get WorkOffline /value` output.
pub fn parse_wmic_offline(stdout: &str) -> OfflineStatus {
    let offline = stdout
        .lines()
        .map(|line| line.trim().to_ascii_lowercase())
        .any(|line| line == "workoffline=true");
    if offline {
        OfflineStatus::Offline
    } else {
        OfflineStatus::Online
    }
}

/// Checks whether a local printer is working offline.
pub struct StatusProber {
    executor: Arc<dyn QueryExecutor>,
    powershell: String,
    wmic: String,
    timeout: Duration,
}

impl StatusProber {
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

    /// `Ok(true)` when offline, `Ok(false)` when online or undetermined,
    /// `DeviceNotFound` when the printer does not exist.
    pub async fn is_offline(&self, printer: &PrinterIdentifier) -> Result<bool> {
        match self.probe(printer).await {
            OfflineStatus::Offline => Ok(true),
            OfflineStatus::Online => Ok(false),
            OfflineStatus::NotFound => Err(SpoolgateError::DeviceNotFound(printer.to_string())),
        }
    }

    /// Resolve the current status, falling back to WMIC when PowerShell
    /// itself fails.
    pub async fn probe(&self, printer: &PrinterIdentifier) -> OfflineStatus {
        debug!(printer = %printer, "checking printer status");
        match self.query_primary(printer).await {
            Some(reading) => self.resolve(printer, reading),
            None => self.query_fallback(printer).await,
        }
    }

    fn resolve(&self, printer: &PrinterIdentifier, reading: ProbeReading) -> OfflineStatus {
        match reading {
            ProbeReading::Offline => {
                info!(printer = %printer, "printer offline");
                OfflineStatus::Offline
            }
            ProbeReading::Online => {
                debug!(printer = %printer, "printer online");
                OfflineStatus::Online
            }
            ProbeReading::NotFound => {
                warn!(printer = %printer, "printer not found");
                OfflineStatus::NotFound
            }
            ProbeReading::Inconclusive => {
                warn!(printer = %printer, "unrecognised printer status, assuming online");
                OfflineStatus::Online
            }
        }
    }

    /// `None` means the query tool itself failed.
    async fn query_primary(&self, printer: &PrinterIdentifier) -> Option<ProbeReading> {
        let script = format!(
            "try {{ $p = Get-Printer -Name '{}' -ErrorAction Stop; Write-Output $p.WorkOffline }} \
             catch {{ Write-Output '{NOT_FOUND_SENTINEL}' }}",
            escape_powershell(printer.as_str())
        );
        let args = [
            "-NoProfile".to_owned(),
            "-NonInteractive".to_owned(),
            "-ExecutionPolicy".to_owned(),
            "Bypass".to_owned(),
            "-Command".to_owned(),
            script,
        ];

        match self.executor.run(&self.powershell, &args, self.timeout).await {
            Ok(output) => {
                if !output.stderr.trim().is_empty() {
                    warn!(printer = %printer, stderr = output.stderr.trim(), "status query wrote to stderr");
                }
                Some(ProbeReading::parse(&output.stdout))
            }
            Err(e) => {
                warn!(printer = %printer, error = %e, "status query failed, trying WMIC");
                None
            }
        }
    }

    async fn query_fallback(&self, printer: &PrinterIdentifier) -> OfflineStatus {
        let args = [
            "printer".to_owned(),
            "where".to_owned(),
            format!("Name='{}'", escape_wql(printer.as_str())),
            "get".to_owned(),
            "WorkOffline".to_owned(),
            "/value".to_owned(),
        ];

        match self.executor.run(&self.wmic, &args, self.timeout).await {
            Ok(output) => {
                let status = parse_wmic_offline(&output.stdout);
                debug!(printer = %printer, ?status, "status resolved via WMIC");
                status
            }
            Err(e) => {
                warn!(printer = %printer, error = %e, "WMIC status query failed too, assuming online");
                OfflineStatus::Online
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedExecutor;

    fn prober(executor: Arc<ScriptedExecutor>) -> StatusProber {
        StatusProber::new(executor, "powershell", "wmic", Duration::from_secs(5))
    }

    fn printer() -> PrinterIdentifier {
        PrinterIdentifier::new("EPSON TM-T82")
    }

    #[test]
    fn reading_is_case_insensitive() {
        assert_eq!(ProbeReading::parse("True\r\n"), ProbeReading::Offline);
        assert_eq!(ProbeReading::parse(" FALSE "), ProbeReading::Online);
        assert_eq!(ProbeReading::parse("NotFound"), ProbeReading::NotFound);
        assert_eq!(ProbeReading::parse(""), ProbeReading::Inconclusive);
        assert_eq!(ProbeReading::parse("True\nFalse"), ProbeReading::Inconclusive);
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_powershell("Bob's Printer"), "Bob''s Printer");
        assert_eq!(escape_wql(r"Bob's \Printer"), r"Bob\'s \\Printer");
    }

    #[test]
    fn wmic_value_parsing() {
        assert_eq!(parse_wmic_offline("\r\r\nWorkOffline=TRUE\r\r\n"), OfflineStatus::Offline);
        assert_eq!(parse_wmic_offline("WorkOffline=FALSE"), OfflineStatus::Online);
        assert_eq!(parse_wmic_offline("No Instance(s) Available."), OfflineStatus::Online);
    }

    #[tokio::test]
    async fn offline_reply_is_offline() {
        let executor = Arc::new(ScriptedExecutor::new().reply_stdout("True\r\n"));
        assert!(prober(executor).is_offline(&printer()).await.expect("probe"));
    }

    #[tokio::test]
    async fn not_found_sentinel_is_an_error_not_online() {
        let executor = Arc::new(ScriptedExecutor::new().reply_stdout("NOTFOUND\r\n"));
        let err = prober(executor.clone())
            .is_offline(&printer())
            .await
            .expect_err("sentinel must surface");
        assert!(matches!(err, SpoolgateError::DeviceNotFound(name) if name == "EPSON TM-T82"));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn fail_open_on_unexpected_output() {
        let executor = Arc::new(ScriptedExecutor::new().reply_stdout("Access is denied."));
        assert!(!prober(executor.clone()).is_offline(&printer()).await.expect("probe"));
        // An answer from PowerShell, however odd, does not trigger WMIC.
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn fail_open_when_both_queries_fail() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .reply_failure("powershell")
                .reply_failure("wmic"),
        );
        assert!(!prober(executor.clone()).is_offline(&printer()).await.expect("fail-open"));
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn primary_failure_uses_wmic_answer() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .reply_timeout("powershell")
                .reply_stdout("WorkOffline=TRUE\r\n"),
        );
        assert!(prober(executor.clone()).is_offline(&printer()).await.expect("probe"));

        let calls = executor.calls();
        assert_eq!(calls[1].tool, "wmic");
        assert!(calls[1].args.contains(&"Name='EPSON TM-T82'".to_owned()));
    }

    #[tokio::test]
    async fn probe_script_embeds_escaped_name_with_short_timeout() {
        let executor = Arc::new(ScriptedExecutor::new().reply_stdout("False"));
        let name = PrinterIdentifier::new("Bob's Printer");
        prober(executor.clone()).is_offline(&name).await.expect("probe");

        let call = &executor.calls()[0];
        assert_eq!(call.timeout, Duration::from_secs(5));
        let script = call.args.last().expect("script arg");
        assert!(script.contains("-Name 'Bob''s Printer'"));
        assert!(script.contains("NOTFOUND"));
    }
}
