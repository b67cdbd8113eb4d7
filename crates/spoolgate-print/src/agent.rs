// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print agent: the three core operations composed the way the HTTP layer
// needs them.  Holds only immutable configuration and shared backends, so a
// single instance serves concurrent requests without locking.

use std::sync::Arc;

use tracing::{info, warn};

use spoolgate_core::AgentConfig;
use spoolgate_core::error::{Result, SpoolgateError};
use spoolgate_core::types::{PrintJob, PrinterIdentifier};

use crate::directory::DirectoryResolver;
use crate::executor::{ProcessExecutor, QueryExecutor};
use crate::spooler::{SpoolerBackend, native_spooler};
use crate::status::StatusProber;
use crate::transmitter::RawTransmitter;

pub struct PrintAgent {
    directory: DirectoryResolver,
    prober: StatusProber,
    transmitter: Arc<RawTransmitter>,
    document_name: String,
}

impl PrintAgent {
    /// Agent backed by real OS processes and the platform spooler.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::with_backends(
            config,
            Arc::new(ProcessExecutor),
            Arc::from(native_spooler()),
        )
    }

    pub fn with_backends(
        config: &AgentConfig,
        executor: Arc<dyn QueryExecutor>,
        spooler: Arc<dyn SpoolerBackend>,
    ) -> Self {
        Self {
            directory: DirectoryResolver::new(
                Arc::clone(&executor),
                &config.powershell,
                &config.wmic,
                config.directory_timeout(),
            ),
            prober: StatusProber::new(
                executor,
                &config.powershell,
                &config.wmic,
                config.probe_timeout(),
            ),
            transmitter: Arc::new(RawTransmitter::new(spooler)),
            document_name: config.document_name.clone(),
        }
    }

    /// Printable targets right now.
    pub async fn list_printers(&self) -> Result<Vec<PrinterIdentifier>> {
        self.directory.list().await
    }

    /// Whether a local printer is working offline.
    pub async fn is_offline(&self, printer: &PrinterIdentifier) -> Result<bool> {
        self.prober.is_offline(printer).await
    }

    /// Build a job carrying the configured document name.
    pub fn job(&self, printer: PrinterIdentifier, payload: Vec<u8>) -> PrintJob {
        PrintJob::new(printer, payload).with_document_name(self.document_name.as_str())
    }

    /// Probe (local printers only) and transmit.
    ///
    /// Only a conclusive offline answer stops the job; a missing printer or
    /// an inconclusive probe lets the spooler have the final word.
    pub async fn submit(&self, job: PrintJob) -> Result<()> {
        if job.payload.is_empty() {
            return Err(SpoolgateError::InvalidInput("empty print data".into()));
        }

        if job.target.is_unc() {
            info!(job = %job.id, printer = %job.target, "skipping offline check for network printer");
        } else {
            match self.prober.is_offline(&job.target).await {
                Ok(true) => return Err(SpoolgateError::DeviceOffline(job.target.to_string())),
                Ok(false) => {}
                Err(e) => {
                    warn!(job = %job.id, printer = %job.target, error = %e, "cannot check printer status, continuing anyway");
                }
            }
        }

        info!(job = %job.id, printer = %job.target, bytes = job.payload.len(), "printing");
        let transmitter = Arc::clone(&self.transmitter);
        let printer = job.target.to_string();
        tokio::task::spawn_blocking(move || transmitter.send_job(&job))
            .await
            .map_err(|e| SpoolgateError::TaskAborted {
                printer,
                reason: e.to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedExecutor;
    use crate::spooler::SpoolHandle;
    use crate::transmitter::testing::{Call, FakeSpooler};

    fn agent(executor: Arc<ScriptedExecutor>, spooler: Arc<FakeSpooler>) -> PrintAgent {
        PrintAgent::with_backends(&AgentConfig::default(), executor, spooler)
    }

    #[tokio::test]
    async fn unc_target_is_printed_without_any_probe() {
        let executor = Arc::new(ScriptedExecutor::new());
        let spooler = Arc::new(FakeSpooler::new());
        let agent = agent(executor.clone(), spooler.clone());

        let job = agent.job(PrinterIdentifier::new(r"\\HOST\SHARE"), b"payload".to_vec());
        agent.submit(job).await.expect("submit");

        assert!(executor.calls().is_empty(), "no status query for UNC targets");
        assert_eq!(spooler.calls()[0], Call::Open(r"\\HOST\SHARE".into()));
    }

    #[tokio::test]
    async fn offline_local_printer_is_refused() {
        let executor = Arc::new(ScriptedExecutor::new().reply_stdout("True"));
        let spooler = Arc::new(FakeSpooler::new());
        let agent = agent(executor.clone(), spooler.clone());

        let job = agent.job(PrinterIdentifier::new("Zebra"), b"payload".to_vec());
        let err = agent.submit(job).await.expect_err("offline");

        assert!(matches!(err, SpoolgateError::DeviceOffline(_)));
        assert!(spooler.calls().is_empty());
    }

    #[tokio::test]
    async fn probe_failure_still_prints() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .reply_failure("powershell")
                .reply_failure("wmic"),
        );
        let spooler = Arc::new(FakeSpooler::new());
        let agent = agent(executor.clone(), spooler.clone());

        let job = agent.job(PrinterIdentifier::new("Zebra"), b"payload".to_vec());
        agent.submit(job).await.expect("fail-open");

        assert_eq!(executor.calls().len(), 2);
        assert_eq!(spooler.calls().last(), Some(&Call::Close));
    }

    #[tokio::test]
    async fn unknown_printer_is_left_to_the_spooler() {
        let executor = Arc::new(ScriptedExecutor::new().reply_stdout("NOTFOUND"));
        let spooler = Arc::new(FakeSpooler::new());
        let agent = agent(executor, spooler.clone());

        let job = agent.job(PrinterIdentifier::new("Ghost"), b"payload".to_vec());
        agent.submit(job).await.expect("spooler decides");
        assert_eq!(spooler.calls()[0], Call::Open("Ghost".into()));
    }

    #[tokio::test]
    async fn empty_payload_never_probes() {
        let executor = Arc::new(ScriptedExecutor::new());
        let spooler = Arc::new(FakeSpooler::new());
        let agent = agent(executor.clone(), spooler.clone());

        let job = agent.job(PrinterIdentifier::new("Zebra"), Vec::new());
        let err = agent.submit(job).await.expect_err("empty");
        assert!(matches!(err, SpoolgateError::InvalidInput(_)));
        assert!(executor.calls().is_empty());
        assert!(spooler.calls().is_empty());
    }

    /// Accepts every call except `write`, which panics.
    struct PanickingSpooler;

    impl SpoolerBackend for PanickingSpooler {
        fn open(&self, _: &str) -> std::io::Result<SpoolHandle> {
            Ok(SpoolHandle(1))
        }
        fn start_document(&self, _: SpoolHandle, _: &str, _: &str) -> std::io::Result<()> {
            Ok(())
        }
        fn start_page(&self, _: SpoolHandle) -> std::io::Result<()> {
            Ok(())
        }
        fn write(&self, _: SpoolHandle, _: &[u8]) -> std::io::Result<usize> {
            panic!("driver crashed");
        }
        fn end_page(&self, _: SpoolHandle) -> std::io::Result<()> {
            Ok(())
        }
        fn end_document(&self, _: SpoolHandle) -> std::io::Result<()> {
            Ok(())
        }
        fn close(&self, _: SpoolHandle) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn panicked_transmission_is_reported_as_aborted() {
        let agent = PrintAgent::with_backends(
            &AgentConfig::default(),
            Arc::new(ScriptedExecutor::new()),
            Arc::new(PanickingSpooler),
        );

        let job = agent.job(PrinterIdentifier::new(r"\\POS\Kitchen"), b"x".to_vec());
        let err = agent.submit(job).await.expect_err("panicked");

        match err {
            SpoolgateError::TaskAborted { printer, .. } => assert_eq!(printer, r"\\POS\Kitchen"),
            other => panic!("expected TaskAborted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn configured_document_name_is_used() {
        let config = AgentConfig {
            document_name: "Kitchen Ticket".into(),
            ..AgentConfig::default()
        };
        let spooler = Arc::new(FakeSpooler::new());
        let agent = PrintAgent::with_backends(&config, Arc::new(ScriptedExecutor::new()), spooler.clone());

        agent
            .submit(agent.job(PrinterIdentifier::new(r"\\POS\Kitchen"), b"x".to_vec()))
            .await
            .expect("submit");
        assert_eq!(
            spooler.calls()[1],
            Call::StartDocument {
                name: "Kitchen Ticket".into(),
                data_type: "RAW".into(),
            }
        );
    }
}
