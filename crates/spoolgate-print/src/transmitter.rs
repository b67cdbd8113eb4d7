// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw job transmission through the native spooler.
//
// One send walks Closed -> Opened -> DocumentStarted -> PageStarted ->
// written -> PageEnded -> DocumentEnded -> Closed.  Each acquisition is held
// by a guard that releases it on drop, so whatever step fails, everything
// acquired so far is released in reverse order before the error returns.
// No timeout, no cancellation, no retry.

use std::sync::Arc;

use tracing::{debug, info, warn};

use spoolgate_core::error::{Result, SpoolStep, SpoolgateError};
use spoolgate_core::types::{DEFAULT_DOCUMENT_NAME, PrintJob, PrinterIdentifier, RAW_DATA_TYPE};

use crate::spooler::{SpoolHandle, SpoolerBackend};

/// Sends byte payloads to a printer as RAW spooler jobs.
pub struct RawTransmitter {
    backend: Arc<dyn SpoolerBackend>,
}

impl RawTransmitter {
    pub fn new(backend: Arc<dyn SpoolerBackend>) -> Self {
        Self { backend }
    }

    /// Send `payload` under the default document name.
    pub fn send(&self, printer: &PrinterIdentifier, payload: &[u8]) -> Result<()> {
        self.transmit(printer, payload, DEFAULT_DOCUMENT_NAME, RAW_DATA_TYPE)
    }

    /// Send a prepared job.
    pub fn send_job(&self, job: &PrintJob) -> Result<()> {
        debug!(job = %job.id, printer = %job.target, "transmitting job");
        self.transmit(&job.target, &job.payload, &job.document_name, job.data_type)
    }

    fn transmit(
        &self,
        printer: &PrinterIdentifier,
        payload: &[u8],
        document_name: &str,
        data_type: &str,
    ) -> Result<()> {
        if printer.is_empty() {
            return Err(SpoolgateError::InvalidInput("empty printer name".into()));
        }
        if payload.is_empty() {
            return Err(SpoolgateError::InvalidInput("empty print data".into()));
        }

        let name = printer.as_str();
        let fail = |step: SpoolStep| {
            move |source: std::io::Error| SpoolgateError::Transmission {
                printer: name.to_owned(),
                step,
                source,
            }
        };

        // Guards drop in reverse declaration order: page, document, handle.
        let opened = OpenPrinter::open(self.backend.as_ref(), name).map_err(fail(SpoolStep::Open))?;
        let document = opened
            .start_document(document_name, data_type)
            .map_err(fail(SpoolStep::StartDocument))?;
        let page = document.start_page().map_err(fail(SpoolStep::StartPage))?;

        let written = page.write(payload).map_err(fail(SpoolStep::Write))?;
        if written != payload.len() {
            return Err(SpoolgateError::ShortWrite {
                printer: name.to_owned(),
                written,
                expected: payload.len(),
            });
        }

        drop(page);
        drop(document);
        drop(opened);

        info!(printer = name, bytes = payload.len(), "raw job spooled");
        Ok(())
    }
}

/// Open printer handle; closed on drop.
struct OpenPrinter<'a> {
    backend: &'a dyn SpoolerBackend,
    handle: SpoolHandle,
    printer: &'a str,
}

impl<'a> OpenPrinter<'a> {
    fn open(backend: &'a dyn SpoolerBackend, printer: &'a str) -> std::io::Result<Self> {
        let handle = backend.open(printer)?;
        Ok(Self {
            backend,
            handle,
            printer,
        })
    }

    fn start_document(&self, document_name: &str, data_type: &str) -> std::io::Result<OpenDocument<'_>> {
        self.backend
            .start_document(self.handle, document_name, data_type)?;
        Ok(OpenDocument { printer: self })
    }
}

impl Drop for OpenPrinter<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.close(self.handle) {
            warn!(printer = self.printer, error = %e, "ClosePrinter failed");
        }
    }
}

/// Started document; ended on drop.
struct OpenDocument<'a> {
    printer: &'a OpenPrinter<'a>,
}

impl OpenDocument<'_> {
    fn start_page(&self) -> std::io::Result<OpenPage<'_>> {
        self.printer.backend.start_page(self.printer.handle)?;
        Ok(OpenPage { document: self })
    }
}

impl Drop for OpenDocument<'_> {
    fn drop(&mut self) {
        let printer = self.printer;
        if let Err(e) = printer.backend.end_document(printer.handle) {
            warn!(printer = printer.printer, error = %e, "EndDocPrinter failed");
        }
    }
}

/// Started page; ended on drop.
struct OpenPage<'a> {
    document: &'a OpenDocument<'a>,
}

impl OpenPage<'_> {
    fn write(&self, data: &[u8]) -> std::io::Result<usize> {
        let printer = self.document.printer;
        printer.backend.write(printer.handle, data)
    }
}

impl Drop for OpenPage<'_> {
    fn drop(&mut self) {
        let printer = self.document.printer;
        if let Err(e) = printer.backend.end_page(printer.handle) {
            warn!(printer = printer.printer, error = %e, "EndPagePrinter failed");
        }
    }
}
