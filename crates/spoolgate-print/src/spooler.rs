// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native print spooler backends.
//
// `SpoolerBackend` is the seam between the raw transmitter's state machine
// and the OS.  On Windows it is the winspool API; elsewhere every call fails
// with `Unsupported`, which keeps the rest of the workspace buildable and
// testable with a fake backend.

use std::io;

/// Opaque handle to one open printer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpoolHandle(pub usize);

/// The document/page/write protocol of a print spooler.
///
/// Calls must be paired: every successful `open` is followed by `close`,
/// every `start_document` by `end_document`, every `start_page` by
/// `end_page`.  The transmitter guarantees this on every exit path.
pub trait SpoolerBackend: Send + Sync {
    fn open(&self, printer: &str) -> io::Result<SpoolHandle>;
    fn start_document(&self, handle: SpoolHandle, document_name: &str, data_type: &str)
    -> io::Result<()>;
    fn start_page(&self, handle: SpoolHandle) -> io::Result<()>;
    /// Returns the number of bytes the spooler accepted.
    fn write(&self, handle: SpoolHandle, data: &[u8]) -> io::Result<usize>;
    fn end_page(&self, handle: SpoolHandle) -> io::Result<()>;
    fn end_document(&self, handle: SpoolHandle) -> io::Result<()>;
    fn close(&self, handle: SpoolHandle) -> io::Result<()>;
}

/// The spooler available on this platform.
pub fn native_spooler() -> Box<dyn SpoolerBackend> {
    #[cfg(windows)]
    {
        Box::new(winspool::WinSpooler)
    }
    #[cfg(not(windows))]
    {
        Box::new(UnavailableSpooler)
    }
}

/// Backend for platforms without winspool.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSpooler;

impl UnavailableSpooler {
    fn unsupported<T>() -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "raw spooler printing requires Windows",
        ))
    }
}

impl SpoolerBackend for UnavailableSpooler {
    fn open(&self, _printer: &str) -> io::Result<SpoolHandle> {
        Self::unsupported()
    }
    fn start_document(&self, _: SpoolHandle, _: &str, _: &str) -> io::Result<()> {
        Self::unsupported()
    }
    fn start_page(&self, _: SpoolHandle) -> io::Result<()> {
        Self::unsupported()
    }
    fn write(&self, _: SpoolHandle, _: &[u8]) -> io::Result<usize> {
        Self::unsupported()
    }
    fn end_page(&self, _: SpoolHandle) -> io::Result<()> {
        Self::unsupported()
    }
    fn end_document(&self, _: SpoolHandle) -> io::Result<()> {
        Self::unsupported()
    }
    fn close(&self, _: SpoolHandle) -> io::Result<()> {
        Self::unsupported()
    }
}

#[cfg(windows)]
mod winspool {
    use std::ffi::OsStr;
    use std::io;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;

    use winapi::shared::minwindef::{BOOL, DWORD, LPBYTE, LPVOID};
    use winapi::um::winnt::HANDLE;
    use winapi::um::winspool::{
        ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, OpenPrinterW,
        StartDocPrinterW, StartPagePrinter, WritePrinter,
    };

    use super::{SpoolHandle, SpoolerBackend};

    /// winspool.drv: `OpenPrinterW` through `ClosePrinter`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WinSpooler;

    fn wide(s: &str) -> io::Result<Vec<u16>> {
        if s.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "name contains a NUL character",
            ));
        }
        Ok(OsStr::new(s).encode_wide().chain(Some(0)).collect())
    }

    fn raw(handle: SpoolHandle) -> HANDLE {
        handle.0 as HANDLE
    }

    fn check(ok: BOOL) -> io::Result<()> {
        if ok == 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    impl SpoolerBackend for WinSpooler {
        fn open(&self, printer: &str) -> io::Result<SpoolHandle> {
            let mut name = wide(printer)?;
            let mut handle: HANDLE = ptr::null_mut();
            // SAFETY: `name` is NUL-terminated and outlives the call; the
            // handle out-pointer is valid.  Null defaults are permitted.
            check(unsafe { OpenPrinterW(name.as_mut_ptr(), &mut handle, ptr::null_mut()) })?;
            Ok(SpoolHandle(handle as usize))
        }

        fn start_document(
            &self,
            handle: SpoolHandle,
            document_name: &str,
            data_type: &str,
        ) -> io::Result<()> {
            let mut doc_name = wide(document_name)?;
            let mut datatype = wide(data_type)?;
            let mut info = DOC_INFO_1W {
                pDocName: doc_name.as_mut_ptr(),
                pOutputFile: ptr::null_mut(),
                pDatatype: datatype.as_mut_ptr(),
            };
            // SAFETY: level 1 matches DOC_INFO_1W; the strings live until
            // the call returns.  Returns the job id, zero on failure.
            let job = unsafe { StartDocPrinterW(raw(handle), 1, &mut info as *mut _ as LPBYTE) };
            if job == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        fn start_page(&self, handle: SpoolHandle) -> io::Result<()> {
            // SAFETY: handle came from OpenPrinterW and is still open.
            check(unsafe { StartPagePrinter(raw(handle)) })
        }

        fn write(&self, handle: SpoolHandle, data: &[u8]) -> io::Result<usize> {
            let len = DWORD::try_from(data.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "payload exceeds 4 GiB")
            })?;
            let mut written: DWORD = 0;
            // SAFETY: `data` is valid for `len` bytes and WritePrinter only
            // reads from it.
            check(unsafe {
                WritePrinter(raw(handle), data.as_ptr() as LPVOID, len, &mut written)
            })?;
            Ok(written as usize)
        }

        fn end_page(&self, handle: SpoolHandle) -> io::Result<()> {
            // SAFETY: paired with a successful StartPagePrinter.
            check(unsafe { EndPagePrinter(raw(handle)) })
        }

        fn end_document(&self, handle: SpoolHandle) -> io::Result<()> {
            // SAFETY: paired with a successful StartDocPrinterW.
            check(unsafe { EndDocPrinter(raw(handle)) })
        }

        fn close(&self, handle: SpoolHandle) -> io::Result<()> {
            // SAFETY: paired with a successful OpenPrinterW; not reused after.
            check(unsafe { ClosePrinter(raw(handle)) })
        }
    }
}

#[cfg(windows)]
pub use winspool::WinSpooler;
