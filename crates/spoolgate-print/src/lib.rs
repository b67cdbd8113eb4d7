// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolgate Print — printer directory and status queries through the OS
// query tools, and raw job transmission through the native spooler.  This
// crate bridges between the core domain types defined in `spoolgate-core`
// and the host's printing subsystem.

pub mod agent;
pub mod directory;
pub mod executor;
pub mod spooler;
pub mod status;
pub mod transmitter;

pub use agent::PrintAgent;
pub use directory::DirectoryResolver;
pub use executor::{ProcessExecutor, QueryError, QueryExecutor, QueryOutput};
pub use spooler::{SpoolHandle, SpoolerBackend};
pub use status::StatusProber;
pub use transmitter::RawTransmitter;
