// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared request state.

use std::sync::Arc;

use spoolgate_core::AgentConfig;
use spoolgate_print::PrintAgent;

/// Handed to every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<PrintAgent>,
    pub max_payload_bytes: usize,
}

impl AppState {
    pub fn new(agent: PrintAgent, config: &AgentConfig) -> Self {
        Self {
            agent: Arc::new(agent),
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    /// Router-level body cap: the payload limit after percent-encoding, plus
    /// room for the other form fields.
    pub fn body_limit(&self) -> usize {
        self.max_payload_bytes.saturating_mul(3).saturating_add(64 * 1024)
    }
}
