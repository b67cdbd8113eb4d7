// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External query executor.
//
// Runs an OS utility (PowerShell, WMIC) with a hard wall-clock limit and
// captures its output.  Timeouts are reported separately from other failures
// so callers can log which fallback trigger fired.  No retries here; fallback
// policy lives in the directory resolver and status prober.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a successful query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Why an external query produced no usable output.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{tool} timed out after {}s", timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },

    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code:?}: {stderr}")]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Something that can run an external query tool.
///
/// Injected into the directory resolver and status prober so tests can
/// substitute scripted or spying implementations.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn run(
        &self,
        tool: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<QueryOutput, QueryError>;
}

/// Production executor backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl QueryExecutor for ProcessExecutor {
    async fn run(
        &self,
        tool: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<QueryOutput, QueryError> {
        let started = Instant::now();

        // The child is killed if the timeout drops the output future.
        let child = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| QueryError::Spawn {
                tool: tool.to_owned(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| QueryError::Timeout {
                tool: tool.to_owned(),
                timeout,
            })?
            .map_err(|source| QueryError::Spawn {
                tool: tool.to_owned(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        debug!(
            tool,
            elapsed_ms = started.elapsed().as_millis() as u64,
            code = ?output.status.code(),
            "external query finished"
        );

        if !output.status.success() {
            return Err(QueryError::Failed {
                tool: tool.to_owned(),
                code: output.status.code(),
                stderr: stderr.trim().to_owned(),
            });
        }

        Ok(QueryOutput { stdout, stderr })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted executor shared by the resolver, prober, and agent tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// One recorded invocation.
    #[derive(Debug, Clone)]
    pub struct Invocation {
        pub tool: String,
        pub args: Vec<String>,
        pub timeout: Duration,
    }

    /// Replays queued results in order and records every call.
    #[derive(Default)]
    pub struct ScriptedExecutor {
        replies: Mutex<VecDeque<Result<QueryOutput, QueryError>>>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply_stdout(self, stdout: &str) -> Self {
            self.push(Ok(QueryOutput {
                stdout: stdout.into(),
                stderr: String::new(),
            }))
        }

        pub fn reply_timeout(self, tool: &str) -> Self {
            self.push(Err(QueryError::Timeout {
                tool: tool.into(),
                timeout: Duration::from_secs(15),
            }))
        }

        pub fn reply_failure(self, tool: &str) -> Self {
            self.push(Err(QueryError::Failed {
                tool: tool.into(),
                code: Some(1),
                stderr: "boom".into(),
            }))
        }

        fn push(self, reply: Result<QueryOutput, QueryError>) -> Self {
            self.replies.lock().expect("replies lock").push_back(reply);
            self
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl QueryExecutor for ScriptedExecutor {
        async fn run(
            &self,
            tool: &str,
            args: &[String],
            timeout: Duration,
        ) -> Result<QueryOutput, QueryError> {
            self.calls.lock().expect("calls lock").push(Invocation {
                tool: tool.into(),
                args: args.to_vec(),
                timeout,
            });
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(QueryError::Failed {
                        tool: tool.into(),
                        code: None,
                        stderr: "no scripted reply".into(),
                    })
                })
        }
    }
}
