//! Submission driver
//!
//! One [`SubmissionDriver::submit`] call is one submission lifecycle:
//!
//! 1. resolve the job's connection into coordinates
//! 2. build the `spark-submit` argv
//! 3. run it, feeding every output line to a fresh [`LogScanner`] as it arrives
//! 4. report the exit code and the captured application id
//!
//! A launcher that exits non-zero is reported in the result, not as an error;
//! the caller decides what a failed submission means.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sparkhook_connections::{ConnectionStore, DEFAULT_CONN_ID};
use sparkhook_logscan::{LogScanner, PatternSet};
use tracing::{debug, info, warn};

use crate::command::{build_command, SubmissionCommand};
use crate::error::SubmitResult;
use crate::job::JobSpec;
use crate::process::{ProcessRunner, SystemRunner};
use crate::resolver::{ConnectionResolver, ResolvedCoordinates};

/// Tracing target for relayed launcher output.
pub const LAUNCHER_LOG_TARGET: &str = "sparkhook::launcher";

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    /// Launcher exit code; `None` if it was killed by a signal
    pub exit_code: Option<i32>,
    /// Cluster-assigned id, if the launcher announced one
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_signal: Option<String>,
    pub cancelled: bool,
    pub timed_out: bool,
    pub line_count: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl SubmissionResult {
    /// True iff the launcher exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Submits jobs through `spark-submit`.
#[derive(Debug, Clone)]
pub struct SubmissionDriver<S, R = SystemRunner> {
    resolver: ConnectionResolver<S>,
    runner: R,
    patterns: PatternSet,
    default_conn_id: String,
}

impl<S: ConnectionStore, R: ProcessRunner> SubmissionDriver<S, R> {
    pub fn new(store: S, runner: R) -> Self {
        Self {
            resolver: ConnectionResolver::new(store),
            runner,
            patterns: PatternSet::default(),
            default_conn_id: DEFAULT_CONN_ID.to_string(),
        }
    }

    /// Marker patterns for application id extraction.
    pub fn with_patterns(mut self, patterns: PatternSet) -> Self {
        self.patterns = patterns;
        self
    }

    /// Connection used by jobs that do not name one.
    pub fn with_default_conn_id(mut self, conn_id: impl Into<String>) -> Self {
        self.default_conn_id = conn_id.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Connection id `job` submits through.
    pub fn conn_id_for<'a>(&'a self, job: &'a JobSpec) -> &'a str {
        job.conn_id.as_deref().unwrap_or(&self.default_conn_id)
    }

    pub fn resolve_connection(&self, conn_id: &str) -> SubmitResult<ResolvedCoordinates> {
        self.resolver.resolve(conn_id)
    }

    /// Resolve the job's connection and build its argv without running it.
    pub fn build_command(&self, job: &JobSpec) -> SubmitResult<SubmissionCommand> {
        let coords = self.resolve_connection(self.conn_id_for(job))?;
        Ok(build_command(job, &coords))
    }

    /// Submit `job` and block until the launcher exits.
    pub fn submit(&self, job: &JobSpec) -> SubmitResult<SubmissionResult> {
        self.submit_with(job, |_| {})
    }

    /// Like [`submit`](Self::submit), calling `on_application_id` as soon as
    /// the id appears in the output, before the launcher exits.
    pub fn submit_with<F>(&self, job: &JobSpec, mut on_application_id: F) -> SubmitResult<SubmissionResult>
    where
        F: FnMut(&str),
    {
        let command = self.build_command(job)?;
        info!(
            application = %job.application,
            conn_id = self.conn_id_for(job),
            "submitting"
        );
        debug!(command = %command, "launcher command");

        let started_at = Utc::now();
        let start = Instant::now();
        let mut scanner = LogScanner::with_patterns(self.patterns.clone());

        let outcome = self.runner.run(&command, &mut |line| {
            info!(target: LAUNCHER_LOG_TARGET, "{}", line);
            if scanner.feed(line) {
                if let Some(id) = scanner.application_id() {
                    info!(application_id = id, "captured application id");
                    on_application_id(id);
                }
            }
        })?;

        let result = SubmissionResult {
            exit_code: outcome.exit_code,
            application_id: scanner.into_application_id(),
            term_signal: outcome.term_signal,
            cancelled: outcome.cancelled,
            timed_out: outcome.timed_out,
            line_count: outcome.line_count,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if result.success() {
            info!(
                application_id = ?result.application_id,
                duration_ms = result.duration_ms,
                "launcher finished"
            );
        } else {
            warn!(
                exit_code = ?result.exit_code,
                term_signal = ?result.term_signal,
                application_id = ?result.application_id,
                "launcher failed"
            );
        }

        Ok(result)
    }
}
