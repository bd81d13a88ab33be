//! Run orchestration: configuration, per-check results, violations, and the
//! level-by-level runner.

pub mod logs;
mod runner;

pub use runner::run;

use crate::model::Severity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Caller-supplied run options. The CLI layer builds this from flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Upper bound on concurrently running checks within a level.
    pub parallel: usize,
    /// Cancel the run at the first error-severity failure.
    pub fail_fast: bool,
    /// Exit code reported for error-severity violations and timeouts.
    pub error_exit_code: i32,
    pub verbose: bool,
    /// OR-semantics include filter; empty means all checks.
    pub include_tags: Vec<String>,
    /// OR-semantics exclude filter.
    pub exclude_tags: Vec<String>,
    /// Restrict the run to these check ids; empty means all checks.
    pub only: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: 4,
            fail_fast: false,
            error_exit_code: 1,
            verbose: false,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            only: Vec::new(),
        }
    }
}

/// Final state of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
    Cancelled,
    Timeout,
}

/// A prompt emitted by an `on` event handler.
#[derive(Debug, Clone, Serialize)]
pub struct TriggeredPrompt {
    /// `success`, `failure`, or `timeout`.
    pub event: &'static str,
    /// `prompt:<id>` for references, `inline` for bare scalars.
    pub source: String,
    pub content: String,
}

/// Outcome of one check, executed or not.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub id: String,
    pub status: CheckStatus,
    pub severity: Severity,
    pub duration: Duration,
    pub tags: Vec<String>,
    pub exit_code: Option<i32>,
    pub captures: BTreeMap<String, String>,
    pub triggered_prompts: Vec<TriggeredPrompt>,
    /// Infrastructure failure (spawn, file read, grok compile, assert parse).
    pub error: Option<String>,
    /// Why the check never ran.
    pub skip_reason: Option<String>,
}

impl CheckResult {
    pub(crate) fn skipped(id: &str, severity: Severity, tags: &[String], reason: &str) -> Self {
        Self {
            id: id.to_string(),
            status: CheckStatus::Skipped,
            severity,
            duration: Duration::ZERO,
            tags: tags.to_vec(),
            exit_code: None,
            captures: BTreeMap::new(),
            triggered_prompts: Vec::new(),
            error: None,
            skip_reason: Some(reason.to_string()),
        }
    }
}

/// A failing (or dependency-skipped) check surfaced to the user.
#[derive(Debug, Clone)]
pub struct Violation {
    pub id: String,
    pub severity: Severity,
    /// The interpolated command line.
    pub command: String,
    pub suggestion: Option<String>,
    pub fix: Option<String>,
    pub extracted: BTreeMap<String, String>,
    pub log_file: PathBuf,
    pub timed_out: bool,
    pub cancelled: bool,
    pub triggered_prompts: Vec<TriggeredPrompt>,
}

/// Everything a run produced, in manifest order per level.
#[derive(Debug)]
pub struct RunResult {
    pub results: Vec<CheckResult>,
    pub violations: Vec<Violation>,
    pub exit_code: i32,
    pub fail_fast_triggered: bool,
}

impl RunResult {
    /// Exit-code calculus: 0 iff no error-severity failure and no timeout.
    pub(crate) fn compute_exit_code(results: &[CheckResult], error_exit_code: i32) -> i32 {
        let blocking = results.iter().any(|r| match r.status {
            CheckStatus::Timeout => true,
            CheckStatus::Failed => r.severity == Severity::Error,
            _ => false,
        });
        if blocking {
            error_exit_code
        } else {
            0
        }
    }
}
