//! The orchestrator: runs a manifest level by level.
//!
//! Levels execute sequentially; checks inside a level run concurrently,
//! bounded by the parallelism semaphore. Dependency satisfaction is strict: a
//! check whose required predecessor did not pass is skipped with a synthetic
//! violation. Fail-fast flips a run-wide watch channel that cancels every
//! in-flight subprocess and prevents later checks from starting.

use super::logs;
use super::{CheckResult, CheckStatus, RunConfig, RunResult, TriggeredPrompt, Violation};
use crate::assertion;
use crate::errors::ExecutionError;
use crate::exec::Executor;
use crate::graph;
use crate::grok::Matcher;
use crate::model::{Check, EventValue, Manifest, Severity};
use crate::template::interpolate;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

const SKIP_DEP_FAILED: &str = "Skipped: required dependency failed";
const SKIP_DEP_FILTERED: &str = "skipped: required dependency not in filtered set";
const SKIP_RUN_CANCELLED: &str = "skipped: run cancelled";

/// State shared between check tasks, guarded by one mutex.
struct Shared {
    passed: HashSet<String>,
    fail_fast_triggered: bool,
}

/// Execute the manifest's checks under `config`, with `workdir` as the
/// working directory for subprocesses, logs, and `file` reads.
pub async fn run(manifest: &Manifest, workdir: &Path, config: &RunConfig) -> RunResult {
    let manifest = Arc::new(manifest.clone());
    let eligible = eligible_checks(&manifest, config);
    let (runnable, filter_skipped) = drop_filtered_dependents(&manifest, &eligible);

    let mut results: Vec<CheckResult> = filter_skipped
        .iter()
        .map(|&i| {
            let c = &manifest.checks[i];
            CheckResult::skipped(&c.id, c.severity, &c.tags, SKIP_DEP_FILTERED)
        })
        .collect();
    let mut violations: Vec<Violation> = Vec::new();

    let levels = match graph::levels(&manifest.checks, &runnable) {
        Ok(levels) => levels,
        Err(e) => {
            // Loader validation rejects cycles; this is a defensive re-check.
            warn!(error = %e, "scheduling fell back to manifest order");
            vec![runnable.clone()]
        }
    };

    let semaphore = Arc::new(Semaphore::new(config.parallel.max(1)));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_tx = Arc::new(cancel_tx);
    let shared = Arc::new(Mutex::new(Shared {
        passed: HashSet::new(),
        fail_fast_triggered: false,
    }));

    for level in levels {
        let fail_fast_hit = shared.lock().map(|s| s.fail_fast_triggered).unwrap_or(false);
        if fail_fast_hit {
            for &i in &level {
                let c = &manifest.checks[i];
                results.push(CheckResult::skipped(
                    &c.id,
                    c.severity,
                    &c.tags,
                    SKIP_RUN_CANCELLED,
                ));
            }
            continue;
        }

        let mut join_set: JoinSet<(usize, CheckResult, Option<Violation>)> = JoinSet::new();
        for &idx in &level {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let manifest = Arc::clone(&manifest);
            let shared = Arc::clone(&shared);
            let cancel_tx = Arc::clone(&cancel_tx);
            let cancel_rx = cancel_rx.clone();
            let workdir = workdir.to_path_buf();
            let fail_fast = config.fail_fast;
            join_set.spawn(async move {
                let _permit = permit;
                let (result, violation) =
                    run_check(&manifest, idx, &workdir, cancel_rx, &shared).await;
                finish_check(&result, fail_fast, &shared, &cancel_tx);
                (idx, result, violation)
            });
        }

        let mut level_results = Vec::with_capacity(level.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => level_results.push(entry),
                Err(e) => warn!(error = %e, "check task panicked"),
            }
        }
        // manifest order within the level, for deterministic reports
        level_results.sort_by_key(|(idx, _, _)| *idx);
        for (_, result, violation) in level_results {
            results.push(result);
            violations.extend(violation);
        }
    }

    let fail_fast_triggered = shared.lock().map(|s| s.fail_fast_triggered).unwrap_or(false);
    let exit_code = RunResult::compute_exit_code(&results, config.error_exit_code);
    RunResult {
        results,
        violations,
        exit_code,
        fail_fast_triggered,
    }
}

/// Tag and id filtering. Include filters use OR-semantics; a check survives
/// when it matches the include set (or the set is empty) and matches nothing
/// in the exclude set.
fn eligible_checks(manifest: &Manifest, config: &RunConfig) -> Vec<usize> {
    manifest
        .checks
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            if !config.only.is_empty() && !config.only.iter().any(|id| id == &c.id) {
                return false;
            }
            if !config.include_tags.is_empty()
                && !c.tags.iter().any(|t| config.include_tags.contains(t))
            {
                return false;
            }
            !c.tags.iter().any(|t| config.exclude_tags.contains(t))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Remove checks whose dependencies left the eligible set, transitively.
/// These are reported as skipped but are not violations: excluding the
/// dependency was the operator's own choice.
fn drop_filtered_dependents(manifest: &Manifest, eligible: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut in_set: HashSet<&str> = eligible
        .iter()
        .map(|&i| manifest.checks[i].id.as_str())
        .collect();
    let mut dropped: HashSet<usize> = HashSet::new();

    loop {
        let mut changed = false;
        for &i in eligible {
            if dropped.contains(&i) {
                continue;
            }
            let check = &manifest.checks[i];
            if check.requires.iter().any(|d| !in_set.contains(d.as_str())) {
                in_set.remove(check.id.as_str());
                dropped.insert(i);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let runnable = eligible.iter().copied().filter(|i| !dropped.contains(i)).collect();
    let mut skipped: Vec<usize> = dropped.into_iter().collect();
    skipped.sort_unstable();
    (runnable, skipped)
}

/// Post-execution bookkeeping under the shared mutex: the passed set and the
/// fail-fast trigger.
fn finish_check(
    result: &CheckResult,
    fail_fast: bool,
    shared: &Mutex<Shared>,
    cancel_tx: &watch::Sender<bool>,
) {
    let Ok(mut state) = shared.lock() else { return };
    match result.status {
        CheckStatus::Passed => {
            state.passed.insert(result.id.clone());
        }
        CheckStatus::Failed | CheckStatus::Timeout => {
            if fail_fast && result.severity == Severity::Error && !state.fail_fast_triggered {
                state.fail_fast_triggered = true;
                debug!(check = %result.id, "fail-fast triggered, cancelling run");
                let _ = cancel_tx.send(true);
            }
        }
        CheckStatus::Skipped | CheckStatus::Cancelled => {}
    }
}

/// The per-check pipeline: dependency gate, interpolation, execution, log,
/// payload selection, extraction, assertion, violation and event handling.
async fn run_check(
    manifest: &Manifest,
    idx: usize,
    workdir: &Path,
    cancel: watch::Receiver<bool>,
    shared: &Mutex<Shared>,
) -> (CheckResult, Option<Violation>) {
    let check = &manifest.checks[idx];
    let vars = &manifest.vars;

    // Fail-fast may have fired while this task waited on the semaphore.
    if *cancel.borrow() {
        return (
            CheckResult::skipped(&check.id, check.severity, &check.tags, SKIP_RUN_CANCELLED),
            None,
        );
    }

    let run_cmd = interpolate(&check.run, &[vars]);

    if let Some(failed_dep) = unmet_dependency(check, shared) {
        let result =
            CheckResult::skipped(&check.id, check.severity, &check.tags, SKIP_DEP_FAILED);
        let violation = Violation {
            id: check.id.clone(),
            severity: check.severity,
            command: run_cmd,
            suggestion: Some(SKIP_DEP_FAILED.to_string()),
            fix: Some(
                check
                    .fix
                    .as_deref()
                    .map(|f| interpolate(f, &[vars]))
                    .unwrap_or_else(|| failed_dep.clone()),
            ),
            extracted: BTreeMap::new(),
            log_file: logs::log_path(workdir, &check.id),
            timed_out: false,
            cancelled: false,
            triggered_prompts: Vec::new(),
        };
        return (result, Some(violation));
    }

    let executor = Executor::new(workdir);
    let exec = match executor.run(&run_cmd, check.timeout, cancel).await {
        Ok(exec) => exec,
        Err(e) => return (execution_error(check, &e, Duration::ZERO), None),
    };

    let log_file = logs::write_log(workdir, &check.id, &exec.combined);

    // Analysis payload: the named file when configured, else combined output.
    let payload = match &check.file {
        Some(file) => {
            let path = workdir.join(interpolate(file, &[vars]));
            match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    let err = ExecutionError::File {
                        path: path.display().to_string(),
                        source: e,
                    };
                    return (execution_error(check, &err, exec.duration), None);
                }
            }
        }
        None => exec.combined.clone(),
    };

    let captures = match Matcher::compile(&check.id, check.grok.patterns()) {
        Ok(matcher) => matcher.extract(&payload),
        Err(e) => {
            let err = ExecutionError::Grok(e);
            return (execution_error(check, &err, exec.duration), None);
        }
    };

    let assert_ok = match assertion::evaluate(check.assert.as_deref(), &captures) {
        Ok(ok) => ok,
        Err(e) => {
            let err = ExecutionError::Assert(e);
            return (execution_error(check, &err, exec.duration), None);
        }
    };

    let passed = exec.exit_code == 0 && assert_ok && !exec.timed_out && !exec.cancelled;
    let status = if exec.timed_out {
        CheckStatus::Timeout
    } else if exec.cancelled {
        CheckStatus::Cancelled
    } else if passed {
        CheckStatus::Passed
    } else {
        CheckStatus::Failed
    };

    let event = match status {
        CheckStatus::Timeout => Some("timeout"),
        CheckStatus::Failed => Some("failure"),
        CheckStatus::Passed => Some("success"),
        // Cancellation is not an outcome of the check itself.
        CheckStatus::Cancelled | CheckStatus::Skipped => None,
    };
    let triggered_prompts = event
        .map(|ev| trigger_prompts(manifest, check, ev))
        .unwrap_or_default();

    let violation = match status {
        CheckStatus::Failed | CheckStatus::Timeout => {
            // Render-time scopes: captures overlay vars.
            let suggestion = if exec.timed_out {
                Some(format!(
                    "Check timed out after {}",
                    humantime::format_duration(check.timeout)
                ))
            } else {
                check
                    .suggestion
                    .as_deref()
                    .map(|s| interpolate(s, &[&captures, vars]))
            };
            Some(Violation {
                id: check.id.clone(),
                severity: check.severity,
                command: run_cmd,
                suggestion,
                fix: check.fix.as_deref().map(|f| interpolate(f, &[&captures, vars])),
                extracted: captures.clone(),
                log_file: log_file.clone(),
                timed_out: exec.timed_out,
                cancelled: exec.cancelled,
                triggered_prompts: triggered_prompts.clone(),
            })
        }
        _ => None,
    };

    let result = CheckResult {
        id: check.id.clone(),
        status,
        severity: check.severity,
        duration: exec.duration,
        tags: check.tags.clone(),
        exit_code: Some(exec.exit_code),
        captures,
        triggered_prompts,
        error: None,
        skip_reason: None,
    };
    (result, violation)
}

fn unmet_dependency(check: &Check, shared: &Mutex<Shared>) -> Option<String> {
    if check.requires.is_empty() {
        return None;
    }
    let state = shared.lock().ok()?;
    check
        .requires
        .iter()
        .find(|dep| !state.passed.contains(dep.as_str()))
        .cloned()
}

/// Infrastructure failure: the check counts as failed, but no policy
/// violation is raised and no events fire.
fn execution_error(check: &Check, err: &ExecutionError, duration: Duration) -> CheckResult {
    warn!(check = %check.id, kind = err.kind(), error = %err, "execution error");
    CheckResult {
        id: check.id.clone(),
        status: CheckStatus::Failed,
        severity: check.severity,
        duration,
        tags: check.tags.clone(),
        exit_code: None,
        captures: BTreeMap::new(),
        triggered_prompts: Vec::new(),
        error: Some(format!("{}: {}", err.kind(), err)),
        skip_reason: None,
    }
}

/// Resolve the `on` handler for `event` into concrete prompt content.
/// Precedence (timeout over failure over success) is decided by the caller
/// passing exactly one event.
fn trigger_prompts(manifest: &Manifest, check: &Check, event: &'static str) -> Vec<TriggeredPrompt> {
    let Some(handler) = &check.on else {
        return Vec::new();
    };
    let value = match event {
        "timeout" => &handler.timeout,
        "failure" => &handler.failure,
        _ => &handler.success,
    };
    let Some(value) = value else {
        return Vec::new();
    };
    match value {
        EventValue::Inline(content) => vec![TriggeredPrompt {
            event,
            source: "inline".to_string(),
            content: content.clone(),
        }],
        EventValue::Refs(ids) => ids
            .iter()
            .filter_map(|id| {
                manifest.prompt_content(id).map(|content| TriggeredPrompt {
                    event,
                    source: format!("prompt:{}", id),
                    content: content.to_string(),
                })
            })
            .collect(),
    }
}
