//! End-to-end orchestrator scenarios: manifest in, RunResult out.

use std::time::{Duration, Instant};
use vibeguard_core::engine::{self, CheckStatus, RunConfig};
use vibeguard_core::manifest;

fn load(source: &str) -> vibeguard_core::Manifest {
    manifest::load_str(source, Some("vibeguard.yaml")).expect("manifest loads")
}

async fn run_in_tempdir(
    source: &str,
    config: RunConfig,
) -> (engine::RunResult, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let m = load(source);
    let run = engine::run(&m, dir.path(), &config).await;
    (run, dir)
}

#[tokio::test]
async fn coverage_gate_passes() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: cov
    run: "echo 'total: (statements) 85.0%'"
    grok: ["total:.*\\(statements\\)\\s+%{NUMBER:coverage}%"]
    assert: "coverage >= 80"
"#,
        RunConfig::default(),
    )
    .await;

    assert_eq!(run.exit_code, 0);
    assert!(run.violations.is_empty());
    assert_eq!(run.results.len(), 1);
    let cov = &run.results[0];
    assert_eq!(cov.id, "cov");
    assert_eq!(cov.status, CheckStatus::Passed);
    assert_eq!(cov.captures.get("coverage").map(String::as_str), Some("85.0"));
}

#[tokio::test]
async fn coverage_gate_fails_with_templated_suggestion() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: cov
    run: "echo 'total: (statements) 72.0%'"
    grok: ["total:.*\\(statements\\)\\s+%{NUMBER:coverage}%"]
    assert: "coverage >= 80"
    suggestion: "Coverage is {{.coverage}}%, need 80"
    severity: error
"#,
        RunConfig::default(),
    )
    .await;

    assert_eq!(run.exit_code, 1);
    assert_eq!(run.violations.len(), 1);
    let v = &run.violations[0];
    assert_eq!(
        v.suggestion.as_deref(),
        Some("Coverage is 72.0%, need 80")
    );
}

#[tokio::test]
async fn dependency_skip_cascade() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: fmt
    run: "false"
  - id: test
    run: "true"
    requires: [fmt]
"#,
        RunConfig::default(),
    )
    .await;

    assert_eq!(run.exit_code, 1);
    let fmt = run.results.iter().find(|r| r.id == "fmt").unwrap();
    assert_eq!(fmt.status, CheckStatus::Failed);
    assert_eq!(fmt.exit_code, Some(1));

    let test = run.results.iter().find(|r| r.id == "test").unwrap();
    assert_eq!(test.status, CheckStatus::Skipped);

    let skip = run.violations.iter().find(|v| v.id == "test").unwrap();
    assert_eq!(
        skip.suggestion.as_deref(),
        Some("Skipped: required dependency failed")
    );
    assert_eq!(skip.fix.as_deref(), Some("fmt"), "fix falls back to the failing dependency");
}

#[tokio::test]
async fn timeout_classification() {
    let (run, dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: slow
    run: "sleep 2"
    timeout: 100ms
"#,
        RunConfig::default(),
    )
    .await;

    assert_eq!(run.exit_code, 1);
    let slow = run.results.iter().find(|r| r.id == "slow").unwrap();
    assert_eq!(slow.status, CheckStatus::Timeout);
    assert_eq!(slow.exit_code, Some(3));

    let v = run.violations.iter().find(|v| v.id == "slow").unwrap();
    assert!(v.timed_out);
    assert_eq!(v.suggestion.as_deref(), Some("Check timed out after 100ms"));
    assert!(
        dir.path().join(".vibeguard/log/slow.log").exists(),
        "log file exists even when empty"
    );
}

#[tokio::test]
async fn fail_fast_cancels_in_flight_checks() {
    let started = Instant::now();
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: a
    run: "false"
  - id: b
    run: "sleep 5"
"#,
        RunConfig {
            fail_fast: true,
            parallel: 2,
            ..RunConfig::default()
        },
    )
    .await;

    assert!(run.fail_fast_triggered);
    assert_eq!(run.exit_code, 1);
    assert!(started.elapsed() < Duration::from_secs(4), "cancellation must beat the sleep");

    let a = run.results.iter().find(|r| r.id == "a").unwrap();
    assert_eq!(a.status, CheckStatus::Failed);

    let b = run.results.iter().find(|r| r.id == "b").unwrap();
    assert_eq!(b.status, CheckStatus::Cancelled);
    assert_eq!(b.exit_code, Some(-1));
    assert!(
        !run.violations.iter().any(|v| v.id == "b"),
        "cancellations are not violations"
    );
}

#[tokio::test]
async fn warning_severity_does_not_block() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: advisory
    run: "false"
    severity: warning
"#,
        RunConfig::default(),
    )
    .await;

    assert_eq!(run.exit_code, 0, "warnings never change the exit code");
    assert_eq!(run.violations.len(), 1);
}

#[tokio::test]
async fn custom_error_exit_code_is_used() {
    let (run, _dir) = run_in_tempdir(
        "version: \"1\"\nchecks:\n  - id: a\n    run: \"false\"\n",
        RunConfig {
            error_exit_code: 42,
            ..RunConfig::default()
        },
    )
    .await;
    assert_eq!(run.exit_code, 42);
}

#[tokio::test]
async fn tag_filter_is_strict() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: fast
    run: "true"
    tags: [quick]
  - id: slow-suite
    run: "false"
    tags: [slow]
  - id: dependent
    run: "true"
    tags: [quick]
    requires: [slow-suite]
"#,
        RunConfig {
            include_tags: vec!["quick".into()],
            ..RunConfig::default()
        },
    )
    .await;

    // slow-suite is filtered out entirely: never executed, not a violation
    assert!(run.results.iter().all(|r| r.id != "slow-suite"));
    assert_eq!(run.exit_code, 0);

    let dependent = run.results.iter().find(|r| r.id == "dependent").unwrap();
    assert_eq!(dependent.status, CheckStatus::Skipped);
    assert_eq!(
        dependent.skip_reason.as_deref(),
        Some("skipped: required dependency not in filtered set")
    );
    assert!(
        !run.violations.iter().any(|v| v.id == "dependent"),
        "filtered-dependency skips are not violations"
    );
}

#[tokio::test]
async fn exclude_tags_remove_checks() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: a
    run: "true"
    tags: [ci]
  - id: b
    run: "false"
    tags: [local]
"#,
        RunConfig {
            exclude_tags: vec!["local".into()],
            ..RunConfig::default()
        },
    )
    .await;
    assert_eq!(run.results.len(), 1);
    assert_eq!(run.exit_code, 0);
}

#[tokio::test]
async fn id_filter_runs_a_single_check() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: a
    run: "true"
  - id: b
    run: "false"
"#,
        RunConfig {
            only: vec!["a".into()],
            ..RunConfig::default()
        },
    )
    .await;
    assert_eq!(run.results.len(), 1);
    assert_eq!(run.results[0].id, "a");
    assert_eq!(run.exit_code, 0);
}

#[tokio::test]
async fn vars_interpolate_into_commands_and_render_paths() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
vars:
  greeting: "hello"
  min: "3"
checks:
  - id: greet
    run: "echo {{.greeting}} {{.greeting}}"
    grok: ["%{WORD:first}"]
    assert: "first == 'hello'"
    suggestion: "said {{.first}}, wanted {{.greeting}}"
"#,
        RunConfig::default(),
    )
    .await;
    assert_eq!(run.exit_code, 0);
    let r = &run.results[0];
    assert_eq!(r.captures.get("first").map(String::as_str), Some("hello"));
}

#[tokio::test]
async fn file_mode_reads_artifact_instead_of_output() {
    let dir = tempfile::tempdir().unwrap();
    let m = load(
        r#"
version: "1"
vars:
  out: "report.txt"
checks:
  - id: artifact
    run: "echo 'score 91' > {{.out}}"
    file: "{{.out}}"
    grok: ["score %{INT:score}"]
    assert: "score > 90"
"#,
    );
    let run = engine::run(&m, dir.path(), &RunConfig::default()).await;
    assert_eq!(run.exit_code, 0);
    assert_eq!(
        run.results[0].captures.get("score").map(String::as_str),
        Some("91")
    );
}

#[tokio::test]
async fn unreadable_file_is_an_execution_error_not_a_violation() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: missing
    run: "true"
    file: "does-not-exist.txt"
"#,
        RunConfig::default(),
    )
    .await;

    let r = &run.results[0];
    assert_eq!(r.status, CheckStatus::Failed);
    let err = r.error.as_deref().unwrap();
    assert!(err.starts_with("file:"), "kind-tagged error, got: {}", err);
    assert!(run.violations.is_empty());
    assert_eq!(run.exit_code, 1, "execution errors still fail the run");
}

#[tokio::test]
async fn event_handlers_fire_with_timeout_precedence() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
prompts:
  late:
    content: the check ran out of time
checks:
  - id: slow
    run: "sleep 2"
    timeout: 100ms
    on:
      timeout: [late]
      failure: "should not fire"
  - id: ok
    run: "true"
    on:
      success: "all good"
"#,
        RunConfig::default(),
    )
    .await;

    let slow = run.results.iter().find(|r| r.id == "slow").unwrap();
    assert_eq!(slow.triggered_prompts.len(), 1);
    assert_eq!(slow.triggered_prompts[0].event, "timeout");
    assert_eq!(slow.triggered_prompts[0].source, "prompt:late");
    assert_eq!(slow.triggered_prompts[0].content, "the check ran out of time");

    let ok = run.results.iter().find(|r| r.id == "ok").unwrap();
    assert_eq!(ok.triggered_prompts.len(), 1);
    assert_eq!(ok.triggered_prompts[0].event, "success");
    assert_eq!(ok.triggered_prompts[0].source, "inline");
}

#[tokio::test]
async fn builtin_init_prompt_resolves_in_events() {
    let (run, _dir) = run_in_tempdir(
        r#"
version: "1"
checks:
  - id: a
    run: "false"
    on:
      failure: [init]
"#,
        RunConfig::default(),
    )
    .await;
    let a = &run.results[0];
    assert_eq!(a.triggered_prompts.len(), 1);
    assert_eq!(a.triggered_prompts[0].source, "prompt:init");
    assert!(!a.triggered_prompts[0].content.is_empty());
}

#[tokio::test]
async fn levels_run_in_dependency_order() {
    // c writes only if b's marker exists, b only if a's does: any ordering
    // mistake breaks the chain and the last assert fails.
    let dir = tempfile::tempdir().unwrap();
    let m = load(
        r#"
version: "1"
checks:
  - id: a
    run: "touch a.marker"
  - id: b
    run: "test -f a.marker && touch b.marker"
    requires: [a]
  - id: c
    run: "test -f b.marker"
    requires: [b]
"#,
    );
    let run = engine::run(&m, dir.path(), &RunConfig::default()).await;
    assert_eq!(run.exit_code, 0);
    assert!(run.results.iter().all(|r| r.status == CheckStatus::Passed));
}

#[tokio::test]
async fn assertion_without_grok_evaluates_over_empty_captures() {
    let (run, _dir) = run_in_tempdir(
        "version: \"1\"\nchecks:\n  - id: a\n    run: \"true\"\n    assert: \"ghost == ''\"\n",
        RunConfig::default(),
    )
    .await;
    assert_eq!(run.exit_code, 0);
    assert_eq!(run.results[0].status, CheckStatus::Passed);
}

#[tokio::test]
async fn log_file_holds_combined_output() {
    let dir = tempfile::tempdir().unwrap();
    let m = load(
        "version: \"1\"\nchecks:\n  - id: noisy\n    run: \"echo out; echo err >&2\"\n",
    );
    let run = engine::run(&m, dir.path(), &RunConfig::default()).await;
    assert_eq!(run.exit_code, 0);
    let log = std::fs::read_to_string(dir.path().join(".vibeguard/log/noisy.log")).unwrap();
    assert!(log.contains("out"));
    assert!(log.contains("err"));
}
