//! Human-readable run output.
//!
//! Silent on pure success. Each violation gets a FAIL/WARN block with the
//! suggestion, the remediation (explicit fix or the command itself), the log
//! path, and whether the violation blocks a commit. Verbose mode adds a
//! per-check ✓/✗ line with wall-clock duration.

use crate::engine::{CheckResult, CheckStatus, RunResult, Violation};
use crate::model::Severity;

/// Render the run to a string; the CLI prints it to stderr.
pub fn render(run: &RunResult, verbose: bool) -> String {
    let mut out = String::new();

    if verbose {
        for r in &run.results {
            render_check_line(&mut out, r);
        }
        if !run.results.is_empty() {
            out.push('\n');
        }
    }

    for v in &run.violations {
        render_violation(&mut out, v);
    }

    for r in &run.results {
        if let Some(err) = &r.error {
            out.push_str(&format!("ERROR {} — {}\n", r.id, err));
        }
    }

    if run.fail_fast_triggered {
        out.push_str("Run cancelled after first error-severity failure (fail-fast).\n");
    }

    out
}

fn render_check_line(out: &mut String, r: &CheckResult) {
    let marker = match r.status {
        CheckStatus::Passed => "✓",
        _ => "✗",
    };
    let duration = format!("{:.1}s", r.duration.as_secs_f64());
    let note = match r.status {
        CheckStatus::Passed => String::new(),
        CheckStatus::Failed => " failed".to_string(),
        CheckStatus::Timeout => " timeout".to_string(),
        CheckStatus::Cancelled => " cancelled".to_string(),
        CheckStatus::Skipped => {
            format!(" {}", r.skip_reason.as_deref().unwrap_or("skipped"))
        }
    };
    out.push_str(&format!("{} {:<20} ({}){}\n", marker, r.id, duration, note));
}

fn render_violation(out: &mut String, v: &Violation) {
    let header = match v.severity {
        Severity::Error => "FAIL",
        Severity::Warning => "WARN",
    };
    out.push_str(&format!("{} {} [{}]\n", header, v.id, v.severity.as_str()));
    if let Some(suggestion) = &v.suggestion {
        out.push_str(&format!("  {}\n", suggestion));
    }
    let fix = v.fix.as_deref().unwrap_or(&v.command);
    out.push_str(&format!("  Fix: {}\n", fix));
    out.push_str(&format!("  Log: {}\n", v.log_file.display()));
    let advisory = if v.severity.blocks_commit() {
        "blocks commit"
    } else {
        "does not block commit"
    };
    out.push_str(&format!("  Advisory: {}\n", advisory));
}
