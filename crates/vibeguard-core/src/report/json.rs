//! Machine-readable run output.
//!
//! The document shape is a public contract consumed by CI integrations; the
//! CLI contract tests pin every field.

use crate::engine::{CheckResult, RunResult, TriggeredPrompt, Violation};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct RunDocument {
    pub exit_code: i32,
    pub fail_fast_triggered: bool,
    pub checks: Vec<CheckEntry>,
    pub violations: Vec<ViolationEntry>,
}

#[derive(Debug, Serialize)]
pub struct CheckEntry {
    pub id: String,
    pub status: crate::engine::CheckStatus,
    pub severity: &'static str,
    pub duration_ms: u64,
    pub tags: Vec<String>,
    pub triggered_prompts: Vec<PromptEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViolationEntry {
    pub id: String,
    pub severity: &'static str,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    pub extracted: BTreeMap<String, String>,
    pub log_file: String,
    pub triggered_prompts: Vec<PromptEntry>,
}

#[derive(Debug, Serialize)]
pub struct PromptEntry {
    pub event: &'static str,
    pub source: String,
    pub content: String,
}

pub fn document(run: &RunResult) -> RunDocument {
    RunDocument {
        exit_code: run.exit_code,
        fail_fast_triggered: run.fail_fast_triggered,
        checks: run.results.iter().map(check_entry).collect(),
        violations: run.violations.iter().map(violation_entry).collect(),
    }
}

pub fn render(run: &RunResult) -> String {
    serde_json::to_string_pretty(&document(run)).unwrap_or_else(|e| {
        // Serialization of plain strings and maps cannot fail in practice.
        format!("{{\"error\": \"render failed: {}\"}}", e)
    })
}

fn check_entry(r: &CheckResult) -> CheckEntry {
    CheckEntry {
        id: r.id.clone(),
        status: r.status,
        severity: r.severity.as_str(),
        duration_ms: r.duration.as_millis() as u64,
        tags: r.tags.clone(),
        triggered_prompts: r.triggered_prompts.iter().map(prompt_entry).collect(),
        error: r.error.clone(),
    }
}

fn violation_entry(v: &Violation) -> ViolationEntry {
    ViolationEntry {
        id: v.id.clone(),
        severity: v.severity.as_str(),
        command: v.command.clone(),
        suggestion: v.suggestion.clone(),
        fix: v.fix.clone(),
        extracted: v.extracted.clone(),
        log_file: v.log_file.display().to_string(),
        triggered_prompts: v.triggered_prompts.iter().map(prompt_entry).collect(),
    }
}

fn prompt_entry(p: &TriggeredPrompt) -> PromptEntry {
    PromptEntry {
        event: p.event,
        source: p.source.clone(),
        content: p.content.clone(),
    }
}
