//! Error taxonomy for the engine.
//!
//! Three categories stay type-distinguished at the API boundary so the CLI
//! exit-code mapping can tell them apart:
//!
//! - [`ConfigError`] — manifest is malformed or violates an invariant. Aborts
//!   the run before any check executes (exit 2).
//! - [`ExecutionError`] — infrastructure failure while running one check
//!   (shell missing, `file` unreadable, grok pattern fails to compile). Local
//!   to the check; never aborts the run.
//! - Policy violations are not errors at all; they are data carried on the
//!   run result.

use std::fmt::{Display, Formatter};

/// A manifest loading or validation failure.
///
/// Carries the 1-based source line of the offending element when it is known.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub line: Option<usize>,
    pub file: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            file: None,
            source: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: {}", file, line, self.message),
            (Some(file), None) => write!(f, "{}: {}", file, self.message),
            (None, Some(line)) => write!(f, "line {}: {}", line, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// An extraction pattern that failed to compile.
#[derive(Debug, thiserror::Error)]
#[error("check '{check_id}': grok pattern #{pattern_index} failed to compile: {message} (pattern: {snippet})")]
pub struct GrokError {
    pub check_id: String,
    pub pattern_index: usize,
    /// First 100 bytes of the offending pattern.
    pub snippet: String,
    /// Underlying compiler diagnostic.
    pub message: String,
}

/// Infrastructure failure while executing a single check.
///
/// Treated as a failure of that check for pass/fail purposes, but reported as
/// an error rather than a policy violation.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("failed to spawn command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to read file '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Grok(#[from] GrokError),

    #[error(transparent)]
    Assert(#[from] AssertError),
}

impl ExecutionError {
    /// Stable kind label surfaced in results and machine output.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Spawn(_) => "spawn",
            ExecutionError::File { .. } => "file",
            ExecutionError::Grok(_) => "grok",
            ExecutionError::Assert(_) => "assert",
        }
    }
}

/// An assertion expression that failed to parse or evaluate.
///
/// The diagnostic embeds the expression with a caret locator under the
/// offending token.
#[derive(Debug)]
pub struct AssertError {
    pub message: String,
    pub expr: String,
    /// Byte offset of the offending token within `expr`.
    pub offset: usize,
}

impl AssertError {
    pub fn new(message: impl Into<String>, expr: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            expr: expr.into(),
            offset,
        }
    }
}

impl Display for AssertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\n  {}\n  {}^",
            self.message,
            self.expr,
            " ".repeat(self.offset)
        )
    }
}

impl std::error::Error for AssertError {}
