//! Source-line lookup for semantic validation errors.
//!
//! serde_yaml reports positions for syntax errors but not for decoded values,
//! so semantic diagnostics (duplicate id, unknown reference, cycle) locate
//! their element by scanning the raw source: `id:` entries inside the
//! top-level `checks:` block, one per check, in document order.

/// 1-based line numbers for manifest elements.
#[derive(Debug, Default)]
pub struct LineIndex {
    /// Line of the k-th check's `id:` entry.
    check_id_lines: Vec<usize>,
    /// Line of the top-level `checks:` key.
    checks_line: Option<usize>,
}

impl LineIndex {
    pub fn scan(source: &str) -> Self {
        let mut index = LineIndex::default();
        let mut in_checks = false;

        for (i, raw) in source.lines().enumerate() {
            let line_no = i + 1;
            let trimmed = raw.trim_start();
            let indent = raw.len() - trimmed.len();

            // A non-indented key ends the checks block.
            if indent == 0 && !trimmed.is_empty() && !trimmed.starts_with('#') {
                in_checks = trimmed.starts_with("checks:");
                if in_checks {
                    index.checks_line = Some(line_no);
                }
                continue;
            }

            if !in_checks {
                continue;
            }

            let item = trimmed.strip_prefix("- ").unwrap_or(trimmed);
            if item.starts_with("id:") {
                index.check_id_lines.push(line_no);
            }
        }

        index
    }

    /// Line of the k-th check's id, if the scan found one.
    pub fn check_line(&self, index: usize) -> Option<usize> {
        self.check_id_lines.get(index).copied()
    }

    pub fn checks_line(&self) -> Option<usize> {
        self.checks_line
    }
}
