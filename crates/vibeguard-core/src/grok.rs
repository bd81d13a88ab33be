//! Grok-style pattern extraction.
//!
//! An extraction pattern is a regular expression in which `%{NAME:capture}`
//! and `%{NAME}` templates expand to built-in sub-expressions; native named
//! groups (`(?P<name>…)`) intermix freely. Applying a list of patterns to a
//! payload yields one merged map of name→string captures, later patterns
//! overriding earlier ones.

use crate::errors::GrokError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Built-in pattern templates, keyed by `%{NAME}`.
static BUILTINS: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("WORD", r"\b\w+\b"),
        ("NOTSPACE", r"\S+"),
        ("SPACE", r"\s*"),
        ("DATA", r".*?"),
        ("GREEDYDATA", r".*"),
        ("INT", r"[+-]?\d+"),
        ("NUMBER", r"[+-]?\d+(?:\.\d+)?"),
        ("BASE10NUM", r"[+-]?(?:\d+(?:\.\d+)?|\.\d+)"),
        ("IP", r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}"),
        (
            "UUID",
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        ),
        ("PATH", r"(?:/[\w.+-]+)+/?"),
        (
            "HOSTNAME",
            r"\b[0-9A-Za-z][0-9A-Za-z-]{0,62}(?:\.[0-9A-Za-z][0-9A-Za-z-]{0,62})*\.?\b",
        ),
        ("LOGLEVEL", r"(?i:trace|debug|info|notice|warn(?:ing)?|err(?:or)?|crit(?:ical)?|fatal)"),
        (
            "TIMESTAMP_ISO8601",
            r"\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?",
        ),
        ("YEAR", r"(?:\d\d){1,2}"),
        ("MONTHNUM", r"0?[1-9]|1[0-2]"),
        ("MONTHDAY", r"(?:0[1-9]|[12]\d|3[01]|[1-9])"),
    ])
});

static TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%\{([A-Z][A-Z0-9_]*)(?::([A-Za-z_][A-Za-z0-9_]*))?\}").expect("template regex")
});

/// A compiled set of extraction patterns for one check.
#[derive(Debug)]
pub struct Matcher {
    patterns: Vec<Regex>,
}

impl Matcher {
    /// Compile each pattern, expanding `%{NAME:capture}` templates.
    pub fn compile(check_id: &str, patterns: &[String]) -> Result<Self, GrokError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for (i, raw) in patterns.iter().enumerate() {
            let expanded = expand(check_id, i, raw)?;
            let re = Regex::new(&expanded).map_err(|e| GrokError {
                check_id: check_id.to_string(),
                pattern_index: i,
                snippet: snippet(raw),
                message: e.to_string(),
            })?;
            compiled.push(re);
        }
        Ok(Self { patterns: compiled })
    }

    /// Apply every pattern to `payload` and merge named captures, later wins.
    ///
    /// A non-matching pattern contributes nothing; that is not an error.
    pub fn extract(&self, payload: &str) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for re in &self.patterns {
            let Some(caps) = re.captures(payload) else {
                continue;
            };
            for name in re.capture_names().flatten() {
                if let Some(m) = caps.name(name) {
                    merged.insert(name.to_string(), m.as_str().to_string());
                }
            }
        }
        merged
    }
}

fn expand(check_id: &str, pattern_index: usize, raw: &str) -> Result<String, GrokError> {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in TEMPLATE.captures_iter(raw) {
        let whole = caps.get(0).expect("whole match");
        out.push_str(&raw[last..whole.start()]);
        let name = &caps[1];
        let Some(sub) = BUILTINS.get(name) else {
            return Err(GrokError {
                check_id: check_id.to_string(),
                pattern_index,
                snippet: snippet(raw),
                message: format!("unknown grok pattern %{{{}}}", name),
            });
        };
        match caps.get(2) {
            Some(capture) => {
                out.push_str("(?P<");
                out.push_str(capture.as_str());
                out.push_str(">");
                out.push_str(sub);
                out.push(')');
            }
            None => {
                out.push_str("(?:");
                out.push_str(sub);
                out.push(')');
            }
        }
        last = whole.end();
    }
    out.push_str(&raw[last..]);
    Ok(out)
}

fn snippet(raw: &str) -> String {
    if raw.len() <= 100 {
        raw.to_string()
    } else {
        let mut end = 100;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        raw[..end].to_string()
    }
}
