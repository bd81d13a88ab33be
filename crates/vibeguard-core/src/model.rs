//! Manifest data model.
//!
//! The manifest is parsed once at startup and immutable afterwards. Checks
//! are stored in a flat vector and referenced by id or index everywhere else;
//! results and violations carry only ids.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Default per-check timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Content served for the `init` prompt when the manifest does not define one.
pub const BUILTIN_INIT_PROMPT: &str = "\
You are helping an operator adopt VibeGuard in this repository.

Inspect the project (build system, languages, CI) and propose a vibeguard.yaml
manifest: a `version: \"1\"` header, shared `vars`, and a `checks` list where
each check has an `id`, a `run` command, and where useful a `grok` pattern
with an `assert` expression, a `suggestion`, and a `fix`. Wire dependent
checks together with `requires` and group them with `tags`.

Keep commands non-interactive and fast; prefer warnings over errors for
advisory policies.
";

/// Root document of a `vibeguard.yaml` manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub version: String,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub checks: Vec<Check>,
    #[serde(default)]
    pub prompts: BTreeMap<String, Prompt>,
}

impl Manifest {
    /// Index of a check by id.
    pub fn check_index(&self, id: &str) -> Option<usize> {
        self.checks.iter().position(|c| c.id == id)
    }

    /// Prompt content for `id`, falling back to the built-in `init` prompt.
    pub fn prompt_content(&self, id: &str) -> Option<&str> {
        match self.prompts.get(id) {
            Some(p) => Some(&p.content),
            None if id == "init" => Some(BUILTIN_INIT_PROMPT),
            None => None,
        }
    }
}

/// One unit of policy: a shell command plus optional extraction, assertion,
/// and remediation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Check {
    pub id: String,
    pub run: String,
    #[serde(default)]
    pub grok: GrokSpec,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub assert: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub fix: Option<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_timeout", deserialize_with = "de_duration")]
    pub timeout: Duration,
    #[serde(default)]
    pub on: Option<EventHandler>,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Extraction patterns; YAML accepts a single string or a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrokSpec(pub Vec<String>);

impl GrokSpec {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for GrokSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = GrokSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a pattern string or a sequence of pattern strings")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<GrokSpec, E> {
                Ok(GrokSpec(vec![v.to_string()]))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<GrokSpec, A::Error> {
                let mut patterns = Vec::new();
                while let Some(p) = seq.next_element::<String>()? {
                    patterns.push(p);
                }
                Ok(GrokSpec(patterns))
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}

/// Blocking class of a failing check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl Severity {
    pub fn blocks_commit(self) -> bool {
        matches!(self, Severity::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Prompts to emit per check outcome.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventHandler {
    #[serde(default)]
    pub success: Option<EventValue>,
    #[serde(default)]
    pub failure: Option<EventValue>,
    #[serde(default)]
    pub timeout: Option<EventValue>,
}

/// Either a list of prompt ids or a single inline content string.
///
/// The choice is driven purely by YAML shape: a sequence is a list of
/// references, a bare scalar is always inline content even when its text
/// happens to match a prompt id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValue {
    Refs(Vec<String>),
    Inline(String),
}

impl<'de> Deserialize<'de> for EventValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = EventValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a prompt-id sequence or an inline content string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EventValue, E> {
                Ok(EventValue::Inline(v.to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<EventValue, A::Error> {
                let mut ids = Vec::new();
                while let Some(id) = seq.next_element::<String>()? {
                    ids.push(id);
                }
                Ok(EventValue::Refs(ids))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Named text block surfaced to downstream consumers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prompt {
    #[serde(default)]
    pub description: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s)
        .map_err(|e| de::Error::custom(format!("invalid duration '{}': {}", s, e)))
}
