//! Manifest loading and validation.
//!
//! Loading runs in two phases: a structural serde decode (custom
//! deserializers handle the polymorphic `grok`, `timeout`, and `on` shapes),
//! then semantic validation of the invariants the rest of the engine relies
//! on. Every failure is a [`ConfigError`]; runtime error types never appear
//! here, so the CLI can map loader failures straight to exit code 2.

mod lines;

pub use lines::LineIndex;

use crate::errors::ConfigError;
use crate::graph;
use crate::model::{EventValue, Manifest};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("id regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("tag regex"));

pub const SUPPORTED_VERSION: &str = "1";

/// Load and validate a manifest from a file.
pub fn load_path(path: &Path) -> Result<Manifest, ConfigError> {
    let file = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::new(format!("failed to read manifest: {}", e)).with_file(file.clone())
    })?;
    load_str(&source, Some(&file))
}

/// Load and validate a manifest from raw UTF-8 source.
pub fn load_str(source: &str, filename: Option<&str>) -> Result<Manifest, ConfigError> {
    let with_file = |mut err: ConfigError| {
        if let Some(name) = filename {
            err = err.with_file(name);
        }
        err
    };

    let manifest: Manifest = serde_yaml::from_str(source).map_err(|e| {
        let mut err = ConfigError::new(format!("failed to parse manifest: {}", e));
        if let Some(loc) = e.location() {
            err = err.with_line(loc.line());
        }
        with_file(err.with_source(e))
    })?;

    let index = LineIndex::scan(source);
    validate(&manifest, &index).map_err(with_file)?;
    Ok(manifest)
}

fn validate(manifest: &Manifest, index: &LineIndex) -> Result<(), ConfigError> {
    if manifest.version != SUPPORTED_VERSION {
        return Err(ConfigError::new(format!(
            "unsupported manifest version '{}' (expected \"{}\")",
            manifest.version, SUPPORTED_VERSION
        )));
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, check) in manifest.checks.iter().enumerate() {
        let at = |err: ConfigError| match index.check_line(i) {
            Some(line) => err.with_line(line),
            None => err,
        };

        if !ID_RE.is_match(&check.id) {
            return Err(at(ConfigError::new(format!(
                "invalid check id '{}' (must match ^[A-Za-z_][A-Za-z0-9_-]*$)",
                check.id
            ))));
        }
        if check.run.trim().is_empty() {
            return Err(at(ConfigError::new(format!(
                "check '{}' has an empty run command",
                check.id
            ))));
        }
        if seen.insert(check.id.as_str(), i).is_some() {
            return Err(at(ConfigError::new(format!(
                "duplicate check id '{}'",
                check.id
            ))));
        }
        for tag in &check.tags {
            if !TAG_RE.is_match(tag) {
                return Err(at(ConfigError::new(format!(
                    "check '{}' has invalid tag '{}' (must match ^[a-z][a-z0-9-]*$)",
                    check.id, tag
                ))));
            }
        }
    }

    for (i, check) in manifest.checks.iter().enumerate() {
        let at = |err: ConfigError| match index.check_line(i) {
            Some(line) => err.with_line(line),
            None => err,
        };
        for dep in &check.requires {
            if dep == &check.id {
                return Err(at(ConfigError::new(format!(
                    "check '{}' requires itself",
                    check.id
                ))));
            }
            if !seen.contains_key(dep.as_str()) {
                return Err(at(ConfigError::new(format!(
                    "check '{}' requires unknown check '{}'",
                    check.id, dep
                ))));
            }
        }
    }

    if let Some(path) = graph::find_cycle(&manifest.checks) {
        let first = path[0];
        let err = ConfigError::new(format!(
            "dependency cycle: {}",
            graph::cycle_path(&manifest.checks, &path)
        ));
        return Err(match index.check_line(first) {
            Some(line) => err.with_line(line),
            None => err,
        });
    }

    for (id, prompt) in &manifest.prompts {
        if !ID_RE.is_match(id) {
            return Err(ConfigError::new(format!(
                "invalid prompt id '{}' (must match ^[A-Za-z_][A-Za-z0-9_-]*$)",
                id
            )));
        }
        for tag in &prompt.tags {
            if !TAG_RE.is_match(tag) {
                return Err(ConfigError::new(format!(
                    "prompt '{}' has invalid tag '{}' (must match ^[a-z][a-z0-9-]*$)",
                    id, tag
                )));
            }
        }
    }

    for (i, check) in manifest.checks.iter().enumerate() {
        let Some(handler) = &check.on else { continue };
        for value in [&handler.success, &handler.failure, &handler.timeout]
            .into_iter()
            .flatten()
        {
            let EventValue::Refs(ids) = value else {
                continue; // inline content needs no resolution
            };
            for id in ids {
                if manifest.prompt_content(id).is_none() {
                    let err = ConfigError::new(format!(
                        "check '{}' references unknown prompt '{}'",
                        check.id, id
                    ));
                    return Err(match index.check_line(i) {
                        Some(line) => err.with_line(line),
                        None => err,
                    });
                }
            }
        }
    }

    Ok(())
}
