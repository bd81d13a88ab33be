//! `{{.name}}` placeholder interpolation.
//!
//! Two scope compositions exist: command-time (manifest vars only, applied to
//! `run` and `file`) and render-time (extracted captures overlaying vars,
//! applied to `suggestion` and `fix`). Each placeholder resolves against the
//! first scope that defines the name; unresolved placeholders stay literal.
//! No shell escaping happens here — the manifest author is the trust
//! boundary, and captures never flow back into commands.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\.([A-Za-z_][A-Za-z0-9_]*)\}\}").expect("placeholder regex"));

/// Substitute `{{.name}}` against `scopes`, first definition wins.
pub fn interpolate(template: &str, scopes: &[&BTreeMap<String, String>]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            scopes
                .iter()
                .find_map(|scope| scope.get(name))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_from_single_scope() {
        let v = vars(&[("min", "80")]);
        assert_eq!(interpolate("need {{.min}}%", &[&v]), "need 80%");
    }

    #[test]
    fn first_scope_wins() {
        let captures = vars(&[("coverage", "72.0")]);
        let v = vars(&[("coverage", "stale"), ("min", "80")]);
        assert_eq!(
            interpolate("Coverage is {{.coverage}}%, need {{.min}}", &[&captures, &v]),
            "Coverage is 72.0%, need 80"
        );
    }

    #[test]
    fn unresolved_placeholders_stay_literal() {
        let v = vars(&[]);
        assert_eq!(interpolate("hello {{.missing}}", &[&v]), "hello {{.missing}}");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let v = vars(&[("a", "b")]);
        let cmd = "grep -r 'TODO' src/ | wc -l";
        assert_eq!(interpolate(cmd, &[&v]), cmd);
    }

    #[test]
    fn metacharacters_pass_through_unescaped() {
        let v = vars(&[("path", "src; rm -rf /")]);
        assert_eq!(interpolate("ls {{.path}}", &[&v]), "ls src; rm -rf /");
    }
}
