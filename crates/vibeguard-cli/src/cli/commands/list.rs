use super::super::args::ListArgs;
use super::load_or_report;
use crate::exit_codes;
use vibeguard_core::model::Check;

pub(crate) fn run(args: ListArgs) -> anyhow::Result<i32> {
    let manifest = match load_or_report(&args.config) {
        Ok(m) => m,
        Err(code) => return Ok(code),
    };

    let checks: Vec<&Check> = manifest
        .checks
        .iter()
        .filter(|c| {
            if !args.tags.is_empty() && !c.tags.iter().any(|t| args.tags.contains(t)) {
                return false;
            }
            !c.tags.iter().any(|t| args.exclude_tags.contains(t))
        })
        .collect();

    if args.json {
        let entries: Vec<serde_json::Value> = checks
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "run": c.run,
                    "severity": c.severity.as_str(),
                    "tags": c.tags,
                    "requires": c.requires,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(exit_codes::SUCCESS);
    }

    for c in checks {
        let tags = if c.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", c.tags.join(", "))
        };
        println!("{:<24} {}{}", c.id, c.severity.as_str(), tags);
    }
    Ok(exit_codes::SUCCESS)
}
