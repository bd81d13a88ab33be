use super::super::args::TagsArgs;
use super::load_or_report;
use crate::exit_codes;
use std::collections::BTreeSet;

pub(crate) fn run(args: TagsArgs) -> anyhow::Result<i32> {
    let manifest = match load_or_report(&args.config) {
        Ok(m) => m,
        Err(code) => return Ok(code),
    };

    // BTreeSet gives the sorted, de-duplicated listing in one pass.
    let tags: BTreeSet<&str> = manifest
        .checks
        .iter()
        .flat_map(|c| c.tags.iter())
        .map(String::as_str)
        .collect();

    for tag in tags {
        println!("{}", tag);
    }
    Ok(exit_codes::SUCCESS)
}
