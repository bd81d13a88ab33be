use super::super::args::ValidateArgs;
use super::load_or_report;
use crate::exit_codes;

pub(crate) fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let manifest = match load_or_report(&args.config) {
        Ok(m) => m,
        Err(code) => return Ok(code),
    };
    println!(
        "OK: {} ({} checks, {} prompts)",
        args.config.display(),
        manifest.checks.len(),
        manifest.prompts.len()
    );
    Ok(exit_codes::SUCCESS)
}
