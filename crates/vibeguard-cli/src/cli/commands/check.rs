use super::super::args::CheckArgs;
use super::{load_or_report, manifest_dir, report_config_error};
use vibeguard_core::engine::RunConfig;
use vibeguard_core::{engine, report, ConfigError};

pub(crate) async fn run(args: CheckArgs) -> anyhow::Result<i32> {
    let manifest = match load_or_report(&args.config) {
        Ok(m) => m,
        Err(code) => return Ok(code),
    };

    for id in &args.ids {
        if manifest.check_index(id).is_none() {
            let e = ConfigError::new(format!("unknown check '{}'", id));
            return Ok(report_config_error(&e));
        }
    }

    let config = RunConfig {
        parallel: args.parallel,
        fail_fast: args.fail_fast,
        error_exit_code: args.error_exit_code,
        verbose: args.verbose,
        include_tags: args.tags.clone(),
        exclude_tags: args.exclude_tags.clone(),
        only: args.ids.clone(),
    };

    let workdir = manifest_dir(&args.config);
    let run = engine::run(&manifest, &workdir, &config).await;

    if args.json {
        println!("{}", report::json::render(&run));
    } else {
        let text = report::console::render(&run, args.verbose);
        if !text.is_empty() {
            eprint!("{}", text);
        }
    }

    Ok(run.exit_code)
}
