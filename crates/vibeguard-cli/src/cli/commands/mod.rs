mod check;
mod list;
mod prompt;
mod tags;
mod validate;

use super::args::{Cli, Command};
use crate::exit_codes;
use std::path::{Path, PathBuf};
use vibeguard_core::{ConfigError, Manifest};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Check(args) => check::run(args).await,
        Command::Validate(args) => validate::run(args),
        Command::List(args) => list::run(args),
        Command::Tags(args) => tags::run(args),
        Command::Prompt(args) => prompt::run(args),
    }
}

/// Load the manifest or report the config error on stderr with exit 2.
pub(crate) fn load_or_report(config: &Path) -> Result<Manifest, i32> {
    match vibeguard_core::manifest::load_path(config) {
        Ok(manifest) => Ok(manifest),
        Err(e) => Err(report_config_error(&e)),
    }
}

pub(crate) fn report_config_error(e: &ConfigError) -> i32 {
    eprintln!("error: {}", e);
    exit_codes::CONFIG_ERROR
}

/// Subprocesses, logs, and `file` reads resolve against the manifest's
/// directory.
pub(crate) fn manifest_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
