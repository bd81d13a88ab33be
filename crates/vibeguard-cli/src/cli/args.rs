use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vibeguard",
    version,
    about = "Declarative policy enforcement for repositories — checks, assertions, and fix guidance"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute all checks, or only the named ones
    Check(CheckArgs),
    /// Load and validate the manifest without running anything
    Validate(ValidateArgs),
    /// Enumerate checks
    List(ListArgs),
    /// List every distinct tag
    Tags(TagsArgs),
    /// List prompts or emit one prompt's raw content
    Prompt(PromptArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// Check ids to run; all checks when empty
    pub ids: Vec<String>,

    #[arg(long, default_value = "vibeguard.yaml")]
    pub config: PathBuf,

    /// Upper bound on concurrently running checks
    #[arg(long, default_value_t = 4)]
    pub parallel: usize,

    /// Cancel the run at the first error-severity failure
    #[arg(long)]
    pub fail_fast: bool,

    #[arg(long)]
    pub verbose: bool,

    /// Machine-readable output on stdout
    #[arg(long)]
    pub json: bool,

    /// Run only checks carrying one of these tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Skip checks carrying one of these tags
    #[arg(long, value_delimiter = ',')]
    pub exclude_tags: Vec<String>,

    /// Exit code for error-severity violations and timeouts
    #[arg(long, default_value_t = crate::exit_codes::DEFAULT_ERROR_EXIT_CODE)]
    pub error_exit_code: i32,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = "vibeguard.yaml")]
    pub config: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, default_value = "vibeguard.yaml")]
    pub config: PathBuf,

    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub exclude_tags: Vec<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct TagsArgs {
    #[arg(long, default_value = "vibeguard.yaml")]
    pub config: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PromptArgs {
    /// Prompt id; lists all prompts when omitted
    pub id: Option<String>,

    #[arg(long, default_value = "vibeguard.yaml")]
    pub config: PathBuf,

    #[arg(long)]
    pub json: bool,

    /// Include full content when listing
    #[arg(long)]
    pub verbose: bool,
}
