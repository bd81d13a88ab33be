//! Exit codes are coarse and stable for pre-commit hooks and CI pipelines.
//!
//! Error-severity violations and timeouts exit with the configurable
//! `--error-exit-code` (default 1); these constants cover the fixed ends of
//! the contract.

/// All executed checks passed.
pub const SUCCESS: i32 = 0;

/// Default exit code for error-severity violations and timeouts.
pub const DEFAULT_ERROR_EXIT_CODE: i32 = 1;

/// Configuration or loading error; no checks ran.
pub const CONFIG_ERROR: i32 = 2;
