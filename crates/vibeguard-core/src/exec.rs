//! Subprocess execution for checks.
//!
//! Commands run through `/bin/sh -c` so operators can use pipes, redirection,
//! and substitution; the `run` string is never tokenised. Each child gets its
//! own process group, so terminating a check takes down the whole pipeline
//! and not just the shell. Non-zero exit codes are data for the orchestrator,
//! not errors; only infrastructure failures (shell unavailable) surface as
//! [`ExecutionError`].

use crate::errors::ExecutionError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::debug;

/// Exit code recorded when the deadline expired.
pub const TIMEOUT_EXIT_CODE: i32 = 3;
/// Exit code recorded when the run was cancelled (fail-fast or caller).
pub const CANCEL_EXIT_CODE: i32 = -1;

/// Bounded wait between SIGTERM and SIGKILL during termination.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Outcome of one subprocess execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// stdout and stderr merged in emission order, line by line.
    pub combined: String,
    pub timed_out: bool,
    pub cancelled: bool,
    pub duration: Duration,
}

/// Runs check commands in a fixed working directory.
#[derive(Debug, Clone)]
pub struct Executor {
    workdir: PathBuf,
}

impl Executor {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `command` with a deadline, honouring run-level cancellation.
    pub async fn run(
        &self,
        command: &str,
        timeout: Duration,
        cancel: watch::Receiver<bool>,
    ) -> Result<ExecResult, ExecutionError> {
        let start = Instant::now();

        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child.id();
        debug!(command, pid, "spawned check subprocess");

        let combined = Arc::new(Mutex::new(String::new()));
        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");
        let out_task = tokio::spawn(drain(stdout, Arc::clone(&combined)));
        let err_task = tokio::spawn(drain(stderr, Arc::clone(&combined)));

        let mut timed_out = false;
        let mut cancelled = false;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let status = tokio::select! {
            res = child.wait() => Some(res?),
            _ = &mut deadline => {
                timed_out = true;
                None
            }
            _ = wait_cancelled(cancel) => {
                cancelled = true;
                None
            }
        };

        let status = match status {
            Some(status) => status,
            None => {
                // The child (and its pipeline) must die actively; waiting on
                // dropped handles is not enough on every platform.
                terminate(pid, &mut child).await?
            }
        };

        let stdout = out_task.await.unwrap_or_default();
        let stderr = err_task.await.unwrap_or_default();
        let combined = combined.lock().map(|c| c.clone()).unwrap_or_default();

        let exit_code = if timed_out {
            TIMEOUT_EXIT_CODE
        } else if cancelled {
            CANCEL_EXIT_CODE
        } else {
            status.code().unwrap_or(CANCEL_EXIT_CODE)
        };

        Ok(ExecResult {
            exit_code,
            stdout,
            stderr,
            combined,
            timed_out,
            cancelled,
            duration: start.elapsed(),
        })
    }
}

/// Resolves when the run context flips to cancelled; pends forever when the
/// sender side goes away without cancelling.
async fn wait_cancelled(mut cancel: watch::Receiver<bool>) {
    if *cancel.borrow() {
        return;
    }
    loop {
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *cancel.borrow() {
            return;
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: R, combined: Arc<Mutex<String>>) -> String {
    let mut own = String::new();
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        own.push_str(&line);
        own.push('\n');
        if let Ok(mut all) = combined.lock() {
            all.push_str(&line);
            all.push('\n');
        }
    }
    own
}

/// SIGTERM the process group, wait out the grace period, then SIGKILL.
async fn terminate(
    pid: Option<u32>,
    child: &mut tokio::process::Child,
) -> Result<std::process::ExitStatus, ExecutionError> {
    signal_group(pid, false);
    match tokio::time::timeout(TERM_GRACE, child.wait()).await {
        Ok(res) => Ok(res?),
        Err(_) => {
            signal_group(pid, true);
            let _ = child.start_kill();
            Ok(child.wait().await?)
        }
    }
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, kill: bool) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    let sig = if kill { Signal::SIGKILL } else { Signal::SIGTERM };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), sig) {
        debug!(pid, ?sig, error = %e, "process group signal failed");
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: Option<u32>, _kill: bool) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cancel() -> watch::Receiver<bool> {
        // dropping the sender leaves the receiver pending forever
        watch::channel(false).1
    }

    fn executor() -> Executor {
        Executor::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let res = executor()
            .run("echo out; echo err >&2; exit 7", Duration::from_secs(5), no_cancel())
            .await
            .unwrap();
        assert_eq!(res.exit_code, 7);
        assert_eq!(res.stdout, "out\n");
        assert_eq!(res.stderr, "err\n");
        assert!(res.combined.contains("out"));
        assert!(res.combined.contains("err"));
        assert!(!res.timed_out);
        assert!(!res.cancelled);
    }

    #[tokio::test]
    async fn shell_features_are_available() {
        let res = executor()
            .run("printf 'a\\nb\\nc\\n' | wc -l | tr -d ' '", Duration::from_secs(5), no_cancel())
            .await
            .unwrap();
        assert_eq!(res.exit_code, 0);
        assert_eq!(res.stdout.trim(), "3");
    }

    #[tokio::test]
    async fn deadline_expiry_sets_timeout_flag_and_code() {
        let start = Instant::now();
        let res = executor()
            .run("sleep 5", Duration::from_millis(100), no_cancel())
            .await
            .unwrap();
        assert!(res.timed_out);
        assert!(!res.cancelled);
        assert_eq!(res.exit_code, TIMEOUT_EXIT_CODE);
        assert!(start.elapsed() < Duration::from_secs(4), "termination must not wait the sleep out");
    }

    #[tokio::test]
    async fn cancellation_sets_cancel_flag_and_code() {
        let (tx, rx) = watch::channel(false);
        let exec = executor();
        let task = tokio::spawn(async move {
            exec.run("sleep 5", Duration::from_secs(30), rx).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        let res = task.await.unwrap().unwrap();
        assert!(res.cancelled);
        assert!(!res.timed_out);
        assert_eq!(res.exit_code, CANCEL_EXIT_CODE);
    }

    #[tokio::test]
    async fn timeout_takes_the_whole_pipeline_down() {
        // the sleep runs as a sibling of the shell in the same group
        let start = Instant::now();
        let res = executor()
            .run("sleep 30 & wait", Duration::from_millis(100), no_cancel())
            .await
            .unwrap();
        assert!(res.timed_out);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_shell_binary_is_not_an_infrastructure_error() {
        // the shell itself exists; an unknown command is a normal failure
        let res = executor()
            .run("definitely-not-a-command-xyz", Duration::from_secs(5), no_cancel())
            .await
            .unwrap();
        assert_ne!(res.exit_code, 0);
        assert!(!res.stderr.is_empty() || !res.combined.is_empty());
    }
}
