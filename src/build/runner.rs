//! External build tool invocation using [`tokio::process::Command`].
//!
//! The runner only reports what the process printed.  Whether a build
//! succeeded is decided by the caller, by looking for the artifact on disk.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Runs a program to completion and hands back its combined output.
#[async_trait::async_trait]
pub trait BuildRunner: Send + Sync {
    /// Execute `program` with `args`, wait for it to exit, and return
    /// stdout followed by stderr.  Exit status is not an error.
    async fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Subprocess implementation
// ---------------------------------------------------------------------------

/// [`BuildRunner`] that spawns a real subprocess.
///
/// Dropping the returned future drops the child's output pipes, and a tool
/// that keeps writing then dies of `SIGPIPE`.  Run it on a spawned task when
/// the build must outlive its caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

#[async_trait::async_trait]
impl BuildRunner for CommandRunner {
    #[instrument(skip(self, args), fields(%program))]
    async fn run(&self, program: &str, args: &[String]) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args);

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(?args, "spawning build tool");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to spawn {program}"))?;

        if !output.status.success() {
            warn!(status = %output.status, "build tool exited with non-zero status");
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let output = CommandRunner
            .run("sh", &args(&["-c", "echo built; echo warning >&2"]))
            .await
            .unwrap();
        assert!(output.contains("built"));
        assert!(output.contains("warning"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let output = CommandRunner
            .run("sh", &args(&["-c", "echo failing; exit 3"]))
            .await
            .unwrap();
        assert!(output.contains("failing"));
    }

    #[tokio::test]
    async fn spawned_run_outlives_dropped_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("built");
        let script = format!(
            "sleep 0.3; echo building; echo done >&2; touch '{}'",
            marker.display()
        );

        let task = tokio::spawn(async move {
            CommandRunner.run("sh", &args(&["-c", &script])).await
        });
        drop(task);

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let err = CommandRunner
            .run("/nonexistent/prebid-build-tool", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }
}
