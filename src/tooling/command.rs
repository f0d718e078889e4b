use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured output of one subprocess run. Never persisted beyond the call
/// that produced it.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Run a program with arguments and capture its output. A non-zero exit is
/// not an error here; it is reported through `exit_code`/`success`.
pub async fn run(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandResult> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|e| Error::Subprocess(format!("failed to run {program}: {e}")))?;

    let exit_code = output.status.code().unwrap_or(-1);
    Ok(CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code,
        success: output.status.success(),
    })
}

/// Run a full shell line through `sh -c`.
pub async fn run_shell(line: &str, cwd: Option<&Path>) -> Result<CommandResult> {
    run("sh", &["-c", line], cwd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_reports_success() {
        let result = run("echo", &["hello"], None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let result = run_shell("exit 3", None).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn missing_binary_is_a_subprocess_error() {
        let err = run("definitely-not-a-real-binary", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Subprocess(_)));
    }
}
