//! Command execution: unprivileged shell commands and elevated ones.

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Result, TrustError};
use crate::platform::Platform;

/// Captured result of one shell invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        }
    }
}

/// Runs a host shell command line to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command_line: &str) -> Result<CommandOutput>;
}

/// Quote one argument for the shell of `platform`.
pub fn quote_arg(platform: Platform, arg: &str) -> String {
    match platform {
        Platform::Windows => format!("\"{}\"", arg.replace('"', "\"\"")),
        Platform::MacOs | Platform::Linux => shell_words::quote(arg).into_owned(),
    }
}

fn shell_command(command_line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        cmd
    }
}

async fn capture(mut cmd: Command, command_line: &str) -> Result<Output> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| TrustError::CommandFailed {
            command: command_line.to_string(),
            message: format!("spawn: {e}"),
        })
}

/// Unprivileged runner. A non-zero exit status is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command_line: &str) -> Result<CommandOutput> {
        tracing::debug!(command = command_line, "exec");
        let output = capture(shell_command(command_line), command_line).await?;
        let result = CommandOutput::from_output(&output);
        if !result.success {
            let stderr = result.stderr.trim();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.to_string()
            };
            return Err(TrustError::CommandFailed {
                command: command_line.to_string(),
                message,
            });
        }
        Ok(result)
    }
}

/// Runner that escalates privilege, prompting for consent where the host
/// does so. Exit status is folded into `stderr`: callers judge the result by
/// stderr text only.
#[derive(Debug, Clone, Default)]
pub struct ElevatedRunner {
    label: Option<String>,
}

impl ElevatedRunner {
    /// `label` brands the consent prompt where the host supports it.
    pub fn new(label: Option<String>) -> Self {
        Self { label }
    }

    #[cfg(target_os = "macos")]
    async fn spawn(&self, command_line: &str) -> Result<Output> {
        let escaped = command_line.replace('\\', "\\\\").replace('"', "\\\"");
        let prompt = match &self.label {
            Some(l) => format!(" with prompt \"{} wants to make changes.\"", l.replace('"', "")),
            None => String::new(),
        };
        let mut cmd = Command::new("osascript");
        cmd.args([
            "-e",
            &format!("do shell script \"{escaped}\"{prompt} with administrator privileges"),
        ]);
        capture(cmd, command_line).await
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    async fn spawn(&self, command_line: &str) -> Result<Output> {
        // SAFETY: geteuid has no preconditions.
        let is_root = unsafe { libc::geteuid() } == 0;
        let cmd = if is_root {
            shell_command(command_line)
        } else {
            let mut cmd = Command::new("pkexec");
            cmd.args(["sh", "-c", command_line]);
            cmd
        };
        capture(cmd, command_line).await
    }

    #[cfg(windows)]
    async fn spawn(&self, command_line: &str) -> Result<Output> {
        // Start-Process -Verb RunAs detaches the child's pipes, so the batch
        // file redirects into files that are read back afterwards.
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("stdout.txt");
        let err = dir.path().join("stderr.txt");
        let script = dir.path().join("elevated.cmd");
        tokio::fs::write(&script, elevated_script(command_line, &out, &err)).await?;
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-Command", &run_as_command(&script)]);
        let mut output = capture(cmd, command_line).await?;
        output.stdout = read_captured(&out).await?;
        let mut stderr = read_captured(&err).await?;
        stderr.extend_from_slice(&output.stderr);
        output.stderr = stderr;
        Ok(output)
    }
}

/// Batch script running `command_line` with both streams redirected to files
/// and its exit code passed on. `%` is doubled so cmd does not expand it.
#[cfg_attr(not(windows), allow(dead_code))]
fn elevated_script(command_line: &str, out: &Path, err: &Path) -> String {
    format!(
        "@echo off\r\n{} > \"{}\" 2> \"{}\"\r\nexit /b %errorlevel%\r\n",
        command_line.replace('%', "%%"),
        out.display(),
        err.display()
    )
}

/// PowerShell that runs `script` elevated and exits with its exit code.
#[cfg_attr(not(windows), allow(dead_code))]
fn run_as_command(script: &Path) -> String {
    format!(
        "$p = Start-Process -FilePath '{}' -Verb RunAs -Wait -PassThru -WindowStyle Hidden; exit $p.ExitCode",
        script.display().to_string().replace('\'', "''")
    )
}

/// Contents of a redirect file. A missing file means the script never ran
/// (consent refused); the exit status then carries the failure.
#[cfg(windows)]
async fn read_captured(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Fold an elevated run into a `CommandOutput`: a failed exit with no stderr
/// gets one synthesized, quoting stdout where tools report errors there.
fn fold_exit_status(command_line: &str, output: &Output) -> CommandOutput {
    let mut result = CommandOutput::from_output(output);
    if !result.success && result.stderr.trim().is_empty() {
        let stdout = result.stdout.trim();
        result.stderr = if stdout.is_empty() {
            format!("`{command_line}` exited with {}", output.status)
        } else {
            format!("`{command_line}` exited with {}: {stdout}", output.status)
        };
    }
    result
}

#[async_trait]
impl CommandRunner for ElevatedRunner {
    async fn run(&self, command_line: &str) -> Result<CommandOutput> {
        tracing::debug!(command = command_line, label = ?self.label, "exec elevated");
        let output = self.spawn(command_line).await?;
        Ok(fold_exit_status(command_line, &output))
    }
}
