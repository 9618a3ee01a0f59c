//! Shell execution

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

/// Marker placed between standard output and standard error
pub const STDERR_MARKER: &str = "STDERR:\n-------\n";

/// Captured result of a shell command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    /// Spawn failure, non-zero exit or timeout
    pub error: Option<String>,
}

impl ShellOutput {
    /// Reply text, or `None` when both streams are blank
    pub fn render(&self) -> Option<String> {
        let has_stdout = !self.stdout.trim().is_empty();
        let has_stderr = !self.stderr.trim().is_empty();

        if !has_stdout && !has_stderr {
            return None;
        }

        let mut text = String::new();
        if has_stdout {
            text.push_str(&self.stdout);
        }
        if has_stderr {
            if has_stdout {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push('\n');
            }
            text.push_str(STDERR_MARKER);
            text.push_str(&self.stderr);
        }
        Some(text)
    }
}

/// Runs a command line through a shell program
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, shell: &str, command: &str, limit: Duration) -> ShellOutput;
}

/// `CommandRunner` backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, shell: &str, command: &str, limit: Duration) -> ShellOutput {
        let mut cmd = Command::new(shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ShellOutput {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // Buffers outlive the timed future so a timeout keeps what was read
        let finished = timeout(limit, async {
            tokio::join!(
                drain(stdout_pipe.as_mut(), &mut stdout),
                drain(stderr_pipe.as_mut(), &mut stderr)
            );
            child.wait().await
        })
        .await;

        let error = match finished {
            Ok(Ok(status)) => (!status.success()).then(|| format!("exit code: {:?}", status.code())),
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    warn!("could not kill timed out command: {}", e);
                }
                Some(format!("timed out after {:?}", limit))
            }
        };

        ShellOutput {
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            error,
        }
    }
}

/// Read `reader` into `buf` until end of stream
async fn drain<R: AsyncRead + Unpin>(reader: Option<&mut R>, buf: &mut Vec<u8>) {
    let Some(reader) = reader else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                warn!("error reading command output: {}", e);
                break;
            }
        }
    }
}
