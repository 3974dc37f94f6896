//! Command Runner (spec §4.1).
//!
//! Runs an external program with a deadline and captures stdout/stderr and
//! the exit code. Generalized from
//! `vx_ecosystem_pm::utils::run_command` (argv + env assembly, captured
//! output) and `vx_system_pm::managers::chocolatey::run_choco` (fixed-argv
//! subprocess dispatch), moved onto `tokio::process` + `tokio::time::timeout`
//! so it composes with the rest of the async stack.

use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Standard timeouts (spec §4.1 "Standard timeouts").
pub const LIST_TIMEOUT: Duration = Duration::from_secs(60);
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);
pub const UNINSTALL_TIMEOUT: Duration = Duration::from_secs(180);

/// Structured result of running a command (spec §4.1).
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Best-effort human message: stderr first, then stdout, then a
    /// generic fallback (spec §4.7 step 4).
    pub fn message_or_fallback(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim().to_string()
        } else if !self.stdout.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            format!("exit code {}", self.code)
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    /// Binary missing from PATH (spec §4.1 `NotFound`).
    #[error("{program} not found on PATH — the {ecosystem} package manager is not installed")]
    NotFound { program: String, ecosystem: String },

    /// Deadline exceeded; the child was terminated and any partial output
    /// is returned (spec §4.1 `Timeout`).
    #[error("{program} timed out after {timeout:?}")]
    Timeout {
        program: String,
        timeout: Duration,
        partial: CommandOutput,
    },

    /// Any other OS error spawning the child (spec §4.1 `Spawn`).
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The caller's `CancellationToken` fired before the child exited;
    /// it was terminated and any partial output is returned (spec §5
    /// "in-flight subprocesses are terminated and their partial output
    /// discarded").
    #[error("{program} was cancelled")]
    Cancelled { program: String, partial: CommandOutput },
}

pub type Result<T> = std::result::Result<T, RunError>;

/// A single command invocation, built up before running (mirrors the
/// builder style of `vx_system_pm::managers::PackageInstallSpec`).
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    /// Windows quirk: `.cmd`/`.bat` wrappers (notably `npm.cmd`) must be
    /// spawned through the platform shell (spec §4.1).
    use_shell: bool,
    /// Human name of the ecosystem this command belongs to, used only to
    /// produce a helpful `NotFound` message.
    ecosystem: String,
    cancel: Option<CancellationToken>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, ecosystem: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: LIST_TIMEOUT,
            use_shell: false,
            ecosystem: ecosystem.into(),
            cancel: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn use_shell(mut self, use_shell: bool) -> Self {
        self.use_shell = use_shell;
        self
    }

    /// Make this invocation cooperatively cancellable: if `token` fires
    /// before the child exits, `run()` terminates it and returns
    /// `RunError::Cancelled` with whatever partial output had been
    /// buffered so far (spec §5 "Cancellation").
    pub fn cancellable(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the invocation to completion, or until its deadline expires.
    pub async fn run(&self) -> Result<CommandOutput> {
        if which::which(&self.program).is_err() && !self.use_shell {
            return Err(RunError::NotFound {
                program: self.program.clone(),
                ecosystem: self.ecosystem.clone(),
            });
        }

        let mut cmd = self.build_command();
        debug!(program = %self.program, args = ?self.args, "spawning command");

        let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                // No token supplied: never resolves, so the `select!`
                // below reduces to the plain timeout-vs-exit race.
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = tokio::time::timeout(self.timeout, child.wait()) => match result {
                Ok(Ok(status)) => {
                    let stdout = stdout_task.await.unwrap_or_default();
                    let stderr = stderr_task.await.unwrap_or_default();
                    Ok(CommandOutput {
                        code: status.code().unwrap_or(-1),
                        stdout: String::from_utf8_lossy(&stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    })
                }
                Ok(Err(source)) => Err(RunError::Spawn {
                    program: self.program.clone(),
                    source,
                }),
                Err(_) => {
                    warn!(program = %self.program, timeout = ?self.timeout, "command timed out");
                    let partial = Self::collect_partial(&mut child, stdout_task, stderr_task).await;
                    Err(RunError::Timeout {
                        program: self.program.clone(),
                        timeout: self.timeout,
                        partial,
                    })
                }
            },
            _ = cancelled => {
                debug!(program = %self.program, "command cancelled");
                let partial = Self::collect_partial(&mut child, stdout_task, stderr_task).await;
                Err(RunError::Cancelled { program: self.program.clone(), partial })
            }
        }
    }

    /// Terminate the child and salvage whatever output the reader tasks had
    /// already buffered (spec §4.1 "the child is terminated and any partial
    /// output returned").
    async fn collect_partial(
        child: &mut Child,
        stdout_task: tokio::task::JoinHandle<Vec<u8>>,
        stderr_task: tokio::task::JoinHandle<Vec<u8>>,
    ) -> CommandOutput {
        let _ = child.start_kill();
        let grace = Duration::from_millis(200);
        let stdout = tokio::time::timeout(grace, stdout_task)
            .await
            .ok()
            .and_then(|r| r.ok())
            .unwrap_or_default();
        let stderr = tokio::time::timeout(grace, stderr_task)
            .await
            .ok()
            .and_then(|r| r.ok())
            .unwrap_or_default();
        CommandOutput {
            code: -1,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
    }

    #[cfg(windows)]
    fn build_command(&self) -> Command {
        let mut cmd = if self.use_shell {
            let mut shell = Command::new("cmd");
            shell.arg("/C").arg(&self.program);
            shell.args(&self.args);
            shell
        } else {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.args);
            cmd
        };
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd
    }

    #[cfg(not(windows))]
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd
    }
}
