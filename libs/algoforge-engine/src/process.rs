//! Process Execution Adapter
//!
//! Spawns one fully-formed command (no shell in between), waits for it up to
//! a deadline, and hands back the captured streams. On unix every step runs
//! as the leader of its own process group, and when the deadline passes the
//! whole group gets SIGKILL, so anything the program forked dies with it.
//! `kill_on_drop` still covers the direct child everywhere else.
//!
//! This is the only containment applied to submitted programs: there is no
//! CPU, memory, or process-count ceiling beyond the wall clock.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Program, arguments and I/O wiring for one toolchain step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// File redirected into the child's stdin; `None` means /dev/null
    pub stdin: Option<PathBuf>,
    pub env_remove: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            env_remove: Vec::new(),
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn without_env(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    /// Shell-like rendering, for diagnostics only
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(stdin) = &self.stdin {
            write!(f, " < {}", stdin.display())?;
        }
        Ok(())
    }
}

/// Captured result of a command that ran to completion
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl ProcessOutput {
    /// Zero exit and nothing written to the diagnostic stream
    pub fn is_clean(&self) -> bool {
        self.status.success() && self.stderr.is_empty()
    }

    /// Human-readable failure text: stderr when there is any, otherwise a
    /// description of how the process ended
    pub fn diagnostic(&self, command: &CommandSpec) -> String {
        if !self.stderr.is_empty() {
            return self.stderr.clone();
        }
        format!("Command failed: {} ({})", command, describe_status(&self.status))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("the process did not finish before its deadline")]
    TimedOut,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open stdin file: {0}")]
    Stdin(#[source] io::Error),

    #[error("failed to collect process output: {0}")]
    Wait(#[source] io::Error),
}

pub fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {}", signal);
        }
    }
    "terminated abnormally".to_string()
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // every member already exited
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid = pid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Run `spec` to completion or until `deadline`, whichever comes first
pub async fn run_until(spec: &CommandSpec, deadline: Instant) -> Result<ProcessOutput, ProcessError> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    for key in &spec.env_remove {
        command.env_remove(key);
    }

    match &spec.stdin {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(ProcessError::Stdin)?
                .into_std()
                .await;
            command.stdin(Stdio::from(file));
        }
        None => {
            command.stdin(Stdio::null());
        }
    }

    let child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    let pid = child.id();
    debug!(command = %spec, pid = pid, "Spawned toolchain process");

    // Dropping the wait future on timeout drops the child, and kill_on_drop
    // reaps it.
    match tokio::time::timeout_at(deadline, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
        }),
        Ok(Err(e)) => Err(ProcessError::Wait(e)),
        Err(_) => {
            debug!(command = %spec, "Deadline reached, killing process group");
            kill_process_group(pid);
            Err(ProcessError::TimedOut)
        }
    }
}
