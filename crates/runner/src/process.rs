//! Process launching seam.
//!
//! [`EngineLauncher`] starts the engine and hands back an [`EngineProcess`]
//! yielding raw output lines. [`ShellLauncher`] is the production
//! implementation; tests inject scripted launchers instead.

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

use crate::command::EngineCommand;

/// A running engine with a single combined output stream.
#[async_trait]
pub trait EngineProcess: Send {
    /// OS process id, if the process is still tracked.
    fn id(&self) -> Option<u32>;

    /// Next raw output line including its terminator. `Ok(None)` at end of
    /// stream.
    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Ask the process (and everything it started) to stop. Does not wait
    /// for it to exit.
    async fn terminate(&mut self) -> io::Result<()>;

    /// Wait for exit after the stream closed. Returns the exit code when
    /// the platform reports one.
    async fn wait(&mut self) -> io::Result<Option<i32>>;
}

#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Start `command` in `working_dir`.
    ///
    /// I/O errors are transient: the supervisor retries them.
    async fn launch(
        &self,
        command: &EngineCommand,
        working_dir: &Path,
    ) -> io::Result<Box<dyn EngineProcess>>;
}

// ---------------------------------------------------------------------------
// ShellLauncher
// ---------------------------------------------------------------------------

/// Runs the command line through the platform shell with stderr merged into
/// stdout and stdin closed.
///
/// On Unix the shell leads a new process group so cancellation can signal
/// the engine together with the shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellLauncher;

impl ShellLauncher {
    #[cfg(unix)]
    fn shell_command(command_line: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("exec 2>&1; {command_line}"))
            .process_group(0);
        cmd
    }

    #[cfg(windows)]
    fn shell_command(command_line: &str) -> Command {
        let mut cmd = Command::new("cmd");
        // cmd keeps inner quotes only when the whole line is quoted once more.
        cmd.arg("/C").raw_arg(format!("\"{command_line} 2>&1\""));
        cmd
    }
}

#[async_trait]
impl EngineLauncher for ShellLauncher {
    async fn launch(
        &self,
        command: &EngineCommand,
        working_dir: &Path,
    ) -> io::Result<Box<dyn EngineProcess>> {
        let mut cmd = Self::shell_command(&command.command_line());
        cmd.current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "engine stdout not captured"))?;

        tracing::debug!(pid = ?child.id(), dir = %working_dir.display(), "Engine shell spawned");

        Ok(Box::new(ShellProcess {
            child,
            stdout: BufReader::new(stdout),
        }))
    }
}

struct ShellProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
}

#[async_trait]
impl EngineProcess for ShellProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let read = self.stdout.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(buf))
    }

    async fn terminate(&mut self) -> io::Result<()> {
        match self.child.id() {
            Some(pid) => terminate_tree(pid).await,
            None => Ok(()),
        }
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}

/// Send `SIGTERM` to the process group led by `pid`.
#[cfg(unix)]
async fn terminate_tree(pid: u32) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: killpg has no memory-safety preconditions; the group was
    // created for this child by `process_group(0)`.
    let rc = unsafe { libc::killpg(pgid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Force-kill the process tree rooted at `pid`.
#[cfg(windows)]
async fn terminate_tree(pid: u32) -> io::Result<()> {
    let status = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("taskkill exited with {status}")))
    }
}
