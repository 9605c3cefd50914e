//! Child-process execution.
//!
//! The [`ProcessExecutor`] trait is the seam between command-line assembly and
//! the operating system. [`SystemExecutor`] hands the command line to the
//! platform shell (`sh -c` or `cmd /C`) with three pipes:
//!
//! - stdin is closed right after spawn;
//! - stdout and stderr are drained on two reader threads while the child runs,
//!   so a child that fills one pipe while we wait on the other cannot deadlock;
//! - both readers are joined once the child has exited.
//!
//! An optional deadline kills the child's process tree (the process group on
//! unix, `taskkill /T` on Windows) and reports [`RunError::TimedOut`]. After a
//! timeout the reader threads are detached rather than joined: on Windows the
//! tool started by `start /B` holds its own copy of the pipes.

use super::escape::ShellFlavor;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A fully assembled command line ready to hand to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Resolved binary; checked before the shell is spawned.
    pub program: PathBuf,
    /// Complete command line, including the escaped program.
    pub command_line: String,
    pub working_dir: PathBuf,
    pub flavor: ShellFlavor,
    pub timeout: Option<Duration>,
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("could not start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Runs an [`Invocation`] and captures its output.
pub trait ProcessExecutor: Sync {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunError>;
}

/// Executes through the host shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessExecutor for SystemExecutor {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunError> {
        resolve_program(&invocation.program, &invocation.working_dir)?;

        let mut command = shell_command(invocation.flavor, &invocation.command_line);
        command
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate_process_group(&mut command);

        let mut child = command.spawn().map_err(|source| RunError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        drop(child.stdin.take());

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = wait(&mut child, invocation.timeout);
        finish(status, stdout, stderr)
    }
}

type Reader = Option<JoinHandle<io::Result<Vec<u8>>>>;

/// Collects both streams once the child has exited.
///
/// On any wait error the readers are dropped unjoined, so a descendant that
/// outlived the kill cannot hold up the caller.
fn finish(
    status: Result<ExitStatus, RunError>,
    stdout: Reader,
    stderr: Reader,
) -> Result<ProcessOutput, RunError> {
    let status = status?;
    Ok(ProcessOutput {
        exit_code: status.code(),
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    })
}

/// Confirms the binary can be started, relative to the working directory.
fn resolve_program(program: &Path, working_dir: &Path) -> Result<PathBuf, RunError> {
    which::which_in(program, std::env::var_os("PATH"), working_dir).map_err(|e| {
        RunError::Spawn {
            program: program.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, e.to_string()),
        }
    })
}

fn shell_command(flavor: ShellFlavor, command_line: &str) -> Command {
    match flavor {
        ShellFlavor::Posix => {
            let mut command = Command::new("sh");
            command.arg("-c").arg(command_line);
            command
        }
        ShellFlavor::Windows => {
            let mut command = Command::new("cmd");
            command.arg("/C");
            #[cfg(windows)]
            {
                use std::os::windows::process::CommandExt;
                command.raw_arg(command_line);
            }
            #[cfg(not(windows))]
            command.arg(command_line);
            command
        }
    }
}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

/// Joins a reader thread; malformed UTF-8 is replaced rather than rejected.
fn collect(reader: Reader) -> io::Result<String> {
    let Some(handle) = reader else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, RunError> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            terminate(child);
            return Err(RunError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kills the child and everything it started, then reaps it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        // SAFETY: the child leads its own process group (see isolate_process_group).
        unsafe {
            libc::kill(-(child.id() as libc::pid_t), libc::SIGKILL);
        }
    }
    #[cfg(windows)]
    {
        let killed = Command::new("taskkill")
            .args(["/T", "/F", "/PID"])
            .arg(child.id().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = killed {
            tracing::warn!(pid = child.id(), error = %e, "taskkill failed; killing cmd only");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
