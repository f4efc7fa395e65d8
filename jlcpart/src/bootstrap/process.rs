//! Subprocess execution seam.
//!
//! Package-manager runs and generation-library calls both go through
//! [`CommandRunner`], so the orchestration can be tested with scripted
//! runners and a future caller can move the work off the control thread.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// A program and its argv, executed without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument (builder pattern).
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments (builder pattern).
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a command to completion and captures its output.
pub trait CommandRunner: Send + Sync {
    /// Run `spec`, blocking until it exits.
    ///
    /// With `timeout: None` the call waits indefinitely. When a timeout
    /// elapses the child is killed (on every platform) and an
    /// [`io::ErrorKind::TimedOut`] error is returned. Spawn failures
    /// (missing executable, permission denied) are returned as the
    /// underlying I/O error.
    fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> io::Result<CommandOutput>;
}

/// Interval between exit checks while a timeout is running.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    /// Drain a child pipe on its own thread so a full pipe never blocks the child.
    fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = pipe {
                let _ = pipe.read_to_end(&mut buf);
            }
            buf
        })
    }

    /// Poll until the child exits; kill it once `limit` has elapsed.
    fn wait_bounded(child: &mut Child, spec: &CommandSpec, limit: Duration) -> io::Result<ExitStatus> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                child.kill()?;
                // Reap so no zombie is left behind.
                let _ = child.wait();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} did not finish within {}s", spec, limit.as_secs()),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> io::Result<CommandOutput> {
        let mut command = spec.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        let stdout = Self::drain(child.stdout.take());
        let stderr = Self::drain(child.stderr.take());

        let status = match timeout {
            None => child.wait(),
            Some(limit) => Self::wait_bounded(&mut child, spec, limit),
        };

        // On timeout the readers are left detached: a grandchild may still
        // hold the pipes open.
        let status = status?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        Ok(CommandOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}
