//! Package-manager install/upgrade of the generation library.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::interpreter::InterpreterCandidate;
use super::process::{CommandRunner, CommandSpec};
use super::version::{InstalledVersionSource, PythonPackageMetadata};
use super::BootstrapError;

/// Package manager module run through the interpreter.
pub const PACKAGE_MANAGER: &str = "pip";

/// Number of trailing stderr characters kept for diagnostics.
pub const STDERR_TAIL_CHARS: usize = 600;

/// Exit code reported when the package manager never produced one.
pub const NO_EXIT_CODE: i32 = -1;

/// Result of one package-manager run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub exit_code: i32,
    /// At most [`STDERR_TAIL_CHARS`] trailing characters of stderr.
    pub stderr_tail: String,
    /// Installed version queried after a successful run.
    pub new_version: Option<String>,
}

impl InstallOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn failed(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stderr_tail: stderr_tail(stderr),
            new_version: None,
        }
    }
}

/// Last [`STDERR_TAIL_CHARS`] characters of trimmed `stderr`.
///
/// Counts characters rather than bytes so a multi-byte sequence is never
/// split.
pub fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    trimmed
        .chars()
        .skip(count.saturating_sub(STDERR_TAIL_CHARS))
        .collect()
}

/// Runs `<interpreter> -m pip install --upgrade <package>`.
pub struct Installer {
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl Installer {
    /// Installer without a timeout: the call blocks until pip exits.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_for(interpreter: &InterpreterCandidate, package: &str) -> CommandSpec {
        CommandSpec::new(interpreter.path())
            .args(["-m", PACKAGE_MANAGER, "install", "--upgrade"])
            .arg(package)
    }

    /// Install or upgrade `package`.
    ///
    /// Without an interpreter nothing is spawned and
    /// [`BootstrapError::ResolverFailure`] is returned. Every other problem,
    /// including a failure to launch the process, is reported through the
    /// returned [`InstallOutcome`].
    pub fn install_or_upgrade(
        &self,
        interpreter: Option<&InterpreterCandidate>,
        package: &str,
    ) -> Result<InstallOutcome, BootstrapError> {
        let interpreter = interpreter.ok_or(BootstrapError::ResolverFailure)?;
        let spec = Self::command_for(interpreter, package);
        info!(command = %spec, "Running package manager");

        let output = match self.runner.run(&spec, self.timeout) {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %spec, error = %e, "Package manager could not be launched");
                return Ok(InstallOutcome::failed(NO_EXIT_CODE, &format!("{:?}: {}", e.kind(), e)));
            }
        };

        let exit_code = output.exit_code.unwrap_or(NO_EXIT_CODE);
        if exit_code != 0 {
            warn!(exit_code, package, "Package manager failed");
            return Ok(InstallOutcome::failed(exit_code, &output.stderr));
        }

        let metadata = PythonPackageMetadata::new(Some(interpreter.clone()), self.runner.clone());
        let new_version = metadata.installed_version(package);
        info!(package, version = ?new_version, "Package manager finished");

        Ok(InstallOutcome {
            exit_code,
            stderr_tail: stderr_tail(&output.stderr),
            new_version,
        })
    }
}
