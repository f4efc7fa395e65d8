//! Bootstrap of the generation library.
//!
//! Resolves an interpreter able to run the package manager, reconciles the
//! installed and published library versions, and installs or upgrades the
//! library on request.
//!
//! # State machine
//!
//! ```text
//! Unresolved -> Resolving -> Resolved | Unresolvable
//! Resolved   -> Installing -> Installed | InstallFailed
//! ```
//!
//! `Unresolvable` and `InstallFailed` end an attempt. A later user action
//! may start over with [`Bootstrapper::resolve`]; no retry state is kept.

mod installer;
mod interpreter;
mod process;
mod version;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::error::{manual_install_hint, FailureKind, UserFacing};

pub use installer::{stderr_tail, InstallOutcome, Installer, STDERR_TAIL_CHARS};
pub use interpreter::{
    default_known_locations, is_runtime_executable, InterpreterCandidate, InterpreterProbe,
    InterpreterResolver, InterpreterSource, SystemProbe, HOST_MARKER, RUNTIME_MARKER,
};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use version::{
    InstalledVersionSource, LatestVersionSource, PackageIndexClient, PythonPackageMetadata,
    VersionDirection, VersionInfo, VersionReconciler, VersionStatus, DEFAULT_INDEX_URL,
    DEFAULT_VERSION_TIMEOUT,
};

#[cfg(test)]
pub(crate) use process::tests::ScriptedRunner;
#[cfg(test)]
pub(crate) use version::tests::FixedVersion;

/// Bootstrap failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BootstrapError {
    /// No interpreter able to run the package manager was found.
    #[error("no Python interpreter able to run pip was found")]
    ResolverFailure,

    /// The package manager ran and failed.
    #[error("package manager exited with code {}", .0.exit_code)]
    InstallFailure(InstallOutcome),
}

impl UserFacing for BootstrapError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::ResolverFailure => FailureKind::ResolverFailure,
            Self::InstallFailure(_) => FailureKind::InstallFailure,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::ResolverFailure => format!(
                "Could not find a Python executable for pip.\n\n{}",
                manual_install_hint()
            ),
            Self::InstallFailure(outcome) => format!(
                "Automatic install/update did not complete successfully.\n\n\
                 pip exit code: {}\n{}\n\n{}",
                outcome.exit_code,
                outcome.stderr_tail,
                manual_install_hint()
            ),
        }
    }
}

/// Bootstrap progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Unresolved,
    Resolving,
    Resolved,
    Unresolvable,
    Installing,
    Installed,
    InstallFailed,
}

impl BootstrapState {
    /// Whether the current attempt has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Unresolvable | Self::Installed | Self::InstallFailed
        )
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unresolved => "not resolved",
            Self::Resolving => "resolving interpreter",
            Self::Resolved => "interpreter found",
            Self::Unresolvable => "no interpreter",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::InstallFailed => "install failed",
        };
        f.write_str(label)
    }
}

/// What an install/upgrade attempt achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateReport {
    /// Versions already matched; the package manager was not run.
    UpToDate { version: String },
    /// The library was missing and is now installed.
    Installed { version: Option<String> },
    /// A different version is now installed.
    Upgraded { from: String, to: String },
    /// The package manager ran but the version did not change, or the
    /// new version could not be read back.
    AlreadyCurrent { version: String },
    /// The user declined the install/upgrade.
    Declined,
}

impl UpdateReport {
    /// Whether the package manager ran successfully, so any cached library
    /// binding must be reset.
    pub fn requires_rebind(&self) -> bool {
        !matches!(self, Self::UpToDate { .. } | Self::Declined)
    }

    /// Message shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::UpToDate { version } | Self::AlreadyCurrent { version } => {
                format!("JLC2KiCad library is already up to date (v{}).", version)
            }
            Self::Installed { version } => format!(
                "JLC2KiCad library installed (v{}).",
                version.as_deref().unwrap_or("unknown")
            ),
            Self::Upgraded { from, to } => format!(
                "JLC2KiCad library upgraded.\nVersion: {} -> {}\n\
                 Restart to load the new version.",
                from, to
            ),
            Self::Declined => "JLC2KiCad library was not changed.".to_string(),
        }
    }
}

/// Confirmation question for an install/upgrade.
pub fn upgrade_prompt(info: &VersionInfo) -> String {
    match &info.installed {
        None => "JLC2KiCad library is missing.\n\nInstall JLC2KiCadLib now?".to_string(),
        Some(current) => {
            let mut prompt = format!("Upgrade JLC2KiCad library now?\nCurrent version: {}", current);
            if let Some(latest) = &info.latest {
                prompt.push_str(&format!("\nLatest version: {}", latest));
            }
            prompt
        }
    }
}

/// Settings for a [`Bootstrapper`].
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Package installed by the package manager.
    pub package: String,
    /// Bound on the package-manager run; `None` blocks until it exits.
    pub install_timeout: Option<Duration>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            package: crate::config::DEFAULT_PACKAGE.to_string(),
            install_timeout: None,
        }
    }
}

/// Drives interpreter resolution, version checks and installs.
pub struct Bootstrapper {
    config: BootstrapConfig,
    source: Box<dyn InterpreterSource>,
    runner: Arc<dyn CommandRunner>,
    latest: Arc<dyn LatestVersionSource>,
    state: BootstrapState,
    interpreter: Option<InterpreterCandidate>,
}

impl Bootstrapper {
    pub fn new(
        config: BootstrapConfig,
        source: Box<dyn InterpreterSource>,
        runner: Arc<dyn CommandRunner>,
        latest: Arc<dyn LatestVersionSource>,
    ) -> Self {
        Self {
            config,
            source,
            runner,
            latest,
            state: BootstrapState::Unresolved,
            interpreter: None,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn package(&self) -> &str {
        &self.config.package
    }

    /// The interpreter found by the last [`resolve`](Self::resolve).
    pub fn interpreter(&self) -> Option<&InterpreterCandidate> {
        self.interpreter.as_ref()
    }

    /// Shared subprocess runner.
    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        self.runner.clone()
    }

    /// Resolve the interpreter, starting a new attempt.
    pub fn resolve(&mut self) -> Option<&InterpreterCandidate> {
        self.state = BootstrapState::Resolving;
        self.interpreter = self.source.resolve_interpreter();
        self.state = if self.interpreter.is_some() {
            BootstrapState::Resolved
        } else {
            BootstrapState::Unresolvable
        };
        self.interpreter.as_ref()
    }

    fn ensure_resolved(&mut self) {
        if self.state == BootstrapState::Unresolved {
            self.resolve();
        }
    }

    /// Version reconciler bound to the resolved interpreter.
    pub fn reconciler(&mut self) -> VersionReconciler {
        self.ensure_resolved();
        VersionReconciler::new(
            self.config.package.clone(),
            Arc::new(PythonPackageMetadata::new(
                self.interpreter.clone(),
                self.runner.clone(),
            )),
            self.latest.clone(),
        )
    }

    /// Installed version only; no network access.
    pub fn installed_version(&mut self) -> Option<String> {
        self.reconciler().installed_version()
    }

    /// Installed and latest versions.
    pub fn check_versions(&mut self) -> VersionInfo {
        self.reconciler().check()
    }

    /// Run the package manager.
    ///
    /// A non-zero exit is returned as [`BootstrapError::InstallFailure`]
    /// carrying the outcome.
    pub fn install(&mut self) -> Result<InstallOutcome, BootstrapError> {
        self.ensure_resolved();
        let Some(interpreter) = self.interpreter.clone() else {
            self.state = BootstrapState::Unresolvable;
            warn!("Install requested without a usable interpreter");
            return Err(BootstrapError::ResolverFailure);
        };

        self.state = BootstrapState::Installing;
        let installer = Installer::new(self.runner.clone()).with_timeout(self.config.install_timeout);
        let outcome = installer.install_or_upgrade(Some(&interpreter), &self.config.package)?;

        if outcome.success() {
            self.state = BootstrapState::Installed;
            Ok(outcome)
        } else {
            self.state = BootstrapState::InstallFailed;
            Err(BootstrapError::InstallFailure(outcome))
        }
    }

    /// Install when the library is missing.
    pub fn install_missing(&mut self) -> Result<UpdateReport, BootstrapError> {
        let outcome = self.install()?;
        Ok(UpdateReport::Installed {
            version: outcome.new_version,
        })
    }

    /// Check versions and install/upgrade unless already up to date.
    ///
    /// `confirm` is asked before the package manager runs. When the
    /// published version cannot be fetched, an upgrade is still offered; the
    /// returned status tells that case apart from a real mismatch.
    pub fn check_for_updates(
        &mut self,
        confirm: impl FnOnce(&VersionInfo) -> bool,
    ) -> Result<(VersionStatus, UpdateReport), BootstrapError> {
        let info = self.check_versions();
        let status = info.status();

        if let VersionStatus::UpToDate { version } = &status {
            info!(version = %version, "Library is up to date");
            let report = UpdateReport::UpToDate {
                version: version.clone(),
            };
            return Ok((status, report));
        }

        if !confirm(&info) {
            info!("Library update declined");
            return Ok((status, UpdateReport::Declined));
        }

        let outcome = self.install()?;
        // An unreadable new version falls back to the old one.
        let report = match (info.installed, outcome.new_version) {
            (None, version) => UpdateReport::Installed { version },
            (Some(old), None) => UpdateReport::AlreadyCurrent { version: old },
            (Some(old), Some(new)) if old == new => UpdateReport::AlreadyCurrent { version: new },
            (Some(old), Some(new)) => UpdateReport::Upgraded { from: old, to: new },
        };
        info!(report = ?report, "Library install/upgrade finished");
        Ok((status, report))
    }
}
