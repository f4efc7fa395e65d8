//! Installed vs. published version reconciliation.
//!
//! Both lookups collapse every failure to `None`: callers only need to know
//! whether a version is known, not why it is not.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::interpreter::InterpreterCandidate;
use super::process::{CommandRunner, CommandSpec};
use crate::http::HttpClient;

/// Default package-index endpoint. `{package}` is replaced by the package name.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi/{package}/json";

/// Default bound on the latest-version query.
pub const DEFAULT_VERSION_TIMEOUT: Duration = Duration::from_secs(4);

/// Prints the installed distribution version of `sys.argv[1]`.
const INSTALLED_VERSION_SCRIPT: &str =
    "import sys, importlib.metadata as m; print(m.version(sys.argv[1]))";

/// Source of the locally installed package version.
pub trait InstalledVersionSource {
    /// The installed version of `package`, or `None` if absent or unknown.
    fn installed_version(&self, package: &str) -> Option<String>;
}

/// Source of the latest published package version.
pub trait LatestVersionSource {
    /// The latest published version of `package`, or `None` on any failure.
    fn latest_version(&self, package: &str) -> Option<String>;
}

/// Reads installed package metadata through the resolved interpreter.
pub struct PythonPackageMetadata {
    interpreter: Option<InterpreterCandidate>,
    runner: Arc<dyn CommandRunner>,
}

impl PythonPackageMetadata {
    pub fn new(interpreter: Option<InterpreterCandidate>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            interpreter,
            runner,
        }
    }
}

impl InstalledVersionSource for PythonPackageMetadata {
    fn installed_version(&self, package: &str) -> Option<String> {
        let interpreter = self.interpreter.as_ref()?;
        let spec = CommandSpec::new(interpreter.path())
            .arg("-c")
            .arg(INSTALLED_VERSION_SCRIPT)
            .arg(package);

        match self.runner.run(&spec, None) {
            Ok(output) if output.success() => {
                let version = output.stdout.trim();
                (!version.is_empty()).then(|| version.to_string())
            }
            Ok(output) => {
                debug!(package, exit_code = ?output.exit_code, "Package metadata not found");
                None
            }
            Err(e) => {
                debug!(package, error = %e, "Package metadata query failed");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexDocument {
    info: IndexInfo,
}

#[derive(Debug, Deserialize)]
struct IndexInfo {
    version: String,
}

/// Queries a package index (PyPI JSON API) for the latest release.
///
/// The request timeout belongs to the injected [`HttpClient`]; build it with
/// [`DEFAULT_VERSION_TIMEOUT`] to keep the query bounded.
pub struct PackageIndexClient<C: HttpClient> {
    http: C,
    url_template: String,
}

impl<C: HttpClient> PackageIndexClient<C> {
    pub fn new(http: C) -> Self {
        Self::with_url_template(http, DEFAULT_INDEX_URL)
    }

    pub fn with_url_template(http: C, url_template: impl Into<String>) -> Self {
        Self {
            http,
            url_template: url_template.into(),
        }
    }
}

impl<C: HttpClient> LatestVersionSource for PackageIndexClient<C> {
    fn latest_version(&self, package: &str) -> Option<String> {
        let url = self.url_template.replace("{package}", package);
        let body = match self.http.get(&url) {
            Ok(body) => body,
            Err(e) => {
                debug!(package, error = %e, "Latest version lookup failed");
                return None;
            }
        };

        match serde_json::from_slice::<IndexDocument>(&body) {
            Ok(doc) => Some(doc.info.version),
            Err(e) => {
                debug!(package, error = %e, "Package index response malformed");
                None
            }
        }
    }
}

/// How a differing published version relates to the installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDirection {
    /// The published version is newer.
    Upgrade,
    /// The installed version is newer (pre-release or local build).
    Downgrade,
    /// At least one version is not semver.
    Unknown,
}

/// Classification of a [`VersionInfo`].
///
/// Only [`VersionStatus::UpToDate`] means "nothing to do". The other
/// variants all ask for install/upgrade, but keep the reason visible so a
/// caller can treat an unreachable index differently from a real mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    /// Installed and latest are both known and equal.
    UpToDate { version: String },
    /// The package is not installed.
    NotInstalled { latest: Option<String> },
    /// Installed, but the index could not be reached.
    LatestUnknown { installed: String },
    /// Both known and different.
    Mismatch {
        installed: String,
        latest: String,
        direction: VersionDirection,
    },
}

impl VersionStatus {
    /// Whether callers should offer install/upgrade.
    pub fn should_install(&self) -> bool {
        !matches!(self, Self::UpToDate { .. })
    }
}

/// Installed and latest versions of the generation library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub installed: Option<String>,
    pub latest: Option<String>,
}

impl VersionInfo {
    pub fn new(installed: Option<String>, latest: Option<String>) -> Self {
        Self { installed, latest }
    }

    /// "Up to date" iff both versions are present and equal.
    pub fn is_up_to_date(&self) -> bool {
        matches!((&self.installed, &self.latest), (Some(i), Some(l)) if i == l)
    }

    /// "JLC2KiCad library vX" or "JLC2KiCad library not installed".
    pub fn installed_text(&self) -> String {
        match &self.installed {
            Some(version) => format!("JLC2KiCad library v{}", version),
            None => "JLC2KiCad library not installed".to_string(),
        }
    }

    pub fn status(&self) -> VersionStatus {
        match (&self.installed, &self.latest) {
            (Some(i), Some(l)) if i == l => VersionStatus::UpToDate { version: i.clone() },
            (None, latest) => VersionStatus::NotInstalled {
                latest: latest.clone(),
            },
            (Some(i), None) => VersionStatus::LatestUnknown {
                installed: i.clone(),
            },
            (Some(i), Some(l)) => VersionStatus::Mismatch {
                installed: i.clone(),
                latest: l.clone(),
                direction: compare_versions(i, l),
            },
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "installed {}, latest {}",
            self.installed.as_deref().unwrap_or("none"),
            self.latest.as_deref().unwrap_or("unknown")
        )
    }
}

fn compare_versions(installed: &str, latest: &str) -> VersionDirection {
    match (
        semver::Version::parse(installed),
        semver::Version::parse(latest),
    ) {
        (Ok(i), Ok(l)) => match l.cmp(&i) {
            Ordering::Greater => VersionDirection::Upgrade,
            Ordering::Less => VersionDirection::Downgrade,
            // Equal precedence, different text (build metadata).
            Ordering::Equal => VersionDirection::Unknown,
        },
        _ => VersionDirection::Unknown,
    }
}

/// Queries both version sources for one package.
pub struct VersionReconciler {
    package: String,
    installed: Arc<dyn InstalledVersionSource>,
    latest: Arc<dyn LatestVersionSource>,
}

impl VersionReconciler {
    pub fn new(
        package: impl Into<String>,
        installed: Arc<dyn InstalledVersionSource>,
        latest: Arc<dyn LatestVersionSource>,
    ) -> Self {
        Self {
            package: package.into(),
            installed,
            latest,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn installed_version(&self) -> Option<String> {
        self.installed.installed_version(&self.package)
    }

    pub fn latest_version(&self) -> Option<String> {
        self.latest.latest_version(&self.package)
    }

    /// Query both sources.
    pub fn check(&self) -> VersionInfo {
        let info = VersionInfo::new(self.installed_version(), self.latest_version());
        info!(package = %self.package, versions = %info, "Checked library versions");
        info
    }
}
