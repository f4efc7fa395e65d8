//! Orchestration context tying bootstrap, acquisition and delivery together.
//!
//! A [`Session`] owns the [`LibraryBinding`]; nothing else caches the
//! generation library. Successful installs reset the binding so the next
//! acquisition binds the freshly installed code.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

use crate::acquire::{
    AcquireError, AcquireMode, AcquiredPart, BindingError, BindingResolver, LibraryBinding,
    PartAcquisition, PythonBindingResolver,
};
use crate::bootstrap::{
    BootstrapConfig, BootstrapError, Bootstrapper, InterpreterResolver, PackageIndexClient,
    SystemRunner, UpdateReport, VersionInfo, VersionStatus,
};
use crate::catalog::{CatalogClient, CatalogLookup, PartIdentifier};
use crate::config::ConfigFile;
use crate::delivery::{DeliveryError, DeliveryOutcome, DeliveryReconciler, HostDocument, TransientChannel};
use crate::error::{manual_install_hint, FailureKind, UserFacing};
use crate::http::{HttpError, ReqwestClient};

/// Session failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] HttpError),

    /// Project mode needs a saved document.
    #[error("the document has not been saved, so there is no project folder")]
    NoDocument,

    #[error("failed to create a scratch directory: {0}")]
    Scratch(#[source] io::Error),

    /// The user declined installing the missing library.
    #[error("the generation library is required")]
    LibraryRequired,
}

impl UserFacing for SessionError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Acquire(e) => e.kind(),
            Self::Binding(e) => e.kind(),
            Self::Bootstrap(e) => e.kind(),
            Self::Delivery(e) => e.kind(),
            Self::Http(_) => FailureKind::NetworkFailure,
            Self::NoDocument => FailureKind::Validation,
            Self::Scratch(_) => FailureKind::GenerationFailure,
            Self::LibraryRequired => FailureKind::InstallFailure,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Acquire(e) => e.user_message(),
            Self::Binding(e) => e.user_message(),
            Self::Bootstrap(e) => e.user_message(),
            Self::Delivery(e) => e.user_message(),
            Self::NoDocument => {
                "Save the board first; the project library is created next to it.".to_string()
            }
            Self::LibraryRequired => format!(
                "JLC2KiCad library is required to run this tool.\n{}",
                manual_install_hint()
            ),
            other => other.to_string(),
        }
    }
}

/// How the library became usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryReady {
    /// Already importable.
    Available,
    /// Installed on request, then bound.
    Installed(UpdateReport),
}

/// A generated part, with the scratch directory kept alive for delivery.
#[derive(Debug)]
pub struct Acquisition {
    pub part: AcquiredPart,
    pub mode: AcquireMode,
    scratch: Option<TempDir>,
}

impl Acquisition {
    /// Scratch output directory for clipboard mode.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    /// User-facing summary for project mode.
    pub fn message(&self) -> String {
        format!(
            "Footprint {} downloaded to project library {}",
            self.part.component_name,
            self.part.library_path.display()
        )
    }
}

/// Owner of the library binding and every collaborator.
pub struct Session {
    config: ConfigFile,
    catalog: Box<dyn CatalogLookup>,
    bootstrap: Bootstrapper,
    resolver: Box<dyn BindingResolver>,
    binding: LibraryBinding,
}

impl Session {
    pub fn new(
        config: ConfigFile,
        catalog: Box<dyn CatalogLookup>,
        bootstrap: Bootstrapper,
        resolver: Box<dyn BindingResolver>,
    ) -> Self {
        Self {
            config,
            catalog,
            bootstrap,
            resolver,
            binding: LibraryBinding::Unbound,
        }
    }

    /// Session over real HTTP, processes and the filesystem.
    pub fn from_config(config: ConfigFile) -> Result<Self, SessionError> {
        let catalog_http = match config.catalog.timeout {
            Some(timeout) => ReqwestClient::with_timeout(&config.catalog.user_agent, timeout)?,
            None => ReqwestClient::new(&config.catalog.user_agent)?,
        };
        let catalog = CatalogClient::with_url_template(catalog_http, config.catalog.url.clone());

        let index_http = match config.library.version_timeout {
            Some(timeout) => ReqwestClient::with_timeout(&config.catalog.user_agent, timeout)?,
            None => ReqwestClient::new(&config.catalog.user_agent)?,
        };
        let latest = PackageIndexClient::with_url_template(index_http, config.library.index_url.clone());

        let mut resolver = InterpreterResolver::new();
        if let Some(interpreter) = &config.library.interpreter {
            resolver = resolver.with_origin(Some(interpreter.clone()));
        }

        let runner = Arc::new(SystemRunner::new());
        let mut bootstrap = Bootstrapper::new(
            BootstrapConfig {
                package: config.library.package.clone(),
                install_timeout: config.library.install_timeout,
            },
            Box::new(resolver),
            runner.clone(),
            Arc::new(latest),
        );
        let interpreter = bootstrap.resolve().cloned();
        let binder = PythonBindingResolver::new(interpreter, runner, config.library.package.clone());

        Ok(Self::new(config, Box::new(catalog), bootstrap, Box::new(binder)))
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn binding(&self) -> &LibraryBinding {
        &self.binding
    }

    pub fn bootstrapper(&mut self) -> &mut Bootstrapper {
        &mut self.bootstrap
    }

    /// "JLC2KiCad library vX" or "JLC2KiCad library not installed".
    pub fn library_status_text(&mut self) -> String {
        VersionInfo::new(self.bootstrap.installed_version(), None).installed_text()
    }

    /// Installed and latest versions.
    pub fn versions(&mut self) -> VersionInfo {
        self.bootstrap.check_versions()
    }

    /// Bind the generation library if not bound yet.
    pub fn ensure_library(&mut self) -> Result<(), BindingError> {
        self.binding.get_or_bind(self.resolver.as_ref()).map(|_| ())
    }

    /// Bind the library, offering installation when it is missing.
    ///
    /// `confirm` is only called when the package is not installed.
    pub fn ensure_library_or_install(
        &mut self,
        confirm: impl FnOnce() -> bool,
    ) -> Result<LibraryReady, SessionError> {
        match self.ensure_library() {
            Ok(()) => Ok(LibraryReady::Available),
            Err(e) if e.is_missing() => {
                if !confirm() {
                    return Err(SessionError::LibraryRequired);
                }
                let report = self.bootstrap.install_missing()?;
                self.binding.reset();
                self.ensure_library()?;
                info!("Generation library installed and bound");
                Ok(LibraryReady::Installed(report))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check-for-updates flow; resets the binding after any install.
    pub fn check_for_updates(
        &mut self,
        confirm: impl FnOnce(&VersionInfo) -> bool,
    ) -> Result<(VersionStatus, UpdateReport), BootstrapError> {
        let (status, report) = self.bootstrap.check_for_updates(confirm)?;
        if report.requires_rebind() {
            self.binding.reset();
        }
        Ok((status, report))
    }

    /// Output directory of project mode for a document directory.
    pub fn project_library_dir(&self, document_dir: &Path) -> PathBuf {
        document_dir.join(&self.config.output.folder)
    }

    /// Acquire a part.
    ///
    /// Clipboard mode writes into a fresh scratch directory held by the
    /// returned [`Acquisition`]. Project mode writes into the project
    /// library folder next to `document_dir`.
    pub fn acquire(
        &mut self,
        raw_part: &str,
        mode: AcquireMode,
        document_dir: Option<&Path>,
    ) -> Result<Acquisition, SessionError> {
        let part_id = PartIdentifier::new(raw_part).map_err(AcquireError::from)?;

        let (output_dir, scratch) = match mode {
            AcquireMode::Clipboard => {
                let scratch = tempfile::Builder::new()
                    .prefix("jlcpart-")
                    .tempdir()
                    .map_err(SessionError::Scratch)?;
                (scratch.path().to_path_buf(), Some(scratch))
            }
            AcquireMode::ProjectLibrary => {
                let dir = document_dir.ok_or(SessionError::NoDocument)?;
                (self.project_library_dir(dir), None)
            }
        };

        let library = self.binding.get_or_bind(self.resolver.as_ref())?;
        let part = PartAcquisition::new(self.catalog.as_ref(), library, &self.config.output.layout)
            .acquire(
                part_id.as_str(),
                &output_dir,
                mode.include_symbol(),
                mode.skip_existing(),
            )
            .map_err(|e| {
                warn!(part_id = %part_id, error = %e, "Acquisition failed");
                e
            })?;

        info!(
            part_id = %part_id,
            component = %part.component_name,
            library = %part.library_path.display(),
            "Part acquired"
        );
        Ok(Acquisition {
            part,
            mode,
            scratch,
        })
    }

    /// Deliver an acquired part through `channel`, falling back to `host`.
    pub fn deliver(
        &self,
        acquisition: &Acquisition,
        channel: &mut dyn TransientChannel,
        host: &mut dyn HostDocument,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        DeliveryReconciler::new(channel, host).deliver(&acquisition.part)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::acquire::{FakeLibrary, FakeResolver};
    use crate::bootstrap::{FixedVersion, InterpreterCandidate, ScriptedRunner};
    use crate::catalog::{CatalogEntry, CatalogError, CatalogResponse, LookupOutcome};

    struct StaticCatalog(Vec<&'static str>, Cell<usize>);

    impl CatalogLookup for StaticCatalog {
        fn lookup(&self, _part_id: &PartIdentifier) -> Result<LookupOutcome, CatalogError> {
            self.1.set(self.1.get() + 1);
            let entries = self.0.iter().map(|u| CatalogEntry::new(*u)).collect();
            Ok(CatalogResponse::new(entries).map_or(LookupOutcome::NotFound, LookupOutcome::Found))
        }
    }

    /// Reports the package missing until the `ready_on`th bind.
    struct InstallThenBind {
        library: FakeLibrary,
        ready_on: Option<usize>,
        binds: Rc<Cell<usize>>,
    }

    impl BindingResolver for InstallThenBind {
        fn bind(&self) -> Result<LibraryBinding, BindingError> {
            let n = self.binds.get() + 1;
            self.binds.set(n);
            match self.ready_on {
                Some(ready_on) if n >= ready_on => Ok(LibraryBinding::bound(self.library.clone())),
                _ => Err(BindingError::NotInstalled {
                    package: "JLC2KiCadLib".to_string(),
                }),
            }
        }
    }

    fn session(
        runner: Arc<ScriptedRunner>,
        resolver: impl BindingResolver + 'static,
        latest: Option<&'static str>,
    ) -> Session {
        let bootstrap = Bootstrapper::new(
            BootstrapConfig::default(),
            Box::new(Some(InterpreterCandidate::new("/usr/bin/python3"))),
            runner,
            Arc::new(FixedVersion(latest)),
        );
        Session::new(
            ConfigFile::default(),
            Box::new(StaticCatalog(vec!["sym1", "fp1"], Cell::new(0))),
            bootstrap,
            Box::new(resolver),
        )
    }

    #[test]
    fn test_status_text() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .then_output(0, "1.0.8\n", "")
                .then_output(1, "", "PackageNotFoundError"),
        );
        let mut session = session(runner, FakeResolver::with(FakeLibrary::returning("footprint:X", None)), None);

        assert_eq!(session.library_status_text(), "JLC2KiCad library v1.0.8");
        assert_eq!(session.library_status_text(), "JLC2KiCad library not installed");
    }

    #[test]
    fn test_project_mode_writes_next_to_document() {
        let library = FakeLibrary::returning("footprint:SOT-23-5", None);
        let runner = Arc::new(ScriptedRunner::new());
        let mut session = session(runner, FakeResolver::with(library.clone()), None);

        let acquisition = session
            .acquire("C326215", AcquireMode::ProjectLibrary, Some(Path::new("/boards/demo")))
            .unwrap();

        assert_eq!(
            acquisition.part.library_path,
            PathBuf::from("/boards/demo/JLC2KiCad_lib/footprint")
        );
        assert!(acquisition.scratch_dir().is_none());
        assert_eq!(library.recorded.borrow().symbols.len(), 1);
        assert!(acquisition.message().contains("downloaded to project library"));
    }

    #[test]
    fn test_project_mode_needs_document() {
        let runner = Arc::new(ScriptedRunner::new());
        let mut session = session(runner, FakeResolver::with(FakeLibrary::returning("footprint:X", None)), None);

        let err = session
            .acquire("C1", AcquireMode::ProjectLibrary, None)
            .unwrap_err();
        assert!(matches!(err, SessionError::NoDocument));
    }

    #[test]
    fn test_clipboard_mode_uses_scratch_dir() {
        let library = FakeLibrary::returning("footprint:SOT-23-5", None);
        let runner = Arc::new(ScriptedRunner::new());
        let mut session = session(runner, FakeResolver::with(library.clone()), None);

        let acquisition = session.acquire("C1", AcquireMode::Clipboard, None).unwrap();

        let scratch = acquisition.scratch_dir().unwrap().to_path_buf();
        assert!(scratch.exists());
        assert_eq!(acquisition.part.library_path, scratch.join("footprint"));
        assert!(library.recorded.borrow().symbols.is_empty());

        drop(acquisition);
        assert!(!scratch.exists());
    }

    #[test]
    fn test_empty_part_fails_before_binding() {
        let resolver = FakeResolver::with(FakeLibrary::returning("footprint:X", None));
        let runner = Arc::new(ScriptedRunner::new());
        let mut session = session(runner, resolver, None);

        let err = session.acquire("", AcquireMode::Clipboard, None).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Validation);
        assert!(!session.binding().is_bound());
    }

    #[test]
    fn test_missing_library_declined() {
        let resolver = FakeResolver::failing(BindingError::NotInstalled {
            package: "JLC2KiCadLib".to_string(),
        });
        let runner = Arc::new(ScriptedRunner::new());
        let mut session = session(runner.clone(), resolver, None);

        let err = session.ensure_library_or_install(|| false).unwrap_err();

        assert!(matches!(err, SessionError::LibraryRequired));
        assert!(err.user_message().contains(crate::error::REPOSITORY_URL));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_update_resets_binding() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .then_output(0, "1.0.7\n", "")
                .then_output(0, "Successfully installed", "")
                .then_output(0, "1.0.8\n", ""),
        );
        let resolver = FakeResolver::with(FakeLibrary::returning("footprint:X", None));
        let mut session = session(runner, resolver, Some("1.0.8"));
        session.ensure_library().unwrap();
        assert!(session.binding().is_bound());

        let (_, report) = session.check_for_updates(|_| true).unwrap();

        assert!(report.requires_rebind());
        assert!(!session.binding().is_bound());
    }

    #[test]
    fn test_missing_library_installed_and_bound() {
        let binds = Rc::new(Cell::new(0));
        let resolver = InstallThenBind {
            library: FakeLibrary::returning("footprint:X", None),
            ready_on: Some(2),
            binds: binds.clone(),
        };
        let runner = Arc::new(
            ScriptedRunner::new()
                .then_output(0, "Successfully installed", "")
                .then_output(0, "1.0.8\n", ""),
        );
        let mut session = session(runner.clone(), resolver, None);
        let mut asked = false;

        let ready = session
            .ensure_library_or_install(|| {
                asked = true;
                true
            })
            .unwrap();

        assert!(asked);
        assert_eq!(
            ready,
            LibraryReady::Installed(UpdateReport::Installed {
                version: Some("1.0.8".to_string())
            })
        );
        assert_eq!(binds.get(), 2);
        assert_eq!(runner.calls().len(), 2);
        assert!(session.binding().is_bound());
    }

    #[test]
    fn test_install_succeeds_but_library_still_missing() {
        let binds = Rc::new(Cell::new(0));
        let resolver = InstallThenBind {
            library: FakeLibrary::returning("footprint:X", None),
            ready_on: None,
            binds: binds.clone(),
        };
        let runner = Arc::new(
            ScriptedRunner::new()
                .then_output(0, "Successfully installed", "")
                .then_output(0, "1.0.8\n", ""),
        );
        let mut session = session(runner.clone(), resolver, None);

        let err = session.ensure_library_or_install(|| true).unwrap_err();

        assert!(matches!(err, SessionError::Binding(BindingError::NotInstalled { .. })));
        assert_eq!(binds.get(), 2);
        assert_eq!(runner.calls().len(), 2);
        assert!(!session.binding().is_bound());
    }
}
