//! Contract with the external footprint/symbol generation library.
//!
//! The library is a black box reached through [`GenerationLibrary`].
//! [`LibraryBinding`] is the loaded handle; it is owned by the session and
//! reset after every successful install so the next use binds the new code.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::error::{manual_install_hint, FailureKind, UserFacing};

/// 3D model format requested from footprint generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelFormat {
    #[default]
    Step,
    Wrl,
}

impl ModelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "STEP",
            Self::Wrl => "WRL",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STEP" => Ok(Self::Step),
            "WRL" => Ok(Self::Wrl),
            other => Err(format!("unknown model format '{}', expected STEP or WRL", other)),
        }
    }
}

/// Inputs of footprint generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintRequest {
    pub footprint_uuid: String,
    pub part_id: String,
    pub footprint_lib: String,
    pub output_dir: PathBuf,
    /// Path variable prefixed to model references; empty for relative paths.
    pub model_base_variable: String,
    pub model_dir: String,
    pub skip_existing: bool,
    pub model_format: ModelFormat,
}

/// Inputs of symbol generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRequest {
    pub symbol_uuids: Vec<String>,
    /// Footprint link written into the symbol, already rewritten to the
    /// library nickname.
    pub footprint_reference: String,
    pub datasheet_link: Option<String>,
    pub library_name: String,
    pub symbol_path: String,
    pub output_dir: PathBuf,
    pub part_id: String,
    pub skip_existing: bool,
}

/// Output of footprint generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// `<library>:<component>` as written by the library.
    pub footprint_qualified_name: String,
    pub datasheet_link: Option<String>,
}

/// Opaque failure of the generation library.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// An entry point ran and reported an error.
    #[error("{entry_point} failed: {message}")]
    Failed {
        entry_point: &'static str,
        message: String,
    },

    /// The library process could not be run.
    #[error("generation library could not be run: {0}")]
    Launch(String),

    /// The library produced output that could not be understood.
    #[error("generation library returned unexpected output: {0}")]
    Protocol(String),
}

impl UserFacing for GenerationError {
    fn kind(&self) -> FailureKind {
        FailureKind::GenerationFailure
    }

    fn user_message(&self) -> String {
        format!("JLC2KiCad library failed to generate the part.\nError: {}", self)
    }
}

/// Footprint and symbol generation entry points.
pub trait GenerationLibrary {
    fn create_footprint(&self, request: &FootprintRequest) -> Result<GenerationResult, GenerationError>;

    /// Writes symbol files; there is no structured output.
    fn create_symbol(&self, request: &SymbolRequest) -> Result<(), GenerationError>;
}

impl<T: GenerationLibrary + ?Sized> GenerationLibrary for Box<T> {
    fn create_footprint(&self, request: &FootprintRequest) -> Result<GenerationResult, GenerationError> {
        (**self).create_footprint(request)
    }

    fn create_symbol(&self, request: &SymbolRequest) -> Result<(), GenerationError> {
        (**self).create_symbol(request)
    }
}

/// Why the generation library could not be bound.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    /// The package is not installed for the interpreter.
    #[error("{package} is not installed")]
    NotInstalled { package: String },

    /// No interpreter to load the package with.
    #[error("no Python interpreter found to load the generation library")]
    NoInterpreter,

    /// The package is present but failed to load.
    #[error("failed to load the generation library: {reason}")]
    Load { reason: String },
}

impl BindingError {
    /// Whether installing the package may fix this.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotInstalled { .. })
    }
}

impl UserFacing for BindingError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::NotInstalled { .. } => FailureKind::InstallFailure,
            Self::NoInterpreter => FailureKind::ResolverFailure,
            Self::Load { .. } => FailureKind::GenerationFailure,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::NotInstalled { .. } | Self::NoInterpreter => format!(
                "JLC2KiCad library is required to run this tool.\n{}",
                manual_install_hint()
            ),
            Self::Load { reason } => {
                format!("Failed to load JLC2KiCad library.\nError: {}", reason)
            }
        }
    }
}

/// Loads the generation library.
pub trait BindingResolver {
    fn bind(&self) -> Result<LibraryBinding, BindingError>;
}

/// Loaded generation-library handle, or nothing yet.
#[derive(Default)]
pub enum LibraryBinding {
    #[default]
    Unbound,
    Bound(Box<dyn GenerationLibrary>),
}

impl LibraryBinding {
    pub fn bound(library: impl GenerationLibrary + 'static) -> Self {
        Self::Bound(Box::new(library))
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }

    pub fn library(&self) -> Option<&dyn GenerationLibrary> {
        match self {
            Self::Bound(library) => Some(library.as_ref()),
            Self::Unbound => None,
        }
    }

    /// Drop the handle so the next use binds again.
    pub fn reset(&mut self) {
        if self.is_bound() {
            debug!("Resetting generation library binding");
        }
        *self = Self::Unbound;
    }

    /// The bound library, binding through `resolver` first if needed.
    pub fn get_or_bind(
        &mut self,
        resolver: &dyn BindingResolver,
    ) -> Result<&dyn GenerationLibrary, BindingError> {
        if let Self::Unbound = self {
            let binding = resolver.bind()?;
            if binding.is_bound() {
                info!("Generation library bound");
            }
            *self = binding;
        }
        match self {
            Self::Bound(library) => Ok(&**library),
            Self::Unbound => Err(BindingError::Load {
                reason: "resolver returned no library".to_string(),
            }),
        }
    }
}

impl fmt::Debug for LibraryBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => f.write_str("Unbound"),
            Self::Bound(_) => f.write_str("Bound(..)"),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    /// Calls recorded by [`FakeLibrary`].
    #[derive(Debug, Default)]
    pub struct Recorded {
        pub footprints: Vec<FootprintRequest>,
        pub symbols: Vec<SymbolRequest>,
    }

    /// Generation library returning canned results.
    #[derive(Clone)]
    pub struct FakeLibrary {
        pub result: Result<GenerationResult, GenerationError>,
        pub recorded: Rc<RefCell<Recorded>>,
    }

    impl FakeLibrary {
        pub fn returning(qualified_name: &str, datasheet: Option<&str>) -> Self {
            Self {
                result: Ok(GenerationResult {
                    footprint_qualified_name: qualified_name.to_string(),
                    datasheet_link: datasheet.map(str::to_string),
                }),
                recorded: Rc::default(),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                result: Err(GenerationError::Failed {
                    entry_point: "create_footprint",
                    message: message.to_string(),
                }),
                recorded: Rc::default(),
            }
        }
    }

    impl GenerationLibrary for FakeLibrary {
        fn create_footprint(
            &self,
            request: &FootprintRequest,
        ) -> Result<GenerationResult, GenerationError> {
            self.recorded.borrow_mut().footprints.push(request.clone());
            self.result.clone()
        }

        fn create_symbol(&self, request: &SymbolRequest) -> Result<(), GenerationError> {
            self.recorded.borrow_mut().symbols.push(request.clone());
            Ok(())
        }
    }

    /// Resolver handing out clones of one [`FakeLibrary`].
    pub struct FakeResolver {
        pub library: Option<FakeLibrary>,
        pub error: Option<BindingError>,
        pub binds: Cell<usize>,
    }

    impl FakeResolver {
        pub fn with(library: FakeLibrary) -> Self {
            Self {
                library: Some(library),
                error: None,
                binds: Cell::new(0),
            }
        }

        pub fn failing(error: BindingError) -> Self {
            Self {
                library: None,
                error: Some(error),
                binds: Cell::new(0),
            }
        }
    }

    impl BindingResolver for FakeResolver {
        fn bind(&self) -> Result<LibraryBinding, BindingError> {
            self.binds.set(self.binds.get() + 1);
            match (&self.library, &self.error) {
                (_, Some(error)) => Err(error.clone()),
                (Some(library), None) => Ok(LibraryBinding::bound(library.clone())),
                (None, None) => Ok(LibraryBinding::Unbound),
            }
        }
    }

    #[test]
    fn test_binding_is_lazy_and_cached() {
        let resolver = FakeResolver::with(FakeLibrary::returning("footprint:R_0603", None));
        let mut binding = LibraryBinding::Unbound;
        assert_eq!(resolver.binds.get(), 0);

        binding.get_or_bind(&resolver).unwrap();
        binding.get_or_bind(&resolver).unwrap();

        assert!(binding.is_bound());
        assert_eq!(resolver.binds.get(), 1);
    }

    #[test]
    fn test_bound_library_is_callable() {
        let library = FakeLibrary::returning("footprint:R_0603", None);
        let resolver = FakeResolver::with(library.clone());
        let mut binding = LibraryBinding::Unbound;

        let bound = binding.get_or_bind(&resolver).unwrap();
        let result = bound
            .create_footprint(&FootprintRequest {
                footprint_uuid: "fp1".to_string(),
                part_id: "C25804".to_string(),
                footprint_lib: "footprint".to_string(),
                output_dir: PathBuf::from("/tmp/out"),
                model_base_variable: String::new(),
                model_dir: "packages3d".to_string(),
                skip_existing: false,
                model_format: ModelFormat::Step,
            })
            .unwrap();

        assert_eq!(result.footprint_qualified_name, "footprint:R_0603");
        assert_eq!(library.recorded.borrow().footprints.len(), 1);
    }

    #[test]
    fn test_reset_forces_rebind() {
        let resolver = FakeResolver::with(FakeLibrary::returning("footprint:R_0603", None));
        let mut binding = LibraryBinding::Unbound;
        binding.get_or_bind(&resolver).unwrap();

        binding.reset();
        assert!(!binding.is_bound());
        binding.get_or_bind(&resolver).unwrap();
        assert_eq!(resolver.binds.get(), 2);
    }

    #[test]
    fn test_bind_failure_leaves_unbound() {
        let resolver = FakeResolver::failing(BindingError::NotInstalled {
            package: "JLC2KiCadLib".to_string(),
        });
        let mut binding = LibraryBinding::Unbound;

        let err = binding.get_or_bind(&resolver).map(|_| ()).unwrap_err();

        assert!(err.is_missing());
        assert!(!binding.is_bound());
    }

    #[test]
    fn test_model_format_parsing() {
        assert_eq!("step".parse::<ModelFormat>().unwrap(), ModelFormat::Step);
        assert_eq!(" WRL ".parse::<ModelFormat>().unwrap(), ModelFormat::Wrl);
        assert!("obj".parse::<ModelFormat>().is_err());
        assert_eq!(ModelFormat::default().to_string(), "STEP");
    }
}
