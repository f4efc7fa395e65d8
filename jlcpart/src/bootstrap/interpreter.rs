//! Discovery of a Python interpreter able to run `pip`.
//!
//! KiCad ships its own Python, and some builds report the KiCad launcher as
//! the running executable. The resolver therefore walks an ordered list of
//! candidates and rejects anything whose file name identifies the host
//! application rather than a script runtime.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Substring identifying host-application executables (never selected).
pub const HOST_MARKER: &str = "kicad";

/// Substring every accepted interpreter file name must contain.
pub const RUNTIME_MARKER: &str = "python";

/// Generic name looked up on `PATH` as the last candidate.
pub const PATH_LOOKUP_NAME: &str = "python";

/// Conventional interpreter names probed next to the origin executable.
pub const SIBLING_NAMES: &[&str] = &["python.exe", "python3.exe", "python", "python3"];

/// Filesystem queries used by the resolver.
pub trait InterpreterProbe {
    /// Whether `path` is an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Resolve `name` through the `PATH` environment variable.
    fn lookup_on_path(&self, name: &str) -> Option<PathBuf>;
}

/// Probe backed by the real filesystem and `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl InterpreterProbe for SystemProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn lookup_on_path(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// A resolved interpreter executable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterpreterCandidate(PathBuf);

impl InterpreterCandidate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for InterpreterCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Whether a path's file name looks like a script runtime and not the host.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use jlcpart::bootstrap::is_runtime_executable;
///
/// assert!(is_runtime_executable(Path::new("/usr/bin/python3")));
/// assert!(!is_runtime_executable(Path::new("C:/KiCad/bin/kicad.exe")));
/// assert!(!is_runtime_executable(Path::new("/opt/kicad-python/bin/kicad-python")));
/// assert!(!is_runtime_executable(Path::new("/usr/bin/perl")));
/// ```
pub fn is_runtime_executable(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return false,
    };
    !name.contains(HOST_MARKER) && name.contains(RUNTIME_MARKER)
}

/// Well-known interpreter locations for the current platform, in
/// preference order.
pub fn default_known_locations() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    return vec![
        PathBuf::from(r"C:\Program Files\KiCad\9.0\bin\python.exe"),
        PathBuf::from(r"C:\Program Files\KiCad\8.0\bin\python.exe"),
    ];

    #[cfg(target_os = "macos")]
    return vec![PathBuf::from(
        "/Applications/KiCad/KiCad.app/Contents/Frameworks/Python.framework/Versions/Current/bin/python3",
    )];

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    return vec![PathBuf::from("/usr/bin/python3")];
}

/// Ordered interpreter discovery.
///
/// Candidate order:
/// 1. the origin executable (configured interpreter, or the running binary)
/// 2. conventional interpreter names in the origin's directory
/// 3. known install locations for the platform
/// 4. the `PATH` lookup result for [`PATH_LOOKUP_NAME`]
pub struct InterpreterResolver<P: InterpreterProbe = SystemProbe> {
    probe: P,
    origin: Option<PathBuf>,
    known_locations: Vec<PathBuf>,
    path_lookup_name: String,
}

impl InterpreterResolver<SystemProbe> {
    /// Resolver over the real filesystem, using the running binary as origin.
    pub fn new() -> Self {
        Self::with_probe(SystemProbe).with_origin(std::env::current_exe().ok())
    }
}

impl Default for InterpreterResolver<SystemProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InterpreterProbe> InterpreterResolver<P> {
    /// Resolver with a custom probe, no origin and the platform locations.
    pub fn with_probe(probe: P) -> Self {
        Self {
            probe,
            origin: None,
            known_locations: default_known_locations(),
            path_lookup_name: PATH_LOOKUP_NAME.to_string(),
        }
    }

    /// Set the origin executable (builder pattern).
    pub fn with_origin(mut self, origin: Option<PathBuf>) -> Self {
        self.origin = origin;
        self
    }

    /// Replace the known install locations (builder pattern).
    pub fn with_known_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.known_locations = locations;
        self
    }

    /// Every candidate in walk order, deduplicated by path.
    ///
    /// Also returns the `PATH` lookup result, which is trusted without an
    /// existence check.
    pub fn candidates(&self) -> (Vec<PathBuf>, Option<PathBuf>) {
        let mut ordered = Vec::new();

        if let Some(origin) = &self.origin {
            ordered.push(origin.clone());
            if let Some(dir) = origin.parent() {
                ordered.extend(SIBLING_NAMES.iter().map(|name| dir.join(name)));
            }
        }

        ordered.extend(self.known_locations.iter().cloned());

        let path_hit = self.probe.lookup_on_path(&self.path_lookup_name);
        if let Some(hit) = &path_hit {
            ordered.push(hit.clone());
        }

        let mut seen = HashSet::new();
        ordered.retain(|p| !p.as_os_str().is_empty() && seen.insert(p.clone()));

        (ordered, path_hit)
    }

    /// Return the first usable interpreter, or `None` when automatic
    /// bootstrap is impossible and the user must install manually.
    pub fn resolve(&self) -> Option<InterpreterCandidate> {
        let (candidates, path_hit) = self.candidates();

        for candidate in candidates {
            if !is_runtime_executable(&candidate) {
                debug!(candidate = %candidate.display(), "Skipping non-interpreter candidate");
                continue;
            }
            let trusted = path_hit.as_deref() == Some(candidate.as_path());
            if trusted || self.probe.is_file(&candidate) {
                info!(interpreter = %candidate.display(), "Resolved Python interpreter");
                return Some(InterpreterCandidate(candidate));
            }
        }

        info!("No Python interpreter found for pip");
        None
    }
}

/// Something that yields the interpreter for bootstrap, if any.
pub trait InterpreterSource {
    fn resolve_interpreter(&self) -> Option<InterpreterCandidate>;
}

impl<P: InterpreterProbe> InterpreterSource for InterpreterResolver<P> {
    fn resolve_interpreter(&self) -> Option<InterpreterCandidate> {
        self.resolve()
    }
}

/// A fixed answer, e.g. an interpreter already resolved elsewhere.
impl InterpreterSource for Option<InterpreterCandidate> {
    fn resolve_interpreter(&self) -> Option<InterpreterCandidate> {
        self.clone()
    }
}
