//! User configuration stored as an INI file.
//!
//! Location: `<config dir>/jlcpart/config.ini`. A missing file yields the
//! defaults; unknown keys in the file are ignored.
//!
//! ```ini
//! [catalog]
//! timeout = 30
//!
//! [library]
//! interpreter = C:\Program Files\KiCad\9.0\bin\python.exe
//!
//! [output]
//! footprint_nickname = jlc
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::acquire::{LibraryLayout, ModelFormat};
use crate::bootstrap::DEFAULT_INDEX_URL;
use crate::catalog::DEFAULT_CATALOG_URL;
use crate::error::{FailureKind, UserFacing};

/// Generation library package name.
pub const DEFAULT_PACKAGE: &str = "JLC2KiCadLib";

/// Folder created next to the board for the project library.
pub const DEFAULT_OUTPUT_FOLDER: &str = "JLC2KiCad_lib";

const APP_DIR: &str = "jlcpart";
const CONFIG_FILE_NAME: &str = "config.ini";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

impl UserFacing for ConfigError {
    fn kind(&self) -> FailureKind {
        FailureKind::Validation
    }

    fn user_message(&self) -> String {
        match self {
            Self::UnknownKey(key) => format!(
                "Unknown configuration key '{}'. Use 'jlcpart config list' to see available keys.",
                key
            ),
            other => format!("Configuration error: {}", other),
        }
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub url: String,
    pub user_agent: String,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.to_string(),
            user_agent: format!("{}/{}", APP_DIR, crate::VERSION),
            timeout: None,
        }
    }
}

/// `[library]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySettings {
    pub package: String,
    pub index_url: String,
    pub version_timeout: Option<Duration>,
    pub install_timeout: Option<Duration>,
    /// Interpreter used as the resolver's starting point.
    pub interpreter: Option<PathBuf>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            package: DEFAULT_PACKAGE.to_string(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            version_timeout: Some(crate::bootstrap::DEFAULT_VERSION_TIMEOUT),
            install_timeout: None,
            interpreter: None,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub folder: String,
    pub layout: LibraryLayout,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            folder: DEFAULT_OUTPUT_FOLDER.to_string(),
            layout: LibraryLayout::default(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub catalog: CatalogSettings,
    pub library: LibrarySettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Directory holding the configuration file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

impl ConfigFile {
    /// Load from [`config_file_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`; a missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        Self::from_ini(&ini)
    }

    /// Build from parsed INI data, starting from the defaults.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// INI representation; unset optional keys are omitted.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        self.to_ini().write_to_file(path).map_err(io_err)
    }
}

/// Every supported `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    CatalogUrl,
    CatalogUserAgent,
    CatalogTimeout,
    LibraryPackage,
    LibraryIndexUrl,
    LibraryVersionTimeout,
    LibraryInstallTimeout,
    LibraryInterpreter,
    OutputFolder,
    OutputFootprintLib,
    OutputFootprintNickname,
    OutputSymbolLib,
    OutputSymbolDir,
    OutputModelDir,
    OutputModelFormat,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            CatalogUrl,
            CatalogUserAgent,
            CatalogTimeout,
            LibraryPackage,
            LibraryIndexUrl,
            LibraryVersionTimeout,
            LibraryInstallTimeout,
            LibraryInterpreter,
            OutputFolder,
            OutputFootprintLib,
            OutputFootprintNickname,
            OutputSymbolLib,
            OutputSymbolDir,
            OutputModelDir,
            OutputModelFormat,
            LoggingLevel,
            LoggingDirectory,
        ]
    }

    /// `section.key` form.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CatalogUrl => "catalog.url",
            Self::CatalogUserAgent => "catalog.user_agent",
            Self::CatalogTimeout => "catalog.timeout",
            Self::LibraryPackage => "library.package",
            Self::LibraryIndexUrl => "library.index_url",
            Self::LibraryVersionTimeout => "library.version_timeout",
            Self::LibraryInstallTimeout => "library.install_timeout",
            Self::LibraryInterpreter => "library.interpreter",
            Self::OutputFolder => "output.folder",
            Self::OutputFootprintLib => "output.footprint_lib",
            Self::OutputFootprintNickname => "output.footprint_nickname",
            Self::OutputSymbolLib => "output.symbol_lib",
            Self::OutputSymbolDir => "output.symbol_dir",
            Self::OutputModelDir => "output.model_dir",
            Self::OutputModelFormat => "output.model_format",
            Self::LoggingLevel => "logging.level",
            Self::LoggingDirectory => "logging.directory",
        }
    }

    pub fn section(&self) -> &'static str {
        self.split().0
    }

    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or(("", name))
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let layout = &config.output.layout;
        match self {
            Self::CatalogUrl => config.catalog.url.clone(),
            Self::CatalogUserAgent => config.catalog.user_agent.clone(),
            Self::CatalogTimeout => format_timeout(config.catalog.timeout),
            Self::LibraryPackage => config.library.package.clone(),
            Self::LibraryIndexUrl => config.library.index_url.clone(),
            Self::LibraryVersionTimeout => format_timeout(config.library.version_timeout),
            Self::LibraryInstallTimeout => format_timeout(config.library.install_timeout),
            Self::LibraryInterpreter => format_path(&config.library.interpreter),
            Self::OutputFolder => config.output.folder.clone(),
            Self::OutputFootprintLib => layout.footprint_lib.clone(),
            Self::OutputFootprintNickname => layout.footprint_nickname.clone(),
            Self::OutputSymbolLib => layout.symbol_lib.clone(),
            Self::OutputSymbolDir => layout.symbol_dir.clone(),
            Self::OutputModelDir => layout.model_dir.clone(),
            Self::OutputModelFormat => layout.model_format.to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
            Self::LoggingDirectory => format_path(&config.logging.directory),
        }
    }

    /// Parse and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let layout = &mut config.output.layout;
        match self {
            Self::CatalogUrl => config.catalog.url = self.placeholder(value, "{part}")?,
            Self::CatalogUserAgent => config.catalog.user_agent = self.non_empty(value)?,
            Self::CatalogTimeout => config.catalog.timeout = self.timeout(value)?,
            Self::LibraryPackage => config.library.package = self.non_empty(value)?,
            Self::LibraryIndexUrl => {
                config.library.index_url = self.placeholder(value, "{package}")?
            }
            Self::LibraryVersionTimeout => config.library.version_timeout = self.timeout(value)?,
            Self::LibraryInstallTimeout => config.library.install_timeout = self.timeout(value)?,
            Self::LibraryInterpreter => config.library.interpreter = parse_path(value),
            Self::OutputFolder => config.output.folder = self.non_empty(value)?,
            Self::OutputFootprintLib => layout.footprint_lib = self.non_empty(value)?,
            Self::OutputFootprintNickname => layout.footprint_nickname = self.non_empty(value)?,
            Self::OutputSymbolLib => layout.symbol_lib = self.non_empty(value)?,
            Self::OutputSymbolDir => layout.symbol_dir = self.non_empty(value)?,
            Self::OutputModelDir => layout.model_dir = self.non_empty(value)?,
            Self::OutputModelFormat => {
                layout.model_format = value
                    .parse::<ModelFormat>()
                    .map_err(|reason| self.invalid(value, reason))?
            }
            Self::LoggingLevel => {
                let level = value.to_ascii_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(self.invalid(value, format!("expected one of {}", LOG_LEVELS.join(", "))));
                }
                config.logging.level = level;
            }
            Self::LoggingDirectory => config.logging.directory = parse_path(value),
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn non_empty(&self, value: &str) -> Result<String, ConfigError> {
        if value.is_empty() {
            return Err(self.invalid(value, "must not be empty"));
        }
        Ok(value.to_string())
    }

    fn placeholder(&self, value: &str, placeholder: &str) -> Result<String, ConfigError> {
        if !value.contains(placeholder) {
            return Err(self.invalid(value, format!("must contain {}", placeholder)));
        }
        Ok(value.to_string())
    }

    /// Seconds; `0` disables the timeout.
    fn timeout(&self, value: &str) -> Result<Option<Duration>, ConfigError> {
        let secs: u64 = value
            .parse()
            .map_err(|_| self.invalid(value, "expected a whole number of seconds"))?;
        Ok((secs > 0).then(|| Duration::from_secs(secs)))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn format_timeout(timeout: Option<Duration>) -> String {
    timeout.map_or(0, |t| t.as_secs()).to_string()
}

fn format_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn parse_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}
