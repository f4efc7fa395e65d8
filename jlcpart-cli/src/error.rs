//! CLI error type.

use std::fmt;
use std::io;

use jlcpart::bootstrap::BootstrapError;
use jlcpart::config::ConfigError;
use jlcpart::delivery::DeliveryError;
use jlcpart::{FailureKind, SessionError, UserFacing};

/// Errors reported by a command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be read or changed.
    Config(String),

    /// The library reported a failure.
    Session(SessionError),

    /// Bad command-line input.
    Input(String),

    /// Terminal or prompt I/O failed.
    Io(io::Error),
}

impl CliError {
    /// Failure class, when the library produced the error.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            CliError::Session(e) => Some(e.kind()),
            CliError::Input(_) => Some(FailureKind::Validation),
            _ => None,
        }
    }

    /// Message printed to the user.
    pub fn user_message(&self) -> String {
        match self {
            CliError::Session(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// Print the message to stderr and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("{} {}", console::style("error:").red().bold(), self.user_message());
        std::process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Session(e) => write!(f, "{}", e),
            CliError::Input(msg) => write!(f, "{}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Session(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Config(_) | CliError::Input(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.user_message())
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<BootstrapError> for CliError {
    fn from(e: BootstrapError) -> Self {
        CliError::Session(e.into())
    }
}

impl From<DeliveryError> for CliError {
    fn from(e: DeliveryError) -> Self {
        CliError::Session(e.into())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(e: dialoguer::Error) -> Self {
        CliError::Io(io::Error::other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CliError::Config("unknown key".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.kind().is_none());
    }

    #[test]
    fn test_session_error_keeps_kind_and_message() {
        let err: CliError = BootstrapError::ResolverFailure.into();
        assert_eq!(err.kind(), Some(FailureKind::ResolverFailure));
        assert!(err.user_message().contains("Could not find a Python executable"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
