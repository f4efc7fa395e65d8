//! Failure taxonomy shared by every component.
//!
//! Module errors stay specific (`CatalogError`, `BootstrapError`, ...) and
//! map onto a [`FailureKind`] through [`UserFacing`], which also renders the
//! message shown to the user.

use std::fmt;

/// Where users are sent for manual installation and help.
pub const REPOSITORY_URL: &str = "https://github.com/dzid26/JLC2KiCad_lib_gui";

/// Coarse classification of every reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Caller input rejected before any work (e.g. empty part number).
    Validation,
    /// The catalog does not know the part.
    NotFound,
    /// Transport-level failure, retry by the user.
    NetworkFailure,
    /// No interpreter able to run the package manager.
    ResolverFailure,
    /// The package manager exited non-zero.
    InstallFailure,
    /// The generation library failed; opaque.
    GenerationFailure,
    /// Primary delivery unavailable, fallback used.
    DeliveryDegraded,
}

impl FailureKind {
    /// Whether retrying the same action later can succeed without user changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure | Self::InstallFailure)
    }

    /// Whether the message should carry the manual installation pointer.
    pub fn wants_manual_pointer(&self) -> bool {
        matches!(self, Self::ResolverFailure | Self::InstallFailure)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::NotFound => "not found",
            Self::NetworkFailure => "network failure",
            Self::ResolverFailure => "resolver failure",
            Self::InstallFailure => "install failure",
            Self::GenerationFailure => "generation failure",
            Self::DeliveryDegraded => "delivery degraded",
        };
        f.write_str(name)
    }
}

/// An error that can be shown to the user.
pub trait UserFacing: std::error::Error {
    fn kind(&self) -> FailureKind;

    /// Human-readable message naming the probable cause.
    fn user_message(&self) -> String;
}

/// Remediation text appended to bootstrap failures.
pub fn manual_install_hint() -> String {
    format!(
        "Install manually using README.md or visit:\n{}",
        REPOSITORY_URL
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(FailureKind::NetworkFailure.is_retryable());
        assert!(FailureKind::InstallFailure.is_retryable());
        assert!(!FailureKind::NotFound.is_retryable());
        assert!(!FailureKind::ResolverFailure.is_retryable());
    }

    #[test]
    fn test_manual_hint_names_repository() {
        assert!(manual_install_hint().contains(REPOSITORY_URL));
        assert!(FailureKind::ResolverFailure.wants_manual_pointer());
        assert!(!FailureKind::NotFound.wants_manual_pointer());
    }
}
