//! jlcpart - JLCPCB part download for KiCad
//!
//! Bootstraps the `JLC2KiCadLib` generation library (interpreter discovery,
//! version checks, install/upgrade) and runs the part acquisition workflow:
//! catalog lookup, footprint/symbol generation, delivery to the host.

pub mod acquire;
pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod delivery;
pub mod error;
pub mod http;
pub mod logging;
pub mod session;

pub use error::{FailureKind, UserFacing};
pub use session::{Acquisition, LibraryReady, Session, SessionError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
