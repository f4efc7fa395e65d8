//! Delivery of a generated footprint to the host.
//!
//! The primary path writes the footprint text into a transient channel (the
//! host's clipboard, or a pipe). When the channel cannot be used the
//! footprint is loaded through the host document at the origin instead.
//! Every call runs exactly one of the two paths to completion.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::acquire::AcquiredPart;
use crate::error::{FailureKind, UserFacing};

/// Short-lived text channel such as a clipboard.
pub trait TransientChannel {
    /// Try to take the channel; `false` when busy or unavailable.
    fn open(&mut self) -> bool;

    fn write_text(&mut self, text: &str) -> io::Result<()>;

    fn close(&mut self);
}

/// Board coordinates in host units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
}

impl Placement {
    /// Top-left corner of the canvas.
    pub const ORIGIN: Placement = Placement { x: 0, y: 0 };
}

/// The host application's open document.
pub trait HostDocument {
    /// Directory of the document on disk, if it has been saved.
    fn document_dir(&self) -> Option<PathBuf>;

    /// Load `component_name` from the library at `library_path` and place it.
    fn load_footprint(
        &mut self,
        library_path: &Path,
        component_name: &str,
        at: Placement,
    ) -> Result<(), String>;

    fn refresh(&mut self);
}

/// Why the transient channel was not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    ChannelUnavailable,
    ArtifactUnreadable(String),
    WriteFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelUnavailable => write!(f, "Clipboard couldn't be opened"),
            Self::ArtifactUnreadable(e) => write!(f, "Footprint file couldn't be read ({})", e),
            Self::WriteFailed(e) => write!(f, "Clipboard write failed ({})", e),
        }
    }
}

/// Which path delivered the footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Written to the transient channel.
    Transient { component_name: String },
    /// Placed in the host document.
    Placed {
        component_name: String,
        at: Placement,
        reason: FallbackReason,
    },
}

impl DeliveryOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }

    /// [`FailureKind::DeliveryDegraded`] for the fallback path.
    pub fn kind(&self) -> Option<FailureKind> {
        self.is_degraded().then_some(FailureKind::DeliveryDegraded)
    }

    /// Tells the user where the footprint went.
    pub fn message(&self) -> String {
        match self {
            Self::Transient { component_name } => {
                format!("Footprint {} copied; paste it into the board.", component_name)
            }
            Self::Placed {
                component_name,
                at,
                reason,
            } => {
                let place = if *at == Placement::ORIGIN {
                    "in top left corner of the canvas".to_string()
                } else {
                    format!("at ({}, {})", at.x, at.y)
                };
                format!("{}. Footprint {} was placed {}", reason, component_name, place)
            }
        }
    }
}

/// Both delivery paths failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("footprint {component_name} could not be placed ({fallback}): {reason}")]
pub struct DeliveryError {
    pub component_name: String,
    pub fallback: FallbackReason,
    pub reason: String,
}

impl UserFacing for DeliveryError {
    fn kind(&self) -> FailureKind {
        FailureKind::DeliveryDegraded
    }

    fn user_message(&self) -> String {
        format!(
            "Footprint {} could not be delivered.\n{}, and placing it failed: {}",
            self.component_name, self.fallback, self.reason
        )
    }
}

/// Chooses and runs one delivery path.
pub struct DeliveryReconciler<'a> {
    channel: &'a mut dyn TransientChannel,
    host: &'a mut dyn HostDocument,
    placement: Placement,
}

impl<'a> DeliveryReconciler<'a> {
    pub fn new(channel: &'a mut dyn TransientChannel, host: &'a mut dyn HostDocument) -> Self {
        Self {
            channel,
            host,
            placement: Placement::ORIGIN,
        }
    }

    /// Fallback placement (builder pattern).
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Deliver a generated part.
    pub fn deliver(&mut self, part: &AcquiredPart) -> Result<DeliveryOutcome, DeliveryError> {
        self.deliver_from(&part.library_path, &part.component_name)
    }

    /// Deliver `<library_path>/<component_name>.kicad_mod`.
    pub fn deliver_from(
        &mut self,
        library_path: &Path,
        component_name: &str,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let reason = match self.try_transient(library_path, component_name) {
            Ok(()) => {
                info!(component = component_name, "Footprint written to transient channel");
                return Ok(DeliveryOutcome::Transient {
                    component_name: component_name.to_string(),
                });
            }
            Err(reason) => reason,
        };

        warn!(component = component_name, reason = %reason, "Falling back to placement");
        self.host
            .load_footprint(library_path, component_name, self.placement)
            .map_err(|e| DeliveryError {
                component_name: component_name.to_string(),
                fallback: reason.clone(),
                reason: e,
            })?;
        self.host.refresh();

        Ok(DeliveryOutcome::Placed {
            component_name: component_name.to_string(),
            at: self.placement,
            reason,
        })
    }

    fn try_transient(&mut self, library_path: &Path, component_name: &str) -> Result<(), FallbackReason> {
        if !self.channel.open() {
            debug!("Transient channel unavailable");
            return Err(FallbackReason::ChannelUnavailable);
        }

        let file = crate::acquire::footprint_file(library_path, component_name);
        let result = match fs::read_to_string(&file) {
            Ok(text) => self
                .channel
                .write_text(&text)
                .map_err(|e| FallbackReason::WriteFailed(e.to_string())),
            Err(e) => Err(FallbackReason::ArtifactUnreadable(format!(
                "{}: {}",
                file.display(),
                e
            ))),
        };
        self.channel.close();
        result
    }
}
