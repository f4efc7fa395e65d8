//! Part acquisition: catalog lookup, footprint generation, optional symbol
//! generation, output naming.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::binding::{FootprintRequest, GenerationError, GenerationLibrary, ModelFormat, SymbolRequest};
use super::naming;
use crate::catalog::{CatalogError, CatalogLookup, EmptyPartIdentifier, LookupOutcome, PartIdentifier};
use crate::error::{FailureKind, UserFacing};

/// Library names and generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    /// Footprint library name passed to the generator.
    pub footprint_lib: String,
    /// Name under which the footprint library is registered in the host.
    pub footprint_nickname: String,
    pub symbol_lib: String,
    pub symbol_dir: String,
    pub model_dir: String,
    pub model_base_variable: String,
    pub model_format: ModelFormat,
}

impl Default for LibraryLayout {
    fn default() -> Self {
        Self {
            footprint_lib: "footprint".to_string(),
            footprint_nickname: "jlc".to_string(),
            symbol_lib: "default_lib".to_string(),
            symbol_dir: "symbol".to_string(),
            model_dir: "packages3d".to_string(),
            model_base_variable: String::new(),
            model_format: ModelFormat::Step,
        }
    }
}

/// How a part is acquired and where it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Footprint only, regenerated into a scratch directory and delivered
    /// through the transient channel.
    Clipboard,
    /// Footprint and symbol kept in the project's library folder.
    ProjectLibrary,
}

impl AcquireMode {
    pub fn include_symbol(&self) -> bool {
        matches!(self, Self::ProjectLibrary)
    }

    pub fn skip_existing(&self) -> bool {
        matches!(self, Self::ProjectLibrary)
    }
}

/// A generated part on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredPart {
    /// Directory of the footprint library.
    pub library_path: PathBuf,
    pub component_name: String,
    pub datasheet_link: Option<String>,
}

impl AcquiredPart {
    /// The generated `.kicad_mod` file.
    pub fn footprint_file(&self) -> PathBuf {
        naming::footprint_file(&self.library_path, &self.component_name)
    }
}

/// Acquisition failures.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    EmptyPartId(#[from] EmptyPartIdentifier),

    #[error("part {part_id} was not found in the catalog")]
    NotFound { part_id: String },

    #[error(transparent)]
    Network(#[from] CatalogError),

    /// Passed through from the generation library unchanged.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl UserFacing for AcquireError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::EmptyPartId(e) => e.kind(),
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Network(e) => e.kind(),
            Self::Generation(e) => e.kind(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::EmptyPartId(e) => e.user_message(),
            Self::NotFound { part_id } => format!(
                "Failed to get component uuid for {}\n\
                 The component # is probably wrong. Check a possible typo and \
                 that the component exists on easyEDA",
                part_id
            ),
            Self::Network(e) => e.user_message(),
            Self::Generation(e) => e.user_message(),
        }
    }
}

/// One acquisition run over borrowed collaborators.
pub struct PartAcquisition<'a> {
    catalog: &'a dyn CatalogLookup,
    library: &'a dyn GenerationLibrary,
    layout: &'a LibraryLayout,
}

impl<'a> PartAcquisition<'a> {
    pub fn new(
        catalog: &'a dyn CatalogLookup,
        library: &'a dyn GenerationLibrary,
        layout: &'a LibraryLayout,
    ) -> Self {
        Self {
            catalog,
            library,
            layout,
        }
    }

    /// Acquire `part_id` into `output_dir`.
    ///
    /// An empty identifier is rejected before any request. "Not found" and
    /// network failures produce no files. `skip_existing` is forwarded to
    /// both generation calls.
    pub fn acquire(
        &self,
        part_id: &str,
        output_dir: &Path,
        include_symbol: bool,
        skip_existing: bool,
    ) -> Result<AcquiredPart, AcquireError> {
        let part_id = PartIdentifier::new(part_id)?;
        info!(part_id = %part_id, output_dir = %output_dir.display(), "Creating library for component");

        let response = match self.catalog.lookup(&part_id)? {
            LookupOutcome::Found(response) => response,
            LookupOutcome::NotFound => {
                warn!(part_id = %part_id, "Part not found in catalog");
                return Err(AcquireError::NotFound {
                    part_id: part_id.to_string(),
                });
            }
        };

        let layout = self.layout;
        let footprint = FootprintRequest {
            footprint_uuid: response.footprint_uuid().to_string(),
            part_id: part_id.to_string(),
            footprint_lib: layout.footprint_lib.clone(),
            output_dir: output_dir.to_path_buf(),
            model_base_variable: layout.model_base_variable.clone(),
            model_dir: layout.model_dir.clone(),
            skip_existing,
            model_format: layout.model_format,
        };
        let generated = self.library.create_footprint(&footprint)?;
        debug!(
            footprint = %generated.footprint_qualified_name,
            datasheet = ?generated.datasheet_link,
            "Footprint generated"
        );

        if include_symbol {
            let symbol = SymbolRequest {
                symbol_uuids: response.symbol_uuids(),
                footprint_reference: naming::symbol_footprint_reference(
                    &generated.footprint_qualified_name,
                    &layout.footprint_lib,
                    &layout.footprint_nickname,
                ),
                datasheet_link: generated.datasheet_link.clone(),
                library_name: layout.symbol_lib.clone(),
                symbol_path: layout.symbol_dir.clone(),
                output_dir: output_dir.to_path_buf(),
                part_id: part_id.to_string(),
                skip_existing,
            };
            self.library.create_symbol(&symbol)?;
            debug!(symbols = symbol.symbol_uuids.len(), "Symbols generated");
        }

        Ok(AcquiredPart {
            library_path: naming::library_path(output_dir, &layout.footprint_lib),
            component_name: naming::component_name(
                &generated.footprint_qualified_name,
                &layout.footprint_lib,
            ),
            datasheet_link: generated.datasheet_link,
        })
    }
}
