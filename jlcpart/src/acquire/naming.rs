//! Names and paths derived from generation results.
//!
//! The generation library qualifies footprints with its on-disk library
//! name, while the host's library table registers that library under a
//! nickname. Symbols must link to the nickname or the host cannot resolve
//! the footprint.

use std::path::{Path, PathBuf};

/// Suffix of on-disk footprint library directories.
pub const LIBRARY_DIR_SUFFIX: &str = ".pretty";

/// File extension of a generated footprint.
pub const FOOTPRINT_EXTENSION: &str = "kicad_mod";

/// Footprint link for a symbol.
///
/// Every occurrence of `footprint_lib` becomes `nickname`, then every
/// [`LIBRARY_DIR_SUFFIX`] is removed.
///
/// ```
/// use jlcpart::acquire::symbol_footprint_reference;
///
/// assert_eq!(
///     symbol_footprint_reference("footprint:SOT-23-5", "footprint", "jlc"),
///     "jlc:SOT-23-5"
/// );
/// assert_eq!(
///     symbol_footprint_reference("footprint.pretty:LQFP-48", "footprint", "jlc"),
///     "jlc:LQFP-48"
/// );
/// ```
pub fn symbol_footprint_reference(qualified_name: &str, footprint_lib: &str, nickname: &str) -> String {
    let renamed = if footprint_lib.is_empty() {
        qualified_name.to_string()
    } else {
        qualified_name.replace(footprint_lib, nickname)
    };
    renamed.replace(LIBRARY_DIR_SUFFIX, "")
}

/// Bare component name: the qualified name without its `<library>:` prefix.
pub fn component_name(qualified_name: &str, footprint_lib: &str) -> String {
    qualified_name.replace(&format!("{}:", footprint_lib), "")
}

/// Directory holding generated footprints.
pub fn library_path(output_dir: &Path, footprint_lib: &str) -> PathBuf {
    output_dir.join(footprint_lib)
}

/// Generated footprint file for a component.
pub fn footprint_file(library_path: &Path, component_name: &str) -> PathBuf {
    library_path.join(format!("{}.{}", component_name, FOOTPRINT_EXTENSION))
}
