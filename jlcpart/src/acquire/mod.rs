//! Part acquisition against the external generation library.

mod binding;
mod naming;
mod pipeline;
mod python;

pub use binding::{
    BindingError, BindingResolver, FootprintRequest, GenerationError, GenerationLibrary,
    GenerationResult, LibraryBinding, ModelFormat, SymbolRequest,
};
pub use naming::{component_name, footprint_file, library_path, symbol_footprint_reference};
pub use pipeline::{AcquireError, AcquireMode, AcquiredPart, LibraryLayout, PartAcquisition};
pub use python::{PythonBindingResolver, PythonLibrary};

#[cfg(test)]
pub(crate) use binding::tests::{FakeLibrary, FakeResolver};
