//! Terminal stand-ins for the host application.
//!
//! The transient channel is stdout when it is piped into another program.
//! Placement copies the footprint into the project library folder, which is
//! where a board editor would load it from.

use std::fs;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};

use jlcpart::acquire::footprint_file;
use jlcpart::delivery::{HostDocument, Placement, TransientChannel};
use tracing::debug;

/// Transient channel over a writer that is only usable when not a terminal.
pub struct PipeChannel<W: Write> {
    writer: W,
    available: bool,
}

impl PipeChannel<Stdout> {
    /// Stdout, available only when redirected.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), !atty::is(atty::Stream::Stdout))
    }
}

impl<W: Write> PipeChannel<W> {
    pub fn new(writer: W, available: bool) -> Self {
        Self { writer, available }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TransientChannel for PipeChannel<W> {
    fn open(&mut self) -> bool {
        self.available
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.writer.flush();
    }
}

/// A project directory acting as the open document.
pub struct ProjectLibraryHost {
    project_dir: PathBuf,
    library_dir: PathBuf,
    placed: Option<PathBuf>,
}

impl ProjectLibraryHost {
    /// `library_dir` is the footprint library inside the project folder.
    pub fn new(project_dir: impl Into<PathBuf>, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            library_dir: library_dir.into(),
            placed: None,
        }
    }

    /// File written by the last placement.
    pub fn placed(&self) -> Option<&Path> {
        self.placed.as_deref()
    }
}

impl HostDocument for ProjectLibraryHost {
    fn document_dir(&self) -> Option<PathBuf> {
        Some(self.project_dir.clone())
    }

    fn load_footprint(
        &mut self,
        library_path: &Path,
        component_name: &str,
        at: Placement,
    ) -> Result<(), String> {
        let source = footprint_file(library_path, component_name);
        let target = footprint_file(&self.library_dir, component_name);
        debug!(
            source = %source.display(),
            target = %target.display(),
            x = at.x,
            y = at.y,
            "Placing footprint"
        );

        if source != target {
            fs::create_dir_all(&self.library_dir)
                .map_err(|e| format!("{}: {}", self.library_dir.display(), e))?;
            fs::copy(&source, &target).map_err(|e| format!("{}: {}", source.display(), e))?;
        } else if !target.is_file() {
            return Err(format!("{} does not exist", target.display()));
        }

        self.placed = Some(target);
        Ok(())
    }

    fn refresh(&mut self) {
        debug!("Nothing to refresh in a terminal host");
    }
}
