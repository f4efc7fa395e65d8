//! `jlcpart fetch`: download a part.

use std::path::PathBuf;

use clap::Args;
use jlcpart::acquire::{library_path, AcquireMode};
use jlcpart::config::ConfigFile;
use jlcpart::delivery::HostDocument;
use jlcpart::{LibraryReady, Session};
use tracing::info;

use super::common::{confirm_or_no, resolve_part_argument};
use crate::error::CliError;
use crate::host::{PipeChannel, ProjectLibraryHost};

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Part number (e.g. C326215), or `-` to read it from stdin
    pub part: String,

    /// Project directory; footprint and symbol go into its library folder
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Footprint only, written to stdout when piped
    #[arg(long)]
    pub clipboard: bool,

    /// Install the generation library without asking if it is missing
    #[arg(short, long)]
    pub yes: bool,
}

impl FetchArgs {
    fn mode(&self) -> AcquireMode {
        if self.project.is_some() && !self.clipboard {
            AcquireMode::ProjectLibrary
        } else {
            AcquireMode::Clipboard
        }
    }
}

pub fn run(args: FetchArgs, config: ConfigFile) -> Result<(), CliError> {
    let part = resolve_part_argument(&args.part)?;
    let project_dir = match &args.project {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let mode = args.mode();

    let mut session = Session::from_config(config)?;
    let ready = session.ensure_library_or_install(|| {
        confirm_or_no("JLC2KiCad library is missing.\n\nInstall it now?", args.yes)
    })?;
    if let LibraryReady::Installed(report) = ready {
        eprintln!("{}", report.message());
    }

    let library_dir = library_path(
        &session.project_library_dir(&project_dir),
        &session.config().output.layout.footprint_lib,
    );
    let mut host = ProjectLibraryHost::new(&project_dir, library_dir);

    let acquisition = session.acquire(&part, mode, host.document_dir().as_deref())?;

    if mode == AcquireMode::ProjectLibrary {
        eprintln!("{}", acquisition.message());
        return Ok(());
    }

    let mut channel = PipeChannel::stdout();
    let outcome = session.deliver(&acquisition, &mut channel, &mut host)?;
    info!(outcome = ?outcome, "Delivered");

    if outcome.is_degraded() {
        let placed = host
            .placed()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!(
            "stdout is a terminal. Footprint {} was saved to {}",
            acquisition.part.component_name, placed
        );
    }
    Ok(())
}
