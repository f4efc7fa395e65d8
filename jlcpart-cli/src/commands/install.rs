//! `jlcpart install`: install the generation library if missing.

use jlcpart::config::ConfigFile;
use jlcpart::{LibraryReady, Session};

use super::common::confirm_or_no;
use crate::error::CliError;

pub fn run(assume_yes: bool, config: ConfigFile) -> Result<(), CliError> {
    let mut session = Session::from_config(config)?;
    let ready = session.ensure_library_or_install(|| {
        confirm_or_no(
            "JLC2KiCad library is missing.\n\nInstall JLC2KiCadLib now?",
            assume_yes,
        )
    })?;

    match ready {
        LibraryReady::Available => println!("{}", session.library_status_text()),
        LibraryReady::Installed(report) => println!("{}", report.message()),
    }
    Ok(())
}
