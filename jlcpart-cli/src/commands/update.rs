//! `jlcpart update`: check for updates and upgrade.

use jlcpart::bootstrap::upgrade_prompt;
use jlcpart::config::ConfigFile;
use jlcpart::Session;

use super::common::confirm_or_no;
use crate::error::CliError;

pub fn run(assume_yes: bool, config: ConfigFile) -> Result<(), CliError> {
    let mut session = Session::from_config(config)?;
    let (_, report) =
        session.check_for_updates(|info| confirm_or_no(&upgrade_prompt(info), assume_yes))?;
    println!("{}", report.message());
    Ok(())
}
