//! `jlcpart status`: interpreter and library versions.

use console::style;
use jlcpart::bootstrap::VersionStatus;
use jlcpart::config::ConfigFile;
use jlcpart::Session;

use crate::error::CliError;

pub fn run(config: ConfigFile) -> Result<(), CliError> {
    let mut session = Session::from_config(config)?;

    let interpreter = session
        .bootstrapper()
        .interpreter()
        .map(|i| i.to_string())
        .unwrap_or_else(|| "not found".to_string());
    println!("Interpreter: {}", interpreter);
    let versions = session.versions();
    println!("{}", versions.installed_text());
    println!(
        "Latest:      {}",
        versions.latest.as_deref().unwrap_or("unknown (index unreachable)")
    );

    let line = match versions.status() {
        VersionStatus::UpToDate { .. } => style("up to date".to_string()).green(),
        VersionStatus::NotInstalled { .. } => style("not installed; run `jlcpart install`".to_string()).yellow(),
        VersionStatus::LatestUnknown { .. } => style("latest version unknown".to_string()).yellow(),
        VersionStatus::Mismatch { latest, direction, .. } => {
            style(format!("{} available ({:?}); run `jlcpart update`", latest, direction)).yellow()
        }
    };
    println!("Status:      {}", line);
    Ok(())
}
