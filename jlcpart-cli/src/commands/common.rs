//! Helpers shared across commands.

use std::io::{self, Read};

use dialoguer::Confirm;
use jlcpart::catalog::PartIdentifier;

use crate::error::CliError;

/// Ask a yes/no question; `assume_yes` answers without prompting.
///
/// Without a terminal on stdin the answer is "no".
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool, CliError> {
    if assume_yes {
        return Ok(true);
    }
    if !atty::is(atty::Stream::Stdin) {
        eprintln!("{}\n(no terminal to answer; pass --yes to accept)", prompt);
        return Ok(false);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Same as [`confirm`] for callers that cannot propagate errors.
pub fn confirm_or_no(prompt: &str, assume_yes: bool) -> bool {
    confirm(prompt, assume_yes).unwrap_or(false)
}

/// The part number argument, reading stdin for `-`.
pub fn resolve_part_argument(arg: &str) -> Result<String, CliError> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    part_from_text(&text)
}

/// First part number found in free text.
pub fn part_from_text(text: &str) -> Result<String, CliError> {
    PartIdentifier::find_in_text(text)
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| CliError::Input("No part number (e.g. C326215) found in input".to_string()))
}
