//! Vendor part identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::error::{FailureKind, UserFacing};

/// Raised when a part identifier is empty after trimming.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no part number given; type a part number, e.g. C326215")]
pub struct EmptyPartIdentifier;

impl UserFacing for EmptyPartIdentifier {
    fn kind(&self) -> FailureKind {
        FailureKind::Validation
    }

    fn user_message(&self) -> String {
        "Type a part number, e.g. C326215.".to_string()
    }
}

/// An opaque vendor part number (e.g. `C326215`).
///
/// The only validation is non-emptiness: the catalog is the authority on
/// whether a part exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartIdentifier(String);

impl PartIdentifier {
    /// Create an identifier from user input, trimming surrounding whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use jlcpart::catalog::PartIdentifier;
    ///
    /// let part = PartIdentifier::new(" C326215 ").unwrap();
    /// assert_eq!(part.as_str(), "C326215");
    /// assert!(PartIdentifier::new("   ").is_err());
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, EmptyPartIdentifier> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EmptyPartIdentifier);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Find the first LCSC-style part number (`C` followed by digits) in
    /// free text, such as a line copied from a BOM or a shop page.
    ///
    /// # Examples
    ///
    /// ```
    /// use jlcpart::catalog::PartIdentifier;
    ///
    /// let part = PartIdentifier::find_in_text("LCSC Part #: C326215 (in stock)").unwrap();
    /// assert_eq!(part.as_str(), "C326215");
    /// assert!(PartIdentifier::find_in_text("ABC326215").is_none());
    /// ```
    pub fn find_in_text(text: &str) -> Option<Self> {
        part_number_pattern()
            .find(text)
            .map(|m| Self(m.as_str().to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn part_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bC\d+\b").unwrap())
}

impl fmt::Display for PartIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartIdentifier {
    type Err = EmptyPartIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PartIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
