//! Operating-system scope labels.
//!
//! # Responsibility
//! - Define the closed set of OS labels an entity can be scoped to.
//! - Convert labels to and from their persisted lowercase text form.
//!
//! # Invariants
//! - Persisted text is always one of `linux|mac|windows`.
//! - Declaration order matches the text order so sorted vectors agree with
//!   `ORDER BY os` results.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Operating system an entity applies to.
///
/// An entity with no labels applies to every operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsLabel {
    Linux,
    Mac,
    Windows,
}

impl OsLabel {
    /// Full known enumeration. A filter covering all of it matches everything.
    pub const ALL: [OsLabel; 3] = [OsLabel::Linux, OsLabel::Mac, OsLabel::Windows];

    /// Returns the persisted label text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Windows => "windows",
        }
    }
}

impl Display for OsLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text does not name a known OS label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOsLabelError(pub String);

impl Display for ParseOsLabelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown os label `{}`; expected linux|mac|windows",
            self.0
        )
    }
}

impl Error for ParseOsLabelError {}

impl FromStr for OsLabel {
    type Err = ParseOsLabelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "mac" | "macos" | "darwin" | "osx" => Ok(Self::Mac),
            "windows" | "win" => Ok(Self::Windows),
            _ => Err(ParseOsLabelError(value.to_string())),
        }
    }
}

impl ToSql for OsLabel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for OsLabel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|err: ParseOsLabelError| FromSqlError::Other(Box::new(err)))
    }
}
