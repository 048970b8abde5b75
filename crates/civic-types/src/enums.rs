//! Enumeration and code types for civic events.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when parsing a [`Level`] or [`StateCode`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCodeError {
    /// The value is not one of `federal`, `state`, `local`.
    #[error("unknown government level: {0}")]
    Level(String),
    /// The value is not a recognized two-letter state or territory code.
    #[error("invalid state code: {0}")]
    State(String),
}

// ---------------------------------------------------------------------------
// Government level
// ---------------------------------------------------------------------------

/// The level of government holding a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Level {
    /// Congress and federal agencies.
    Federal,
    /// State legislatures and agencies.
    State,
    /// City councils, county boards, school boards.
    Local,
}

impl Level {
    /// The lowercase name stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Federal => "federal",
            Self::State => "state",
            Self::Local => "local",
        }
    }
}

impl core::fmt::Display for Level {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Level {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "federal" => Ok(Self::Federal),
            "state" => Ok(Self::State),
            "local" | "municipal" | "county" => Ok(Self::Local),
            _ => Err(ParseCodeError::Level(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// State code
// ---------------------------------------------------------------------------

/// Postal codes of the 50 states, the District of Columbia, and the
/// inhabited territories.
pub const STATE_CODES: [&str; 56] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC", "PR", "GU", "VI", "AS", "MP",
];

/// A validated, upper-cased two-letter state or territory code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(export, export_to = "bindings/")]
pub struct StateCode(String);

impl StateCode {
    /// Parse a code case-insensitively, rejecting anything not in
    /// [`STATE_CODES`].
    pub fn parse(raw: &str) -> Result<Self, ParseCodeError> {
        let upper = raw.trim().to_ascii_uppercase();
        if STATE_CODES.contains(&upper.as_str()) {
            Ok(Self(upper))
        } else {
            Err(ParseCodeError::State(raw.to_owned()))
        }
    }

    /// The code as an upper-case string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for StateCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for StateCode {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StateCode {
    type Error = ParseCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StateCode> for String {
    fn from(code: StateCode) -> Self {
        code.0
    }
}
