use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much of a turn's history a projection shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Terminal outcome only
    Minimal,
    /// Outcome plus tool activity, pauses, questions and errors
    #[default]
    Normal,
    /// Every recorded event
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown verbosity '{0}' (expected minimal, normal or detailed)")]
pub struct ParseVerbosityError(String);

impl FromStr for Verbosity {
    type Err = ParseVerbosityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" | "quiet" => Ok(Verbosity::Minimal),
            "normal" => Ok(Verbosity::Normal),
            "detailed" | "verbose" => Ok(Verbosity::Detailed),
            _ => Err(ParseVerbosityError(s.to_string())),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verbosity::Minimal => "minimal",
            Verbosity::Normal => "normal",
            Verbosity::Detailed => "detailed",
        };
        f.write_str(name)
    }
}
