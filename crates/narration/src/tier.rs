use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Verbosity of narration text, bound to the operator's access level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerbosityTier {
    Level1,
    Level2,
    Level3,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown user level '{0}' (expected Level1, Level2 or Level3)")]
pub struct UnknownTier(pub String);

impl VerbosityTier {
    pub const ALL: [VerbosityTier; 3] = [
        VerbosityTier::Level1,
        VerbosityTier::Level2,
        VerbosityTier::Level3,
    ];

    pub fn number(self) -> u8 {
        match self {
            VerbosityTier::Level1 => 1,
            VerbosityTier::Level2 => 2,
            VerbosityTier::Level3 => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(VerbosityTier::Level1),
            2 => Some(VerbosityTier::Level2),
            3 => Some(VerbosityTier::Level3),
            _ => None,
        }
    }

    pub fn message_style(self) -> &'static str {
        match self {
            VerbosityTier::Level1 => "Detailed Descriptive",
            VerbosityTier::Level2 => "Simple Operational",
            VerbosityTier::Level3 => "Brief Status",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VerbosityTier::Level1 => {
                "Detailed descriptive messages with full context and safety information"
            }
            VerbosityTier::Level2 => "Simple operational messages showing basic action information",
            VerbosityTier::Level3 => "Very brief status messages showing only the essential action",
        }
    }
}

impl fmt::Display for VerbosityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level{}", self.number())
    }
}

impl FromStr for VerbosityTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase();
        let digits = t.strip_prefix("level").unwrap_or(&t);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}
