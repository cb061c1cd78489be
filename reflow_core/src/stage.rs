//! Top-level profile phases.

use std::fmt;
use std::str::FromStr;

use crate::error::ReflowError;

/// Profile stage. Stages only move forward through
/// Preheat → Soak → Reflow → Cool, or jump to `Error` on fail-stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Preheat,
    Soak,
    Reflow,
    Cool,
    Error,
}

impl Stage {
    /// Stages whose duty levels come from the band table.
    pub const TABLED: [Stage; 3] = [Stage::Preheat, Stage::Soak, Stage::Reflow];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Preheat => "preheat",
            Stage::Soak => "soak",
            Stage::Reflow => "reflow",
            Stage::Cool => "cool",
            Stage::Error => "error",
        }
    }

    /// Stage entered when this one's exit threshold is met.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Preheat => Some(Stage::Soak),
            Stage::Soak => Some(Stage::Reflow),
            Stage::Reflow => Some(Stage::Cool),
            Stage::Cool | Stage::Error => None,
        }
    }

    pub fn is_tabled(self) -> bool {
        matches!(self, Stage::Preheat | Stage::Soak | Stage::Reflow)
    }

    /// Wire code used when a stage crosses a process boundary.
    pub fn code(self) -> u8 {
        match self {
            Stage::Preheat => 0,
            Stage::Soak => 1,
            Stage::Reflow => 2,
            Stage::Cool => 3,
            Stage::Error => 4,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Stage {
    type Error = ReflowError;

    fn try_from(code: u8) -> Result<Self, ReflowError> {
        match code {
            0 => Ok(Stage::Preheat),
            1 => Ok(Stage::Soak),
            2 => Ok(Stage::Reflow),
            3 => Ok(Stage::Cool),
            4 => Ok(Stage::Error),
            other => Err(ReflowError::InvalidStage(other)),
        }
    }
}

impl FromStr for Stage {
    type Err = ReflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preheat" => Ok(Stage::Preheat),
            "soak" => Ok(Stage::Soak),
            "reflow" => Ok(Stage::Reflow),
            "cool" => Ok(Stage::Cool),
            "error" => Ok(Stage::Error),
            other => Err(ReflowError::Config(format!("unknown stage {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_unknown_is_rejected() {
        for s in [
            Stage::Preheat,
            Stage::Soak,
            Stage::Reflow,
            Stage::Cool,
            Stage::Error,
        ] {
            assert_eq!(Stage::try_from(s.code()).unwrap(), s);
        }
        assert_eq!(Stage::try_from(9), Err(ReflowError::InvalidStage(9)));
    }

    #[test]
    fn next_walks_forward_and_stops() {
        assert_eq!(Stage::Preheat.next(), Some(Stage::Soak));
        assert_eq!(Stage::Reflow.next(), Some(Stage::Cool));
        assert_eq!(Stage::Cool.next(), None);
        assert_eq!(Stage::Error.next(), None);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Soak".parse::<Stage>().unwrap(), Stage::Soak);
        assert!("bake".parse::<Stage>().is_err());
    }
}
