//! Match settings
//!
//! Loaded from a JSON file (or built in code) and validated before a match
//! is constructed. Invalid configuration is fatal.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{MATCH_DURATION_SECS, MAX_CPU_LEVEL};
use crate::error::ConfigError;

/// Who produces a player's intent each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ControlMode {
    /// Intent set externally through `Match::set_intent`
    Human,
    /// Built-in controller at the given difficulty (0..=MAX_CPU_LEVEL)
    Cpu { level: u8 },
}

impl Default for ControlMode {
    fn default() -> Self {
        ControlMode::Cpu {
            level: MAX_CPU_LEVEL,
        }
    }
}

impl ControlMode {
    pub fn is_human(&self) -> bool {
        matches!(self, ControlMode::Human)
    }

    /// Difficulty normalized to 0..=1 (None for human players)
    pub fn difficulty(&self) -> Option<f32> {
        match self {
            ControlMode::Human => None,
            ControlMode::Cpu { level } => Some(*level as f32 / MAX_CPU_LEVEL as f32),
        }
    }
}

impl FromStr for ControlMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scheme = s.trim().to_lowercase();
        match scheme.as_str() {
            "human" => return Ok(ControlMode::Human),
            "cpu" => return Ok(ControlMode::default()),
            _ => {}
        }

        let level = scheme
            .strip_prefix("cpu:")
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| ConfigError::UnknownControlScheme(s.to_string()))?;
        if level > MAX_CPU_LEVEL as u32 {
            return Err(ConfigError::CpuLevelOutOfRange {
                level,
                max: MAX_CPU_LEVEL,
            });
        }
        Ok(ControlMode::Cpu { level: level as u8 })
    }
}

impl TryFrom<String> for ControlMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ControlMode> for String {
    fn from(mode: ControlMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Human => write!(f, "human"),
            ControlMode::Cpu { level } => write!(f, "cpu:{level}"),
        }
    }
}

/// Per-player setup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSetup {
    pub control: ControlMode,
}

/// Everything needed to construct a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Match length in seconds of match clock
    pub duration_secs: f32,
    /// Seed for every random draw in the match
    pub seed: u64,
    /// Player 1 and player 2
    pub players: [PlayerSetup; 2],
    /// Hitting balls sit idle instead of seeking
    pub disable_seeking_hitting_ball: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            duration_secs: MATCH_DURATION_SECS,
            seed: 0x5eed,
            players: [PlayerSetup::default(), PlayerSetup::default()],
            disable_seeking_hitting_ball: false,
        }
    }
}

impl MatchSettings {
    /// Settings with the given control modes and defaults elsewhere
    pub fn with_controls(player1: ControlMode, player2: ControlMode) -> Self {
        Self {
            players: [
                PlayerSetup { control: player1 },
                PlayerSetup { control: player2 },
            ],
            ..Self::default()
        }
    }

    /// Parse and validate settings from JSON
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(ConfigError::InvalidDuration(self.duration_secs));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_schemes() {
        assert_eq!("human".parse::<ControlMode>().unwrap(), ControlMode::Human);
        assert_eq!(
            "CPU".parse::<ControlMode>().unwrap(),
            ControlMode::Cpu { level: 10 }
        );
        assert_eq!(
            "cpu:3".parse::<ControlMode>().unwrap(),
            ControlMode::Cpu { level: 3 }
        );
    }

    #[test]
    fn test_unknown_control_scheme_fails() {
        let err = "joystick".parse::<ControlMode>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownControlScheme(_)));

        let err = "cpu:11".parse::<ControlMode>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::CpuLevelOutOfRange { level: 11, .. }
        ));
    }

    #[test]
    fn test_settings_json_roundtrip() {
        let json = r#"{
            "duration_secs": 60.0,
            "seed": 7,
            "players": [{ "control": "human" }, { "control": "cpu:4" }]
        }"#;
        let settings = MatchSettings::from_json_str(json).unwrap();
        assert_eq!(settings.duration_secs, 60.0);
        assert_eq!(settings.players[0].control, ControlMode::Human);
        assert_eq!(settings.players[1].control, ControlMode::Cpu { level: 4 });
        assert!(!settings.disable_seeking_hitting_ball);

        let back = serde_json::to_string(&settings).unwrap();
        assert!(back.contains("\"cpu:4\""));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err = MatchSettings::from_json_str(r#"{ "players": [{ "control": "ai" }, {}] }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = MatchSettings::from_json_str(r#"{ "duration_secs": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration(_)));
    }

    #[test]
    fn test_difficulty_normalized() {
        assert_eq!(ControlMode::Human.difficulty(), None);
        assert_eq!(ControlMode::Cpu { level: 5 }.difficulty(), Some(0.5));
        assert_eq!(ControlMode::default().difficulty(), Some(1.0));
    }
}
