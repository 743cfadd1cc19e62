//! TOML-backed engine configuration.
//!
//! Every threshold used by focus admission, streak math, scoring and the
//! daily reset lives here. Missing keys fall back to defaults, so an empty
//! file yields `EngineConfig::default()`.
//!
//! ```toml
//! [focus]
//! capacity = 4
//!
//! [streak]
//! grace_days = 5
//!
//! [scoring.task_done]
//! high_points = 5
//! low_points = 2
//! min_points = 1
//! high_limit = 4
//! ```

use crate::model::entry::{RECOVERY_CYCLES_MAX, STREAK_CEILING};
use crate::model::score::{ScoreCategory, ScoreRule};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration load/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    InvalidValue {
        key: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Serialize(err) => write!(f, "failed to serialize config: {err}"),
            Self::InvalidValue { key, message } => {
                write!(f, "invalid config value for `{key}`: {message}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

/// Focus admission settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusConfig {
    #[serde(default = "default_focus_capacity")]
    pub capacity: u32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            capacity: default_focus_capacity(),
        }
    }
}

/// Streak thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRules {
    #[serde(default = "default_max_streak")]
    pub max_streak: u8,
    /// Largest gap (in days) still handled as a grace-window lapse.
    #[serde(default = "default_grace_days")]
    pub grace_days: i64,
    /// Long lapses needed before the frozen value is partially restored.
    #[serde(default = "default_recovery_cycles")]
    pub recovery_cycles: u8,
}

impl Default for StreakRules {
    fn default() -> Self {
        Self {
            max_streak: default_max_streak(),
            grace_days: default_grace_days(),
            recovery_cycles: default_recovery_cycles(),
        }
    }
}

/// Scoring tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Daily count after which only `min_points` is granted.
    #[serde(default = "default_low_limit")]
    pub low_limit: u32,
    #[serde(default = "default_level_step")]
    pub level_step: u64,
    #[serde(default = "default_identity_fill_rule")]
    pub identity_fill: ScoreRule,
    #[serde(default = "default_task_done_rule")]
    pub task_done: ScoreRule,
    #[serde(default = "default_habit_log_rule")]
    pub habit_log: ScoreRule,
    #[serde(default = "default_note_new_rule")]
    pub note_new: ScoreRule,
}

impl ScoringConfig {
    pub fn rule(&self, category: ScoreCategory) -> ScoreRule {
        match category {
            ScoreCategory::IdentityFill => self.identity_fill,
            ScoreCategory::TaskDone => self.task_done,
            ScoreCategory::HabitLog => self.habit_log,
            ScoreCategory::NoteNew => self.note_new,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            low_limit: default_low_limit(),
            level_step: default_level_step(),
            identity_fill: default_identity_fill_rule(),
            task_done: default_task_done_rule(),
            habit_log: default_habit_log_rule(),
            note_new: default_note_new_rule(),
        }
    }
}

/// Daily reset scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetConfig {
    #[serde(default = "default_reset_interval_secs")]
    pub interval_secs: u64,
}

impl ResetConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reset_interval_secs(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub focus: FocusConfig,
    #[serde(default)]
    pub streak: StreakRules,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub reset: ResetConfig,
}

impl EngineConfig {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Rejects values that would break engine invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.focus.capacity == 0 {
            return Err(invalid("focus.capacity", "must be at least 1"));
        }
        if self.streak.max_streak == 0 || self.streak.max_streak > STREAK_CEILING {
            return Err(invalid(
                "streak.max_streak",
                format!("must be within 1..={STREAK_CEILING}"),
            ));
        }
        if self.streak.grace_days < 1 {
            return Err(invalid("streak.grace_days", "must be at least 1"));
        }
        if !(1..=RECOVERY_CYCLES_MAX).contains(&self.streak.recovery_cycles) {
            return Err(invalid(
                "streak.recovery_cycles",
                format!("must be within 1..={RECOVERY_CYCLES_MAX}"),
            ));
        }
        if self.scoring.level_step == 0 {
            return Err(invalid("scoring.level_step", "must be at least 1"));
        }
        for category in ScoreCategory::ALL {
            if self.scoring.rule(category).high_limit > self.scoring.low_limit {
                return Err(invalid(
                    "scoring.high_limit",
                    format!(
                        "`{}` high_limit exceeds low_limit {}",
                        category.as_str(),
                        self.scoring.low_limit
                    ),
                ));
            }
        }
        if self.reset.interval_secs == 0 {
            return Err(invalid("reset.interval_secs", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        message: message.into(),
    }
}

fn default_focus_capacity() -> u32 {
    4
}

fn default_max_streak() -> u8 {
    STREAK_CEILING
}

fn default_grace_days() -> i64 {
    5
}

fn default_recovery_cycles() -> u8 {
    3
}

fn default_low_limit() -> u32 {
    10
}

fn default_level_step() -> u64 {
    200
}

fn default_identity_fill_rule() -> ScoreRule {
    ScoreRule {
        high_points: 10,
        low_points: 2,
        min_points: 0,
        high_limit: 1,
    }
}

fn default_task_done_rule() -> ScoreRule {
    ScoreRule {
        high_points: 5,
        low_points: 2,
        min_points: 1,
        high_limit: 4,
    }
}

fn default_habit_log_rule() -> ScoreRule {
    ScoreRule {
        high_points: 3,
        low_points: 1,
        min_points: 0,
        high_limit: 5,
    }
}

fn default_note_new_rule() -> ScoreRule {
    ScoreRule {
        high_points: 2,
        low_points: 1,
        min_points: 0,
        high_limit: 3,
    }
}

fn default_reset_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::model::score::ScoreCategory;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.focus.capacity, 4);
        assert_eq!(config.streak.grace_days, 5);
        assert_eq!(config.streak.recovery_cycles, 3);
        assert_eq!(config.scoring.low_limit, 10);
        assert_eq!(config.scoring.level_step, 200);
        assert_eq!(config.reset.interval_secs, 60);
    }

    #[test]
    fn partial_sections_override_only_given_keys() {
        let config = EngineConfig::from_toml_str(
            "[focus]\ncapacity = 2\n\n[scoring.habit_log]\nhigh_points = 7\nlow_points = 3\nmin_points = 1\nhigh_limit = 2\n",
        )
        .unwrap();
        assert_eq!(config.focus.capacity, 2);
        assert_eq!(config.scoring.rule(ScoreCategory::HabitLog).high_points, 7);
        assert_eq!(
            config.scoring.rule(ScoreCategory::TaskDone),
            EngineConfig::default().scoring.task_done
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = EngineConfig::from_toml_str("[focus]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "focus.capacity",
                ..
            }
        ));
    }

    #[test]
    fn streak_ceiling_cannot_be_raised() {
        let err = EngineConfig::from_toml_str("[streak]\nmax_streak = 150\n").unwrap_err();
        assert!(err.to_string().contains("streak.max_streak"));
    }

    #[test]
    fn recovery_cycles_are_bounded() {
        assert!(EngineConfig::from_toml_str("[streak]\nrecovery_cycles = 10\n").is_ok());
        let err = EngineConfig::from_toml_str("[streak]\nrecovery_cycles = 11\n").unwrap_err();
        assert!(err.to_string().contains("streak.recovery_cycles"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn serialized_defaults_parse_back() {
        let text = EngineConfig::default().to_toml_string().unwrap();
        assert_eq!(
            EngineConfig::from_toml_str(&text).unwrap(),
            EngineConfig::default()
        );
    }
}
