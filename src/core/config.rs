//! Engine tuning: failure thresholds, control-loop constants and rewards.
//!
//! Every section is `#[serde(default)]`, so a RON file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::failure::{FailureMetric, FailureThreshold, Severity, SupportLevel};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Metrics at or above `warning_ratio × threshold` produce a warning.
    pub warning_ratio: f32,
    /// Difficulty mismatch above which a long-term recommendation is made.
    pub mismatch_recommendation: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            warning_ratio: 0.8,
            mismatch_recommendation: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub currency_per_level: f32,
    pub turns_per_objective: f32,
    pub choice_window: usize,
    pub repeat_cap: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            currency_per_level: 100.0,
            turns_per_objective: 5.0,
            choice_window: 10,
            repeat_cap: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    pub raise_below: f32,
    pub lower_above: f32,
    pub initial_level: SupportLevel,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            raise_below: 0.3,
            lower_above: 0.8,
            initial_level: SupportLevel::Moderate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub adaptive_step: f32,
    pub struggle_failure_rate: f32,
    pub mastery_min_completed: u32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            adaptive_step: 0.5,
            struggle_failure_rate: 0.5,
            mastery_min_completed: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub base_experience: u32,
    pub experience_per_difficulty: u32,
    pub agency_bonus_threshold: f32,
    pub skill_points: u32,
    pub fast_completion_turns: u32,
    pub currency_bonus: u32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            base_experience: 500,
            experience_per_difficulty: 100,
            agency_bonus_threshold: 70.0,
            skill_points: 2,
            fast_completion_turns: 15,
            currency_bonus: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Vec<FailureThreshold>,
    pub detection: DetectionConfig,
    pub metrics: MetricsConfig,
    pub support: SupportConfig,
    pub difficulty: DifficultyConfig,
    pub rewards: RewardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            detection: DetectionConfig::default(),
            metrics: MetricsConfig::default(),
            support: SupportConfig::default(),
            difficulty: DifficultyConfig::default(),
            rewards: RewardConfig::default(),
        }
    }
}

pub fn default_thresholds() -> Vec<FailureThreshold> {
    vec![
        FailureThreshold::new(FailureMetric::ObjectiveFailures, 0.7, Severity::Critical),
        FailureThreshold::new(FailureMetric::TimeInefficiency, 0.75, Severity::Warning),
        FailureThreshold::new(FailureMetric::ResourceDepletion, 0.8, Severity::Concern),
        FailureThreshold::new(FailureMetric::RelationshipBreakdown, 0.6, Severity::Concern),
        FailureThreshold::new(FailureMetric::PlayerFrustration, 0.6, Severity::Critical),
        FailureThreshold::new(FailureMetric::DifficultyMismatch, 0.5, Severity::Warning),
    ]
}

impl EngineConfig {
    /// Load a config from a RON file and validate it.
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string and validate it.
    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for t in &self.thresholds {
            if !(0.0..=1.0).contains(&t.threshold) {
                return Err(ConfigError::Invalid(format!(
                    "threshold for {} must be within [0, 1], got {}",
                    t.metric, t.threshold
                )));
            }
        }
        if self.support.raise_below >= self.support.lower_above {
            return Err(ConfigError::Invalid(format!(
                "support raise_below ({}) must be below lower_above ({})",
                self.support.raise_below, self.support.lower_above
            )));
        }
        if !(0.0..=1.0).contains(&self.detection.warning_ratio) {
            return Err(ConfigError::Invalid(
                "detection warning_ratio must be within [0, 1]".to_string(),
            ));
        }
        if self.metrics.turns_per_objective <= 0.0 || self.metrics.repeat_cap == 0 {
            return Err(ConfigError::Invalid(
                "metrics turns_per_objective and repeat_cap must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
