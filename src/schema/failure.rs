use serde::{Deserialize, Serialize};
use std::fmt;

/// A derived metric that a failure threshold can watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMetric {
    ObjectiveFailures,
    TimeInefficiency,
    ResourceDepletion,
    RelationshipBreakdown,
    PlayerFrustration,
    DifficultyMismatch,
    /// A metric this engine does not compute. Never fires.
    Custom(String),
}

impl FailureMetric {
    pub fn name(&self) -> &str {
        match self {
            Self::ObjectiveFailures => "objective_failures",
            Self::TimeInefficiency => "time_inefficiency",
            Self::ResourceDepletion => "resource_depletion",
            Self::RelationshipBreakdown => "relationship_breakdown",
            Self::PlayerFrustration => "player_frustration",
            Self::DifficultyMismatch => "difficulty_mismatch",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Parse from string. Unknown names become `Custom`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "objective_failures" => Self::ObjectiveFailures,
            "time_inefficiency" => Self::TimeInefficiency,
            "resource_depletion" => Self::ResourceDepletion,
            "relationship_breakdown" => Self::RelationshipBreakdown,
            "player_frustration" => Self::PlayerFrustration,
            "difficulty_mismatch" => Self::DifficultyMismatch,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for FailureMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Severity of a tripped threshold, ordered from mildest to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Concern,
    Critical,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureThreshold {
    pub metric: FailureMetric,
    /// In [0, 1].
    pub threshold: f32,
    pub severity: Severity,
}

impl FailureThreshold {
    pub fn new(metric: FailureMetric, threshold: f32, severity: Severity) -> Self {
        Self {
            metric,
            threshold,
            severity,
        }
    }
}

/// Normalized metrics derived from arc, character and world state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FailureMetrics {
    /// failed / (failed + completed), in [0, 1].
    pub objective_failure_rate: f32,
    /// Time spent per completed objective, in [0, 2]; 1 is on budget.
    pub time_efficiency: f32,
    /// In [0, 1]; 1 means every resource is exhausted.
    pub resource_depletion: f32,
    /// Fraction of relationships with a negative score.
    pub relationship_stress: f32,
    /// Normalized count of repeated recent choices, in [0, 1].
    pub frustration_indicator: f32,
    /// |arc difficulty − character capability| / 10.
    pub difficulty_mismatch: f32,
}

impl FailureMetrics {
    /// The value a threshold on `metric` compares against, in [0, 1].
    pub fn value(&self, metric: &FailureMetric) -> Option<f32> {
        match metric {
            FailureMetric::ObjectiveFailures => Some(self.objective_failure_rate),
            FailureMetric::TimeInefficiency => Some(self.time_efficiency / 2.0),
            FailureMetric::ResourceDepletion => Some(self.resource_depletion),
            FailureMetric::RelationshipBreakdown => Some(self.relationship_stress),
            FailureMetric::PlayerFrustration => Some(self.frustration_indicator),
            FailureMetric::DifficultyMismatch => Some(self.difficulty_mismatch),
            FailureMetric::Custom(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFailure {
    pub metric: FailureMetric,
    pub severity: Severity,
    pub current_value: f32,
    pub threshold: f32,
    pub description: String,
    pub suggested_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedWarning {
    pub metric: FailureMetric,
    pub current_value: f32,
    pub threshold: f32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationHorizon {
    Immediate,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub horizon: RecommendationHorizon,
    pub priority: u8,
    pub expected_effectiveness: u8,
    pub metric: Option<FailureMetric>,
    pub action: String,
}

/// Output of one failure-detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FailureDetection {
    pub failures: Vec<DetectedFailure>,
    pub warnings: Vec<DetectedWarning>,
    pub recommendations: Vec<Recommendation>,
    pub metrics: FailureMetrics,
}

impl FailureDetection {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn worst_severity(&self) -> Option<Severity> {
        self.failures.iter().map(|f| f.severity).max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecoveryCost {
    None,
    Time { turns: u32 },
    NarrativeConsequence { description: String },
    Resource { amount: f32 },
    Reputation { amount: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOption {
    pub id: String,
    pub recovery_type: String,
    pub name: String,
    pub description: String,
    pub trigger_conditions: Vec<String>,
    pub cost: RecoveryCost,
    /// 0..=100.
    pub effectiveness: u8,
    pub requires_player_choice: bool,
}

/// How much adaptive help the engine offers. Moves one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    Minimal,
    #[default]
    Moderate,
    High,
    Maximum,
}

impl SupportLevel {
    /// One step up, saturating at `Maximum`.
    pub fn raised(self) -> Self {
        match self {
            Self::Minimal => Self::Moderate,
            Self::Moderate => Self::High,
            Self::High | Self::Maximum => Self::Maximum,
        }
    }

    /// One step down, saturating at `Minimal`.
    pub fn lowered(self) -> Self {
        match self {
            Self::Maximum => Self::High,
            Self::High => Self::Moderate,
            Self::Moderate | Self::Minimal => Self::Minimal,
        }
    }

    /// How many recovery options are surfaced at once at this level.
    pub fn max_offered_options(self) -> usize {
        match self {
            Self::Minimal => 1,
            Self::Moderate => 2,
            Self::High => 3,
            Self::Maximum => usize::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportEffectiveness {
    pub support_type: String,
    pub times_offered: u32,
    pub times_accepted: u32,
    /// Running mean of reported effectiveness, in [0, 1].
    pub success_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AdaptiveSupport {
    pub support_level: SupportLevel,
    pub effectiveness_tracking: Vec<SupportEffectiveness>,
}

impl AdaptiveSupport {
    /// Mean success rate across tracked support types; `None` before any sample.
    pub fn average_effectiveness(&self) -> Option<f32> {
        if self.effectiveness_tracking.is_empty() {
            return None;
        }
        let total: f32 = self
            .effectiveness_tracking
            .iter()
            .map(|e| e.success_rate)
            .sum();
        Some(total / self.effectiveness_tracking.len() as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecoveryConfig {
    pub enabled: bool,
    pub thresholds: Vec<FailureThreshold>,
    pub adaptive_support: AdaptiveSupport,
    pub recoveries_offered: u32,
}

impl Default for FailureRecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thresholds: Vec::new(),
            adaptive_support: AdaptiveSupport::default(),
            recoveries_offered: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_level_moves_one_step() {
        assert_eq!(SupportLevel::Minimal.raised(), SupportLevel::Moderate);
        assert_eq!(SupportLevel::Moderate.raised(), SupportLevel::High);
        assert_eq!(SupportLevel::Maximum.raised(), SupportLevel::Maximum);
        assert_eq!(SupportLevel::High.lowered(), SupportLevel::Moderate);
        assert_eq!(SupportLevel::Minimal.lowered(), SupportLevel::Minimal);
    }

    #[test]
    fn metric_names_round_trip_through_from_name() {
        for metric in [
            FailureMetric::ObjectiveFailures,
            FailureMetric::TimeInefficiency,
            FailureMetric::ResourceDepletion,
            FailureMetric::RelationshipBreakdown,
            FailureMetric::PlayerFrustration,
            FailureMetric::DifficultyMismatch,
        ] {
            assert_eq!(FailureMetric::from_name(metric.name()), metric);
        }
        assert_eq!(
            FailureMetric::from_name("boredom"),
            FailureMetric::Custom("boredom".to_string())
        );
    }

    #[test]
    fn custom_metric_has_no_value() {
        let metrics = FailureMetrics::default();
        assert_eq!(metrics.value(&FailureMetric::Custom("x".into())), None);
        assert_eq!(metrics.value(&FailureMetric::ObjectiveFailures), Some(0.0));
    }

    #[test]
    fn time_inefficiency_is_normalized() {
        let metrics = FailureMetrics {
            time_efficiency: 1.5,
            ..Default::default()
        };
        assert_eq!(metrics.value(&FailureMetric::TimeInefficiency), Some(0.75));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Warning < Severity::Concern);
        assert!(Severity::Critical < Severity::Failure);
    }

    #[test]
    fn average_effectiveness_empty_is_none() {
        assert_eq!(AdaptiveSupport::default().average_effectiveness(), None);
    }
}
