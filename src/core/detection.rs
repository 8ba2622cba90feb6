//! Failure detection: compares derived metrics against configured thresholds
//! and ranks the resulting recommendations.
//!
//! Stateless. Identical inputs always produce identical output.

use crate::core::config::{DetectionConfig, EngineConfig};
use crate::core::metrics::calculate_failure_metrics;
use crate::schema::arc::Arc;
use crate::schema::character::CharacterSnapshot;
use crate::schema::failure::{
    DetectedFailure, DetectedWarning, FailureDetection, FailureMetric, FailureMetrics,
    FailureThreshold, Recommendation, RecommendationHorizon,
};
use crate::schema::world::WorldStateSnapshot;

const IMMEDIATE_PRIORITY: u8 = 9;
const IMMEDIATE_EFFECTIVENESS: u8 = 80;
const SHORT_TERM_PRIORITY: u8 = 6;
const SHORT_TERM_EFFECTIVENESS: u8 = 60;
const LONG_TERM_PRIORITY: u8 = 4;
const LONG_TERM_EFFECTIVENESS: u8 = 70;

/// Compute metrics for the arc and run detection against `thresholds`.
pub fn detect_arc_failures(
    arc: &Arc,
    character: &CharacterSnapshot,
    world: &WorldStateSnapshot,
    thresholds: &[FailureThreshold],
    config: &EngineConfig,
) -> FailureDetection {
    let metrics = calculate_failure_metrics(arc, character, world, &config.metrics);
    detect_from_metrics(metrics, thresholds, &config.detection)
}

/// Run detection over already-computed metrics.
pub fn detect_from_metrics(
    metrics: FailureMetrics,
    thresholds: &[FailureThreshold],
    config: &DetectionConfig,
) -> FailureDetection {
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    for threshold in thresholds {
        let value = match metrics.value(&threshold.metric) {
            Some(v) => v,
            None => continue,
        };

        if value >= threshold.threshold {
            failures.push(DetectedFailure {
                metric: threshold.metric.clone(),
                severity: threshold.severity,
                current_value: value,
                threshold: threshold.threshold,
                description: describe_failure(&threshold.metric, value, threshold.threshold),
                suggested_actions: suggested_actions(&threshold.metric),
            });
        } else if value >= threshold.threshold * config.warning_ratio {
            warnings.push(DetectedWarning {
                metric: threshold.metric.clone(),
                current_value: value,
                threshold: threshold.threshold,
                description: format!(
                    "{} is approaching its limit ({:.2} of {:.2})",
                    threshold.metric, value, threshold.threshold
                ),
            });
        }
    }

    let recommendations = build_recommendations(&failures, &warnings, &metrics, config);

    FailureDetection {
        failures,
        warnings,
        recommendations,
        metrics,
    }
}

fn build_recommendations(
    failures: &[DetectedFailure],
    warnings: &[DetectedWarning],
    metrics: &FailureMetrics,
    config: &DetectionConfig,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for failure in failures {
        let action = failure
            .suggested_actions
            .first()
            .cloned()
            .unwrap_or_else(|| format!("Intervene on {}", failure.metric));
        recommendations.push(Recommendation {
            horizon: RecommendationHorizon::Immediate,
            priority: IMMEDIATE_PRIORITY,
            expected_effectiveness: IMMEDIATE_EFFECTIVENESS,
            metric: Some(failure.metric.clone()),
            action,
        });
    }

    for warning in warnings {
        recommendations.push(Recommendation {
            horizon: RecommendationHorizon::ShortTerm,
            priority: SHORT_TERM_PRIORITY,
            expected_effectiveness: SHORT_TERM_EFFECTIVENESS,
            metric: Some(warning.metric.clone()),
            action: format!("Monitor {} and prepare support", warning.metric),
        });
    }

    if metrics.difficulty_mismatch > config.mismatch_recommendation {
        recommendations.push(Recommendation {
            horizon: RecommendationHorizon::LongTerm,
            priority: LONG_TERM_PRIORITY,
            expected_effectiveness: LONG_TERM_EFFECTIVENESS,
            metric: Some(FailureMetric::DifficultyMismatch),
            action: "Revisit difficulty scaling for this character".to_string(),
        });
    }

    // Stable: ties keep discovery order.
    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
    recommendations
}

fn describe_failure(metric: &FailureMetric, value: f32, threshold: f32) -> String {
    let what = match metric {
        FailureMetric::ObjectiveFailures => "Too many objectives are failing",
        FailureMetric::TimeInefficiency => "Progress is taking far longer than expected",
        FailureMetric::ResourceDepletion => "The character is running out of resources",
        FailureMetric::RelationshipBreakdown => "Relationships with key characters are breaking down",
        FailureMetric::PlayerFrustration => "The player appears stuck, repeating the same choices",
        FailureMetric::DifficultyMismatch => "Arc difficulty is out of step with the character",
        FailureMetric::Custom(_) => "Custom metric exceeded its threshold",
    };
    format!("{} ({} {:.2} >= {:.2})", what, metric, value, threshold)
}

/// Fixed remediation suggestions per metric.
pub fn suggested_actions(metric: &FailureMetric) -> Vec<String> {
    let actions: &[&str] = match metric {
        FailureMetric::ObjectiveFailures => &[
            "Offer guidance toward the current objective",
            "Reduce the difficulty of upcoming objectives",
        ],
        FailureMetric::TimeInefficiency => &[
            "Surface a clearer lead to the next objective",
            "Offer a narrative shortcut",
        ],
        FailureMetric::ResourceDepletion => &[
            "Place a resource cache along the current path",
            "Offer a safe place to rest",
        ],
        FailureMetric::RelationshipBreakdown => &[
            "Create an opportunity for mediation",
            "Let an ally vouch for the character",
        ],
        FailureMetric::PlayerFrustration => &[
            "Offer a hint about untried approaches",
            "Open an alternate path forward",
        ],
        FailureMetric::DifficultyMismatch => &["Recalibrate arc difficulty to the character"],
        FailureMetric::Custom(_) => &[],
    };
    actions.iter().map(|s| s.to_string()).collect()
}
