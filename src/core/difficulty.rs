//! Difficulty adjustment and the adaptive difficulty control loop.

use crate::core::config::DifficultyConfig;
use crate::schema::arc::{clamp_difficulty, Arc, DifficultyAdjustment};
use crate::schema::character::CharacterSnapshot;
use crate::schema::failure::{FailureDetection, FailureMetric, Severity};
use crate::schema::integration::SideEffect;

/// Shift the arc's difficulty by `delta`, clamped to [1, 10].
///
/// Returns the new arc and, if the value actually moved, the side effect
/// describing the change.
pub fn adjust_arc_difficulty(
    arc: &Arc,
    delta: f32,
    reason: &str,
    turn: Option<u64>,
) -> (Arc, Option<SideEffect>) {
    let from = arc.difficulty.current_difficulty;
    let to = clamp_difficulty(from + delta);
    if (to - from).abs() < f32::EPSILON {
        return (arc.clone(), None);
    }

    let mut next = arc.clone();
    next.difficulty.current_difficulty = to;
    next.difficulty.history.push(DifficultyAdjustment {
        turn,
        from,
        to,
        reason: reason.to_string(),
    });
    let effect = SideEffect::DifficultyAdjusted {
        from,
        to,
        reason: reason.to_string(),
    };
    (next, Some(effect))
}

/// Decide whether the adaptive loop should move difficulty this turn.
///
/// Returns the signed step and the reason, or `None` to hold.
pub fn adaptive_step(
    arc: &Arc,
    detection: &FailureDetection,
    character: &CharacterSnapshot,
    config: &DifficultyConfig,
) -> Option<(f32, &'static str)> {
    if !arc.difficulty.adaptive_scaling {
        return None;
    }

    let struggling_failure = detection.failures.iter().any(|f| {
        f.severity >= Severity::Concern
            && matches!(
                f.metric,
                FailureMetric::ObjectiveFailures
                    | FailureMetric::ResourceDepletion
                    | FailureMetric::DifficultyMismatch
            )
    });
    let failure_rate = detection.metrics.objective_failure_rate;

    if struggling_failure || failure_rate >= config.struggle_failure_rate {
        // A mismatch can also mean the arc is too easy.
        if arc.difficulty.current_difficulty < character.capability()
            && !struggling_on_objectives(detection, config)
        {
            return Some((config.adaptive_step, "arc is too easy for the character"));
        }
        return Some((-config.adaptive_step, "player is struggling"));
    }

    let mastered = failure_rate == 0.0
        && arc.progression.objectives_completed >= config.mastery_min_completed
        && arc.difficulty.current_difficulty < character.capability();
    if mastered {
        return Some((config.adaptive_step, "player is mastering the arc"));
    }

    None
}

fn struggling_on_objectives(detection: &FailureDetection, config: &DifficultyConfig) -> bool {
    detection.metrics.objective_failure_rate >= config.struggle_failure_rate
        || detection.failures.iter().any(|f| {
            matches!(
                f.metric,
                FailureMetric::ObjectiveFailures | FailureMetric::ResourceDepletion
            )
        })
}

/// Run the adaptive loop once: compute the step and apply it.
pub fn adapt_difficulty(
    arc: &Arc,
    detection: &FailureDetection,
    character: &CharacterSnapshot,
    config: &DifficultyConfig,
    turn: u64,
) -> (Arc, Option<SideEffect>) {
    match adaptive_step(arc, detection, character, config) {
        Some((delta, reason)) => adjust_arc_difficulty(arc, delta, reason, Some(turn)),
        None => (arc.clone(), None),
    }
}
