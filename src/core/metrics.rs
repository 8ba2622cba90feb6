//! Metric calculator: derives normalized failure metrics from arc,
//! character and world snapshots. Pure; no hidden state.

use rustc_hash::FxHashSet;

use crate::core::config::MetricsConfig;
use crate::schema::arc::Arc;
use crate::schema::character::CharacterSnapshot;
use crate::schema::failure::FailureMetrics;
use crate::schema::world::WorldStateSnapshot;

pub fn calculate_failure_metrics(
    arc: &Arc,
    character: &CharacterSnapshot,
    _world: &WorldStateSnapshot,
    config: &MetricsConfig,
) -> FailureMetrics {
    FailureMetrics {
        objective_failure_rate: objective_failure_rate(arc),
        time_efficiency: time_efficiency(arc, config),
        resource_depletion: resource_depletion(character, config),
        relationship_stress: relationship_stress(character),
        frustration_indicator: frustration_indicator(arc, config),
        difficulty_mismatch: difficulty_mismatch(arc, character),
    }
}

/// failed / (failed + completed); zero when nothing has been attempted.
pub fn objective_failure_rate(arc: &Arc) -> f32 {
    let failed = arc.progression.objectives_failed as f32;
    let completed = arc.progression.objectives_completed as f32;
    if failed + completed == 0.0 {
        return 0.0;
    }
    failed / (failed + completed)
}

pub fn time_efficiency(arc: &Arc, config: &MetricsConfig) -> f32 {
    let time_spent = arc.progression.turns_elapsed as f32 / config.turns_per_objective;
    let completed = arc.progression.objectives_completed.max(1) as f32;
    (time_spent / completed).clamp(0.0, 2.0)
}

pub fn resource_depletion(character: &CharacterSnapshot, config: &MetricsConfig) -> f32 {
    let expected_currency = config.currency_per_level * character.level.max(1) as f32;
    let currency_ratio = if expected_currency <= 0.0 {
        1.0
    } else {
        (character.currency / expected_currency).clamp(0.0, 1.0)
    };
    let average = (character.health_ratio() + character.mana_ratio() + currency_ratio) / 3.0;
    (1.0 - average).clamp(0.0, 1.0)
}

pub fn relationship_stress(character: &CharacterSnapshot) -> f32 {
    if character.relationships.is_empty() {
        return 0.0;
    }
    let strained = character.relationships.iter().filter(|r| r.score < 0).count();
    strained as f32 / character.relationships.len() as f32
}

/// Repeated recent choices, capped and normalized to [0, 1].
pub fn frustration_indicator(arc: &Arc, config: &MetricsConfig) -> f32 {
    let history = &arc.progression.choice_history;
    let window = &history[history.len().saturating_sub(config.choice_window)..];

    let mut seen = FxHashSet::default();
    let mut repeats = 0u32;
    for choice in window {
        let normalized = choice.text.trim().to_lowercase();
        if !seen.insert(normalized) {
            repeats += 1;
        }
    }

    let cap = config.repeat_cap.max(1);
    repeats.min(cap) as f32 / cap as f32
}

pub fn difficulty_mismatch(arc: &Arc, character: &CharacterSnapshot) -> f32 {
    ((arc.difficulty.current_difficulty - character.capability()).abs() / 10.0).clamp(0.0, 1.0)
}
