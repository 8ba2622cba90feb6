//! Adaptive support: tracks how well offered support works and moves the
//! support level one step at a time.
//!
//! Also hosts the `SupportStrategy` extension point used for hints, skill-gap
//! analysis and cross-arc pattern learning.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::config::SupportConfig;
use crate::schema::arc::{Arc, ArcArchetype};
use crate::schema::character::CharacterSnapshot;
use crate::schema::failure::{FailureDetection, SupportEffectiveness, SupportLevel};

/// Result of one `update_adaptive_support` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportUpdate {
    pub arc: Arc,
    pub previous_level: SupportLevel,
    pub level: SupportLevel,
    pub average_effectiveness: f32,
}

impl SupportUpdate {
    pub fn level_changed(&self) -> bool {
        self.previous_level != self.level
    }
}

/// Record a response to offered support and apply the hysteresis rule.
///
/// Below `raise_below` the level rises one step; above `lower_above` it drops
/// one step; in between it holds.
pub fn update_adaptive_support(
    arc: &Arc,
    response_type: &str,
    effectiveness: f32,
    config: &SupportConfig,
) -> SupportUpdate {
    let effectiveness = if effectiveness.is_nan() {
        0.0
    } else {
        effectiveness.clamp(0.0, 1.0)
    };

    let mut next = arc.clone();
    let support = &mut next.recovery.adaptive_support;

    let position = support
        .effectiveness_tracking
        .iter()
        .position(|e| e.support_type == response_type);
    let entry = match position {
        Some(i) => &mut support.effectiveness_tracking[i],
        None => {
            support.effectiveness_tracking.push(SupportEffectiveness {
                support_type: response_type.to_string(),
                times_offered: 0,
                times_accepted: 0,
                success_rate: 0.0,
            });
            let last = support.effectiveness_tracking.len() - 1;
            &mut support.effectiveness_tracking[last]
        }
    };

    entry.times_offered += 1;
    if effectiveness > 0.0 {
        entry.times_accepted += 1;
    }
    let n = entry.times_offered as f32;
    entry.success_rate = (entry.success_rate * (n - 1.0) + effectiveness) / n;

    let average = support.average_effectiveness().unwrap_or(effectiveness);
    let previous_level = support.support_level;
    let level = if average < config.raise_below && previous_level != SupportLevel::Maximum {
        previous_level.raised()
    } else if average > config.lower_above && previous_level != SupportLevel::Minimal {
        previous_level.lowered()
    } else {
        previous_level
    };
    support.support_level = level;

    SupportUpdate {
        arc: next,
        previous_level,
        level,
        average_effectiveness: average,
    }
}

/// Pluggable policy for the softer parts of adaptive support.
pub trait SupportStrategy {
    /// Player-facing hints for the current detection result.
    fn hints(&self, arc: &Arc, detection: &FailureDetection) -> Vec<String>;

    /// Areas where the character looks under-equipped for the arc.
    fn skill_gaps(&self, arc: &Arc, character: &CharacterSnapshot) -> Vec<String>;

    /// Called once per completed arc with its final agency score.
    fn observe_completion(&mut self, arc: &Arc, final_agency: f32);

    /// The archetype that has worked best so far, if any has been observed.
    fn preferred_archetype(&self) -> Option<ArcArchetype>;

    /// Learned state to persist with a session snapshot. Stateless
    /// strategies have nothing to save.
    fn observations(&self) -> Vec<ArchetypeObservation> {
        Vec::new()
    }

    /// Replace learned state with observations from a snapshot.
    fn restore_observations(&mut self, _observations: Vec<ArchetypeObservation>) {}
}

/// Accumulated agency for one archetype across completed arcs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeObservation {
    pub archetype: ArcArchetype,
    pub agency_sum: f32,
    pub completions: u32,
}

/// Default strategy: hints from detection suggestions, skill gaps from
/// difficulty and resources, and a running mean of agency per archetype.
#[derive(Debug, Clone, Default)]
pub struct PatternLearner {
    agency_by_archetype: FxHashMap<ArcArchetype, (f32, u32)>,
}

impl PatternLearner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean_agency(&self, archetype: ArcArchetype) -> Option<f32> {
        self.agency_by_archetype
            .get(&archetype)
            .map(|(sum, count)| sum / *count as f32)
    }
}

impl SupportStrategy for PatternLearner {
    fn hints(&self, arc: &Arc, detection: &FailureDetection) -> Vec<String> {
        let limit = match arc.recovery.adaptive_support.support_level {
            SupportLevel::Minimal => 0,
            SupportLevel::Moderate => 1,
            SupportLevel::High => 2,
            SupportLevel::Maximum => 4,
        };
        let mut hints: Vec<String> = Vec::new();
        for failure in &detection.failures {
            for action in &failure.suggested_actions {
                if !hints.contains(action) {
                    hints.push(action.clone());
                }
            }
        }
        hints.truncate(limit);
        hints
    }

    fn skill_gaps(&self, arc: &Arc, character: &CharacterSnapshot) -> Vec<String> {
        let mut gaps = Vec::new();
        let gap = arc.difficulty.current_difficulty - character.capability();
        if gap >= 2.0 {
            gaps.push(format!(
                "Arc difficulty {:.1} exceeds capability {:.1}",
                arc.difficulty.current_difficulty,
                character.capability()
            ));
        }
        if character.health_ratio() < 0.3 {
            gaps.push("Low health reserves".to_string());
        }
        if character.max_mana > 0.0 && character.mana_ratio() < 0.2 {
            gaps.push("Low mana reserves".to_string());
        }
        if arc.progression.objectives_failed > arc.progression.objectives_completed {
            gaps.push("Objectives fail more often than they succeed".to_string());
        }
        gaps
    }

    fn observe_completion(&mut self, arc: &Arc, final_agency: f32) {
        let entry = self
            .agency_by_archetype
            .entry(arc.archetype)
            .or_insert((0.0, 0));
        entry.0 += final_agency;
        entry.1 += 1;
    }

    fn preferred_archetype(&self) -> Option<ArcArchetype> {
        let mut best: Option<(ArcArchetype, f32)> = None;
        // Iterate in a fixed order so ties resolve the same way every time.
        for archetype in ArcArchetype::ALL {
            if let Some(mean) = self.mean_agency(archetype) {
                match best {
                    Some((_, best_mean)) if best_mean >= mean => {}
                    _ => best = Some((archetype, mean)),
                }
            }
        }
        best.map(|(a, _)| a)
    }

    fn observations(&self) -> Vec<ArchetypeObservation> {
        ArcArchetype::ALL
            .into_iter()
            .filter_map(|archetype| {
                self.agency_by_archetype
                    .get(&archetype)
                    .map(|&(agency_sum, completions)| ArchetypeObservation {
                        archetype,
                        agency_sum,
                        completions,
                    })
            })
            .collect()
    }

    fn restore_observations(&mut self, observations: Vec<ArchetypeObservation>) {
        self.agency_by_archetype = observations
            .into_iter()
            .filter(|o| o.completions > 0)
            .map(|o| (o.archetype, (o.agency_sum, o.completions)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::arc::{ArcId, CharacterId, DifficultySettings};
    use crate::schema::failure::{DetectedFailure, FailureMetric, Severity};

    fn arc_at(level: SupportLevel) -> Arc {
        let mut arc = Arc::new(ArcId(1), CharacterId(1), 1, ArcArchetype::Adventure);
        arc.recovery.adaptive_support.support_level = level;
        arc
    }

    #[test]
    fn low_effectiveness_raises_exactly_one_step() {
        let update =
            update_adaptive_support(&arc_at(SupportLevel::Moderate), "hint_offer", 0.25, &SupportConfig::default());
        assert_eq!(update.average_effectiveness, 0.25);
        assert_eq!(update.previous_level, SupportLevel::Moderate);
        assert_eq!(update.level, SupportLevel::High);
        assert_eq!(
            update.arc.recovery.adaptive_support.support_level,
            SupportLevel::High
        );
    }

    #[test]
    fn high_effectiveness_lowers_one_step() {
        let update = update_adaptive_support(
            &arc_at(SupportLevel::Maximum),
            "guidance_system",
            0.9,
            &SupportConfig::default(),
        );
        assert_eq!(update.level, SupportLevel::High);
    }

    #[test]
    fn middle_band_holds() {
        let update = update_adaptive_support(
            &arc_at(SupportLevel::Moderate),
            "resource_cache",
            0.5,
            &SupportConfig::default(),
        );
        assert!(!update.level_changed());
    }

    #[test]
    fn saturates_at_the_ends() {
        let config = SupportConfig::default();
        let up = update_adaptive_support(&arc_at(SupportLevel::Maximum), "x", 0.0, &config);
        assert_eq!(up.level, SupportLevel::Maximum);
        let down = update_adaptive_support(&arc_at(SupportLevel::Minimal), "x", 1.0, &config);
        assert_eq!(down.level, SupportLevel::Minimal);
    }

    #[test]
    fn tracking_entry_accumulates() {
        let config = SupportConfig::default();
        let first = update_adaptive_support(&arc_at(SupportLevel::Moderate), "hint_offer", 0.6, &config);
        let second = update_adaptive_support(&first.arc, "hint_offer", 0.0, &config);
        let tracking = &second.arc.recovery.adaptive_support.effectiveness_tracking;
        assert_eq!(tracking.len(), 1);
        assert_eq!(tracking[0].times_offered, 2);
        assert_eq!(tracking[0].times_accepted, 1);
        assert!((tracking[0].success_rate - 0.3).abs() < 1e-6);
    }

    #[test]
    fn input_arc_is_untouched() {
        let arc = arc_at(SupportLevel::Moderate);
        let _ = update_adaptive_support(&arc, "hint_offer", 0.1, &SupportConfig::default());
        assert!(arc.recovery.adaptive_support.effectiveness_tracking.is_empty());
        assert_eq!(arc.recovery.adaptive_support.support_level, SupportLevel::Moderate);
    }

    #[test]
    fn hints_respect_support_level() {
        let detection = FailureDetection {
            failures: vec![DetectedFailure {
                metric: FailureMetric::ObjectiveFailures,
                severity: Severity::Critical,
                current_value: 0.8,
                threshold: 0.7,
                description: String::new(),
                suggested_actions: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            }],
            ..Default::default()
        };
        let learner = PatternLearner::new();
        assert!(learner.hints(&arc_at(SupportLevel::Minimal), &detection).is_empty());
        assert_eq!(learner.hints(&arc_at(SupportLevel::High), &detection).len(), 2);
        assert_eq!(learner.hints(&arc_at(SupportLevel::Maximum), &detection).len(), 3);
    }

    #[test]
    fn skill_gaps_flag_overtuned_arcs() {
        let mut arc = arc_at(SupportLevel::Moderate);
        arc.difficulty = DifficultySettings::new(9.0);
        let character = CharacterSnapshot::new(CharacterId(1), "Ada", 2);
        let gaps = PatternLearner::new().skill_gaps(&arc, &character);
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].contains("exceeds capability"));
    }

    #[test]
    fn learner_prefers_highest_mean_agency() {
        let mut learner = PatternLearner::new();
        assert_eq!(learner.preferred_archetype(), None);

        let mystery = Arc::new(ArcId(1), CharacterId(1), 1, ArcArchetype::Mystery);
        let bond = Arc::new(ArcId(2), CharacterId(1), 2, ArcArchetype::Bond);
        learner.observe_completion(&mystery, 80.0);
        learner.observe_completion(&mystery, 40.0);
        learner.observe_completion(&bond, 75.0);

        assert_eq!(learner.mean_agency(ArcArchetype::Mystery), Some(60.0));
        assert_eq!(learner.preferred_archetype(), Some(ArcArchetype::Bond));
    }

    #[test]
    fn observations_restore_into_a_fresh_learner() {
        let mut learner = PatternLearner::new();
        learner.observe_completion(&Arc::new(ArcId(1), CharacterId(1), 1, ArcArchetype::Mystery), 30.0);
        learner.observe_completion(&Arc::new(ArcId(2), CharacterId(1), 2, ArcArchetype::Bond), 90.0);

        let saved = learner.observations();
        assert_eq!(saved.len(), 2);

        let mut fresh = PatternLearner::new();
        fresh.restore_observations(saved);
        assert_eq!(fresh.mean_agency(ArcArchetype::Bond), Some(90.0));
        assert_eq!(fresh.preferred_archetype(), Some(ArcArchetype::Bond));

        // Empty entries would divide by zero in the mean.
        fresh.restore_observations(vec![ArchetypeObservation {
            archetype: ArcArchetype::Mystery,
            agency_sum: 10.0,
            completions: 0,
        }]);
        assert_eq!(fresh.preferred_archetype(), None);
    }
}
