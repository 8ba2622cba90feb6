//! Per-arc analytics and the running global metrics accumulator.

use serde::{Deserialize, Serialize};

use crate::core::config::MetricsConfig;
use crate::core::metrics::time_efficiency;
use crate::schema::arc::{Arc, ArcArchetype, ArcId, ArcStatus};
use crate::schema::failure::SupportLevel;

/// 10 at perfect pacing, 0 at the worst. Derived from time efficiency.
pub fn efficiency_score(arc: &Arc, config: &MetricsConfig) -> f32 {
    (10.0 - time_efficiency(arc, config) * 5.0).clamp(0.0, 10.0)
}

pub fn quality_score(efficiency: f32, agency: f32) -> f32 {
    (5.0 + (efficiency - 5.0) + (agency - 50.0) / 10.0).clamp(1.0, 10.0)
}

pub fn satisfaction_estimate(agency: f32, difficulty: f32, efficiency: f32) -> f32 {
    (agency + (10.0 - (difficulty - 5.0).abs()) * 10.0 + efficiency * 10.0) / 3.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcAnalytics {
    pub arc_id: ArcId,
    pub title: String,
    pub archetype: ArcArchetype,
    pub status: ArcStatus,
    pub current_phase: usize,
    pub progress_percent: f32,
    pub difficulty: f32,
    pub difficulty_adjustments: usize,
    pub agency_score: f32,
    pub efficiency_score: f32,
    pub quality_score: f32,
    pub satisfaction_estimate: f32,
    pub turns_elapsed: u32,
    pub objectives_completed: u32,
    pub objectives_failed: u32,
    pub choices_made: u32,
    pub recoveries_offered: u32,
    pub support_level: SupportLevel,
}

pub fn arc_analytics(arc: &Arc, config: &MetricsConfig) -> ArcAnalytics {
    let efficiency = efficiency_score(arc, config);
    let agency = arc.agency.overall_agency_score;
    let difficulty = arc.difficulty.current_difficulty;
    ArcAnalytics {
        arc_id: arc.id,
        title: arc.title.clone(),
        archetype: arc.archetype,
        status: arc.status,
        current_phase: arc.progression.current_phase,
        progress_percent: arc.progression.progress_percent,
        difficulty,
        difficulty_adjustments: arc.difficulty.history.len(),
        agency_score: agency,
        efficiency_score: efficiency,
        quality_score: quality_score(efficiency, agency),
        satisfaction_estimate: satisfaction_estimate(agency, difficulty, efficiency),
        turns_elapsed: arc.progression.turns_elapsed,
        objectives_completed: arc.progression.objectives_completed,
        objectives_failed: arc.progression.objectives_failed,
        choices_made: arc.agency.total_choices,
        recoveries_offered: arc.recovery.recoveries_offered,
        support_level: arc.recovery.adaptive_support.support_level,
    }
}

/// Counters and running means across every arc a manager has seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalArcMetrics {
    pub arcs_created: u64,
    pub arcs_completed: u64,
    pub updates_processed: u64,
    pub failed_updates: u64,
    pub failures_detected: u64,
    pub recoveries_offered: u64,
    pub average_completion_turns: f32,
    pub average_final_agency: f32,
    pub average_quality: f32,
    pub archetype_counts: Vec<(ArcArchetype, u32)>,
    /// Filled in at query time from the store.
    pub active_arcs: usize,
    /// Mean current difficulty over active and completed arcs.
    pub average_difficulty: f32,
}

impl GlobalArcMetrics {
    pub fn record_created(&mut self, archetype: ArcArchetype) {
        self.arcs_created += 1;
        match self.archetype_counts.iter_mut().find(|(a, _)| *a == archetype) {
            Some((_, count)) => *count += 1,
            None => self.archetype_counts.push((archetype, 1)),
        }
    }

    pub fn record_update(&mut self, failures: usize, recoveries: usize) {
        self.updates_processed += 1;
        self.failures_detected += failures as u64;
        self.recoveries_offered += recoveries as u64;
    }

    pub fn record_failed_update(&mut self) {
        self.failed_updates += 1;
    }

    pub fn record_completion(&mut self, turns: u32, agency: f32, quality: f32) {
        self.arcs_completed += 1;
        let n = self.arcs_completed as f32;
        self.average_completion_turns += (turns as f32 - self.average_completion_turns) / n;
        self.average_final_agency += (agency - self.average_final_agency) / n;
        self.average_quality += (quality - self.average_quality) / n;
    }

    /// A copy with the store-derived fields filled in.
    pub fn with_arcs<'a>(&self, active: &[&'a Arc], history: &'a [Arc]) -> GlobalArcMetrics {
        let mut out = self.clone();
        out.active_arcs = active.len();
        let difficulties: Vec<f32> = active
            .iter()
            .copied()
            .chain(history.iter())
            .map(|a| a.difficulty.current_difficulty)
            .collect();
        out.average_difficulty = if difficulties.is_empty() {
            0.0
        } else {
            difficulties.iter().sum::<f32>() / difficulties.len() as f32
        };
        out
    }
}
