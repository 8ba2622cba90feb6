//! Objective bookkeeping, phase advancement and choice/agency tracking.
//!
//! These helpers operate on a working copy of an arc owned by the caller
//! (the manager clones the stored arc before routing an update), so the
//! stored snapshot is never touched until the whole update succeeds.

use crate::schema::arc::{
    Arc, ChoiceCategory, ChoiceImpact, ChoiceQuality, ChoiceRecord, Milestone, ObjectiveStatus,
    ObjectiveType, PlayerAgencyMetrics,
};
use crate::schema::event::PlayerChoice;
use crate::schema::integration::SideEffect;

/// A requested change to a single objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveChange {
    Progress(u8),
    Complete,
    Fail,
}

/// Stamp the turn on the arc. Repeated calls with the same turn count once.
pub fn record_turn(arc: &mut Arc, turn: u64) {
    let progression = &mut arc.progression;
    if progression.started_turn.is_none() {
        progression.started_turn = Some(turn);
    }
    if progression.last_turn != Some(turn) {
        progression.turns_elapsed += 1;
        progression.last_turn = Some(turn);
    }
}

/// Put the current phase's seed objective in progress.
pub fn start_current_phase(arc: &mut Arc) {
    let index = arc.progression.current_phase;
    if let Some(phase) = arc.phases.get_mut(index) {
        if let Some(seed) = phase
            .objectives
            .iter_mut()
            .find(|o| o.objective_type == ObjectiveType::Primary)
        {
            if seed.status == ObjectiveStatus::NotStarted {
                seed.status = ObjectiveStatus::InProgress;
            }
        }
    }
}

/// Apply a change to one objective.
///
/// Status only moves forward: finished objectives ignore further changes and
/// progress never decreases. Returns `None` when nothing changed, including
/// for unknown objective ids.
pub fn update_objective(
    arc: &mut Arc,
    objective_id: &str,
    change: ObjectiveChange,
) -> Option<SideEffect> {
    let objective = arc.find_objective_mut(objective_id)?;
    if objective.status.is_finished() {
        return None;
    }

    let counted = match change {
        ObjectiveChange::Progress(value) => {
            let value = value.min(100);
            if value <= objective.progress && objective.status == ObjectiveStatus::InProgress {
                return None;
            }
            objective.progress = objective.progress.max(value);
            if objective.progress == 100 {
                objective.status = ObjectiveStatus::Completed;
                Some(ObjectiveStatus::Completed)
            } else {
                objective.status = ObjectiveStatus::InProgress;
                None
            }
        }
        ObjectiveChange::Complete => {
            objective.status = ObjectiveStatus::Completed;
            objective.progress = 100;
            Some(ObjectiveStatus::Completed)
        }
        ObjectiveChange::Fail => {
            objective.status = ObjectiveStatus::Failed;
            Some(ObjectiveStatus::Failed)
        }
    };

    let effect = SideEffect::ObjectiveUpdated {
        objective_id: objective.id.clone(),
        status: objective.status,
        progress: objective.progress,
    };
    match counted {
        Some(ObjectiveStatus::Completed) => arc.progression.objectives_completed += 1,
        Some(ObjectiveStatus::Failed) => arc.progression.objectives_failed += 1,
        _ => {}
    }
    Some(effect)
}

/// Advance past the current phase if it is finished. Moves at most one phase.
pub fn advance_phase(arc: &mut Arc, turn: u64) -> Option<SideEffect> {
    let index = arc.progression.current_phase;
    let current = arc.phases.get(index)?;
    if !current.is_finished() || index + 1 >= arc.phases.len() {
        return None;
    }

    let from = current.order;
    let next_index = index + 1;
    let to = arc.phases[next_index].order;
    let milestone = Milestone {
        id: format!("{}:phase-{}", arc.id, from),
        description: format!("Finished {}", current.name),
        phase_order: from,
        reached_turn: turn,
    };
    let milestone_id = milestone.id.clone();

    arc.progression.milestones.push(milestone);
    arc.progression.current_phase = next_index;
    start_current_phase(arc);

    Some(SideEffect::PhaseAdvanced {
        from,
        to,
        milestone_id,
    })
}

/// 100 × (finished phases + current phase mean progress) / phase count.
pub fn recompute_progress(arc: &mut Arc) {
    if arc.phases.is_empty() {
        arc.progression.progress_percent = 0.0;
        return;
    }
    let finished = arc.phases.iter().filter(|p| p.is_finished()).count() as f32;
    let partial = match arc.current_phase() {
        Some(phase) if !phase.is_finished() => phase.mean_progress(),
        _ => 0.0,
    };
    let percent = 100.0 * (finished + partial) / arc.phases.len() as f32;
    arc.progression.progress_percent = percent.clamp(0.0, 100.0);
}

/// True once the final phase is finished.
pub fn all_phases_finished(arc: &Arc) -> bool {
    !arc.phases.is_empty() && arc.phases.iter().all(|p| p.is_finished())
}

/// Append a choice to the history and refresh the agency metrics.
pub fn record_choice(arc: &mut Arc, choice: &PlayerChoice, turn: u64) -> SideEffect {
    let quality = if choice.quality.is_nan() {
        0.0
    } else {
        choice.quality.clamp(0.0, 1.0)
    };

    arc.progression.choice_history.push(ChoiceRecord {
        turn,
        choice_id: choice.choice_id.clone(),
        text: choice.text.clone(),
        category: choice.category,
        impact: choice.impact,
        quality,
    });

    let agency = &mut arc.agency;
    agency.total_choices += 1;
    if choice.impact == ChoiceImpact::Major {
        agency.impactful_choices += 1;
    }
    if choice.impact >= ChoiceImpact::Moderate {
        agency.meaningful_choices += 1;
    }
    fold_quality(&mut agency.choice_quality, choice.category, quality * 100.0);
    agency.overall_agency_score = agency_score(agency);

    SideEffect::ChoiceRecorded {
        choice_id: choice.choice_id.clone(),
        agency_score: agency.overall_agency_score,
    }
}

fn fold_quality(quality: &mut ChoiceQuality, category: ChoiceCategory, sample: f32) {
    let (score, samples) = match category {
        ChoiceCategory::Strategic => (&mut quality.strategic, &mut quality.strategic_samples),
        ChoiceCategory::Moral => (&mut quality.moral, &mut quality.moral_samples),
        ChoiceCategory::Creative => (&mut quality.creative, &mut quality.creative_samples),
        ChoiceCategory::Social => (&mut quality.social, &mut quality.social_samples),
    };
    *samples += 1;
    let n = *samples as f32;
    *score = ((*score * (n - 1.0) + sample) / n).clamp(0.0, 100.0);
}

/// Overall agency in [0, 100].
pub fn agency_score(agency: &PlayerAgencyMetrics) -> f32 {
    if agency.total_choices == 0 {
        return 0.0;
    }
    let meaningful_ratio = agency.meaningful_choices as f32 / agency.total_choices as f32;

    let q = &agency.choice_quality;
    let touched: Vec<f32> = [
        (q.strategic, q.strategic_samples),
        (q.moral, q.moral_samples),
        (q.creative, q.creative_samples),
        (q.social, q.social_samples),
    ]
    .iter()
    .filter(|(_, samples)| *samples > 0)
    .map(|(score, _)| *score)
    .collect();
    let mean_quality = if touched.is_empty() {
        0.0
    } else {
        touched.iter().sum::<f32>() / touched.len() as f32
    };

    let impact = (agency.impactful_choices as f32 * 10.0).min(100.0);
    let score = 0.5 * meaningful_ratio * 100.0 + 0.3 * mean_quality + 0.2 * impact;
    score.clamp(0.0, 100.0)
}
