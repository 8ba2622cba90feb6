use crate::core::error::ArcError;
use crate::core::metrics::objective_failure_rate;
use crate::core::progress::{recompute_progress, update_objective, ObjectiveChange};
use crate::schema::arc::{Arc, ArcObjective, ObjectiveStatus};
use crate::schema::character::CharacterSnapshot;
use crate::schema::event::{QuestEvent, QuestEventKind, UpdateEvent};
use crate::schema::integration::{AdaptationTrigger, QuestTrigger, SideEffect, Subsystem};
use crate::schema::world::WorldStateSnapshot;

use super::unlock::is_unlocked;
use super::{foreign_event, phase_reached, Integration, IntegrationAdapter};

pub struct QuestAdapter;

impl IntegrationAdapter for QuestAdapter {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Quest
    }

    fn integrate(
        &self,
        arc: &Arc,
        event: &UpdateEvent,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> Result<Integration, ArcError> {
        match event {
            UpdateEvent::QuestEvent(quest) => Ok(integrate_quest(arc, quest, character, world)),
            other => Err(foreign_event(self.subsystem(), other)),
        }
    }
}

pub fn integrate_quest(
    arc: &Arc,
    event: &QuestEvent,
    character: &CharacterSnapshot,
    _world: &WorldStateSnapshot,
) -> Integration {
    let mut out = Integration::from_arc(arc);

    let chain = &mut out.arc.integration.quest.quest_chain;
    if !chain.contains(&event.quest_id) {
        chain.push(event.quest_id.clone());
        out.side_effects.push(SideEffect::QuestChained {
            quest_id: event.quest_id.clone(),
            position: chain.len() - 1,
        });
    }

    let change = match &event.kind {
        QuestEventKind::ObjectiveProgress {
            objective_id,
            progress,
        } => Some((objective_id, ObjectiveChange::Progress(*progress))),
        QuestEventKind::ObjectiveCompleted { objective_id } => {
            Some((objective_id, ObjectiveChange::Complete))
        }
        QuestEventKind::ObjectiveFailed { objective_id } => {
            Some((objective_id, ObjectiveChange::Fail))
        }
        QuestEventKind::Started | QuestEventKind::Completed | QuestEventKind::Failed => None,
    };
    if let Some((objective_id, change)) = change {
        if let Some(effect) = update_objective(&mut out.arc, objective_id, change) {
            out.side_effects.push(effect);
        }
    }
    recompute_progress(&mut out.arc);

    out.side_effects
        .extend(apply_modification_rules(&mut out.arc, character));
    out.side_effects
        .extend(spawn_dynamic_objectives(&mut out.arc, character));
    out
}

fn rule_fires(trigger: &QuestTrigger, arc: &Arc, character: &CharacterSnapshot) -> bool {
    match trigger {
        QuestTrigger::ObjectiveFailuresAtLeast(n) => arc.progression.objectives_failed >= *n,
        QuestTrigger::PhaseReached(weight) => phase_reached(arc, *weight),
        QuestTrigger::DifficultyAbove(d) => arc.difficulty.current_difficulty > *d,
        QuestTrigger::Unlock(condition) => is_unlocked(condition, arc, character),
    }
}

fn adaptation_fires(trigger: &AdaptationTrigger, arc: &Arc, character: &CharacterSnapshot) -> bool {
    match trigger {
        AdaptationTrigger::FailureRateAbove(rate) => objective_failure_rate(arc) > *rate,
        AdaptationTrigger::ProgressAbove(p) => arc.progression.progress_percent > *p,
        AdaptationTrigger::TurnsElapsedAbove(t) => arc.progression.turns_elapsed > *t,
        AdaptationTrigger::Unlock(condition) => is_unlocked(condition, arc, character),
    }
}

/// Apply every not-yet-applied rule whose trigger holds.
pub fn apply_modification_rules(arc: &mut Arc, character: &CharacterSnapshot) -> Vec<SideEffect> {
    let snapshot = arc.clone();
    let mut effects = Vec::new();
    for rule in arc
        .integration
        .quest
        .modification_rules
        .iter_mut()
        .filter(|r| !r.applied)
    {
        if rule_fires(&rule.trigger, &snapshot, character) {
            rule.applied = true;
            effects.push(SideEffect::QuestModified {
                rule_id: rule.id.clone(),
                modification: rule.modification.clone(),
            });
        }
    }
    effects
}

/// Add each triggered dynamic objective to the current phase as an optional
/// objective already in progress.
pub fn spawn_dynamic_objectives(arc: &mut Arc, character: &CharacterSnapshot) -> Vec<SideEffect> {
    let snapshot = arc.clone();
    let mut spawned = Vec::new();
    for objective in arc
        .integration
        .quest
        .dynamic_objectives
        .iter_mut()
        .filter(|o| !o.spawned)
    {
        if adaptation_fires(&objective.trigger, &snapshot, character) {
            objective.spawned = true;
            spawned.push((objective.id.clone(), objective.description.clone()));
        }
    }

    let index = arc.progression.current_phase;
    let mut effects = Vec::new();
    for (id, description) in spawned {
        if let Some(phase) = arc.phases.get_mut(index) {
            let mut added = ArcObjective::optional(id.clone(), description.clone());
            added.status = ObjectiveStatus::InProgress;
            phase.objectives.push(added);
        }
        effects.push(SideEffect::ObjectiveAdded {
            objective_id: id,
            description,
        });
    }
    effects
}
