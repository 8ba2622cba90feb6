use crate::core::error::ArcError;
use crate::schema::arc::Arc;
use crate::schema::character::CharacterSnapshot;
use crate::schema::event::{ProgressionEvent, UpdateEvent};
use crate::schema::integration::{ExperienceModifiers, SideEffect, Subsystem};
use crate::schema::world::WorldStateSnapshot;

use super::unlock::{all_unlocked, is_unlocked};
use super::{foreign_event, Integration, IntegrationAdapter};

/// Bonus per point of difficulty above the midpoint.
const DIFFICULTY_BONUS_PER_POINT: f32 = 0.05;
/// Bonus at an agency score of 100.
const MAX_CHOICE_QUALITY_BONUS: f32 = 0.25;

pub struct ProgressionAdapter;

impl IntegrationAdapter for ProgressionAdapter {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Progression
    }

    fn integrate(
        &self,
        arc: &Arc,
        event: &UpdateEvent,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> Result<Integration, ArcError> {
        match event {
            UpdateEvent::ProgressionEvent(progression) => {
                Ok(integrate_progression(arc, progression, character, world))
            }
            other => Err(foreign_event(self.subsystem(), other)),
        }
    }
}

pub fn experience_modifiers(arc: &Arc) -> ExperienceModifiers {
    let base_multiplier = arc.integration.progression.base_multiplier;
    let difficulty_bonus = (arc.difficulty.current_difficulty - 5.0) * DIFFICULTY_BONUS_PER_POINT;
    let choice_quality_bonus =
        arc.agency.overall_agency_score / 100.0 * MAX_CHOICE_QUALITY_BONUS;
    ExperienceModifiers {
        base_multiplier,
        difficulty_bonus,
        choice_quality_bonus,
        total: (base_multiplier + difficulty_bonus + choice_quality_bonus).max(0.0),
    }
}

pub fn integrate_progression(
    arc: &Arc,
    event: &ProgressionEvent,
    character: &CharacterSnapshot,
    _world: &WorldStateSnapshot,
) -> Integration {
    let mut out = Integration::from_arc(arc);

    let modifiers = experience_modifiers(arc);
    let adjusted = (event.experience_gained as f32 * modifiers.total).round() as u32;
    out.arc.integration.progression.experience_awarded += adjusted as u64;
    out.side_effects.push(SideEffect::ExperienceAdjusted {
        base: event.experience_gained,
        adjusted,
        modifiers,
    });

    // A level-up reported with this event counts immediately.
    let mut leveled = character.clone();
    if let Some(level) = event.new_level {
        leveled.level = leveled.level.max(level);
    }
    out.side_effects
        .extend(evaluate_progression_gates(&mut out.arc, &leveled));
    out
}

/// Unlock skills, offer specializations and open gates. Unlocks never
/// revert. Returns the side effects for anything that changed state.
pub fn evaluate_progression_gates(arc: &mut Arc, character: &CharacterSnapshot) -> Vec<SideEffect> {
    let snapshot = arc.clone();
    let progression = &mut arc.integration.progression;
    let mut effects = Vec::new();

    for unlock in progression.skill_unlocks.iter_mut().filter(|s| !s.unlocked) {
        if is_unlocked(&unlock.condition, &snapshot, character) {
            unlock.unlocked = true;
            effects.push(SideEffect::SkillUnlocked {
                skill: unlock.skill.clone(),
            });
        }
    }

    for spec in progression.specializations.iter_mut().filter(|s| !s.offered) {
        if all_unlocked(&spec.conditions, &snapshot, character) {
            spec.offered = true;
            effects.push(SideEffect::SpecializationOffered {
                name: spec.name.clone(),
            });
        }
    }

    // Gates stay open once opened, like every other unlock.
    for gate in progression.gates.iter_mut().filter(|g| !g.unlocked) {
        if is_unlocked(&gate.condition, &snapshot, character) {
            gate.unlocked = true;
            effects.push(SideEffect::GateUnlocked {
                gate_id: gate.id.clone(),
            });
        }
    }

    effects
}
