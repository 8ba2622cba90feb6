use crate::core::error::ArcError;
use crate::schema::arc::{Arc, NarrativeWeight};
use crate::schema::character::CharacterSnapshot;
use crate::schema::event::{CombatEvent, UpdateEvent};
use crate::schema::integration::{
    CombatConsequence, CombatOutcome, QuestConsequence, SideEffect, Subsystem,
};
use crate::schema::world::WorldStateSnapshot;

use super::{foreign_event, Integration, IntegrationAdapter};

/// Experience is doubled for victories during the climax.
const CLIMAX_MULTIPLIER: f32 = 2.0;

pub struct CombatAdapter;

impl IntegrationAdapter for CombatAdapter {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Combat
    }

    fn integrate(
        &self,
        arc: &Arc,
        event: &UpdateEvent,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> Result<Integration, ArcError> {
        match event {
            UpdateEvent::CombatResult(combat) => Ok(integrate_combat(arc, combat, character, world)),
            other => Err(foreign_event(self.subsystem(), other)),
        }
    }
}

/// Encounter difficulty after arc scaling: `base × difficulty / 5 × factor`.
pub fn scale_encounter(arc: &Arc, base_difficulty: f32) -> f32 {
    base_difficulty * (arc.difficulty.current_difficulty / 5.0)
        * arc.integration.combat.scaling_factor
}

pub fn integrate_combat(
    arc: &Arc,
    event: &CombatEvent,
    _character: &CharacterSnapshot,
    world: &WorldStateSnapshot,
) -> Integration {
    let mut out = Integration::from_arc(arc);
    let scaled_difficulty = scale_encounter(arc, event.base_difficulty);
    let weight = arc.current_weight();
    let narrative_tag = weight.combat_tag().to_string();

    let consequence = match event.outcome {
        CombatOutcome::Victory => {
            let multiplier = if weight == NarrativeWeight::Climax {
                CLIMAX_MULTIPLIER
            } else {
                1.0
            };
            let amount = arc.integration.combat.base_experience as f32
                * arc.difficulty.current_difficulty
                * multiplier;
            Some(QuestConsequence::ExperienceBonus {
                amount: amount.round() as u32,
            })
        }
        CombatOutcome::Defeat => Some(QuestConsequence::NarrativeFlag {
            flag: format!("{}:defeated_at:{}", arc.id, event.encounter_id),
            reversible: true,
        }),
        CombatOutcome::Retreat => None,
    };

    out.side_effects.push(SideEffect::EncounterScaled {
        encounter_id: event.encounter_id.clone(),
        scaled_difficulty,
        narrative_tag: narrative_tag.clone(),
    });
    if let Some(c) = &consequence {
        out.side_effects.push(SideEffect::Consequence {
            encounter_id: event.encounter_id.clone(),
            consequence: c.clone(),
        });
    }

    out.arc.integration.combat.consequences.push(CombatConsequence {
        encounter_id: event.encounter_id.clone(),
        outcome: event.outcome,
        scaled_difficulty,
        narrative_tag,
        turn: world.turn,
        consequence,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::arc::{
        ArcArchetype, ArcId, ArcObjective, ArcPhase, CharacterId, DifficultySettings,
    };

    fn arc_in(weight: NarrativeWeight, difficulty: f32) -> Arc {
        let mut arc = Arc::new(ArcId(5), CharacterId(1), 1, ArcArchetype::Crisis);
        arc.difficulty = DifficultySettings::new(difficulty);
        arc.phases.push(ArcPhase {
            order: 1,
            name: "Now".to_string(),
            narrative_weight: weight,
            objectives: vec![ArcObjective::primary("o", "o")],
            estimated_duration: 3,
            difficulty_modifier: 1.0,
        });
        arc
    }

    fn event(outcome: CombatOutcome) -> CombatEvent {
        CombatEvent {
            encounter_id: "gate".to_string(),
            base_difficulty: 4.0,
            outcome,
            enemies_defeated: 2,
        }
    }

    fn run(arc: &Arc, outcome: CombatOutcome) -> Integration {
        integrate_combat(
            arc,
            &event(outcome),
            &CharacterSnapshot::new(CharacterId(1), "Ada", 5),
            &WorldStateSnapshot::new(9, "keep"),
        )
    }

    #[test]
    fn encounter_scales_with_difficulty() {
        let out = run(&arc_in(NarrativeWeight::Setup, 7.5), CombatOutcome::Retreat);
        assert!(matches!(
            &out.side_effects[0],
            SideEffect::EncounterScaled { scaled_difficulty, narrative_tag, .. }
                if *scaled_difficulty == 6.0 && narrative_tag == "combat:skirmish"
        ));
        assert_eq!(out.side_effects.len(), 1);
    }

    #[test]
    fn climax_victory_doubles_experience() {
        let out = run(&arc_in(NarrativeWeight::Climax, 6.0), CombatOutcome::Victory);
        let record = &out.arc.integration.combat.consequences[0];
        assert_eq!(record.narrative_tag, "combat:showdown");
        assert_eq!(
            record.consequence,
            Some(QuestConsequence::ExperienceBonus { amount: 600 })
        );

        let plain = run(&arc_in(NarrativeWeight::RisingAction, 6.0), CombatOutcome::Victory);
        assert_eq!(
            plain.arc.integration.combat.consequences[0].consequence,
            Some(QuestConsequence::ExperienceBonus { amount: 300 })
        );
    }

    #[test]
    fn defeat_sets_reversible_flag() {
        let out = run(&arc_in(NarrativeWeight::Setup, 5.0), CombatOutcome::Defeat);
        match &out.arc.integration.combat.consequences[0].consequence {
            Some(QuestConsequence::NarrativeFlag { flag, reversible }) => {
                assert!(*reversible);
                assert_eq!(flag, "arc-5:defeated_at:gate");
            }
            other => panic!("unexpected consequence {:?}", other),
        }
        assert_eq!(out.arc.integration.combat.consequences[0].turn, 9);
    }

    #[test]
    fn input_arc_is_untouched() {
        let arc = arc_in(NarrativeWeight::Setup, 5.0);
        let _ = run(&arc, CombatOutcome::Victory);
        assert!(arc.integration.combat.consequences.is_empty());
    }
}
