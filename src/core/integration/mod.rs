//! Integration adapters: translate subsystem events into arc changes and
//! side effects for the subsystem to apply.
//!
//! Every adapter is a pure function of `(arc, event, character, world)`. The
//! [`IntegrationAdapter`] trait is the seam the manager dispatches through.

pub mod combat;
pub mod inventory;
pub mod progression;
pub mod quest;
pub mod relationship;
pub mod unlock;

use crate::core::error::ArcError;
use crate::schema::arc::{Arc, ArcArchetype, NarrativeWeight};
use crate::schema::character::CharacterSnapshot;
use crate::schema::event::UpdateEvent;
use crate::schema::integration::{
    AdaptationTrigger, BeatTrigger, CraftingUnlock, DynamicObjective, EmotionalBeat,
    EquipmentTier, IntegrationPoints, KeyItemUnlock, ProgressionGate, QuestModificationRule,
    QuestTrigger, SideEffect, SkillUnlock, SpecializationOpportunity, Subsystem,
    UnlockCondition,
};
use crate::schema::world::WorldStateSnapshot;

pub use combat::CombatAdapter;
pub use inventory::InventoryAdapter;
pub use progression::ProgressionAdapter;
pub use quest::QuestAdapter;
pub use relationship::RelationshipAdapter;

/// The new arc plus what the subsystem should apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Integration {
    pub arc: Arc,
    pub side_effects: Vec<SideEffect>,
}

impl Integration {
    /// Start from a copy of `arc` with no side effects yet.
    pub fn from_arc(arc: &Arc) -> Self {
        Self {
            arc: arc.clone(),
            side_effects: Vec::new(),
        }
    }
}

pub trait IntegrationAdapter {
    fn subsystem(&self) -> Subsystem;

    /// Apply `event` to `arc`. Events owned by another subsystem are
    /// rejected with [`ArcError::Integration`].
    fn integrate(
        &self,
        arc: &Arc,
        event: &UpdateEvent,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> Result<Integration, ArcError>;
}

pub(crate) fn foreign_event(subsystem: Subsystem, event: &UpdateEvent) -> ArcError {
    ArcError::Integration {
        adapter: subsystem.name(),
        event: event.name(),
    }
}

/// The adapter that owns `subsystem`, if it has one.
pub fn adapter_for(subsystem: Subsystem) -> Option<&'static dyn IntegrationAdapter> {
    match subsystem {
        Subsystem::Combat => Some(&CombatAdapter),
        Subsystem::Progression => Some(&ProgressionAdapter),
        Subsystem::Quest => Some(&QuestAdapter),
        Subsystem::Inventory => Some(&InventoryAdapter),
        Subsystem::Relationship => Some(&RelationshipAdapter),
        Subsystem::Choice | Subsystem::Support => None,
    }
}

fn signature_skill(archetype: ArcArchetype) -> &'static str {
    match archetype {
        ArcArchetype::Crisis => "last_stand",
        ArcArchetype::Growth => "quick_study",
        ArcArchetype::Adventure => "pathfinding",
        ArcArchetype::Mystery => "keen_eye",
        ArcArchetype::Intrigue => "silver_tongue",
        ArcArchetype::Bond => "steadfast",
        ArcArchetype::Introspective => "inner_calm",
    }
}

/// Default rules and gates attached to a freshly generated arc.
pub fn default_integration_points(arc: &Arc, character: &CharacterSnapshot) -> IntegrationPoints {
    let mut points = arc.integration.clone();
    let id = arc.id;

    let progression = &mut points.progression;
    progression.gates = [25.0, 50.0, 75.0]
        .iter()
        .map(|p| ProgressionGate {
            id: format!("{}:gate-{}", id, p),
            description: format!("Arc {}% complete", p),
            condition: UnlockCondition::ArcProgress(*p),
            unlocked: false,
        })
        .collect();
    progression.skill_unlocks.push(SkillUnlock {
        skill: signature_skill(arc.archetype).to_string(),
        condition: UnlockCondition::ArcProgress(50.0),
        unlocked: false,
    });
    progression.specializations.push(SpecializationOpportunity {
        name: format!("{} veteran", arc.archetype.as_str().trim_end_matches("_arc")),
        conditions: vec![
            UnlockCondition::ArcProgress(75.0),
            UnlockCondition::CharacterLevel(character.level + 2),
        ],
        offered: false,
    });

    let inventory = &mut points.inventory;
    inventory.key_items.push(KeyItemUnlock {
        item_id: format!("{}:key", id),
        name: format!("Token of {}", arc.title),
        condition: UnlockCondition::ArcProgress(50.0),
        unlocked: false,
    });
    inventory.crafting.push(CraftingUnlock {
        recipe: format!("{}_kit", signature_skill(arc.archetype)),
        condition: UnlockCondition::CharacterLevel(character.level + 1),
        unlocked: false,
    });
    inventory.equipment_tiers = [(1u8, 25.0), (2, 50.0), (3, 100.0)]
        .iter()
        .map(|(tier, p)| EquipmentTier {
            tier: *tier,
            condition: UnlockCondition::ArcProgress(*p),
            unlocked: false,
        })
        .collect();

    let quest = &mut points.quest;
    quest.modification_rules.push(QuestModificationRule {
        id: format!("{}:ease-on-failures", id),
        trigger: QuestTrigger::ObjectiveFailuresAtLeast(2),
        modification: "Offer an easier route to the current objective".to_string(),
        applied: false,
    });
    quest.modification_rules.push(QuestModificationRule {
        id: format!("{}:climax-stakes", id),
        trigger: QuestTrigger::PhaseReached(NarrativeWeight::Climax),
        modification: "Raise the stakes of active quests".to_string(),
        applied: false,
    });
    let expected_turns: u32 = arc.phases.iter().map(|p| p.estimated_duration).sum();
    quest.dynamic_objectives.push(DynamicObjective {
        id: format!("{}:regroup", id),
        description: "Regroup and find another way forward".to_string(),
        trigger: AdaptationTrigger::FailureRateAbove(0.5),
        spawned: false,
    });
    quest.dynamic_objectives.push(DynamicObjective {
        id: format!("{}:shortcut", id),
        description: "Look for a quicker path".to_string(),
        trigger: AdaptationTrigger::TurnsElapsedAbove(expected_turns.max(1) * 2),
        spawned: false,
    });

    let relationship = &mut points.relationship;
    relationship.emotional_beats.push(EmotionalBeat {
        id: format!("{}:bond-deepens", id),
        npc_id: None,
        trigger: BeatTrigger::ReputationAtLeast(50),
        description: "A friendship deepens".to_string(),
        fired: false,
    });
    relationship.emotional_beats.push(EmotionalBeat {
        id: format!("{}:rift", id),
        npc_id: None,
        trigger: BeatTrigger::ReputationAtMost(-50),
        description: "A rift opens".to_string(),
        fired: false,
    });
    relationship.emotional_beats.push(EmotionalBeat {
        id: format!("{}:climax-confidant", id),
        npc_id: None,
        trigger: BeatTrigger::PhaseReached(NarrativeWeight::Climax),
        description: "A confidant steps forward before the climax".to_string(),
        fired: false,
    });

    points
}

/// True once the arc has reached (or passed) a phase of the given weight.
pub(crate) fn phase_reached(arc: &Arc, weight: NarrativeWeight) -> bool {
    let current = arc.progression.current_phase;
    arc.phases
        .iter()
        .take(current + 1)
        .any(|p| p.narrative_weight == weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::arc::{ArcId, CharacterId};
    use crate::schema::event::{QuestEvent, QuestEventKind};

    #[test]
    fn adapters_cover_subsystems() {
        for subsystem in [
            Subsystem::Combat,
            Subsystem::Progression,
            Subsystem::Quest,
            Subsystem::Inventory,
            Subsystem::Relationship,
        ] {
            let adapter = adapter_for(subsystem).unwrap();
            assert_eq!(adapter.subsystem(), subsystem);
        }
        assert!(adapter_for(Subsystem::Choice).is_none());
    }

    #[test]
    fn adapter_rejects_foreign_event() {
        let arc = Arc::new(ArcId(1), CharacterId(1), 1, ArcArchetype::Crisis);
        let event = UpdateEvent::QuestEvent(QuestEvent {
            quest_id: "q".to_string(),
            kind: QuestEventKind::Started,
        });
        let err = CombatAdapter
            .integrate(
                &arc,
                &event,
                &CharacterSnapshot::new(CharacterId(1), "Ada", 3),
                &WorldStateSnapshot::new(1, "keep"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ArcError::Integration {
                adapter: "combat",
                event: "quest_event"
            }
        ));
    }

    #[test]
    fn scaffolding_configures_every_subsystem() {
        let arc = Arc::new(ArcId(2), CharacterId(1), 1, ArcArchetype::Bond);
        let points = default_integration_points(&arc, &CharacterSnapshot::new(CharacterId(1), "Ada", 4));
        assert_eq!(points.configured_subsystems(), 5);
        assert_eq!(points.progression.gates.len(), 3);
        assert_eq!(points.progression.gates[0].id, "arc-2:gate-25");
        assert_eq!(points.inventory.equipment_tiers.len(), 3);
        assert_eq!(
            points.progression.specializations[0].conditions[1],
            UnlockCondition::CharacterLevel(6)
        );
    }
}
