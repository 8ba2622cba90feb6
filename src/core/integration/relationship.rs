use crate::core::error::ArcError;
use crate::schema::arc::Arc;
use crate::schema::character::CharacterSnapshot;
use crate::schema::event::{RelationshipEvent, UpdateEvent};
use crate::schema::integration::{
    BeatTrigger, RelationshipImpact, RelationshipIntegration, SideEffect, SocialDynamics,
    Subsystem, MAX_REPUTATION, MIN_REPUTATION,
};
use crate::schema::world::WorldStateSnapshot;

use super::unlock::is_unlocked;
use super::{foreign_event, phase_reached, Integration, IntegrationAdapter};

pub struct RelationshipAdapter;

impl IntegrationAdapter for RelationshipAdapter {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Relationship
    }

    fn integrate(
        &self,
        arc: &Arc,
        event: &UpdateEvent,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> Result<Integration, ArcError> {
        match event {
            UpdateEvent::RelationshipEvent(rel) => {
                Ok(integrate_relationship(arc, rel, character, world))
            }
            other => Err(foreign_event(self.subsystem(), other)),
        }
    }
}

pub fn integrate_relationship(
    arc: &Arc,
    event: &RelationshipEvent,
    character: &CharacterSnapshot,
    _world: &WorldStateSnapshot,
) -> Integration {
    let mut out = Integration::from_arc(arc);
    let weight = arc.consequence_weight;
    let relationship = &mut out.arc.integration.relationship;

    let position = relationship
        .impacts
        .iter()
        .position(|i| i.npc_id == event.npc_id);
    let impact = match position {
        Some(i) => &mut relationship.impacts[i],
        None => {
            let starting = character
                .relationship(&event.npc_id)
                .map(|r| r.score)
                .unwrap_or(0);
            relationship.impacts.push(RelationshipImpact {
                npc_id: event.npc_id.clone(),
                arc_id: arc.id,
                impact_score: 0.0,
                reputation_score: starting.clamp(MIN_REPUTATION, MAX_REPUTATION),
                interactions: 0,
                last_interaction: String::new(),
            });
            let last = relationship.impacts.len() - 1;
            &mut relationship.impacts[last]
        }
    };

    impact.impact_score += event.delta as f32 * weight;
    impact.reputation_score = impact
        .reputation_score
        .saturating_add(event.delta)
        .clamp(MIN_REPUTATION, MAX_REPUTATION);
    impact.interactions += 1;
    impact.last_interaction = event.interaction.clone();
    let reputation = impact.reputation_score;
    out.side_effects.push(SideEffect::RelationshipChanged {
        npc_id: event.npc_id.clone(),
        reputation_score: reputation,
        impact_score: impact.impact_score,
    });

    relationship.social_dynamics = social_dynamics(relationship);
    let fired = fire_beats(&mut out.arc, &event.npc_id, reputation, character);
    out.side_effects.extend(fired);
    out
}

/// Cohesion and tension over tracked NPCs, plus the most affected one.
pub fn social_dynamics(relationship: &RelationshipIntegration) -> SocialDynamics {
    let total = relationship.impacts.len();
    if total == 0 {
        return SocialDynamics::default();
    }
    let positive = relationship
        .impacts
        .iter()
        .filter(|i| i.reputation_score > 0)
        .count();
    let negative = relationship
        .impacts
        .iter()
        .filter(|i| i.reputation_score < 0)
        .count();

    let mut pivotal: Option<&RelationshipImpact> = None;
    for impact in &relationship.impacts {
        match pivotal {
            Some(best) if best.impact_score.abs() >= impact.impact_score.abs() => {}
            _ => pivotal = Some(impact),
        }
    }

    SocialDynamics {
        cohesion: positive as f32 / total as f32,
        tension: negative as f32 / total as f32,
        pivotal_npc: pivotal.map(|i| i.npc_id.clone()),
    }
}

fn fire_beats(
    arc: &mut Arc,
    npc_id: &str,
    reputation: i32,
    character: &CharacterSnapshot,
) -> Vec<SideEffect> {
    let snapshot = arc.clone();
    let mut effects = Vec::new();
    for beat in arc
        .integration
        .relationship
        .emotional_beats
        .iter_mut()
        .filter(|b| !b.fired)
    {
        if beat.npc_id.as_deref().is_some_and(|id| id != npc_id) {
            continue;
        }
        let fires = match &beat.trigger {
            BeatTrigger::ReputationAtLeast(n) => reputation >= *n,
            BeatTrigger::ReputationAtMost(n) => reputation <= *n,
            BeatTrigger::PhaseReached(weight) => phase_reached(&snapshot, *weight),
            BeatTrigger::Unlock(condition) => is_unlocked(condition, &snapshot, character),
        };
        if fires {
            beat.fired = true;
            effects.push(SideEffect::EmotionalBeat {
                beat_id: beat.id.clone(),
                npc_id: Some(npc_id.to_string()),
                description: beat.description.clone(),
            });
        }
    }
    effects
}
