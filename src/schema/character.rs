use serde::{Deserialize, Serialize};

use super::arc::CharacterId;

/// A character's standing with one NPC, as reported by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcRelationship {
    pub npc_id: String,
    pub name: String,
    /// -100..=100; negative means strained.
    pub score: i32,
}

/// Immutable view of the player character supplied by the caller each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub id: CharacterId,
    pub name: String,
    pub level: u32,
    pub health: f32,
    pub max_health: f32,
    pub mana: f32,
    pub max_mana: f32,
    pub currency: f32,
    #[serde(default)]
    pub relationships: Vec<NpcRelationship>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl CharacterSnapshot {
    pub fn new(id: CharacterId, name: impl Into<String>, level: u32) -> Self {
        Self {
            id,
            name: name.into(),
            level,
            health: 100.0,
            max_health: 100.0,
            mana: 50.0,
            max_mana: 50.0,
            currency: 100.0 * level.max(1) as f32,
            relationships: Vec::new(),
            skills: Vec::new(),
        }
    }

    /// Rough measure of what difficulty this character can handle, in [1, 10].
    pub fn capability(&self) -> f32 {
        (self.level as f32 / 2.0).clamp(1.0, 10.0)
    }

    pub fn health_ratio(&self) -> f32 {
        ratio(self.health, self.max_health)
    }

    pub fn mana_ratio(&self) -> f32 {
        ratio(self.mana, self.max_mana)
    }

    pub fn relationship(&self, npc_id: &str) -> Option<&NpcRelationship> {
        self.relationships.iter().find(|r| r.npc_id == npc_id)
    }
}

// A zero maximum means there is nothing to deplete.
fn ratio(value: f32, max: f32) -> f32 {
    if max <= 0.0 {
        return 1.0;
    }
    (value / max).clamp(0.0, 1.0)
}
