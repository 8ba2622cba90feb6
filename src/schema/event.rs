use serde::{Deserialize, Serialize};

use super::arc::{ChoiceCategory, ChoiceImpact};
use super::integration::{CombatOutcome, Subsystem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerChoice {
    pub choice_id: String,
    pub text: String,
    pub category: ChoiceCategory,
    pub impact: ChoiceImpact,
    /// 0..1.
    pub quality: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub encounter_id: String,
    /// Difficulty the combat subsystem would use before arc scaling.
    pub base_difficulty: f32,
    pub outcome: CombatOutcome,
    #[serde(default)]
    pub enemies_defeated: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestEventKind {
    Started,
    ObjectiveProgress { objective_id: String, progress: u8 },
    ObjectiveCompleted { objective_id: String },
    ObjectiveFailed { objective_id: String },
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestEvent {
    pub quest_id: String,
    pub kind: QuestEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionEvent {
    pub experience_gained: u32,
    #[serde(default)]
    pub new_level: Option<u32>,
    #[serde(default)]
    pub skill_used: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryEventKind {
    Acquired,
    Used,
    Crafted,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub item_id: String,
    pub kind: InventoryEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEvent {
    pub npc_id: String,
    pub interaction: String,
    /// Raw change in standing reported by the relationship subsystem.
    pub delta: i32,
}

/// The player's (or system's) reaction to offered support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResponse {
    pub support_type: String,
    /// 0..1; zero means the support was declined or useless.
    pub effectiveness: f32,
}

/// One turn's worth of input to `ArcManager::update_arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "update_type", content = "data", rename_all = "snake_case")]
pub enum UpdateEvent {
    PlayerChoice(PlayerChoice),
    CombatResult(CombatEvent),
    QuestEvent(QuestEvent),
    ProgressionEvent(ProgressionEvent),
    InventoryEvent(InventoryEvent),
    RelationshipEvent(RelationshipEvent),
    SupportResponse(SupportResponse),
}

impl UpdateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerChoice(_) => "player_choice",
            Self::CombatResult(_) => "combat_result",
            Self::QuestEvent(_) => "quest_event",
            Self::ProgressionEvent(_) => "progression_event",
            Self::InventoryEvent(_) => "inventory_event",
            Self::RelationshipEvent(_) => "relationship_event",
            Self::SupportResponse(_) => "support_response",
        }
    }

    /// The subsystem responsible for handling this event.
    pub fn subsystem(&self) -> Subsystem {
        match self {
            Self::PlayerChoice(_) => Subsystem::Choice,
            Self::CombatResult(_) => Subsystem::Combat,
            Self::QuestEvent(_) => Subsystem::Quest,
            Self::ProgressionEvent(_) => Subsystem::Progression,
            Self::InventoryEvent(_) => Subsystem::Inventory,
            Self::RelationshipEvent(_) => Subsystem::Relationship,
            Self::SupportResponse(_) => Subsystem::Support,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_route_to_subsystems() {
        let combat = UpdateEvent::CombatResult(CombatEvent {
            encounter_id: "ambush".to_string(),
            base_difficulty: 4.0,
            outcome: CombatOutcome::Victory,
            enemies_defeated: 3,
        });
        assert_eq!(combat.subsystem(), Subsystem::Combat);
        assert_eq!(combat.name(), "combat_result");

        let quest = UpdateEvent::QuestEvent(QuestEvent {
            quest_id: "q1".to_string(),
            kind: QuestEventKind::Started,
        });
        assert_eq!(quest.subsystem(), Subsystem::Quest);
    }
}
