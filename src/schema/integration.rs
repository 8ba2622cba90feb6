use serde::{Deserialize, Serialize};

use super::arc::{ArcId, NarrativeWeight, ObjectiveStatus};
use super::failure::SupportLevel;

/// A gate shared by every subsystem: `{type, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UnlockCondition {
    /// Arc progress percentage at or above the value.
    ArcProgress(f32),
    /// Character level at or above the value.
    CharacterLevel(u32),
    /// A choice with this id (or text) appears in the arc's history.
    ChoiceMade(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Choice,
    Combat,
    Progression,
    Quest,
    Inventory,
    Relationship,
    Support,
}

impl Subsystem {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Choice => "choice",
            Self::Combat => "combat",
            Self::Progression => "progression",
            Self::Quest => "quest",
            Self::Inventory => "inventory",
            Self::Relationship => "relationship",
            Self::Support => "support",
        }
    }
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Retreat,
}

/// A quest-level consequence produced by combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestConsequence {
    ExperienceBonus { amount: u32 },
    NarrativeFlag { flag: String, reversible: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatConsequence {
    pub encounter_id: String,
    pub outcome: CombatOutcome,
    pub scaled_difficulty: f32,
    pub narrative_tag: String,
    pub turn: u64,
    pub consequence: Option<QuestConsequence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatIntegration {
    pub scaling_factor: f32,
    /// Experience per point of difficulty on victory.
    pub base_experience: u32,
    pub consequences: Vec<CombatConsequence>,
}

impl Default for CombatIntegration {
    fn default() -> Self {
        Self {
            scaling_factor: 1.0,
            base_experience: 50,
            consequences: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Progression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillUnlock {
    pub skill: String,
    pub condition: UnlockCondition,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationOpportunity {
    pub name: String,
    pub conditions: Vec<UnlockCondition>,
    pub offered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionGate {
    pub id: String,
    pub description: String,
    pub condition: UnlockCondition,
    pub unlocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ExperienceModifiers {
    pub base_multiplier: f32,
    pub difficulty_bonus: f32,
    pub choice_quality_bonus: f32,
    pub total: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionIntegration {
    pub base_multiplier: f32,
    pub skill_unlocks: Vec<SkillUnlock>,
    pub specializations: Vec<SpecializationOpportunity>,
    pub gates: Vec<ProgressionGate>,
    pub experience_awarded: u64,
}

impl Default for ProgressionIntegration {
    fn default() -> Self {
        Self {
            base_multiplier: 1.0,
            skill_unlocks: Vec::new(),
            specializations: Vec::new(),
            gates: Vec::new(),
            experience_awarded: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Quest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QuestTrigger {
    ObjectiveFailuresAtLeast(u32),
    PhaseReached(NarrativeWeight),
    DifficultyAbove(f32),
    Unlock(UnlockCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestModificationRule {
    pub id: String,
    pub trigger: QuestTrigger,
    pub modification: String,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AdaptationTrigger {
    FailureRateAbove(f32),
    ProgressAbove(f32),
    TurnsElapsedAbove(u32),
    Unlock(UnlockCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicObjective {
    pub id: String,
    pub description: String,
    pub trigger: AdaptationTrigger,
    pub spawned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuestIntegration {
    pub modification_rules: Vec<QuestModificationRule>,
    pub dynamic_objectives: Vec<DynamicObjective>,
    /// Quest ids in the order they first touched this arc.
    pub quest_chain: Vec<String>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyItemUnlock {
    pub item_id: String,
    pub name: String,
    pub condition: UnlockCondition,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftingUnlock {
    pub recipe: String,
    pub condition: UnlockCondition,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentTier {
    pub tier: u8,
    pub condition: UnlockCondition,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InventoryIntegration {
    pub key_items: Vec<KeyItemUnlock>,
    pub crafting: Vec<CraftingUnlock>,
    pub equipment_tiers: Vec<EquipmentTier>,
    pub acquired_items: Vec<String>,
}

// ---------------------------------------------------------------------------
// Relationship
// ---------------------------------------------------------------------------

pub const MIN_REPUTATION: i32 = -100;
pub const MAX_REPUTATION: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipImpact {
    pub npc_id: String,
    pub arc_id: ArcId,
    /// Cumulative weighted impact of this arc on the relationship.
    pub impact_score: f32,
    /// Always within [-100, 100].
    pub reputation_score: i32,
    pub interactions: u32,
    pub last_interaction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SocialDynamics {
    /// Fraction of tracked NPCs with positive reputation.
    pub cohesion: f32,
    /// Fraction of tracked NPCs with negative reputation.
    pub tension: f32,
    /// NPC with the largest absolute impact, if any.
    pub pivotal_npc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BeatTrigger {
    ReputationAtLeast(i32),
    ReputationAtMost(i32),
    PhaseReached(NarrativeWeight),
    Unlock(UnlockCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalBeat {
    pub id: String,
    /// `None` matches any NPC.
    pub npc_id: Option<String>,
    pub trigger: BeatTrigger,
    pub description: String,
    pub fired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RelationshipIntegration {
    pub impacts: Vec<RelationshipImpact>,
    pub social_dynamics: SocialDynamics,
    pub emotional_beats: Vec<EmotionalBeat>,
}

impl RelationshipIntegration {
    pub fn impact(&self, npc_id: &str) -> Option<&RelationshipImpact> {
        self.impacts.iter().find(|i| i.npc_id == npc_id)
    }
}

/// Per-subsystem integration state carried by an arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IntegrationPoints {
    pub combat: CombatIntegration,
    pub progression: ProgressionIntegration,
    pub quest: QuestIntegration,
    pub inventory: InventoryIntegration,
    pub relationship: RelationshipIntegration,
}

impl IntegrationPoints {
    /// Number of subsystems with at least one configured rule or gate.
    pub fn configured_subsystems(&self) -> usize {
        let combat = self.combat.scaling_factor > 0.0;
        let progression = !self.progression.skill_unlocks.is_empty()
            || !self.progression.specializations.is_empty()
            || !self.progression.gates.is_empty();
        let quest =
            !self.quest.modification_rules.is_empty() || !self.quest.dynamic_objectives.is_empty();
        let inventory = !self.inventory.key_items.is_empty()
            || !self.inventory.crafting.is_empty()
            || !self.inventory.equipment_tiers.is_empty();
        let relationship = !self.relationship.emotional_beats.is_empty();
        [combat, progression, quest, inventory, relationship]
            .iter()
            .filter(|b| **b)
            .count()
    }
}

/// Something a subsystem (or the caller) should apply after an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SideEffect {
    ChoiceRecorded {
        choice_id: String,
        agency_score: f32,
    },
    EncounterScaled {
        encounter_id: String,
        scaled_difficulty: f32,
        narrative_tag: String,
    },
    Consequence {
        encounter_id: String,
        consequence: QuestConsequence,
    },
    ExperienceAdjusted {
        base: u32,
        adjusted: u32,
        modifiers: ExperienceModifiers,
    },
    SkillUnlocked {
        skill: String,
    },
    SpecializationOffered {
        name: String,
    },
    GateUnlocked {
        gate_id: String,
    },
    ObjectiveUpdated {
        objective_id: String,
        status: ObjectiveStatus,
        progress: u8,
    },
    QuestModified {
        rule_id: String,
        modification: String,
    },
    ObjectiveAdded {
        objective_id: String,
        description: String,
    },
    QuestChained {
        quest_id: String,
        position: usize,
    },
    KeyItemUnlocked {
        item_id: String,
        name: String,
    },
    CraftingUnlocked {
        recipe: String,
    },
    EquipmentTierUnlocked {
        tier: u8,
    },
    RelationshipChanged {
        npc_id: String,
        reputation_score: i32,
        impact_score: f32,
    },
    EmotionalBeat {
        beat_id: String,
        npc_id: Option<String>,
        description: String,
    },
    PhaseAdvanced {
        from: u32,
        to: u32,
        milestone_id: String,
    },
    DifficultyAdjusted {
        from: f32,
        to: f32,
        reason: String,
    },
    SupportLevelChanged {
        from: SupportLevel,
        to: SupportLevel,
    },
    RecoveryOffered {
        option_id: String,
        recovery_type: String,
    },
    Hint {
        text: String,
    },
}
