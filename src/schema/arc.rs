use serde::{Deserialize, Serialize};
use std::fmt;

use super::failure::{FailureRecoveryConfig, RecoveryOption};
use super::integration::{IntegrationPoints, UnlockCondition};

/// Newtype wrapper for arc IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArcId(pub u64);

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arc-{}", self.0)
    }
}

/// Newtype wrapper for the ID of the character that owns an arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u64);

/// Lifecycle of an arc: `Created → Active → Completing → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArcStatus {
    #[default]
    Created,
    Active,
    Completing,
    Completed,
}

impl ArcStatus {
    /// Check if transition to target status is valid.
    pub fn can_transition_to(&self, target: ArcStatus) -> bool {
        use ArcStatus::*;
        matches!(
            (self, target),
            (Created, Active) | (Active, Completing) | (Completing, Completed)
        )
    }
}

/// The archetype an arc is instantiated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcArchetype {
    #[serde(rename = "crisis_arc")]
    Crisis,
    #[serde(rename = "growth_arc")]
    Growth,
    #[serde(rename = "adventure_arc")]
    Adventure,
    #[serde(rename = "mystery_arc")]
    Mystery,
    #[serde(rename = "intrigue_arc")]
    Intrigue,
    #[serde(rename = "bond_arc")]
    Bond,
    #[serde(rename = "introspective_arc")]
    Introspective,
}

impl ArcArchetype {
    pub const ALL: [ArcArchetype; 7] = [
        Self::Crisis,
        Self::Growth,
        Self::Adventure,
        Self::Mystery,
        Self::Intrigue,
        Self::Bond,
        Self::Introspective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crisis => "crisis_arc",
            Self::Growth => "growth_arc",
            Self::Adventure => "adventure_arc",
            Self::Mystery => "mystery_arc",
            Self::Intrigue => "intrigue_arc",
            Self::Bond => "bond_arc",
            Self::Introspective => "introspective_arc",
        }
    }

    /// Starting difficulty offset relative to the neutral midpoint of 5.
    pub fn difficulty_offset(&self) -> f32 {
        match self {
            Self::Crisis => 2.0,
            Self::Growth => -2.0,
            Self::Adventure => 0.0,
            Self::Mystery => 0.5,
            Self::Intrigue => 1.0,
            Self::Bond => -1.0,
            Self::Introspective => -0.5,
        }
    }
}

impl fmt::Display for ArcArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dramatic role of a phase within its arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeWeight {
    Setup,
    RisingAction,
    Climax,
    FallingAction,
    Resolution,
}

impl NarrativeWeight {
    /// Tag attached to combat that happens during a phase of this weight.
    pub fn combat_tag(&self) -> &'static str {
        match self {
            Self::Setup => "combat:skirmish",
            Self::RisingAction => "combat:escalation",
            Self::Climax => "combat:showdown",
            Self::FallingAction => "combat:aftermath",
            Self::Resolution => "combat:epilogue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    Primary,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl ObjectiveStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcObjective {
    pub id: String,
    pub description: String,
    pub objective_type: ObjectiveType,
    pub status: ObjectiveStatus,
    /// 0..=100.
    pub progress: u8,
}

impl ArcObjective {
    pub fn primary(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            objective_type: ObjectiveType::Primary,
            status: ObjectiveStatus::NotStarted,
            progress: 0,
        }
    }

    pub fn optional(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            objective_type: ObjectiveType::Optional,
            ..Self::primary(id, description)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcPhase {
    /// 1-based, strictly increasing within an arc.
    pub order: u32,
    pub name: String,
    pub narrative_weight: NarrativeWeight,
    pub objectives: Vec<ArcObjective>,
    /// Expected length of the phase in turns.
    pub estimated_duration: u32,
    /// Multiplier applied to the arc difficulty while this phase is current.
    pub difficulty_modifier: f32,
}

impl ArcPhase {
    /// A phase is finished once every primary objective is completed or failed.
    pub fn is_finished(&self) -> bool {
        let mut primaries = self
            .objectives
            .iter()
            .filter(|o| o.objective_type == ObjectiveType::Primary)
            .peekable();
        primaries.peek().is_some() && primaries.all(|o| o.status.is_finished())
    }

    /// Mean progress of the phase's objectives, in [0, 1].
    pub fn mean_progress(&self) -> f32 {
        if self.objectives.is_empty() {
            return 0.0;
        }
        let total: f32 = self.objectives.iter().map(|o| o.progress as f32).sum();
        total / (self.objectives.len() as f32 * 100.0)
    }
}

/// A named point of progress reached during the arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub description: String,
    pub phase_order: u32,
    pub reached_turn: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceCategory {
    Strategic,
    Moral,
    Creative,
    Social,
}

/// How much a choice shaped the story. Ordered from least to most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceImpact {
    Minor,
    Moderate,
    Major,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub turn: u64,
    pub choice_id: String,
    pub text: String,
    pub category: ChoiceCategory,
    pub impact: ChoiceImpact,
    /// 0..1 judgement of the choice supplied by the caller.
    pub quality: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProgressionState {
    pub current_phase: usize,
    pub objectives_completed: u32,
    pub objectives_failed: u32,
    pub turns_elapsed: u32,
    pub started_turn: Option<u64>,
    pub last_turn: Option<u64>,
    /// 0..=100.
    pub progress_percent: f32,
    pub milestones: Vec<Milestone>,
    pub choice_history: Vec<ChoiceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAdjustment {
    pub turn: Option<u64>,
    pub from: f32,
    pub to: f32,
    pub reason: String,
}

pub const MIN_DIFFICULTY: f32 = 1.0;
pub const MAX_DIFFICULTY: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    /// Always within [1, 10].
    pub current_difficulty: f32,
    pub base_difficulty: f32,
    pub history: Vec<DifficultyAdjustment>,
    pub adaptive_scaling: bool,
}

impl DifficultySettings {
    pub fn new(difficulty: f32) -> Self {
        let value = clamp_difficulty(difficulty);
        Self {
            current_difficulty: value,
            base_difficulty: value,
            history: Vec::new(),
            adaptive_scaling: true,
        }
    }
}

impl Default for DifficultySettings {
    fn default() -> Self {
        Self::new(5.0)
    }
}

/// Clamp a difficulty value into [1, 10]. NaN maps to the midpoint.
pub fn clamp_difficulty(value: f32) -> f32 {
    if value.is_nan() {
        return 5.0;
    }
    value.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Per-category choice quality, each in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChoiceQuality {
    pub strategic: f32,
    pub moral: f32,
    pub creative: f32,
    pub social: f32,
    pub strategic_samples: u32,
    pub moral_samples: u32,
    pub creative_samples: u32,
    pub social_samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerAgencyMetrics {
    /// Always within [0, 100].
    pub overall_agency_score: f32,
    pub choice_quality: ChoiceQuality,
    pub total_choices: u32,
    pub impactful_choices: u32,
    pub meaningful_choices: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchingPath {
    pub id: String,
    pub description: String,
    pub condition: UnlockCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeEnding {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    pub id: String,
    pub phase_order: u32,
    pub prompt: String,
    pub options: Vec<String>,
}

/// A multi-phase narrative unit owned by one character.
///
/// Arcs are values: every change produces a new `Arc` that replaces the old
/// one in the manager's store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub id: ArcId,
    pub character_id: CharacterId,
    pub title: String,
    pub description: String,
    pub archetype: ArcArchetype,
    /// Monotonic sequence number among the owning character's arcs.
    pub order: u32,
    pub status: ArcStatus,
    pub thematic_tags: Vec<String>,
    pub consequence_weight: f32,
    pub choice_influence: f32,
    pub phases: Vec<ArcPhase>,
    pub difficulty: DifficultySettings,
    pub progression: ProgressionState,
    pub agency: PlayerAgencyMetrics,
    pub integration: IntegrationPoints,
    pub recovery: FailureRecoveryConfig,
    pub active_recovery_options: Vec<RecoveryOption>,
    pub branching_paths: Vec<BranchingPath>,
    pub alternative_endings: Vec<AlternativeEnding>,
    pub key_decision_points: Vec<DecisionPoint>,
    /// Opaque content returned by the narrative generator, if any.
    pub narrative_payload: Option<String>,
}

impl Arc {
    /// The default arc every component builds on. All invariants hold for
    /// the returned value: difficulty 5, no phases, zeroed metrics, empty
    /// integration scaffolding.
    pub fn new(id: ArcId, character_id: CharacterId, order: u32, archetype: ArcArchetype) -> Self {
        Self {
            id,
            character_id,
            title: String::new(),
            description: String::new(),
            archetype,
            order,
            status: ArcStatus::Created,
            thematic_tags: Vec::new(),
            consequence_weight: 1.0,
            choice_influence: 0.5,
            phases: Vec::new(),
            difficulty: DifficultySettings::default(),
            progression: ProgressionState::default(),
            agency: PlayerAgencyMetrics::default(),
            integration: IntegrationPoints::default(),
            recovery: FailureRecoveryConfig::default(),
            active_recovery_options: Vec::new(),
            branching_paths: Vec::new(),
            alternative_endings: Vec::new(),
            key_decision_points: Vec::new(),
            narrative_payload: None,
        }
    }

    /// Pull every bounded value back into range: difficulty into [1, 10],
    /// agency and progress into [0, 100], objective progress to at most 100.
    pub fn enforce_bounds(&mut self) {
        let difficulty = &mut self.difficulty;
        difficulty.current_difficulty = clamp_difficulty(difficulty.current_difficulty);
        difficulty.base_difficulty = clamp_difficulty(difficulty.base_difficulty);
        for adjustment in &mut difficulty.history {
            adjustment.from = clamp_difficulty(adjustment.from);
            adjustment.to = clamp_difficulty(adjustment.to);
        }
        self.agency.overall_agency_score = clamp_percent(self.agency.overall_agency_score);
        self.progression.progress_percent = clamp_percent(self.progression.progress_percent);
        for objective in self.phases.iter_mut().flat_map(|p| p.objectives.iter_mut()) {
            objective.progress = objective.progress.min(100);
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ArcStatus::Completed
    }

    pub fn current_phase(&self) -> Option<&ArcPhase> {
        self.phases.get(self.progression.current_phase)
    }

    pub fn current_weight(&self) -> NarrativeWeight {
        self.current_phase()
            .map(|p| p.narrative_weight)
            .unwrap_or(NarrativeWeight::Setup)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.thematic_tags.iter().any(|t| t == tag)
    }

    /// Difficulty with the current phase's modifier applied, clamped.
    pub fn effective_difficulty(&self) -> f32 {
        let modifier = self.current_phase().map(|p| p.difficulty_modifier).unwrap_or(1.0);
        clamp_difficulty(self.difficulty.current_difficulty * modifier)
    }

    pub fn find_objective(&self, objective_id: &str) -> Option<&ArcObjective> {
        self.phases
            .iter()
            .flat_map(|p| p.objectives.iter())
            .find(|o| o.id == objective_id)
    }

    pub fn find_objective_mut(&mut self, objective_id: &str) -> Option<&mut ArcObjective> {
        self.phases
            .iter_mut()
            .flat_map(|p| p.objectives.iter_mut())
            .find(|o| o.id == objective_id)
    }

    pub fn has_made_choice(&self, choice: &str) -> bool {
        self.progression
            .choice_history
            .iter()
            .any(|c| c.choice_id == choice || c.text.eq_ignore_ascii_case(choice))
    }
}
