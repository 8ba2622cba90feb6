use serde::{Deserialize, Serialize};

use super::arc::{Arc, ArcArchetype};
use super::character::CharacterSnapshot;
use super::world::{StoryState, WorldStateSnapshot};

/// The storytelling flavor a player has said they enjoy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeStyle {
    Action,
    Exploration,
    Mystery,
    Political,
    Romance,
    Reflective,
}

impl NarrativeStyle {
    pub fn archetype(&self) -> ArcArchetype {
        match self {
            Self::Action | Self::Exploration => ArcArchetype::Adventure,
            Self::Mystery => ArcArchetype::Mystery,
            Self::Political => ArcArchetype::Intrigue,
            Self::Romance => ArcArchetype::Bond,
            Self::Reflective => ArcArchetype::Introspective,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerPreferences {
    #[serde(default)]
    pub preferred_style: Option<NarrativeStyle>,
    /// 1..=10 when set.
    #[serde(default)]
    pub preferred_difficulty: Option<f32>,
    #[serde(default)]
    pub favored_themes: Vec<String>,
}

/// What the generator needs to know about an arc the character already had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorArc {
    pub title: String,
    pub archetype: ArcArchetype,
    pub thematic_tags: Vec<String>,
}

impl From<&Arc> for PriorArc {
    fn from(arc: &Arc) -> Self {
        Self {
            title: arc.title.clone(),
            archetype: arc.archetype,
            thematic_tags: arc.thematic_tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcGenerationInput {
    pub series_name: String,
    #[serde(default)]
    pub series_context: String,
    pub character: CharacterSnapshot,
    #[serde(default)]
    pub story_state: StoryState,
    #[serde(default)]
    pub previous_arcs: Vec<PriorArc>,
    #[serde(default)]
    pub player_preferences: PlayerPreferences,
    pub world_state: WorldStateSnapshot,
    #[serde(default)]
    pub narrative_goals: Vec<String>,
}

/// Scores in [1, 10] describing a freshly generated arc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ArcQualityMetrics {
    pub narrative_depth: f32,
    pub player_agency_potential: f32,
    pub system_integration: f32,
    pub thematic_consistency: f32,
    pub difficulty_balance: f32,
    pub replayability: f32,
    pub overall: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcGenerationResult {
    pub arc: Arc,
    pub generation_reasoning: String,
    pub adaptation_notes: Vec<String>,
    pub integration_suggestions: Vec<String>,
    pub quality_metrics: ArcQualityMetrics,
}
