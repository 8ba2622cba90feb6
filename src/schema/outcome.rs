use serde::{Deserialize, Serialize};

use super::arc::{Arc, ArcArchetype, ArcId};
use super::failure::FailureDetection;
use super::integration::SideEffect;

/// Result of one successful `ArcManager::update_arc` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcUpdate {
    pub arc: Arc,
    pub update_results: Vec<SideEffect>,
    pub failure_detection: FailureDetection,
}

/// JSON-facing shape of an update: `{success, updated_arc?, update_results,
/// failure_detection?, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcUpdateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_arc: Option<Arc>,
    #[serde(default)]
    pub update_results: Vec<SideEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_detection: Option<FailureDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    Experience { amount: u32 },
    SkillPoints { amount: u32 },
    Currency { amount: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextArcSuggestion {
    pub archetype: ArcArchetype,
    pub suggested_difficulty: f32,
    pub reason: String,
}

/// Final numbers recorded when an arc is retired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalArcMetrics {
    pub arc_id: ArcId,
    pub total_duration: u32,
    pub final_agency_score: f32,
    pub final_difficulty: f32,
    pub objectives_completed: u32,
    pub objectives_failed: u32,
    pub efficiency_score: f32,
    pub quality_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcCompletion {
    pub arc: Arc,
    pub summary: String,
    pub final_metrics: FinalArcMetrics,
    pub rewards: Vec<Reward>,
    pub next_arc_suggestions: Vec<NextArcSuggestion>,
}

impl ArcCompletion {
    pub fn total_experience(&self) -> u32 {
        self.rewards
            .iter()
            .map(|r| match r {
                Reward::Experience { amount } => *amount,
                _ => 0,
            })
            .sum()
    }
}
