//! Arc generation: archetype selection, template instantiation, phase
//! scaffolding and quality scoring.
//!
//! Creative text comes from a [`NarrativeGenerator`]. The engine treats its
//! output as opaque; only archetype selection and structure are decided here.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::core::error::ArcError;
use crate::core::template::{pick, ArcTemplate, ArcTemplateSet, TemplateContext, PHASE_COUNT};
use crate::schema::arc::{
    AlternativeEnding, Arc, ArcArchetype, ArcId, ArcObjective, ArcPhase, BranchingPath,
    DecisionPoint, DifficultySettings, NarrativeWeight,
};
use crate::schema::generation::{ArcGenerationInput, ArcGenerationResult, ArcQualityMetrics};
use crate::schema::integration::UnlockCondition;

/// Threat level at which a crisis arc is forced.
pub const CRISIS_THREAT_LEVEL: u8 = 8;
/// Characters at or below this level get a growth arc.
pub const GROWTH_MAX_LEVEL: u32 = 3;

/// Name, weight, difficulty modifier and estimated turns for each phase.
const PHASES: [(&str, NarrativeWeight, f32, u32); PHASE_COUNT] = [
    ("Introduction", NarrativeWeight::Setup, 0.8, 3),
    ("Development", NarrativeWeight::RisingAction, 1.0, 5),
    ("Climax", NarrativeWeight::Climax, 1.3, 4),
    ("Resolution", NarrativeWeight::Resolution, 0.9, 2),
];

/// What the narrative collaborator is asked to write.
pub struct NarrativeRequest<'a> {
    pub archetype: ArcArchetype,
    pub template: &'a ArcTemplate,
    pub context: &'a TemplateContext,
    pub input: &'a ArcGenerationInput,
}

/// Text produced for one arc.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeDraft {
    pub title: String,
    pub description: String,
    /// Anything else the collaborator wants carried on the arc.
    pub payload: Option<String>,
}

/// External collaborator that writes arc text.
pub trait NarrativeGenerator {
    fn generate(&mut self, request: &NarrativeRequest<'_>) -> Result<NarrativeDraft, ArcError>;
}

/// Default collaborator: weighted picks from the template's alternatives.
pub struct TemplateNarrator {
    rng: StdRng,
}

impl TemplateNarrator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NarrativeGenerator for TemplateNarrator {
    fn generate(&mut self, request: &NarrativeRequest<'_>) -> Result<NarrativeDraft, ArcError> {
        let title = pick(&request.template.titles, &mut self.rng).ok_or_else(|| {
            ArcError::Generation(format!("no title alternatives for {}", request.archetype))
        })?;
        let description = pick(&request.template.descriptions, &mut self.rng).ok_or_else(|| {
            ArcError::Generation(format!(
                "no description alternatives for {}",
                request.archetype
            ))
        })?;
        Ok(NarrativeDraft {
            title: title.render(request.context),
            description: description.render(request.context),
            payload: None,
        })
    }
}

/// Reject input that cannot produce a sensible arc.
pub fn validate_input(input: &ArcGenerationInput) -> Result<(), ArcError> {
    if input.series_name.trim().is_empty() {
        return Err(ArcError::Validation("series_name is required".to_string()));
    }
    if input.character.name.trim().is_empty() {
        return Err(ArcError::Validation("character name is required".to_string()));
    }
    if input.world_state.location.trim().is_empty() {
        return Err(ArcError::Validation("world location is required".to_string()));
    }
    if let Some(d) = input.player_preferences.preferred_difficulty {
        if !(1.0..=10.0).contains(&d) {
            return Err(ArcError::Validation(format!(
                "preferred_difficulty must be within [1, 10], got {}",
                d
            )));
        }
    }
    Ok(())
}

/// Rule-based archetype choice. Deterministic; never consumes randomness.
pub fn select_archetype(input: &ArcGenerationInput) -> (ArcArchetype, String) {
    if input.world_state.threat_level >= CRISIS_THREAT_LEVEL {
        return (
            ArcArchetype::Crisis,
            format!(
                "World threat level {} demands a crisis",
                input.world_state.threat_level
            ),
        );
    }
    if input.character.level <= GROWTH_MAX_LEVEL {
        return (
            ArcArchetype::Growth,
            format!(
                "{} is level {} and still growing",
                input.character.name, input.character.level
            ),
        );
    }
    if let Some(style) = input.player_preferences.preferred_style {
        return (
            style.archetype(),
            format!("Player prefers {} stories", format!("{:?}", style).to_lowercase()),
        );
    }
    if let Some(theme) = repeated_theme(input) {
        return (
            ArcArchetype::Introspective,
            format!("The last three arcs all dealt with {}", theme),
        );
    }
    (
        ArcArchetype::Adventure,
        "No strong signal; defaulting to adventure".to_string(),
    )
}

/// A tag shared by each of the last three prior arcs.
fn repeated_theme(input: &ArcGenerationInput) -> Option<&str> {
    let arcs = &input.previous_arcs;
    if arcs.len() < 3 {
        return None;
    }
    let recent = &arcs[arcs.len() - 3..];
    recent[0]
        .thematic_tags
        .iter()
        .find(|tag| recent[1..].iter().all(|a| a.thematic_tags.contains(tag)))
        .map(|s| s.as_str())
}

fn template_context(input: &ArcGenerationInput, template: &ArcTemplate) -> TemplateContext {
    let theme = input
        .player_preferences
        .favored_themes
        .first()
        .or_else(|| template.thematic_tags.first())
        .cloned()
        .unwrap_or_default();
    TemplateContext {
        character_name: input.character.name.clone(),
        character_level: input.character.level,
        location: input.world_state.location.clone(),
        series_name: input.series_name.clone(),
        theme,
        goal: input
            .narrative_goals
            .first()
            .cloned()
            .unwrap_or_else(|| "a forgotten prize".to_string()),
        faction: input
            .world_state
            .active_factions
            .first()
            .cloned()
            .unwrap_or_else(|| "a rival power".to_string()),
    }
}

/// Starting difficulty: capability shifted by the archetype, blended with the
/// player's stated preference when there is one.
pub fn initial_difficulty(input: &ArcGenerationInput, archetype: ArcArchetype) -> f32 {
    let base = input.character.capability() + archetype.difficulty_offset();
    match input.player_preferences.preferred_difficulty {
        Some(preferred) => (base + preferred) / 2.0,
        None => base,
    }
}

/// Build a new arc from the input.
///
/// `id` and `order` are assigned by the caller, which owns the counters.
pub fn generate_arc(
    input: &ArcGenerationInput,
    id: ArcId,
    order: u32,
    templates: &ArcTemplateSet,
    narrator: &mut dyn NarrativeGenerator,
) -> Result<ArcGenerationResult, ArcError> {
    validate_input(input)?;

    let (archetype, reasoning) = select_archetype(input);
    let template = templates
        .get(archetype)
        .ok_or_else(|| ArcError::Generation(format!("no template for {}", archetype)))?;
    let ctx = template_context(input, template);
    debug!(arc_id = %id, archetype = %archetype, "instantiating arc template");

    let draft = narrator.generate(&NarrativeRequest {
        archetype,
        template,
        context: &ctx,
        input,
    })?;

    let mut arc = Arc::new(id, input.character.id, order, archetype);
    arc.title = draft.title;
    arc.description = draft.description;
    arc.narrative_payload = draft.payload;
    arc.consequence_weight = template.consequence_weight;
    arc.choice_influence = template.choice_influence;
    arc.thematic_tags = template.thematic_tags.clone();
    let mut adaptation_notes = Vec::new();
    for theme in &input.player_preferences.favored_themes {
        if !arc.thematic_tags.contains(theme) {
            arc.thematic_tags.push(theme.clone());
            adaptation_notes.push(format!("Wove in favored theme '{}'", theme));
        }
    }

    arc.difficulty = DifficultySettings::new(initial_difficulty(input, archetype));
    if input.player_preferences.preferred_difficulty.is_some() {
        adaptation_notes.push(format!(
            "Blended preferred difficulty into a starting difficulty of {:.1}",
            arc.difficulty.current_difficulty
        ));
    }
    if input.world_state.threat_level >= CRISIS_THREAT_LEVEL && archetype == ArcArchetype::Crisis {
        adaptation_notes.push("Escalated to a crisis because of world threat".to_string());
    }

    arc.phases = PHASES
        .iter()
        .zip(template.objectives.iter())
        .enumerate()
        .map(|(i, ((name, weight, modifier, duration), objective))| {
            let phase_order = i as u32 + 1;
            ArcPhase {
                order: phase_order,
                name: name.to_string(),
                narrative_weight: *weight,
                objectives: vec![ArcObjective::primary(
                    format!("{}:p{}:seed", id, phase_order),
                    objective.render(&ctx),
                )],
                estimated_duration: *duration,
                difficulty_modifier: *modifier,
            }
        })
        .collect();

    arc.branching_paths = template
        .branches
        .iter()
        .map(|b| BranchingPath {
            id: b.id.clone(),
            description: b.description.render(&ctx),
            condition: UnlockCondition::ArcProgress(b.unlock_progress),
        })
        .collect();
    arc.alternative_endings = template
        .endings
        .iter()
        .map(|(ending_id, text)| AlternativeEnding {
            id: ending_id.clone(),
            description: text.render(&ctx),
        })
        .collect();
    arc.key_decision_points = template
        .decisions
        .iter()
        .map(|d| DecisionPoint {
            id: d.id.clone(),
            phase_order: d.phase,
            prompt: d.prompt.render(&ctx),
            options: d.options.clone(),
        })
        .collect();

    let integration_suggestions = integration_suggestions(archetype);
    let quality_metrics = score_quality(&arc, input, integration_suggestions.len());

    if let Some(event) = input.story_state.recent_events.last() {
        adaptation_notes.push(format!("Follows on from: {}", event));
    }

    Ok(ArcGenerationResult {
        arc,
        generation_reasoning: reasoning,
        adaptation_notes,
        integration_suggestions,
        quality_metrics,
    })
}

fn integration_suggestions(archetype: ArcArchetype) -> Vec<String> {
    let suggestions: &[&str] = match archetype {
        ArcArchetype::Crisis => &[
            "Scale combat encounters with arc difficulty",
            "Gate emergency supplies behind arc progress",
            "Track faction standing through the relationship adapter",
        ],
        ArcArchetype::Growth => &[
            "Unlock skills as phases complete",
            "Keep early combat forgiving",
        ],
        ArcArchetype::Adventure => &[
            "Tie key items to exploration milestones",
            "Chain side quests into the main route",
        ],
        ArcArchetype::Mystery => &[
            "Surface clues as key items",
            "Let failed objectives spawn new leads",
        ],
        ArcArchetype::Intrigue => &[
            "Drive the arc from reputation changes",
            "Open branches on pivotal choices",
        ],
        ArcArchetype::Bond => &["Fire emotional beats from relationship thresholds"],
        ArcArchetype::Introspective => &["Reward reflective choices with agency"],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}

fn score_quality(
    arc: &Arc,
    input: &ArcGenerationInput,
    suggestion_count: usize,
) -> ArcQualityMetrics {
    let clamp = |v: f32| v.clamp(1.0, 10.0);
    let branches = arc.branching_paths.len() as f32;
    let endings = arc.alternative_endings.len() as f32;
    let decisions = arc.key_decision_points.len() as f32;

    let narrative_depth = clamp(3.0 + branches + endings + decisions);
    let player_agency_potential = clamp(arc.choice_influence * 10.0 + decisions * 0.5);
    let system_integration = clamp(4.0 + suggestion_count as f32);

    let favored = &input.player_preferences.favored_themes;
    let thematic_consistency = if favored.is_empty() {
        7.0
    } else {
        let overlap = favored
            .iter()
            .filter(|t| arc.thematic_tags.contains(t))
            .count();
        clamp(5.0 + 2.0 * overlap as f32)
    };
    let difficulty_balance =
        clamp(10.0 - (arc.difficulty.current_difficulty - input.character.capability()).abs());
    let replayability = clamp(2.0 + branches * 2.0 + endings);

    let overall = (narrative_depth
        + player_agency_potential
        + system_integration
        + thematic_consistency
        + difficulty_balance
        + replayability)
        / 6.0;

    ArcQualityMetrics {
        narrative_depth,
        player_agency_potential,
        system_integration,
        thematic_consistency,
        difficulty_balance,
        replayability,
        overall,
    }
}
