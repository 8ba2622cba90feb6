//! The arc manager: owns the arc store and the global metrics, and routes
//! every lifecycle operation through generation, detection, recovery,
//! support and the integration adapters.
//!
//! One manager per game session. Every operation works on a copy of the
//! stored arc and only writes back once the whole operation has succeeded.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::analytics::{arc_analytics, efficiency_score, quality_score, ArcAnalytics, GlobalArcMetrics};
use crate::core::config::{EngineConfig, RewardConfig};
use crate::core::detection::detect_arc_failures;
use crate::core::difficulty::{adapt_difficulty, adjust_arc_difficulty};
use crate::core::error::ArcError;
use crate::core::generation::{generate_arc, NarrativeGenerator, TemplateNarrator, GROWTH_MAX_LEVEL};
use crate::core::integration::inventory::evaluate_inventory_unlocks;
use crate::core::integration::progression::evaluate_progression_gates;
use crate::core::integration::{adapter_for, default_integration_points};
use crate::core::progress::{advance_phase, record_choice, record_turn, recompute_progress, start_current_phase};
use crate::core::recovery::select_recovery_options;
use crate::core::store::ArcStore;
use crate::core::support::{update_adaptive_support, ArchetypeObservation, PatternLearner, SupportStrategy};
use crate::core::template::ArcTemplateSet;
use crate::schema::arc::{clamp_difficulty, Arc, ArcArchetype, ArcId, ArcStatus, CharacterId, Milestone};
use crate::schema::character::CharacterSnapshot;
use crate::schema::event::UpdateEvent;
use crate::schema::failure::{AdaptiveSupport, FailureDetection, FailureRecoveryConfig};
use crate::schema::generation::{ArcGenerationInput, ArcGenerationResult, PriorArc};
use crate::schema::integration::SideEffect;
use crate::schema::outcome::{
    ArcCompletion, ArcUpdate, ArcUpdateResponse, FinalArcMetrics, NextArcSuggestion, Reward,
};
use crate::schema::world::WorldStateSnapshot;

/// How many next-arc suggestions a completion carries.
const MAX_SUGGESTIONS: usize = 3;

pub struct ArcManager {
    config: EngineConfig,
    templates: ArcTemplateSet,
    narrator: Box<dyn NarrativeGenerator>,
    strategy: Box<dyn SupportStrategy>,
    store: ArcStore,
    metrics: GlobalArcMetrics,
}

/// Builder for constructing an `ArcManager`.
pub struct ArcManagerBuilder {
    seed: u64,
    config_path: Option<String>,
    templates_path: Option<String>,
    config: Option<EngineConfig>,
    templates: Option<ArcTemplateSet>,
    narrator: Option<Box<dyn NarrativeGenerator>>,
    strategy: Option<Box<dyn SupportStrategy>>,
}

/// Everything needed to resume a session. Plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    pub active: Vec<Arc>,
    pub history: Vec<Arc>,
    pub metrics: GlobalArcMetrics,
    pub next_id: u64,
    /// What the support strategy has learned from completed arcs. Older
    /// snapshots without it restore an untrained strategy.
    #[serde(default)]
    pub learned: Vec<ArchetypeObservation>,
}

impl ManagerSnapshot {
    pub fn to_ron(&self) -> Result<String, ArcError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ArcError::Snapshot(e.to_string()))
    }

    pub fn from_ron(input: &str) -> Result<ManagerSnapshot, ArcError> {
        ron::from_str(input).map_err(|e| ArcError::Snapshot(e.to_string()))
    }
}

impl ArcManager {
    pub fn builder() -> ArcManagerBuilder {
        ArcManagerBuilder {
            seed: 0,
            config_path: None,
            templates_path: None,
            config: None,
            templates: None,
            narrator: None,
            strategy: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn templates(&self) -> &ArcTemplateSet {
        &self.templates
    }

    /// Generate, enhance and register a new arc.
    pub fn create_arc(&mut self, input: &ArcGenerationInput) -> Result<ArcGenerationResult, ArcError> {
        let id = self.store.peek_id();
        let order = self.store.peek_order(input.character.id);
        let mut result = generate_arc(input, id, order, &self.templates, self.narrator.as_mut())
            .map_err(|err| {
                warn!(arc_id = %id, error = %err, "arc generation failed");
                err
            })?;

        result.arc = self.enhance(result.arc, &input.character)?;
        self.metrics.record_created(result.arc.archetype);
        self.store.insert(result.arc.clone());

        info!(
            arc_id = %id,
            archetype = %result.arc.archetype,
            order,
            difficulty = result.arc.difficulty.current_difficulty,
            "arc created"
        );
        Ok(result)
    }

    /// Attach recovery, support and integration scaffolding and activate the
    /// arc's first phase.
    fn enhance(&self, mut arc: Arc, character: &CharacterSnapshot) -> Result<Arc, ArcError> {
        arc.recovery = FailureRecoveryConfig {
            enabled: true,
            thresholds: self.config.thresholds.clone(),
            adaptive_support: AdaptiveSupport {
                support_level: self.config.support.initial_level,
                effectiveness_tracking: Vec::new(),
            },
            recoveries_offered: 0,
        };
        arc.integration = default_integration_points(&arc, character);
        if !arc.status.can_transition_to(ArcStatus::Active) {
            return Err(ArcError::Generation(format!(
                "{} cannot be activated from {:?}",
                arc.id, arc.status
            )));
        }
        arc.status = ArcStatus::Active;
        start_current_phase(&mut arc);
        Ok(arc)
    }

    pub fn get_arc(&self, id: ArcId) -> Option<&Arc> {
        self.store.get(id).or_else(|| self.store.find_in_history(id))
    }

    pub fn active_arcs(&self) -> Vec<&Arc> {
        self.store.active()
    }

    pub fn history(&self) -> &[Arc] {
        self.store.history()
    }

    /// A character's arcs in the shape generation input expects.
    pub fn previous_arcs(&self, character: CharacterId) -> Vec<PriorArc> {
        self.store
            .arcs_for(character)
            .into_iter()
            .map(PriorArc::from)
            .collect()
    }

    /// Route one turn's event through the arc. On error the stored arc is
    /// left exactly as it was.
    pub fn update_arc(
        &mut self,
        id: ArcId,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
        turn: u64,
        event: &UpdateEvent,
    ) -> Result<ArcUpdate, ArcError> {
        match self.process_update(id, character, world, turn, event) {
            Ok(update) => {
                self.store.replace(update.arc.clone())?;
                let recoveries = update
                    .update_results
                    .iter()
                    .filter(|e| matches!(e, SideEffect::RecoveryOffered { .. }))
                    .count();
                self.metrics
                    .record_update(update.failure_detection.failures.len(), recoveries);
                debug!(
                    arc_id = %id,
                    turn_id = turn,
                    update_type = event.name(),
                    effects = update.update_results.len(),
                    failures = update.failure_detection.failures.len(),
                    "arc updated"
                );
                Ok(update)
            }
            Err(err) => {
                self.metrics.record_failed_update();
                warn!(arc_id = %id, turn_id = turn, update_type = event.name(), error = %err, "arc update rejected");
                Err(err)
            }
        }
    }

    /// `update_arc` flattened into the `{success, ...}` response shape.
    pub fn update_arc_response(
        &mut self,
        id: ArcId,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
        turn: u64,
        event: &UpdateEvent,
    ) -> ArcUpdateResponse {
        match self.update_arc(id, character, world, turn, event) {
            Ok(update) => ArcUpdateResponse {
                success: true,
                updated_arc: Some(update.arc),
                update_results: update.update_results,
                failure_detection: Some(update.failure_detection),
                error: None,
                error_kind: None,
            },
            Err(err) => ArcUpdateResponse {
                success: false,
                updated_arc: None,
                update_results: Vec::new(),
                failure_detection: None,
                error: Some(err.to_string()),
                error_kind: Some(err.kind().to_string()),
            },
        }
    }

    fn process_update(
        &self,
        id: ArcId,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
        turn: u64,
        event: &UpdateEvent,
    ) -> Result<ArcUpdate, ArcError> {
        let stored = self.store.get(id).ok_or(ArcError::NotFound(id))?;
        let mut arc = stored.clone();
        record_turn(&mut arc, turn);
        // The update's turn id is authoritative; adapters and recovery read
        // it through the world view.
        let world = &WorldStateSnapshot {
            turn,
            ..world.clone()
        };

        let mut effects = Vec::new();
        let mut arc = match event {
            UpdateEvent::PlayerChoice(choice) => {
                effects.push(record_choice(&mut arc, choice, turn));
                arc
            }
            UpdateEvent::SupportResponse(response) => {
                let update = update_adaptive_support(
                    &arc,
                    &response.support_type,
                    response.effectiveness,
                    &self.config.support,
                );
                if update.level_changed() {
                    info!(arc_id = %id, from = ?update.previous_level, to = ?update.level, "support level changed");
                    effects.push(SideEffect::SupportLevelChanged {
                        from: update.previous_level,
                        to: update.level,
                    });
                }
                update.arc
            }
            other => {
                let subsystem = other.subsystem();
                let adapter = adapter_for(subsystem).ok_or(ArcError::Integration {
                    adapter: subsystem.name(),
                    event: other.name(),
                })?;
                let out = adapter.integrate(&arc, other, character, world)?;
                effects.extend(out.side_effects);
                out.arc
            }
        };

        if let Some(effect) = advance_phase(&mut arc, turn) {
            info!(arc_id = %id, turn_id = turn, "phase advanced");
            effects.push(effect);
        }
        recompute_progress(&mut arc);
        effects.extend(evaluate_progression_gates(&mut arc, character));
        effects.extend(evaluate_inventory_unlocks(&mut arc, character));

        let detection = self.detect(&arc, character, world);
        if arc.recovery.enabled && detection.has_failures() {
            let options = select_recovery_options(
                &detection.failures,
                &arc,
                character,
                world,
                arc.recovery.adaptive_support.support_level,
            );
            arc.recovery.recoveries_offered += options.len() as u32;
            effects.extend(options.iter().map(|o| SideEffect::RecoveryOffered {
                option_id: o.id.clone(),
                recovery_type: o.recovery_type.clone(),
            }));
            arc.active_recovery_options = options;
        } else {
            arc.active_recovery_options.clear();
        }

        if arc.difficulty.adaptive_scaling {
            let (next, effect) =
                adapt_difficulty(&arc, &detection, character, &self.config.difficulty, turn);
            arc = next;
            effects.extend(effect);
        }

        effects.extend(
            self.strategy
                .hints(&arc, &detection)
                .into_iter()
                .map(|text| SideEffect::Hint { text }),
        );
        arc.enforce_bounds();

        Ok(ArcUpdate {
            arc,
            update_results: effects,
            failure_detection: detection,
        })
    }

    fn detect(
        &self,
        arc: &Arc,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> FailureDetection {
        let thresholds = if arc.recovery.thresholds.is_empty() {
            &self.config.thresholds
        } else {
            &arc.recovery.thresholds
        };
        detect_arc_failures(arc, character, world, thresholds, &self.config)
    }

    /// Run detection against the stored arc without changing anything.
    pub fn detect_arc_failures(
        &self,
        id: ArcId,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> Result<FailureDetection, ArcError> {
        let arc = self.store.get(id).ok_or(ArcError::NotFound(id))?;
        Ok(self.detect(arc, character, world))
    }

    /// Areas where the character looks under-equipped for an active arc.
    pub fn skill_gaps(&self, id: ArcId, character: &CharacterSnapshot) -> Result<Vec<String>, ArcError> {
        let arc = self.store.get(id).ok_or(ArcError::NotFound(id))?;
        Ok(self.strategy.skill_gaps(arc, character))
    }

    /// Retire an arc: final metrics, rewards, history and suggestions.
    pub fn complete_arc(
        &mut self,
        id: ArcId,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
        summary: &str,
    ) -> Result<ArcCompletion, ArcError> {
        let stored = match self.store.get(id) {
            Some(arc) => arc,
            None if self.store.find_in_history(id).is_some() => {
                return Err(ArcError::AlreadyCompleted(id))
            }
            None => return Err(ArcError::NotFound(id)),
        };

        let mut arc = stored.clone();
        for target in [ArcStatus::Completing, ArcStatus::Completed] {
            if !arc.status.can_transition_to(target) {
                return Err(ArcError::AlreadyCompleted(id));
            }
            arc.status = target;
        }
        recompute_progress(&mut arc);
        arc.active_recovery_options.clear();
        arc.progression.milestones.push(Milestone {
            id: format!("{}:complete", arc.id),
            description: summary.to_string(),
            phase_order: arc.current_phase().map(|p| p.order).unwrap_or(0),
            // Never earlier than the last update the arc saw.
            reached_turn: arc.progression.last_turn.map_or(world.turn, |t| t.max(world.turn)),
        });

        let final_metrics = self.final_metrics(&arc);
        let rewards = completion_rewards(&final_metrics, &self.config.rewards);

        self.store.retire(arc.clone())?;
        self.strategy
            .observe_completion(&arc, final_metrics.final_agency_score);
        self.metrics.record_completion(
            final_metrics.total_duration,
            final_metrics.final_agency_score,
            final_metrics.quality_score,
        );
        let next_arc_suggestions = next_arc_suggestions(
            &arc,
            character,
            &self.templates,
            self.strategy.preferred_archetype(),
        );

        info!(
            arc_id = %id,
            turns = final_metrics.total_duration,
            agency = final_metrics.final_agency_score,
            rewards = rewards.len(),
            "arc completed"
        );
        Ok(ArcCompletion {
            arc,
            summary: summary.to_string(),
            final_metrics,
            rewards,
            next_arc_suggestions,
        })
    }

    fn final_metrics(&self, arc: &Arc) -> FinalArcMetrics {
        let efficiency = efficiency_score(arc, &self.config.metrics);
        let agency = arc.agency.overall_agency_score;
        FinalArcMetrics {
            arc_id: arc.id,
            total_duration: arc.progression.turns_elapsed,
            final_agency_score: agency,
            final_difficulty: arc.difficulty.current_difficulty,
            objectives_completed: arc.progression.objectives_completed,
            objectives_failed: arc.progression.objectives_failed,
            efficiency_score: efficiency,
            quality_score: quality_score(efficiency, agency),
        }
    }

    /// Shift an active arc's difficulty. The result is clamped to [1, 10].
    pub fn adjust_arc_difficulty(&mut self, id: ArcId, delta: f32, reason: &str) -> Result<Arc, ArcError> {
        let arc = self.store.get(id).ok_or(ArcError::NotFound(id))?;
        let (next, effect) = adjust_arc_difficulty(arc, delta, reason, arc.progression.last_turn);
        if let Some(SideEffect::DifficultyAdjusted { from, to, .. }) = &effect {
            info!(arc_id = %id, from, to, reason, "difficulty adjusted");
        }
        self.store.replace(next.clone())?;
        Ok(next)
    }

    pub fn get_arc_analytics(&self, id: ArcId) -> Result<ArcAnalytics, ArcError> {
        let arc = self.get_arc(id).ok_or(ArcError::NotFound(id))?;
        Ok(arc_analytics(arc, &self.config.metrics))
    }

    pub fn get_global_arc_metrics(&self) -> GlobalArcMetrics {
        self.metrics
            .with_arcs(&self.store.active(), self.store.history())
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let (active, history, next_id) = self.store.to_parts();
        ManagerSnapshot {
            active,
            history,
            metrics: self.metrics.clone(),
            next_id,
            learned: self.strategy.observations(),
        }
    }

    /// Replace the session state with a snapshot. Templates, config and
    /// collaborators are kept; the strategy is retrained from the snapshot's
    /// observations. Out-of-range persisted values are clamped.
    pub fn restore(&mut self, snapshot: ManagerSnapshot) {
        info!(
            active = snapshot.active.len(),
            history = snapshot.history.len(),
            "restoring arc manager snapshot"
        );
        self.store = ArcStore::from_parts(snapshot.active, snapshot.history, snapshot.next_id);
        self.metrics = snapshot.metrics;
        self.strategy.restore_observations(snapshot.learned);
    }
}

pub fn completion_rewards(metrics: &FinalArcMetrics, config: &RewardConfig) -> Vec<Reward> {
    let experience = config.base_experience
        + (config.experience_per_difficulty as f32 * metrics.final_difficulty).round() as u32;
    let mut rewards = vec![Reward::Experience { amount: experience }];
    if metrics.final_agency_score > config.agency_bonus_threshold {
        rewards.push(Reward::SkillPoints {
            amount: config.skill_points,
        });
    }
    if metrics.total_duration < config.fast_completion_turns {
        rewards.push(Reward::Currency {
            amount: config.currency_bonus,
        });
    }
    rewards
}

/// Rank archetypes for the character's next arc by shared themes with the
/// finished arc and by the strategy's learned preference.
pub fn next_arc_suggestions(
    arc: &Arc,
    character: &CharacterSnapshot,
    templates: &ArcTemplateSet,
    preferred: Option<ArcArchetype>,
) -> Vec<NextArcSuggestion> {
    let agency = arc.agency.overall_agency_score;
    let step = if agency > 70.0 {
        0.5
    } else if agency < 40.0 {
        -0.5
    } else {
        0.0
    };
    let base = (arc.difficulty.current_difficulty + character.capability()) / 2.0 + step;

    let mut scored: Vec<(f32, NextArcSuggestion)> = Vec::new();
    for archetype in ArcArchetype::ALL {
        if archetype == arc.archetype {
            continue;
        }
        if archetype == ArcArchetype::Growth && character.level > GROWTH_MAX_LEVEL {
            continue;
        }
        let mut score = 0.0;
        let mut reasons = Vec::new();
        if let Some(template) = templates.get(archetype) {
            let shared: Vec<&String> = template
                .thematic_tags
                .iter()
                .filter(|t| arc.has_tag(t))
                .collect();
            if let Some(first) = shared.first() {
                score += shared.len() as f32;
                reasons.push(format!("continues the {} thread", first));
            }
        }
        if preferred == Some(archetype) {
            score += 1.5;
            reasons.push("matches the arcs this player engaged with most".to_string());
        }
        if reasons.is_empty() {
            reasons.push("a change of pace".to_string());
        }
        scored.push((
            score,
            NextArcSuggestion {
                archetype,
                suggested_difficulty: clamp_difficulty(base + archetype.difficulty_offset()),
                reason: reasons.join("; "),
            },
        ));
    }

    // Stable sort keeps archetype order for ties.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, s)| s)
        .collect()
}

impl ArcManagerBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load the engine config from a RON file at build time.
    pub fn config_file(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Load extra arc templates from a RON file; they override the builtin
    /// catalog per archetype.
    pub fn templates_file(mut self, path: &str) -> Self {
        self.templates_path = Some(path.to_string());
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Provide templates directly (for testing without files).
    pub fn with_templates(mut self, templates: ArcTemplateSet) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn with_narrator(mut self, narrator: Box<dyn NarrativeGenerator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn SupportStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<ArcManager, ArcError> {
        let config = match (self.config, &self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(Path::new(path))?,
            (None, None) => EngineConfig::default(),
        };
        config.validate()?;

        let mut templates = ArcTemplateSet::builtin()?;
        if let Some(ref path) = self.templates_path {
            templates.merge(ArcTemplateSet::load_from_ron(Path::new(path))?);
        }
        if let Some(extra) = self.templates {
            templates.merge(extra);
        }
        templates.validate_complete()?;

        let narrator = self
            .narrator
            .unwrap_or_else(|| Box::new(TemplateNarrator::new(self.seed)));
        let strategy = self
            .strategy
            .unwrap_or_else(|| Box::new(PatternLearner::new()));

        debug!(seed = self.seed, templates = templates.len(), "arc manager built");
        Ok(ArcManager {
            config,
            templates,
            narrator,
            strategy,
            store: ArcStore::new(),
            metrics: GlobalArcMetrics::default(),
        })
    }
}
