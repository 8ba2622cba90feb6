/// Arc manager integration tests: lifecycle, storage, errors and snapshots.

use arc_engine::core::error::ArcError;
use arc_engine::core::generation::{NarrativeDraft, NarrativeGenerator, NarrativeRequest};
use arc_engine::core::manager::{ArcManager, ManagerSnapshot};
use arc_engine::core::script::{run_script, SessionScript};
use arc_engine::schema::arc::{
    ArcArchetype, ArcId, ArcStatus, CharacterId, ChoiceCategory, ChoiceImpact, ObjectiveStatus,
};
use arc_engine::schema::character::CharacterSnapshot;
use arc_engine::schema::event::{
    CombatEvent, PlayerChoice, ProgressionEvent, QuestEvent, QuestEventKind, UpdateEvent,
};
use arc_engine::schema::generation::{ArcGenerationInput, NarrativeStyle, PlayerPreferences};
use arc_engine::schema::integration::{CombatOutcome, ProgressionGate, SideEffect, UnlockCondition};
use arc_engine::schema::outcome::Reward;
use arc_engine::schema::world::{StoryState, WorldStateSnapshot};
use std::path::Path;

fn input(level: u32, threat: u8) -> ArcGenerationInput {
    let mut world = WorldStateSnapshot::new(0, "Saltmarsh");
    world.threat_level = threat;
    ArcGenerationInput {
        series_name: "Saltmarsh Tales".to_string(),
        series_context: String::new(),
        character: CharacterSnapshot::new(CharacterId(1), "Tamsin", level),
        story_state: StoryState::default(),
        previous_arcs: Vec::new(),
        player_preferences: PlayerPreferences::default(),
        world_state: world,
        narrative_goals: Vec::new(),
    }
}

fn complete(objective_id: String) -> UpdateEvent {
    UpdateEvent::QuestEvent(QuestEvent {
        quest_id: "main".to_string(),
        kind: QuestEventKind::ObjectiveCompleted { objective_id },
    })
}

fn manager() -> ArcManager {
    ArcManager::builder().seed(42).build().unwrap()
}

#[test]
fn created_arc_is_active_with_first_phase_started() {
    let mut manager = manager();
    let result = manager.create_arc(&input(5, 3)).unwrap();
    let arc = &result.arc;

    assert_eq!(arc.id, ArcId(1));
    assert_eq!(arc.order, 1);
    assert_eq!(arc.status, ArcStatus::Active);
    assert_eq!(arc.archetype, ArcArchetype::Adventure);
    assert_eq!(arc.phases.len(), 4);
    assert_eq!(arc.phases[0].objectives[0].status, ObjectiveStatus::InProgress);
    assert_eq!(arc.phases[1].objectives[0].status, ObjectiveStatus::NotStarted);
    assert_eq!(arc.recovery.thresholds.len(), 6);
    assert!(!arc.integration.progression.gates.is_empty());
    assert!(!arc.title.is_empty());
    assert!(result.quality_metrics.overall >= 1.0 && result.quality_metrics.overall <= 10.0);
    assert_eq!(manager.get_global_arc_metrics().arcs_created, 1);
}

#[test]
fn threat_nine_always_yields_crisis() {
    let mut manager = manager();
    let mut crisis_input = input(1, 9);
    crisis_input.player_preferences = PlayerPreferences {
        preferred_style: Some(NarrativeStyle::Romance),
        preferred_difficulty: Some(2.0),
        favored_themes: vec!["romance".to_string()],
    };
    let result = manager.create_arc(&crisis_input).unwrap();
    assert_eq!(result.arc.archetype, ArcArchetype::Crisis);
    assert_eq!(result.arc.archetype.as_str(), "crisis_arc");
}

#[test]
fn same_seed_same_arc() {
    let a = manager().create_arc(&input(5, 3)).unwrap();
    let b = manager().create_arc(&input(5, 3)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn phases_advance_one_at_a_time_to_completion() {
    let mut manager = manager();
    let arc = manager.create_arc(&input(5, 3)).unwrap().arc;
    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);

    for phase in 1..=4u32 {
        let world = WorldStateSnapshot::new(phase as u64, "Saltmarsh");
        let update = manager
            .update_arc(
                arc.id,
                &character,
                &world,
                phase as u64,
                &complete(format!("{}:p{}:seed", arc.id, phase)),
            )
            .unwrap();
        let expected_phase = (phase as usize).min(3);
        assert_eq!(update.arc.progression.current_phase, expected_phase);
        assert_eq!(update.arc.progression.progress_percent, 25.0 * phase as f32);
        let advanced = update
            .update_results
            .iter()
            .filter(|e| matches!(e, SideEffect::PhaseAdvanced { .. }))
            .count();
        assert_eq!(advanced, if phase < 4 { 1 } else { 0 });
    }

    let stored = manager.get_arc(arc.id).unwrap();
    assert_eq!(stored.progression.milestones.len(), 3);
    assert_eq!(stored.progression.objectives_completed, 4);
    assert_eq!(stored.progression.turns_elapsed, 4);
    assert!(stored.integration.progression.gates.iter().all(|g| g.unlocked));
}

#[test]
fn completion_moves_arc_to_history_exactly_once() {
    let mut manager = manager();
    let arc = manager.create_arc(&input(5, 3)).unwrap().arc;
    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);
    let world = WorldStateSnapshot::new(3, "Saltmarsh");

    let completion = manager
        .complete_arc(arc.id, &character, &world, "The marsh lights fade")
        .unwrap();
    assert_eq!(completion.arc.status, ArcStatus::Completed);
    assert!(manager.active_arcs().is_empty());
    assert_eq!(manager.history().len(), 1);
    assert_eq!(manager.history()[0].id, arc.id);

    let again = manager.complete_arc(arc.id, &character, &world, "again");
    assert!(matches!(again, Err(ArcError::AlreadyCompleted(_))));
    assert_eq!(manager.history().len(), 1);

    // Completed arcs stay readable but no longer accept updates.
    assert!(manager.get_arc_analytics(arc.id).is_ok());
    let update = manager.update_arc(arc.id, &character, &world, 4, &complete("x".to_string()));
    assert!(matches!(update, Err(ArcError::NotFound(_))));

    let metrics = manager.get_global_arc_metrics();
    assert_eq!(metrics.arcs_completed, 1);
    assert_eq!(metrics.active_arcs, 0);
    assert_eq!(metrics.failed_updates, 1);
}

#[test]
fn second_arc_gets_next_order() {
    let mut manager = manager();
    let first = manager.create_arc(&input(5, 3)).unwrap().arc;
    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);
    manager
        .complete_arc(first.id, &character, &WorldStateSnapshot::new(2, "Saltmarsh"), "done")
        .unwrap();

    let mut next_input = input(5, 3);
    next_input.previous_arcs = manager.previous_arcs(CharacterId(1));
    let second = manager.create_arc(&next_input).unwrap().arc;
    assert_eq!(second.order, 2);
    assert_eq!(second.id, ArcId(2));
}

#[test]
fn unknown_arc_update_is_reported_not_thrown() {
    let mut manager = manager();
    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);
    let world = WorldStateSnapshot::new(1, "Saltmarsh");
    let response =
        manager.update_arc_response(ArcId(99), &character, &world, 1, &complete("x".to_string()));
    assert!(!response.success);
    assert!(response.updated_arc.is_none());
    assert_eq!(response.error_kind.as_deref(), Some("not_found"));
    assert_eq!(response.error.as_deref(), Some("arc not found: arc-99"));
}

#[test]
fn invalid_input_registers_nothing() {
    let mut manager = manager();
    let mut bad = input(5, 3);
    bad.series_name = "  ".to_string();
    let err = manager.create_arc(&bad).unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert!(manager.active_arcs().is_empty());
    assert_eq!(manager.get_global_arc_metrics().arcs_created, 0);
}

struct SilentNarrator;

impl NarrativeGenerator for SilentNarrator {
    fn generate(&mut self, _request: &NarrativeRequest<'_>) -> Result<NarrativeDraft, ArcError> {
        Err(ArcError::Generation("narrator unavailable".to_string()))
    }
}

#[test]
fn narrator_failure_registers_nothing() {
    let mut manager = ArcManager::builder()
        .with_narrator(Box::new(SilentNarrator))
        .build()
        .unwrap();
    let err = manager.create_arc(&input(5, 3)).unwrap_err();
    assert!(matches!(err, ArcError::Generation(_)));
    assert!(manager.active_arcs().is_empty());

    // The failed attempt does not burn an id.
    let mut working = ArcManager::builder().build().unwrap();
    assert_eq!(working.create_arc(&input(5, 3)).unwrap().arc.id, ArcId(1));
}

#[test]
fn adjust_difficulty_is_clamped() {
    let mut manager = manager();
    let arc = manager.create_arc(&input(5, 3)).unwrap().arc;
    let raised = manager.adjust_arc_difficulty(arc.id, 50.0, "testing").unwrap();
    assert_eq!(raised.difficulty.current_difficulty, 10.0);
    assert_eq!(raised.difficulty.history.len(), 1);
    let lowered = manager.adjust_arc_difficulty(arc.id, -50.0, "testing").unwrap();
    assert_eq!(lowered.difficulty.current_difficulty, 1.0);
    assert_eq!(manager.get_arc(arc.id).unwrap().difficulty.current_difficulty, 1.0);
}

#[test]
fn scenario_script_plays_through() {
    let script = SessionScript::load_from_ron(Path::new("tests/fixtures/scenario.ron")).unwrap();
    let mut manager = ArcManager::builder()
        .seed(7)
        .config_file("tests/fixtures/engine.ron")
        .build()
        .unwrap();
    let report = run_script(&mut manager, &script).unwrap();

    assert_eq!(report.generation.arc.archetype, ArcArchetype::Mystery);
    assert!(report.generation.arc.has_tag("memory"));
    assert_eq!(report.turns.len(), 11);
    assert!(report.turns.iter().all(|t| t.response.success));

    let beat = report.turns[4]
        .response
        .update_results
        .iter()
        .any(|e| matches!(e, SideEffect::EmotionalBeat { beat_id, .. } if beat_id == "arc-1:bond-deepens"));
    assert!(beat);

    let completion = report.completion.unwrap();
    assert_eq!(completion.final_metrics.total_duration, 11);
    assert!(completion.final_metrics.final_agency_score > 70.0);
    assert!(completion.rewards.contains(&Reward::SkillPoints { amount: 2 }));
    assert!(completion.rewards.contains(&Reward::Currency { amount: 200 }));
    assert!(!completion.next_arc_suggestions.is_empty());
    assert!(completion
        .next_arc_suggestions
        .iter()
        .all(|s| s.archetype != ArcArchetype::Mystery));
}

#[test]
fn snapshot_round_trips_through_ron() {
    let script = SessionScript::load_from_ron(Path::new("tests/fixtures/scenario.ron")).unwrap();
    let mut short = script.clone();
    short.turns.truncate(5);
    short.summary.clear();

    let mut manager = manager();
    let report = run_script(&mut manager, &short).unwrap();
    let id = report.generation.arc.id;

    let snapshot = manager.snapshot();
    let text = snapshot.to_ron().unwrap();
    let parsed = ManagerSnapshot::from_ron(&text).unwrap();
    assert_eq!(parsed, snapshot);

    let mut restored = ArcManager::builder().seed(42).build().unwrap();
    restored.restore(parsed);
    assert_eq!(restored.get_arc(id), manager.get_arc(id));
    assert_eq!(
        restored.get_global_arc_metrics(),
        manager.get_global_arc_metrics()
    );

    // The restored session keeps counting from where it left off.
    let next = restored.create_arc(&input(5, 3)).unwrap().arc;
    assert_eq!(next.id, ArcId(2));
}

#[test]
fn restored_difficulty_is_clamped_and_stays_clamped() {
    let mut manager = manager();
    let id = manager.create_arc(&input(5, 3)).unwrap().arc.id;
    let mut snapshot = manager.snapshot();
    snapshot.active[0].difficulty.current_difficulty = 42.0;
    snapshot.active[0].difficulty.adaptive_scaling = false;

    let mut restored = ArcManager::builder().seed(42).build().unwrap();
    restored.restore(snapshot);
    assert_eq!(restored.get_arc(id).unwrap().difficulty.current_difficulty, 10.0);

    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);
    let choice = UpdateEvent::PlayerChoice(PlayerChoice {
        choice_id: "ford".to_string(),
        text: "Wade across the ford".to_string(),
        category: ChoiceCategory::Strategic,
        impact: ChoiceImpact::Moderate,
        quality: 0.7,
    });
    let update = restored
        .update_arc(id, &character, &WorldStateSnapshot::new(1, "Saltmarsh"), 1, &choice)
        .unwrap();
    assert!(update.arc.difficulty.current_difficulty <= 10.0);
    assert!(restored.get_arc(id).unwrap().difficulty.current_difficulty <= 10.0);
}

#[test]
fn level_gate_opened_by_level_up_stays_open() {
    let mut manager = manager();
    let id = manager.create_arc(&input(5, 3)).unwrap().arc.id;
    let mut snapshot = manager.snapshot();
    snapshot.active[0].integration.progression.gates.push(ProgressionGate {
        id: "veteran".to_string(),
        description: "Reach level 7".to_string(),
        condition: UnlockCondition::CharacterLevel(7),
        unlocked: false,
    });
    manager.restore(snapshot);

    // The caller's snapshot still shows the level before the level-up.
    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);
    let level_up = UpdateEvent::ProgressionEvent(ProgressionEvent {
        experience_gained: 500,
        new_level: Some(7),
        skill_used: None,
    });
    let update = manager
        .update_arc(id, &character, &WorldStateSnapshot::new(1, "Saltmarsh"), 1, &level_up)
        .unwrap();
    assert!(update.update_results.contains(&SideEffect::GateUnlocked {
        gate_id: "veteran".to_string()
    }));

    let veteran = |manager: &ArcManager| {
        manager
            .get_arc(id)
            .unwrap()
            .integration
            .progression
            .gates
            .iter()
            .find(|g| g.id == "veteran")
            .map(|g| g.unlocked)
    };
    assert_eq!(veteran(&manager), Some(true));

    manager
        .update_arc(id, &character, &WorldStateSnapshot::new(2, "Saltmarsh"), 2, &complete("none".to_string()))
        .ok();
    assert_eq!(veteran(&manager), Some(true));
}

#[test]
fn update_turn_wins_over_world_turn() {
    let mut manager = manager();
    let id = manager.create_arc(&input(5, 3)).unwrap().arc.id;
    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);
    let stale_world = WorldStateSnapshot::new(99, "Saltmarsh");

    let combat = UpdateEvent::CombatResult(CombatEvent {
        encounter_id: "bog-wights".to_string(),
        base_difficulty: 4.0,
        outcome: CombatOutcome::Victory,
        enemies_defeated: 3,
    });
    let update = manager.update_arc(id, &character, &stale_world, 4, &combat).unwrap();
    assert_eq!(update.arc.integration.combat.consequences[0].turn, 4);
    assert_eq!(update.arc.progression.last_turn, Some(4));

    let completion = manager
        .complete_arc(id, &character, &WorldStateSnapshot::new(2, "Saltmarsh"), "done")
        .unwrap();
    let last = completion.arc.progression.milestones.last().unwrap();
    assert_eq!(last.reached_turn, 4);
}

#[test]
fn learned_archetype_preferences_survive_a_snapshot() {
    let mut manager = manager();
    let character = CharacterSnapshot::new(CharacterId(1), "Tamsin", 5);
    let id = manager.create_arc(&input(5, 3)).unwrap().arc.id;
    manager
        .complete_arc(id, &character, &WorldStateSnapshot::new(1, "Saltmarsh"), "done")
        .unwrap();

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.learned.len(), 1);
    assert_eq!(snapshot.learned[0].archetype, ArcArchetype::Adventure);
    assert_eq!(snapshot.learned[0].completions, 1);

    let parsed = ManagerSnapshot::from_ron(&snapshot.to_ron().unwrap()).unwrap();
    let mut restored = ArcManager::builder().seed(42).build().unwrap();
    restored.restore(parsed);
    assert_eq!(restored.snapshot().learned, snapshot.learned);
}

