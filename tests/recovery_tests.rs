/// Failure detection, recovery offers, adaptive support and adaptive
/// difficulty, driven through the manager.

use arc_engine::core::manager::ArcManager;
use arc_engine::schema::arc::{ArcId, CharacterId, ObjectiveStatus};
use arc_engine::schema::character::CharacterSnapshot;
use arc_engine::schema::event::{QuestEvent, QuestEventKind, SupportResponse, UpdateEvent};
use arc_engine::schema::failure::{FailureMetric, Severity, SupportLevel};
use arc_engine::schema::generation::{ArcGenerationInput, PlayerPreferences};
use arc_engine::schema::integration::SideEffect;
use arc_engine::schema::world::{StoryState, WorldStateSnapshot};

fn input(level: u32, preferred_difficulty: Option<f32>) -> ArcGenerationInput {
    ArcGenerationInput {
        series_name: "Emberfall".to_string(),
        series_context: String::new(),
        character: CharacterSnapshot::new(CharacterId(1), "Oren", level),
        story_state: StoryState::default(),
        previous_arcs: Vec::new(),
        player_preferences: PlayerPreferences {
            preferred_difficulty,
            ..PlayerPreferences::default()
        },
        world_state: WorldStateSnapshot::new(0, "Emberfall"),
        narrative_goals: Vec::new(),
    }
}

fn quest(kind: QuestEventKind) -> UpdateEvent {
    UpdateEvent::QuestEvent(QuestEvent {
        quest_id: "embers".to_string(),
        kind,
    })
}

fn support(support_type: &str, effectiveness: f32) -> UpdateEvent {
    UpdateEvent::SupportResponse(SupportResponse {
        support_type: support_type.to_string(),
        effectiveness,
    })
}

fn setup(level: u32, preferred_difficulty: Option<f32>) -> (ArcManager, ArcId, CharacterSnapshot) {
    let mut manager = ArcManager::builder().seed(3).build().unwrap();
    let id = manager
        .create_arc(&input(level, preferred_difficulty))
        .unwrap()
        .arc
        .id;
    (manager, id, CharacterSnapshot::new(CharacterId(1), "Oren", level))
}

fn world(turn: u64) -> WorldStateSnapshot {
    WorldStateSnapshot::new(turn, "Emberfall")
}

#[test]
fn failed_objective_triggers_recovery_in_the_same_turn() {
    let (mut manager, id, character) = setup(5, None);
    let update = manager
        .update_arc(
            id,
            &character,
            &world(1),
            1,
            &quest(QuestEventKind::ObjectiveFailed {
                objective_id: format!("{}:p1:seed", id),
            }),
        )
        .unwrap();

    let detection = &update.failure_detection;
    assert_eq!(detection.failures.len(), 1);
    assert_eq!(detection.failures[0].metric, FailureMetric::ObjectiveFailures);
    assert_eq!(detection.failures[0].severity, Severity::Critical);
    assert_eq!(detection.metrics.objective_failure_rate, 1.0);

    // Moderate support caps the offer at two, most effective first.
    let options = &update.arc.active_recovery_options;
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].recovery_type, "difficulty_reduction");
    assert_eq!(options[0].effectiveness, 85);
    assert_eq!(options[1].recovery_type, "guidance_system");
    let offered = update
        .update_results
        .iter()
        .filter(|e| matches!(e, SideEffect::RecoveryOffered { .. }))
        .count();
    assert_eq!(offered, 2);

    assert_eq!(update.arc.difficulty.current_difficulty, 2.0);
    assert_eq!(update.arc.difficulty.history[0].reason, "player is struggling");
    assert!(update.update_results.contains(&SideEffect::Hint {
        text: "Offer guidance toward the current objective".to_string()
    }));
    assert!(update.update_results.iter().any(|e| matches!(
        e,
        SideEffect::ObjectiveAdded { objective_id, .. } if objective_id == "arc-1:regroup"
    )));

    // A failed primary still finishes its phase.
    assert_eq!(update.arc.progression.current_phase, 1);
    assert_eq!(update.arc.phases[0].objectives[0].status, ObjectiveStatus::Failed);

    let metrics = manager.get_global_arc_metrics();
    assert_eq!(metrics.failures_detected, 1);
    assert_eq!(metrics.recoveries_offered, 2);
}

#[test]
fn recovery_options_clear_once_the_failure_resolves() {
    let (mut manager, id, character) = setup(5, None);
    manager
        .update_arc(
            id,
            &character,
            &world(1),
            1,
            &quest(QuestEventKind::ObjectiveFailed {
                objective_id: format!("{}:p1:seed", id),
            }),
        )
        .unwrap();
    let update = manager
        .update_arc(
            id,
            &character,
            &world(2),
            2,
            &quest(QuestEventKind::ObjectiveCompleted {
                objective_id: format!("{}:p2:seed", id),
            }),
        )
        .unwrap();

    assert_eq!(update.failure_detection.metrics.objective_failure_rate, 0.5);
    assert!(!update.failure_detection.has_failures());
    assert!(update.arc.active_recovery_options.is_empty());
    assert!(manager.get_arc(id).unwrap().active_recovery_options.is_empty());
}

#[test]
fn support_level_moves_one_step_and_holds_in_the_band() {
    let (mut manager, id, character) = setup(5, None);

    let low = manager
        .update_arc(id, &character, &world(1), 1, &support("guidance_system", 0.2))
        .unwrap();
    assert_eq!(
        low.arc.recovery.adaptive_support.support_level,
        SupportLevel::High
    );
    let changes: Vec<&SideEffect> = low
        .update_results
        .iter()
        .filter(|e| matches!(e, SideEffect::SupportLevelChanged { .. }))
        .collect();
    assert_eq!(
        changes,
        vec![&SideEffect::SupportLevelChanged {
            from: SupportLevel::Moderate,
            to: SupportLevel::High,
        }]
    );

    // Mean success rate is now 0.4: inside the band, so the level holds.
    let held = manager
        .update_arc(id, &character, &world(2), 2, &support("guidance_system", 0.6))
        .unwrap();
    assert_eq!(
        held.arc.recovery.adaptive_support.support_level,
        SupportLevel::High
    );
    assert!(!held
        .update_results
        .iter()
        .any(|e| matches!(e, SideEffect::SupportLevelChanged { .. })));

    let tracking = &manager
        .get_arc(id)
        .unwrap()
        .recovery
        .adaptive_support
        .effectiveness_tracking;
    assert_eq!(tracking.len(), 1);
    assert_eq!(tracking[0].times_offered, 2);
    assert_eq!(tracking[0].times_accepted, 2);
}

#[test]
fn mastery_raises_difficulty() {
    // Capability 5, preferred difficulty 1: the arc starts at 3.
    let (mut manager, id, character) = setup(10, Some(1.0));
    assert_eq!(
        manager.get_arc(id).unwrap().difficulty.current_difficulty,
        3.0
    );

    for turn in 1..=3u64 {
        manager
            .update_arc(
                id,
                &character,
                &world(turn),
                turn,
                &quest(QuestEventKind::ObjectiveCompleted {
                    objective_id: format!("{}:p{}:seed", id, turn),
                }),
            )
            .unwrap();
    }

    let arc = manager.get_arc(id).unwrap();
    assert_eq!(arc.difficulty.current_difficulty, 3.5);
    assert_eq!(arc.difficulty.history.len(), 1);
    assert_eq!(arc.difficulty.history[0].reason, "player is mastering the arc");
    assert_eq!(arc.difficulty.history[0].turn, Some(3));
}

#[test]
fn detection_on_demand_leaves_the_arc_alone() {
    let (manager, id, _) = setup(5, None);
    let before = manager.get_arc(id).unwrap().clone();

    let mut drained = CharacterSnapshot::new(CharacterId(1), "Oren", 5);
    drained.health = 10.0;
    drained.mana = 0.0;
    drained.currency = 0.0;
    let detection = manager.detect_arc_failures(id, &drained, &world(1)).unwrap();

    assert!(detection
        .failures
        .iter()
        .any(|f| f.metric == FailureMetric::ResourceDepletion && f.severity == Severity::Concern));
    assert!(detection.recommendations[0].priority >= detection.recommendations.last().unwrap().priority);
    assert_eq!(manager.get_arc(id).unwrap(), &before);
}

#[test]
fn skill_gaps_follow_difficulty() {
    let (mut manager, id, character) = setup(5, None);
    assert!(manager.skill_gaps(id, &character).unwrap().is_empty());

    manager.adjust_arc_difficulty(id, 3.0, "stress test").unwrap();
    let gaps = manager.skill_gaps(id, &character).unwrap();
    assert_eq!(gaps, vec!["Arc difficulty 5.5 exceeds capability 2.5".to_string()]);
    assert!(manager.skill_gaps(ArcId(40), &character).is_err());
}
