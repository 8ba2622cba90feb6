/// Bounds that must hold for any sequence of inputs.

use arc_engine::core::config::SupportConfig;
use arc_engine::core::difficulty::adjust_arc_difficulty;
use arc_engine::core::integration::relationship::integrate_relationship;
use arc_engine::core::manager::ArcManager;
use arc_engine::core::progress::record_choice;
use arc_engine::core::support::update_adaptive_support;
use arc_engine::schema::arc::{
    Arc, ArcArchetype, ArcId, CharacterId, ChoiceCategory, ChoiceImpact,
};
use arc_engine::schema::character::{CharacterSnapshot, NpcRelationship};
use arc_engine::schema::event::{
    CombatEvent, PlayerChoice, QuestEvent, QuestEventKind, RelationshipEvent, SupportResponse,
    UpdateEvent,
};
use arc_engine::schema::generation::ArcGenerationInput;
use arc_engine::schema::integration::CombatOutcome;
use arc_engine::schema::world::{StoryState, WorldStateSnapshot};
use proptest::prelude::*;

const IMPACTS: [ChoiceImpact; 3] = [ChoiceImpact::Minor, ChoiceImpact::Moderate, ChoiceImpact::Major];
const CATEGORIES: [ChoiceCategory; 4] = [
    ChoiceCategory::Strategic,
    ChoiceCategory::Moral,
    ChoiceCategory::Creative,
    ChoiceCategory::Social,
];

fn arc() -> Arc {
    Arc::new(ArcId(1), CharacterId(1), 1, ArcArchetype::Bond)
}

fn generation_input(place: &str, level: u32, threat: u8) -> ArcGenerationInput {
    let mut world = WorldStateSnapshot::new(0, place);
    world.threat_level = threat;
    ArcGenerationInput {
        series_name: place.to_string(),
        series_context: String::new(),
        character: CharacterSnapshot::new(CharacterId(1), "Pell", level),
        story_state: StoryState::default(),
        previous_arcs: Vec::new(),
        player_preferences: Default::default(),
        world_state: world,
        narrative_goals: Vec::new(),
    }
}

/// One of a handful of update kinds, picked by `kind`.
fn update_event(id: ArcId, turn: usize, kind: usize, value: f32) -> UpdateEvent {
    match kind {
        0 => UpdateEvent::PlayerChoice(PlayerChoice {
            choice_id: format!("c{}", turn),
            text: format!("choice {}", turn),
            category: CATEGORIES[turn % CATEGORIES.len()],
            impact: IMPACTS[turn % IMPACTS.len()],
            quality: value,
        }),
        1 => UpdateEvent::QuestEvent(QuestEvent {
            quest_id: "main".to_string(),
            kind: QuestEventKind::ObjectiveCompleted {
                objective_id: format!("{}:p{}:seed", id, turn % 4 + 1),
            },
        }),
        2 => UpdateEvent::QuestEvent(QuestEvent {
            quest_id: "main".to_string(),
            kind: QuestEventKind::ObjectiveFailed {
                objective_id: format!("{}:p{}:seed", id, turn % 4 + 1),
            },
        }),
        3 => UpdateEvent::CombatResult(CombatEvent {
            encounter_id: format!("e{}", turn),
            base_difficulty: value * 20.0,
            outcome: if value > 0.5 { CombatOutcome::Victory } else { CombatOutcome::Defeat },
            enemies_defeated: 1,
        }),
        _ => UpdateEvent::SupportResponse(SupportResponse {
            support_type: "guidance_system".to_string(),
            effectiveness: value,
        }),
    }
}

proptest! {
    #[test]
    fn difficulty_stays_in_range(deltas in prop::collection::vec(-20.0_f32..20.0, 1..30)) {
        let mut current = arc();
        for delta in deltas {
            let (next, _) = adjust_arc_difficulty(&current, delta, "property", Some(1));
            prop_assert!((1.0..=10.0).contains(&next.difficulty.current_difficulty));
            current = next;
        }
        for adjustment in &current.difficulty.history {
            prop_assert!((1.0..=10.0).contains(&adjustment.to));
        }
    }

    #[test]
    fn agency_stays_in_range(
        choices in prop::collection::vec((0_usize..3, 0_usize..4, -1.0_f32..2.0), 1..40),
    ) {
        let mut current = arc();
        for (turn, (impact, category, quality)) in choices.into_iter().enumerate() {
            let choice = PlayerChoice {
                choice_id: format!("c{}", turn),
                text: format!("choice {}", turn),
                category: CATEGORIES[category],
                impact: IMPACTS[impact],
                quality,
            };
            record_choice(&mut current, &choice, turn as u64);
            let agency = &current.agency;
            prop_assert!((0.0..=100.0).contains(&agency.overall_agency_score));
            prop_assert!(agency.impactful_choices <= agency.meaningful_choices);
            prop_assert!(agency.meaningful_choices <= agency.total_choices);
        }
    }

    #[test]
    fn reputation_stays_in_range(
        starting in -100_i32..=100,
        deltas in prop::collection::vec(-500_i32..500, 1..20),
    ) {
        let mut character = CharacterSnapshot::new(CharacterId(1), "Ilse", 4);
        character.relationships.push(NpcRelationship {
            npc_id: "brother".to_string(),
            name: "Brother Anselm".to_string(),
            score: starting,
        });
        let world = WorldStateSnapshot::new(1, "abbey");

        let mut current = arc();
        for delta in deltas {
            let event = RelationshipEvent {
                npc_id: "brother".to_string(),
                interaction: "argued".to_string(),
                delta,
            };
            current = integrate_relationship(&current, &event, &character, &world).arc;
            let impact = &current.integration.relationship.impacts[0];
            prop_assert!((-100..=100).contains(&impact.reputation_score));
            let dynamics = &current.integration.relationship.social_dynamics;
            prop_assert!(dynamics.cohesion + dynamics.tension <= 1.0);
        }
        prop_assert_eq!(current.integration.relationship.impacts.len(), 1);
    }

    #[test]
    fn support_moves_at_most_one_step(responses in prop::collection::vec(0.0_f32..1.0, 1..30)) {
        let config = SupportConfig::default();
        let mut current = arc();
        for effectiveness in responses {
            let update = update_adaptive_support(&current, "guidance_system", effectiveness, &config);
            let before = update.previous_level as i32;
            let after = update.level as i32;
            prop_assert!((before - after).abs() <= 1);
            current = update.arc;
        }
    }

    #[test]
    fn updates_keep_restored_difficulty_in_range(
        persisted in -50.0_f32..60.0,
        adaptive in any::<bool>(),
        level in 1_u32..20,
        events in prop::collection::vec((0_usize..5, 0.0_f32..1.0), 1..25),
    ) {
        let mut manager = ArcManager::builder().seed(7).build().unwrap();
        let id = manager.create_arc(&generation_input("Harrowgate", level, 3)).unwrap().arc.id;
        let mut snapshot = manager.snapshot();
        snapshot.active[0].difficulty.current_difficulty = persisted;
        snapshot.active[0].difficulty.adaptive_scaling = adaptive;
        manager.restore(snapshot);

        let character = CharacterSnapshot::new(CharacterId(1), "Pell", level);
        for (turn, (kind, value)) in events.into_iter().enumerate() {
            let turn = turn + 1;
            let world = WorldStateSnapshot::new(turn as u64, "Harrowgate");
            let event = update_event(id, turn, kind, value);
            // Rejected updates leave the stored arc alone; either way it must be in range.
            let _ = manager.update_arc(id, &character, &world, turn as u64, &event);
            let difficulty = manager.get_arc(id).unwrap().difficulty.current_difficulty;
            prop_assert!((1.0..=10.0).contains(&difficulty), "difficulty {} after turn {}", difficulty, turn);
        }
    }

    #[test]
    fn same_seed_same_arc(seed in 0_u64..1_000, level in 1_u32..20, threat in 0_u8..=10) {
        let input = generation_input("Harrowgate", level, threat);
        let a = ArcManager::builder().seed(seed).build().unwrap().create_arc(&input).unwrap();
        let b = ArcManager::builder().seed(seed).build().unwrap().create_arc(&input).unwrap();
        prop_assert!((1.0..=10.0).contains(&a.arc.difficulty.current_difficulty));
        prop_assert_eq!(a, b);
    }
}
