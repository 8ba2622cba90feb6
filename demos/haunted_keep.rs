/// Haunted Keep example — a crisis arc where the player struggles, the
/// engine steps in, and the arc still reaches its ending.
///
/// A mini session: the keep is overrun → a failed defense → support kicks in
/// → the tide turns → completion and next-arc suggestions.
///
/// Run with: cargo run --example haunted_keep

use arc_engine::core::error::ArcError;
use arc_engine::core::generation::{NarrativeDraft, NarrativeGenerator, NarrativeRequest};
use arc_engine::core::manager::ArcManager;
use arc_engine::schema::arc::{ArcId, CharacterId, ChoiceCategory, ChoiceImpact};
use arc_engine::schema::character::{CharacterSnapshot, NpcRelationship};
use arc_engine::schema::event::{
    CombatEvent, PlayerChoice, QuestEvent, QuestEventKind, RelationshipEvent, SupportResponse,
    UpdateEvent,
};
use arc_engine::schema::generation::{ArcGenerationInput, PlayerPreferences};
use arc_engine::schema::integration::{CombatOutcome, SideEffect};
use arc_engine::schema::world::{StoryState, WorldStateSnapshot};

/// A narrator that writes in the voice of the keep's chronicler.
struct Chronicler;

impl NarrativeGenerator for Chronicler {
    fn generate(&mut self, request: &NarrativeRequest<'_>) -> Result<NarrativeDraft, ArcError> {
        let ctx = request.context;
        Ok(NarrativeDraft {
            title: format!("The Night {} Would Not Fall", ctx.location),
            description: format!(
                "From the chronicle of {}: the dead rose against {}, and {} stood on the wall.",
                ctx.series_name, ctx.location, ctx.character_name
            ),
            payload: Some(format!("chronicle-entry:{}", request.archetype)),
        })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut manager = ArcManager::builder()
        .seed(1313)
        .with_narrator(Box::new(Chronicler))
        .build()
        .expect("Failed to build arc manager");

    // --- The player character ---
    let mut character = CharacterSnapshot::new(CharacterId(7), "Sister Maren", 8);
    character.relationships.push(NpcRelationship {
        npc_id: "castellan".to_string(),
        name: "Castellan Hode".to_string(),
        score: 10,
    });

    let mut world = WorldStateSnapshot::new(0, "Gravenhold Keep");
    world.threat_level = 8;
    world.active_factions.push("the Hollow Host".to_string());

    let input = ArcGenerationInput {
        series_name: "The Gravenhold Chronicle".to_string(),
        series_context: "A border keep that remembers every siege".to_string(),
        character: character.clone(),
        story_state: StoryState {
            turn: 0,
            recent_events: vec!["The chapel bells rang on their own at midnight".to_string()],
        },
        previous_arcs: Vec::new(),
        player_preferences: PlayerPreferences::default(),
        world_state: world.clone(),
        narrative_goals: vec!["the relic of Saint Oda".to_string()],
    };

    let generated = manager.create_arc(&input).expect("Failed to create arc");
    let arc = &generated.arc;
    println!("=== {} ({}) ===", arc.title, arc.archetype);
    println!("{}", arc.description);
    println!("Why: {}", generated.generation_reasoning);
    println!(
        "Starting difficulty {:.1}, quality {:.1}\n",
        arc.difficulty.current_difficulty, generated.quality_metrics.overall
    );
    let id = arc.id;

    // --- Turn 1: a desperate order ---
    step(&mut manager, id, &character, &mut world, 1, UpdateEvent::PlayerChoice(PlayerChoice {
        choice_id: "hold-the-gate".to_string(),
        text: "Hold the gatehouse at any cost".to_string(),
        category: ChoiceCategory::Strategic,
        impact: ChoiceImpact::Major,
        quality: 0.4,
    }));

    // --- Turn 2: the defense collapses ---
    character.health = 25.0;
    character.mana = 5.0;
    step(&mut manager, id, &character, &mut world, 2, UpdateEvent::CombatResult(CombatEvent {
        encounter_id: "gatehouse".to_string(),
        base_difficulty: 7.0,
        outcome: CombatOutcome::Defeat,
        enemies_defeated: 2,
    }));
    step(&mut manager, id, &character, &mut world, 3, UpdateEvent::QuestEvent(QuestEvent {
        quest_id: "gravenhold".to_string(),
        kind: QuestEventKind::ObjectiveFailed {
            objective_id: format!("{}:p1:seed", id),
        },
    }));

    // --- Turn 4: the offered help barely lands ---
    step(&mut manager, id, &character, &mut world, 4, UpdateEvent::SupportResponse(SupportResponse {
        support_type: "difficulty_reduction".to_string(),
        effectiveness: 0.2,
    }));

    // --- Turns 5-8: the tide turns ---
    character.health = 80.0;
    character.mana = 40.0;
    step(&mut manager, id, &character, &mut world, 5, UpdateEvent::RelationshipEvent(RelationshipEvent {
        npc_id: "castellan".to_string(),
        interaction: "Carried the castellan from the rubble".to_string(),
        delta: 45,
    }));
    for (turn, phase) in [(6, 2), (7, 3), (8, 4)] {
        step(&mut manager, id, &character, &mut world, turn, UpdateEvent::QuestEvent(QuestEvent {
            quest_id: "gravenhold".to_string(),
            kind: QuestEventKind::ObjectiveCompleted {
                objective_id: format!("{}:p{}:seed", id, phase),
            },
        }));
    }

    // --- Completion ---
    let completion = manager
        .complete_arc(id, &character, &world, "Dawn finds the keep standing")
        .expect("Failed to complete arc");
    let m = &completion.final_metrics;
    println!("\n=== {} ===", completion.summary);
    println!(
        "{} turns, agency {:.1}, final difficulty {:.1}, quality {:.1}",
        m.total_duration, m.final_agency_score, m.final_difficulty, m.quality_score
    );
    println!("Rewards: {:?}", completion.rewards);
    println!("Total experience: {}", completion.total_experience());
    for suggestion in &completion.next_arc_suggestions {
        println!(
            "Next: {} at {:.1} — {}",
            suggestion.archetype, suggestion.suggested_difficulty, suggestion.reason
        );
    }

    let metrics = manager.get_global_arc_metrics();
    println!(
        "\nSession: {} updates, {} failures detected, {} recoveries offered",
        metrics.updates_processed, metrics.failures_detected, metrics.recoveries_offered
    );
}

fn step(
    manager: &mut ArcManager,
    id: ArcId,
    character: &CharacterSnapshot,
    world: &mut WorldStateSnapshot,
    turn: u64,
    event: UpdateEvent,
) {
    world.turn = turn;
    let update = manager
        .update_arc(id, character, world, turn, &event)
        .expect("Update rejected");

    println!(
        "[turn {}] {} — progress {:.0}%, difficulty {:.1}, support {:?}",
        turn,
        event.name(),
        update.arc.progression.progress_percent,
        update.arc.difficulty.current_difficulty,
        update.arc.recovery.adaptive_support.support_level
    );
    for failure in &update.failure_detection.failures {
        println!("    ! {}", failure.description);
    }
    for effect in &update.update_results {
        match effect {
            SideEffect::RecoveryOffered { recovery_type, .. } => {
                println!("    offer: {}", recovery_type)
            }
            SideEffect::Hint { text } => println!("    hint: {}", text),
            SideEffect::DifficultyAdjusted { from, to, reason } => {
                println!("    difficulty {:.1} -> {:.1}: {}", from, to, reason)
            }
            SideEffect::SupportLevelChanged { from, to } => {
                println!("    support {:?} -> {:?}", from, to)
            }
            other => println!("    {:?}", other),
        }
    }
}
