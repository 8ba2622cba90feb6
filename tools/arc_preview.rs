/// Arc Preview — plays a scripted session through the arc manager and
/// prints what happened each turn.
///
/// Usage: arc_preview <scenario.ron> [--seed <n>] [--config <path>] [--templates <path>] [--snapshot]
///
/// Set RUST_LOG (e.g. `RUST_LOG=arc_engine=debug`) for engine tracing.

use arc_engine::core::manager::ArcManager;
use arc_engine::core::script::{run_script, SessionReport, SessionScript, TurnReport};
use arc_engine::schema::integration::SideEffect;
use arc_engine::schema::outcome::{ArcCompletion, Reward};
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    init_tracing();

    let scenario_path = &args[1];
    let mut seed: u64 = 42;
    let mut config_path = None;
    let mut templates_path = None;
    let mut show_snapshot = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--templates" if i + 1 < args.len() => {
                i += 1;
                templates_path = Some(args[i].clone());
            }
            "--snapshot" => show_snapshot = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let script = match SessionScript::load_from_ron(Path::new(scenario_path)) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("ERROR: Failed to load scenario: {}", e);
            process::exit(1);
        }
    };

    let mut builder = ArcManager::builder().seed(seed);
    if let Some(ref path) = config_path {
        builder = builder.config_file(path);
    }
    if let Some(ref path) = templates_path {
        builder = builder.templates_file(path);
    }
    let mut manager = match builder.build() {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("ERROR: Failed to build arc manager: {}", e);
            process::exit(1);
        }
    };

    let report = match run_script(&mut manager, &script) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("ERROR: Session aborted: {}", e);
            process::exit(1);
        }
    };

    print_report(&report);

    let metrics = manager.get_global_arc_metrics();
    println!("\n=== Session Metrics ===");
    println!(
        "  arcs created: {}  completed: {}  updates: {}  rejected: {}",
        metrics.arcs_created, metrics.arcs_completed, metrics.updates_processed, metrics.failed_updates
    );
    println!(
        "  failures detected: {}  recoveries offered: {}",
        metrics.failures_detected, metrics.recoveries_offered
    );

    if show_snapshot {
        match manager.snapshot().to_ron() {
            Ok(text) => println!("\n=== Snapshot ===\n{}", text),
            Err(e) => eprintln!("ERROR: Failed to serialize snapshot: {}", e),
        }
    }

    let rejected = report.turns.iter().filter(|t| !t.response.success).count();
    if rejected > 0 {
        process::exit(2);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_usage() {
    println!("Arc Preview — plays a scripted session through the arc manager.");
    println!();
    println!("Usage: arc_preview <scenario.ron> [--seed <n>] [--config <path>] [--templates <path>] [--snapshot]");
    println!();
    println!("  --seed <n>          Narrator RNG seed (default: 42)");
    println!("  --config <path>     Engine config RON file");
    println!("  --templates <path>  Extra arc templates RON file");
    println!("  --snapshot          Print the manager snapshot after the session");
}

fn print_report(report: &SessionReport) {
    let arc = &report.generation.arc;
    println!("\n=== {} ({}) ===", arc.title, arc.archetype);
    println!("{}", arc.description);
    println!("Reasoning: {}", report.generation.generation_reasoning);
    for note in &report.generation.adaptation_notes {
        println!("  note: {}", note);
    }
    println!(
        "Difficulty {:.1}, quality {:.1}, tags: {}",
        arc.difficulty.current_difficulty,
        report.generation.quality_metrics.overall,
        arc.thematic_tags.join(", ")
    );
    for phase in &arc.phases {
        let objective = phase
            .objectives
            .first()
            .map(|o| o.description.as_str())
            .unwrap_or("");
        println!("  {}. {} — {}", phase.order, phase.name, objective);
    }

    println!();
    for turn in &report.turns {
        print_turn(turn);
    }

    if let Some(ref completion) = report.completion {
        print_completion(completion);
    }
}

fn print_turn(turn: &TurnReport) {
    let response = &turn.response;
    if !response.success {
        println!(
            "[turn {:>3}] {:<18} REJECTED ({}): {}",
            turn.turn,
            turn.update_type,
            response.error_kind.as_deref().unwrap_or("unknown"),
            response.error.as_deref().unwrap_or("")
        );
        return;
    }

    let (progress, difficulty, agency) = match response.updated_arc {
        Some(ref arc) => (
            arc.progression.progress_percent,
            arc.difficulty.current_difficulty,
            arc.agency.overall_agency_score,
        ),
        None => (0.0, 0.0, 0.0),
    };
    println!(
        "[turn {:>3}] {:<18} progress {:>5.1}%  difficulty {:>4.1}  agency {:>5.1}",
        turn.turn, turn.update_type, progress, difficulty, agency
    );
    for effect in &response.update_results {
        println!("             - {}", describe(effect));
    }
    if let Some(ref detection) = response.failure_detection {
        for failure in &detection.failures {
            println!("             ! {}", failure.description);
        }
        for warning in &detection.warnings {
            println!("             ~ {}", warning.description);
        }
    }
}

fn describe(effect: &SideEffect) -> String {
    match effect {
        SideEffect::PhaseAdvanced { from, to, .. } => format!("phase {} -> {}", from, to),
        SideEffect::DifficultyAdjusted { from, to, reason } => {
            format!("difficulty {:.1} -> {:.1} ({})", from, to, reason)
        }
        SideEffect::SupportLevelChanged { from, to } => {
            format!("support {:?} -> {:?}", from, to)
        }
        SideEffect::RecoveryOffered { recovery_type, .. } => format!("recovery offered: {}", recovery_type),
        SideEffect::Hint { text } => format!("hint: {}", text),
        other => format!("{:?}", other),
    }
}

fn print_completion(completion: &ArcCompletion) {
    let m = &completion.final_metrics;
    println!("\n=== Completed: {} ===", completion.summary);
    println!(
        "  {} turns, agency {:.1}, difficulty {:.1}, efficiency {:.1}, quality {:.1}",
        m.total_duration, m.final_agency_score, m.final_difficulty, m.efficiency_score, m.quality_score
    );
    println!(
        "  objectives: {} completed, {} failed",
        m.objectives_completed, m.objectives_failed
    );
    for reward in &completion.rewards {
        match reward {
            Reward::Experience { amount } => println!("  reward: {} experience", amount),
            Reward::SkillPoints { amount } => println!("  reward: {} skill points", amount),
            Reward::Currency { amount } => println!("  reward: {} currency", amount),
        }
    }
    for suggestion in &completion.next_arc_suggestions {
        println!(
            "  next: {} at difficulty {:.1} ({})",
            suggestion.archetype, suggestion.suggested_difficulty, suggestion.reason
        );
    }
}
