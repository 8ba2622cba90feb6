//! Recovery option generator: a fixed catalog of remediations per failure
//! metric. Unknown metrics produce no options.

use rustc_hash::FxHashSet;

use crate::schema::arc::Arc;
use crate::schema::character::CharacterSnapshot;
use crate::schema::failure::{
    DetectedFailure, FailureMetric, RecoveryCost, RecoveryOption, SupportLevel,
};
use crate::schema::world::WorldStateSnapshot;

struct CatalogEntry {
    recovery_type: &'static str,
    name: &'static str,
    description: &'static str,
    cost: fn(&Arc, &CharacterSnapshot) -> RecoveryCost,
    effectiveness: u8,
    requires_player_choice: bool,
}

fn free(_: &Arc, _: &CharacterSnapshot) -> RecoveryCost {
    RecoveryCost::None
}

fn mediation_time(_: &Arc, _: &CharacterSnapshot) -> RecoveryCost {
    RecoveryCost::Time { turns: 2 }
}

fn difficulty_consequence(arc: &Arc, _: &CharacterSnapshot) -> RecoveryCost {
    RecoveryCost::NarrativeConsequence {
        description: format!("The path through \"{}\" becomes less rewarding", arc.title),
    }
}

fn shortcut_consequence(_: &Arc, _: &CharacterSnapshot) -> RecoveryCost {
    RecoveryCost::NarrativeConsequence {
        description: "Some optional story threads will close".to_string(),
    }
}

const OBJECTIVE_FAILURES: &[CatalogEntry] = &[
    CatalogEntry {
        recovery_type: "guidance_system",
        name: "Guidance System",
        description: "A mentor or omen points toward the current objective",
        cost: free,
        effectiveness: 70,
        requires_player_choice: false,
    },
    CatalogEntry {
        recovery_type: "difficulty_reduction",
        name: "Difficulty Reduction",
        description: "Upcoming challenges in this arc ease off",
        cost: difficulty_consequence,
        effectiveness: 85,
        requires_player_choice: true,
    },
];

const RESOURCE_DEPLETION: &[CatalogEntry] = &[CatalogEntry {
    recovery_type: "resource_cache",
    name: "Resource Cache",
    description: "Supplies turn up along the current path",
    cost: free,
    effectiveness: 60,
    requires_player_choice: false,
}];

const RELATIONSHIP_BREAKDOWN: &[CatalogEntry] = &[CatalogEntry {
    recovery_type: "mediation_opportunity",
    name: "Mediation Opportunity",
    description: "A neutral party offers to help repair a strained relationship",
    cost: mediation_time,
    effectiveness: 75,
    requires_player_choice: true,
}];

const PLAYER_FRUSTRATION: &[CatalogEntry] = &[
    CatalogEntry {
        recovery_type: "alternate_path",
        name: "Alternate Path",
        description: "A different way forward opens up",
        cost: free,
        effectiveness: 65,
        requires_player_choice: true,
    },
    CatalogEntry {
        recovery_type: "hint_offer",
        name: "Hint Offer",
        description: "The story nudges toward an untried approach",
        cost: free,
        effectiveness: 55,
        requires_player_choice: false,
    },
];

const TIME_INEFFICIENCY: &[CatalogEntry] = &[CatalogEntry {
    recovery_type: "narrative_shortcut",
    name: "Narrative Shortcut",
    description: "The arc skips ahead to its next meaningful beat",
    cost: shortcut_consequence,
    effectiveness: 65,
    requires_player_choice: true,
}];

const DIFFICULTY_MISMATCH: &[CatalogEntry] = &[CatalogEntry {
    recovery_type: "difficulty_recalibration",
    name: "Difficulty Recalibration",
    description: "Arc difficulty is re-centered on the character's capability",
    cost: free,
    effectiveness: 80,
    requires_player_choice: false,
}];

fn catalog(metric: &FailureMetric) -> &'static [CatalogEntry] {
    match metric {
        FailureMetric::ObjectiveFailures => OBJECTIVE_FAILURES,
        FailureMetric::ResourceDepletion => RESOURCE_DEPLETION,
        FailureMetric::RelationshipBreakdown => RELATIONSHIP_BREAKDOWN,
        FailureMetric::PlayerFrustration => PLAYER_FRUSTRATION,
        FailureMetric::TimeInefficiency => TIME_INEFFICIENCY,
        FailureMetric::DifficultyMismatch => DIFFICULTY_MISMATCH,
        FailureMetric::Custom(_) => &[],
    }
}

/// Candidate remediations for one detected failure.
pub fn generate_recovery_options(
    failure: &DetectedFailure,
    arc: &Arc,
    character: &CharacterSnapshot,
    world: &WorldStateSnapshot,
) -> Vec<RecoveryOption> {
    catalog(&failure.metric)
        .iter()
        .map(|entry| RecoveryOption {
            id: format!("{}:{}:{}", arc.id, entry.recovery_type, world.turn),
            recovery_type: entry.recovery_type.to_string(),
            name: entry.name.to_string(),
            description: entry.description.to_string(),
            trigger_conditions: vec![format!(
                "{} >= {:.2}",
                failure.metric, failure.threshold
            )],
            cost: (entry.cost)(arc, character),
            effectiveness: entry.effectiveness,
            requires_player_choice: entry.requires_player_choice,
        })
        .collect()
}

/// Options for every failure, most effective first, capped by support level.
pub fn select_recovery_options(
    failures: &[DetectedFailure],
    arc: &Arc,
    character: &CharacterSnapshot,
    world: &WorldStateSnapshot,
    level: SupportLevel,
) -> Vec<RecoveryOption> {
    let mut options: Vec<RecoveryOption> = failures
        .iter()
        .flat_map(|f| generate_recovery_options(f, arc, character, world))
        .collect();
    options.sort_by(|a, b| b.effectiveness.cmp(&a.effectiveness));
    let mut seen = FxHashSet::default();
    options.retain(|o| seen.insert(o.recovery_type.clone()));
    options.truncate(level.max_offered_options());
    options
}
