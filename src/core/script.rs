//! Scripted sessions: a generation input plus a list of turns, played
//! through an `ArcManager`. Used by the preview tool and the scenario tests.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::core::error::ArcError;
use crate::core::manager::ArcManager;
use crate::schema::event::UpdateEvent;
use crate::schema::generation::{ArcGenerationInput, ArcGenerationResult};
use crate::schema::outcome::{ArcCompletion, ArcUpdateResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedTurn {
    pub turn: u64,
    pub event: UpdateEvent,
    /// Character health for this and later turns.
    #[serde(default)]
    pub health: Option<f32>,
    #[serde(default)]
    pub threat_level: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScript {
    pub input: ArcGenerationInput,
    pub turns: Vec<ScriptedTurn>,
    /// Completion summary. The arc is left active when empty.
    #[serde(default)]
    pub summary: String,
}

impl SessionScript {
    pub fn load_from_ron(path: &Path) -> Result<SessionScript, ArcError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ArcError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<SessionScript, ArcError> {
        ron::from_str(input).map_err(|e| ArcError::Script(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub turn: u64,
    pub update_type: &'static str,
    pub response: ArcUpdateResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub generation: ArcGenerationResult,
    pub turns: Vec<TurnReport>,
    pub completion: Option<ArcCompletion>,
}

/// Play a script. Rejected updates are recorded in their turn report;
/// generation and completion errors end the session.
pub fn run_script(manager: &mut ArcManager, script: &SessionScript) -> Result<SessionReport, ArcError> {
    let generation = manager.create_arc(&script.input)?;
    let id = generation.arc.id;
    let mut character = script.input.character.clone();
    let mut world = script.input.world_state.clone();

    let mut turns = Vec::with_capacity(script.turns.len());
    for step in &script.turns {
        if let Some(health) = step.health {
            character.health = health;
        }
        if let Some(threat) = step.threat_level {
            world.threat_level = threat;
        }
        world.turn = step.turn;
        let response = manager.update_arc_response(id, &character, &world, step.turn, &step.event);
        turns.push(TurnReport {
            turn: step.turn,
            update_type: step.event.name(),
            response,
        });
    }

    let completion = if script.summary.is_empty() {
        None
    } else {
        Some(manager.complete_arc(id, &character, &world, &script.summary)?)
    };
    info!(arc_id = %id, turns = turns.len(), completed = completion.is_some(), "script finished");

    Ok(SessionReport {
        generation,
        turns,
        completion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_io() {
        let err = SessionScript::load_from_ron(Path::new("tests/fixtures/no_such_script.ron")).unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().contains("no_such_script.ron"));
    }

    #[test]
    fn malformed_script_reports_script() {
        let err = SessionScript::parse_ron("SessionScript(turns: [").unwrap_err();
        assert_eq!(err.kind(), "script");
    }
}
