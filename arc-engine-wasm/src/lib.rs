//! WASM bindings for arc-engine. Every value crosses the boundary as JSON,
//! except snapshots, which stay in RON.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use arc_engine::core::config::EngineConfig;
use arc_engine::core::manager::{ArcManager, ManagerSnapshot};
use arc_engine::schema::arc::{ArcArchetype, ArcId};
use arc_engine::schema::character::CharacterSnapshot;
use arc_engine::schema::event::UpdateEvent;
use arc_engine::schema::generation::ArcGenerationInput;
use arc_engine::schema::world::WorldStateSnapshot;

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------
fn parse<T: serde::de::DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {what} JSON: {e}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {e}"))
}

fn js(message: String) -> JsError {
    JsError::new(&message)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ArcSession {
    manager: ArcManager,
    seed: u64,
}

#[wasm_bindgen]
impl ArcSession {
    /// Create a session with the default engine config.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<ArcSession, JsError> {
        Self::build(seed, None).map_err(js)
    }

    /// Create a session with an engine config given as RON text.
    pub fn with_config(seed: u64, config_ron: &str) -> Result<ArcSession, JsError> {
        Self::build(seed, Some(config_ron)).map_err(js)
    }

    /// Generate and register an arc. Takes an `ArcGenerationInput` as JSON and
    /// returns the `ArcGenerationResult` as JSON.
    pub fn create_arc(&mut self, input_json: &str) -> Result<String, JsError> {
        self.create_arc_json(input_json).map_err(js)
    }

    /// Route one turn's event through an arc.
    ///
    /// Engine failures are reported inside the returned response
    /// (`{"success": false, "error": ..., "error_kind": ...}`); only malformed
    /// JSON throws.
    ///
    /// Event JSON shape:
    /// ```json
    /// { "update_type": "quest_event",
    ///   "data": { "quest_id": "q1",
    ///             "kind": { "kind": "objective_completed", "objective_id": "arc-1:p1:seed" } } }
    /// ```
    pub fn update_arc(
        &mut self,
        arc_id: u64,
        character_json: &str,
        world_json: &str,
        turn: u64,
        event_json: &str,
    ) -> Result<String, JsError> {
        self.update_arc_json(arc_id, character_json, world_json, turn, event_json)
            .map_err(js)
    }

    /// Complete an arc and return the `ArcCompletion` as JSON.
    pub fn complete_arc(
        &mut self,
        arc_id: u64,
        character_json: &str,
        world_json: &str,
        summary: &str,
    ) -> Result<String, JsError> {
        self.complete_arc_json(arc_id, character_json, world_json, summary)
            .map_err(js)
    }

    /// Run failure detection without changing the arc.
    pub fn detect_failures(
        &self,
        arc_id: u64,
        character_json: &str,
        world_json: &str,
    ) -> Result<String, JsError> {
        let character: CharacterSnapshot = parse("character", character_json).map_err(js)?;
        let world: WorldStateSnapshot = parse("world", world_json).map_err(js)?;
        let detection = self
            .manager
            .detect_arc_failures(ArcId(arc_id), &character, &world)
            .map_err(|e| js(e.to_string()))?;
        to_json(&detection).map_err(js)
    }

    pub fn adjust_difficulty(&mut self, arc_id: u64, delta: f32, reason: &str) -> Result<String, JsError> {
        let arc = self
            .manager
            .adjust_arc_difficulty(ArcId(arc_id), delta, reason)
            .map_err(|e| js(e.to_string()))?;
        to_json(&arc).map_err(js)
    }

    /// An active or completed arc as JSON.
    pub fn get_arc(&self, arc_id: u64) -> Result<String, JsError> {
        self.get_arc_json(arc_id).map_err(js)
    }

    pub fn get_arc_analytics(&self, arc_id: u64) -> Result<String, JsError> {
        let analytics = self
            .manager
            .get_arc_analytics(ArcId(arc_id))
            .map_err(|e| js(e.to_string()))?;
        to_json(&analytics).map_err(js)
    }

    pub fn global_metrics(&self) -> Result<String, JsError> {
        to_json(&self.manager.get_global_arc_metrics()).map_err(js)
    }

    /// The whole session as RON text.
    pub fn snapshot(&self) -> Result<String, JsError> {
        self.manager.snapshot().to_ron().map_err(|e| js(e.to_string()))
    }

    /// Replace the session state with a RON snapshot.
    pub fn restore(&mut self, snapshot_ron: &str) -> Result<(), JsError> {
        let snapshot = ManagerSnapshot::from_ron(snapshot_ron).map_err(|e| js(e.to_string()))?;
        self.manager.restore(snapshot);
        Ok(())
    }

    /// Start over with a fresh manager, keeping the config.
    pub fn reset(&mut self, seed: u64) -> Result<(), JsError> {
        let config = self.manager.config().clone();
        self.manager = ArcManager::builder()
            .seed(seed)
            .with_config(config)
            .build()
            .map_err(|e| js(e.to_string()))?;
        self.seed = seed;
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// JSON array of archetype names.
    pub fn archetypes() -> String {
        let names: Vec<&str> = ArcArchetype::ALL.iter().map(|a| a.as_str()).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }
}

impl ArcSession {
    fn build(seed: u64, config_ron: Option<&str>) -> Result<ArcSession, String> {
        let mut builder = ArcManager::builder().seed(seed);
        if let Some(text) = config_ron {
            let config = EngineConfig::parse_ron(text).map_err(|e| format!("Config error: {e}"))?;
            builder = builder.with_config(config);
        }
        let manager = builder
            .build()
            .map_err(|e| format!("Engine build error: {e}"))?;
        Ok(ArcSession { manager, seed })
    }

    fn create_arc_json(&mut self, input_json: &str) -> Result<String, String> {
        let input: ArcGenerationInput = parse("generation input", input_json)?;
        let result = self
            .manager
            .create_arc(&input)
            .map_err(|e| format!("Generation error: {e}"))?;
        to_json(&result)
    }

    fn update_arc_json(
        &mut self,
        arc_id: u64,
        character_json: &str,
        world_json: &str,
        turn: u64,
        event_json: &str,
    ) -> Result<String, String> {
        let character: CharacterSnapshot = parse("character", character_json)?;
        let world: WorldStateSnapshot = parse("world", world_json)?;
        let event: UpdateEvent = parse("event", event_json)?;
        let response =
            self.manager
                .update_arc_response(ArcId(arc_id), &character, &world, turn, &event);
        to_json(&response)
    }

    fn complete_arc_json(
        &mut self,
        arc_id: u64,
        character_json: &str,
        world_json: &str,
        summary: &str,
    ) -> Result<String, String> {
        let character: CharacterSnapshot = parse("character", character_json)?;
        let world: WorldStateSnapshot = parse("world", world_json)?;
        let completion = self
            .manager
            .complete_arc(ArcId(arc_id), &character, &world, summary)
            .map_err(|e| format!("Completion error: {e}"))?;
        to_json(&completion)
    }

    fn get_arc_json(&self, arc_id: u64) -> Result<String, String> {
        let arc = self
            .manager
            .get_arc(ArcId(arc_id))
            .ok_or_else(|| format!("arc not found: {}", ArcId(arc_id)))?;
        to_json(arc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARACTER: &str = r#"{
        "id": 1, "name": "Tamsin", "level": 5,
        "health": 100.0, "max_health": 100.0,
        "mana": 50.0, "max_mana": 50.0, "currency": 500.0
    }"#;
    const WORLD: &str = r#"{ "turn": 1, "location": "Saltmarsh", "threat_level": 3 }"#;

    fn input() -> String {
        format!(
            r#"{{ "series_name": "Saltmarsh Tales", "character": {}, "world_state": {} }}"#,
            CHARACTER, WORLD
        )
    }

    #[test]
    fn session_round_trip_over_json() {
        let mut session = ArcSession::build(9, None).unwrap();
        let created: serde_json::Value =
            serde_json::from_str(&session.create_arc_json(&input()).unwrap()).unwrap();
        assert_eq!(created["arc"]["id"], 1);
        assert_eq!(created["arc"]["archetype"], "adventure_arc");

        let event = r#"{ "update_type": "quest_event", "data": {
            "quest_id": "main",
            "kind": { "kind": "objective_completed", "objective_id": "arc-1:p1:seed" } } }"#;
        let response: serde_json::Value = serde_json::from_str(
            &session
                .update_arc_json(1, CHARACTER, WORLD, 1, event)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(response["success"], true);
        assert_eq!(response["updated_arc"]["progression"]["current_phase"], 1);
        assert!(response.get("error").is_none());
    }

    #[test]
    fn unknown_arc_is_a_response_not_an_error() {
        let mut session = ArcSession::build(9, None).unwrap();
        let event = r#"{ "update_type": "progression_event", "data": { "experience_gained": 10 } }"#;
        let response: serde_json::Value = serde_json::from_str(
            &session
                .update_arc_json(42, CHARACTER, WORLD, 1, event)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(response["success"], false);
        assert_eq!(response["error_kind"], "not_found");
    }

    #[test]
    fn malformed_json_is_rejected() {
        let mut session = ArcSession::build(9, None).unwrap();
        let err = session.create_arc_json("{ not json").unwrap_err();
        assert!(err.starts_with("Invalid generation input JSON"));
        assert!(session.get_arc_json(1).is_err());
    }

    #[test]
    fn config_comes_from_ron() {
        let session =
            ArcSession::build(1, Some("(support: (initial_level: high))")).unwrap();
        assert_eq!(
            session.manager.config().support.initial_level,
            arc_engine::schema::failure::SupportLevel::High
        );
        assert!(ArcSession::build(1, Some("(support: (raise_below: 0.9))")).is_err());
    }

    #[test]
    fn archetype_list() {
        let names: Vec<String> = serde_json::from_str(&ArcSession::archetypes()).unwrap();
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "crisis_arc");
    }
}
