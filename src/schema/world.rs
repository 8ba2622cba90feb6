use serde::{Deserialize, Serialize};

/// Immutable view of the world supplied by the caller each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStateSnapshot {
    pub turn: u64,
    pub location: String,
    /// 0..=10; 8 and above forces a crisis arc.
    pub threat_level: u8,
    #[serde(default)]
    pub active_factions: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl WorldStateSnapshot {
    pub fn new(turn: u64, location: impl Into<String>) -> Self {
        Self {
            turn,
            location: location.into(),
            threat_level: 3,
            active_factions: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Story-so-far context passed along with a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StoryState {
    pub turn: u64,
    #[serde(default)]
    pub recent_events: Vec<String>,
}
