//! Arena + index storage for arcs.
//!
//! Active arcs live in an id-keyed table and are only ever swapped out whole.
//! Completed arcs move to an append-only history. An id is never present in
//! both at once.

use rustc_hash::FxHashMap;

use crate::core::error::ArcError;
use crate::schema::arc::{Arc, ArcId, CharacterId};

#[derive(Debug, Clone, Default)]
pub struct ArcStore {
    active: FxHashMap<ArcId, Arc>,
    history: Vec<Arc>,
    next_id: u64,
    orders: FxHashMap<CharacterId, u32>,
}

impl ArcStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next inserted arc should carry. Not reserved until the
    /// arc is inserted.
    pub fn peek_id(&self) -> ArcId {
        ArcId(self.next_id + 1)
    }

    /// The order the next arc for `character` would get, without reserving it.
    pub fn peek_order(&self, character: CharacterId) -> u32 {
        self.orders.get(&character).copied().unwrap_or(0) + 1
    }

    /// Register a freshly created arc. Its order becomes the character's
    /// latest.
    pub fn insert(&mut self, arc: Arc) {
        let latest = self.orders.entry(arc.character_id).or_insert(0);
        *latest = (*latest).max(arc.order);
        self.next_id = self.next_id.max(arc.id.0);
        self.active.insert(arc.id, arc);
    }

    pub fn get(&self, id: ArcId) -> Option<&Arc> {
        self.active.get(&id)
    }

    pub fn contains(&self, id: ArcId) -> bool {
        self.active.contains_key(&id)
    }

    /// Swap in a new snapshot for an active arc.
    pub fn replace(&mut self, arc: Arc) -> Result<(), ArcError> {
        match self.active.get_mut(&arc.id) {
            Some(slot) => {
                *slot = arc;
                Ok(())
            }
            None => Err(ArcError::NotFound(arc.id)),
        }
    }

    /// Move an arc out of the active table and append its final snapshot to
    /// history in one step.
    pub fn retire(&mut self, arc: Arc) -> Result<(), ArcError> {
        if self.active.remove(&arc.id).is_none() {
            return Err(ArcError::NotFound(arc.id));
        }
        self.history.push(arc);
        Ok(())
    }

    pub fn history(&self) -> &[Arc] {
        &self.history
    }

    pub fn find_in_history(&self, id: ArcId) -> Option<&Arc> {
        self.history.iter().find(|a| a.id == id)
    }

    /// Active arcs ordered by id.
    pub fn active(&self) -> Vec<&Arc> {
        let mut arcs: Vec<&Arc> = self.active.values().collect();
        arcs.sort_by_key(|a| a.id);
        arcs
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Every arc a character has owned, completed first, in order.
    pub fn arcs_for(&self, character: CharacterId) -> Vec<&Arc> {
        let mut arcs: Vec<&Arc> = self
            .history
            .iter()
            .chain(self.active.values())
            .filter(|a| a.character_id == character)
            .collect();
        arcs.sort_by_key(|a| a.order);
        arcs
    }

    /// Parts needed to rebuild the store: active arcs by id, history, and
    /// the id counter.
    pub fn to_parts(&self) -> (Vec<Arc>, Vec<Arc>, u64) {
        let active = self.active().into_iter().cloned().collect();
        (active, self.history.clone(), self.next_id)
    }

    /// Rebuild from persisted parts. Arcs that appear in history are not
    /// re-registered as active. Persisted values are untrusted, so every arc
    /// is pulled back into its documented bounds.
    pub fn from_parts(active: Vec<Arc>, mut history: Vec<Arc>, next_id: u64) -> Self {
        let mut store = ArcStore::new();
        for arc in &mut history {
            arc.enforce_bounds();
            let latest = store.orders.entry(arc.character_id).or_insert(0);
            *latest = (*latest).max(arc.order);
            store.next_id = store.next_id.max(arc.id.0);
        }
        store.history = history;
        for mut arc in active {
            arc.enforce_bounds();
            if store.find_in_history(arc.id).is_none() {
                store.insert(arc);
            }
        }
        store.next_id = store.next_id.max(next_id);
        store
    }
}
