use crate::core::error::ArcError;
use crate::schema::arc::Arc;
use crate::schema::character::CharacterSnapshot;
use crate::schema::event::{InventoryEvent, InventoryEventKind, UpdateEvent};
use crate::schema::integration::{SideEffect, Subsystem};
use crate::schema::world::WorldStateSnapshot;

use super::unlock::is_unlocked;
use super::{foreign_event, Integration, IntegrationAdapter};

pub struct InventoryAdapter;

impl IntegrationAdapter for InventoryAdapter {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Inventory
    }

    fn integrate(
        &self,
        arc: &Arc,
        event: &UpdateEvent,
        character: &CharacterSnapshot,
        world: &WorldStateSnapshot,
    ) -> Result<Integration, ArcError> {
        match event {
            UpdateEvent::InventoryEvent(inventory) => {
                Ok(integrate_inventory(arc, inventory, character, world))
            }
            other => Err(foreign_event(self.subsystem(), other)),
        }
    }
}

pub fn integrate_inventory(
    arc: &Arc,
    event: &InventoryEvent,
    character: &CharacterSnapshot,
    _world: &WorldStateSnapshot,
) -> Integration {
    let mut out = Integration::from_arc(arc);
    let items = &mut out.arc.integration.inventory.acquired_items;
    match event.kind {
        InventoryEventKind::Acquired | InventoryEventKind::Crafted => {
            if !items.contains(&event.item_id) {
                items.push(event.item_id.clone());
            }
        }
        InventoryEventKind::Lost => items.retain(|i| i != &event.item_id),
        InventoryEventKind::Used => {}
    }
    out.side_effects = evaluate_inventory_unlocks(&mut out.arc, character);
    out
}

/// Surface key items, recipes and equipment tiers whose gates now hold.
pub fn evaluate_inventory_unlocks(arc: &mut Arc, character: &CharacterSnapshot) -> Vec<SideEffect> {
    let snapshot = arc.clone();
    let inventory = &mut arc.integration.inventory;
    let mut effects = Vec::new();

    for item in inventory.key_items.iter_mut().filter(|i| !i.unlocked) {
        if is_unlocked(&item.condition, &snapshot, character) {
            item.unlocked = true;
            effects.push(SideEffect::KeyItemUnlocked {
                item_id: item.item_id.clone(),
                name: item.name.clone(),
            });
        }
    }
    for recipe in inventory.crafting.iter_mut().filter(|c| !c.unlocked) {
        if is_unlocked(&recipe.condition, &snapshot, character) {
            recipe.unlocked = true;
            effects.push(SideEffect::CraftingUnlocked {
                recipe: recipe.recipe.clone(),
            });
        }
    }
    for tier in inventory.equipment_tiers.iter_mut().filter(|t| !t.unlocked) {
        if is_unlocked(&tier.condition, &snapshot, character) {
            tier.unlocked = true;
            effects.push(SideEffect::EquipmentTierUnlocked { tier: tier.tier });
        }
    }
    effects
}
