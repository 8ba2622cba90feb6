//! Arc Engine: narrative arc orchestration for interactive fiction.
//!
//! Creates multi-phase story arcs, tracks objectives and player agency,
//! detects when a player is struggling, offers recovery paths, adapts
//! difficulty and support, and keeps combat, quest, progression, inventory
//! and relationship subsystems in step with the narrative.
//!
//! Start with [`core::manager::ArcManager::builder`].

pub mod core;
pub mod schema;
