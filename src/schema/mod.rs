//! Plain data shared across the engine. Everything here is serializable and
//! carries no behavior beyond small accessors.

pub mod arc;
pub mod character;
pub mod event;
pub mod failure;
pub mod generation;
pub mod integration;
pub mod outcome;
pub mod world;
