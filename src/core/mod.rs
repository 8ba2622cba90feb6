pub mod analytics;
pub mod config;
pub mod detection;
pub mod difficulty;
pub mod error;
pub mod generation;
pub mod integration;
pub mod manager;
pub mod metrics;
pub mod progress;
pub mod recovery;
pub mod script;
pub mod store;
pub mod support;
pub mod template;
