use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::template::TemplateError;
use crate::schema::arc::ArcId;

#[derive(Debug, Error)]
pub enum ArcError {
    #[error("arc not found: {0}")]
    NotFound(ArcId),
    #[error("arc generation failed: {0}")]
    Generation(String),
    #[error("invalid generation input: {0}")]
    Validation(String),
    #[error("{adapter} adapter does not handle {event} events")]
    Integration {
        adapter: &'static str,
        event: &'static str,
    },
    #[error("arc {0} is already completed")]
    AlreadyCompleted(ArcId),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session script: {0}")]
    Script(String),
}

impl ArcError {
    /// Stable short name for the error kind, used at serialization boundaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Generation(_) | Self::Template(_) => "generation",
            Self::Validation(_) => "validation",
            Self::Integration { .. } => "integration",
            Self::AlreadyCompleted(_) => "already_completed",
            Self::Config(_) => "config",
            Self::Snapshot(_) => "snapshot",
            Self::Io { .. } => "io",
            Self::Script(_) => "script",
        }
    }
}
