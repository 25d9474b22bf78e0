use thiserror::Error;

use crate::model::Span;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Malformed input, or an interval outside business hours.
    #[error("{0}")]
    Validation(String),
    #[error("the requested time {requested} overlaps an existing booking {existing}")]
    Conflict { requested: Span, existing: Span },
    #[error("unknown space category: {0}")]
    NotFound(String),
    /// Durable storage unreadable or unwritable.
    #[error("storage error: {0}")]
    Persistence(String),
}

impl EngineError {
    /// Short label for metrics and the wire `error.kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::Conflict { .. } => "conflict",
            EngineError::NotFound(_) => "not_found",
            EngineError::Persistence(_) => "persistence",
        }
    }

    /// Expected outcomes the caller renders to the user, as opposed to
    /// storage failures.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Persistence(_))
    }

    pub(crate) fn persistence(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        EngineError::Persistence(format!("{}: {err}", path.display()))
    }
}
