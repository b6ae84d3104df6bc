use thiserror::Error;

/// Everything the quiz engine can report to its host. None of these are fatal:
/// the session stays where it was until a valid load or command arrives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("no valid category lines found")]
    EmptyCatalog,
    #[error("could not read {source_name}: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
    #[error("no catalog loaded")]
    NotLoaded,
    #[error("no group is being presented")]
    NotPresenting,
    #[error("invalid quiz config: {0}")]
    InvalidConfig(String),
}

impl QuizError {
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = QuizError> = std::result::Result<T, E>;
