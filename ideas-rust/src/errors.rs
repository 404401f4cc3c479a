use ideaboard_sdk::LanguageModelError;
use thiserror::Error;

/// Failure of an idea generation request.
///
/// `Display` is safe to show to end users: it never includes the technical
/// cause. The cause of a [`IdeaError::Generation`] is available through
/// [`std::error::Error::source`] for diagnostics.
#[derive(Debug, Error)]
pub enum IdeaError {
    /// No API key is stored. The user has to configure one; retrying will not
    /// help.
    #[error("API key not configured")]
    Auth,
    /// The request reached the generation stage and failed there.
    #[error("idea generation failed")]
    Generation(#[from] GenerationFailure),
    #[error("topic must not be empty")]
    EmptyTopic,
    /// The spawned generation task was aborted before it finished.
    #[error("idea generation was cancelled")]
    Cancelled,
}

impl IdeaError {
    /// Whether the user may simply trigger the same request again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}

#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("language model error: {0}")]
    Model(#[from] LanguageModelError),
    #[error("malformed idea payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("generation task failed: {0}")]
    Task(String),
}
