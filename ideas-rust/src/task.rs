use crate::{GeneratedIdea, GenerationFailure, IdeaError};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::task::JoinHandle;
use tracing::error;

/// Handle to an idea generation running in the background.
///
/// Awaiting the handle yields the generation result. [`Self::abort`] stops
/// the request; the handle then resolves to [`IdeaError::Cancelled`].
/// Dropping the handle detaches the task without aborting it.
pub struct GenerationTask {
    handle: JoinHandle<Result<Vec<GeneratedIdea>, IdeaError>>,
}

impl GenerationTask {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<Vec<GeneratedIdea>, IdeaError>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for GenerationTask {
    type Output = Result<Vec<GeneratedIdea>, IdeaError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(join_error) if join_error.is_cancelled() => Err(IdeaError::Cancelled),
            Err(join_error) => {
                error!(error = %join_error, "idea generation task failed");
                Err(GenerationFailure::Task(join_error.to_string()).into())
            }
        })
    }
}
