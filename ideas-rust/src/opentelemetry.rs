use crate::{GeneratedIdea, IdeaError, Locale};
use opentelemetry::trace::Status;
use std::future::Future;
use tracing::{info_span, Span};
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct IdeaSpan {
    span: Span,
}

impl IdeaSpan {
    pub fn new(locale: Locale) -> Self {
        let span = info_span!("ideaboard.generate_ideas");
        span.set_attribute("gen_ai.operation.name", "generate_ideas");
        span.set_attribute("ideaboard.locale", locale.tag());
        Self { span }
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn on_model(&self, provider: &str, model_id: &str) {
        self.span
            .set_attribute("gen_ai.provider.name", provider.to_string());
        self.span
            .set_attribute("gen_ai.request.model", model_id.to_string());
    }

    pub fn on_ideas(&self, ideas: &[GeneratedIdea]) {
        self.span.set_attribute(
            "ideaboard.idea_count",
            i64::try_from(ideas.len()).unwrap_or(i64::MAX),
        );
    }

    pub fn on_error(&self, error: &IdeaError) {
        let message = match std::error::Error::source(error) {
            Some(cause) => format!("{error}: {cause}"),
            None => error.to_string(),
        };
        self.span.set_attribute("exception.message", message.clone());
        self.span.set_status(Status::error(message));
    }
}

/// Run one idea generation inside an `ideaboard.generate_ideas` span.
pub async fn trace_generate_ideas<F, Fut>(
    locale: Locale,
    f: F,
) -> Result<Vec<GeneratedIdea>, IdeaError>
where
    F: FnOnce(IdeaSpan) -> Fut,
    Fut: Future<Output = Result<Vec<GeneratedIdea>, IdeaError>>,
{
    let span = IdeaSpan::new(locale);
    let result = f(span.clone()).instrument(span.span()).await;

    match &result {
        Ok(ideas) => span.on_ideas(ideas),
        Err(error) => span.on_error(error),
    }

    result
}
