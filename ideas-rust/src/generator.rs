use crate::{
    credential::CredentialProvider, opentelemetry::trace_generate_ideas, prompt,
    task::GenerationTask, GeneratedIdea, GenerationFailure, IdeaError, Locale,
};
use ideaboard_sdk::{
    google::{GoogleModel, GoogleModelOptions},
    LanguageModel,
};
use reqwest::Client;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, warn};

pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";

/// Builds the model used for a request from the credential active at that
/// moment.
pub trait ModelFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Arc<dyn LanguageModel>;
}

impl<F> ModelFactory for F
where
    F: Fn(&str) -> Arc<dyn LanguageModel> + Send + Sync,
{
    fn create(&self, api_key: &str) -> Arc<dyn LanguageModel> {
        self(api_key)
    }
}

#[derive(Clone)]
pub struct GoogleModelFactoryOptions {
    pub model_id: String,
    pub base_url: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
}

impl Default for GoogleModelFactoryOptions {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            base_url: None,
            headers: None,
            client: None,
        }
    }
}

/// Creates [`GoogleModel`]s that share one HTTP client.
pub struct GoogleModelFactory {
    model_id: String,
    base_url: Option<String>,
    headers: Option<HashMap<String, String>>,
    client: Client,
}

impl GoogleModelFactory {
    #[must_use]
    pub fn new(options: GoogleModelFactoryOptions) -> Self {
        let GoogleModelFactoryOptions {
            model_id,
            base_url,
            headers,
            client,
        } = options;

        Self {
            model_id,
            base_url,
            headers,
            client: client.unwrap_or_default(),
        }
    }
}

impl ModelFactory for GoogleModelFactory {
    fn create(&self, api_key: &str) -> Arc<dyn LanguageModel> {
        Arc::new(GoogleModel::new(
            self.model_id.clone(),
            GoogleModelOptions {
                api_key: api_key.to_string(),
                base_url: self.base_url.clone(),
                headers: self.headers.clone(),
                client: Some(self.client.clone()),
            },
        ))
    }
}

/// Turns a topic into [`prompt::IDEA_COUNT`] structured ideas.
///
/// Every call is a single independent attempt: no retries, no caching, and
/// no shared state between concurrent calls apart from reading the
/// credential.
#[derive(Clone)]
pub struct IdeaGenerator {
    credentials: Arc<dyn CredentialProvider>,
    models: Arc<dyn ModelFactory>,
    locale: Locale,
}

impl IdeaGenerator {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialProvider>, models: Arc<dyn ModelFactory>) -> Self {
        Self {
            credentials,
            models,
            locale: Locale::default(),
        }
    }

    /// A generator backed by Gemini.
    #[must_use]
    pub fn google(
        credentials: Arc<dyn CredentialProvider>,
        options: GoogleModelFactoryOptions,
    ) -> Self {
        Self::new(credentials, Arc::new(GoogleModelFactory::new(options)))
    }

    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Generate ideas for `topic`, in the order the model produced them.
    ///
    /// Fails with [`IdeaError::EmptyTopic`] for a blank topic and with
    /// [`IdeaError::Auth`] when no credential is set; neither case reaches
    /// the network. Every other failure is an [`IdeaError::Generation`].
    pub async fn generate(&self, topic: &str) -> Result<Vec<GeneratedIdea>, IdeaError> {
        if topic.trim().is_empty() {
            warn!("idea generation requested for an empty topic");
            return Err(IdeaError::EmptyTopic);
        }

        let api_key = self.credentials.credential();
        if api_key.is_empty() {
            warn!("idea generation requested without an API key");
            return Err(IdeaError::Auth);
        }

        let model = self.models.create(&api_key);
        let input = prompt::build_input(topic, self.locale);

        trace_generate_ideas(self.locale, |span| async move {
            span.on_model(model.provider(), &model.model_id());

            let response = model
                .generate(input)
                .await
                .map_err(|e| log_failure(GenerationFailure::Model(e)))?;

            let ideas = parse_ideas(&response.text()).map_err(log_failure)?;
            debug!(count = ideas.len(), "ideas generated");
            Ok(ideas)
        })
        .await
    }

    /// Run [`Self::generate`] as a background task that can be aborted.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn(&self, topic: impl Into<String>) -> GenerationTask {
        let generator = self.clone();
        let topic = topic.into();
        GenerationTask::spawn(async move { generator.generate(&topic).await })
    }
}

fn parse_ideas(text: &str) -> Result<Vec<GeneratedIdea>, GenerationFailure> {
    Ok(serde_json::from_str(text.trim())?)
}

fn log_failure(failure: GenerationFailure) -> IdeaError {
    error!(error = %failure, "idea generation failed");
    IdeaError::Generation(failure)
}
