use ideaboard::{
    prompt::{ideas_schema, IDEA_COUNT},
    store::MemoryStore,
    CredentialStore, GeneratedIdea, GenerationFailure, IdeaError, IdeaGenerator, Locale,
    ModelFactory, StaticCredential,
};
use ideaboard_sdk::{
    mock::MockLanguageModel, LanguageModel, LanguageModelError, LanguageModelInput,
    LanguageModelResult, Message, ModelResponse, Part, ResponseFormatOption,
};
use serde_json::json;
use std::{
    error::Error,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// Hands out the same model for every key and records the keys it saw.
#[derive(Default)]
struct RecordingFactory {
    model: Arc<MockLanguageModel>,
    keys: Mutex<Vec<String>>,
}

impl ModelFactory for RecordingFactory {
    fn create(&self, api_key: &str) -> Arc<dyn LanguageModel> {
        self.keys
            .lock()
            .expect("keys poisoned")
            .push(api_key.to_string());
        self.model.clone()
    }
}

impl RecordingFactory {
    fn keys(&self) -> Vec<String> {
        self.keys.lock().expect("keys poisoned").clone()
    }
}

fn sample_ideas() -> Vec<GeneratedIdea> {
    vec![
        GeneratedIdea::new(
            "No-meeting Wednesdays",
            "Keep one weekday free of meetings for focused work.",
        )
        .with_tags(["focus", "meetings"]),
        GeneratedIdea::new(
            "Async standups",
            "Post daily updates in a shared channel instead of meeting.",
        )
        .with_tags(["async", "communication"]),
        GeneratedIdea::new("Automation budget", "").with_tags(["tooling"]),
        GeneratedIdea::new(
            "Pair rotation",
            "Rotate programming pairs weekly to spread knowledge.",
        ),
        GeneratedIdea::new(
            "Interrupt shield",
            "One person per day handles incoming requests for the team.",
        )
        .with_tags(["support", "focus", "process"]),
    ]
}

fn text_response(text: impl Into<String>) -> ModelResponse {
    ModelResponse {
        content: vec![Part::text(text)],
        ..Default::default()
    }
}

fn generator_with_key(key: &str) -> (IdeaGenerator, Arc<RecordingFactory>) {
    let factory = Arc::new(RecordingFactory::default());
    let generator = IdeaGenerator::new(Arc::new(StaticCredential::new(key)), factory.clone());
    (generator, factory)
}

#[tokio::test]
async fn generate_without_credential_fails_before_any_call() {
    let (generator, factory) = generator_with_key("");

    for topic in ["team productivity", "x", "  padded topic  "] {
        let error = generator
            .generate(topic)
            .await
            .expect_err("generation must fail without a key");
        assert!(matches!(error, IdeaError::Auth));
        assert_eq!(error.to_string(), "API key not configured");
    }

    assert!(factory.keys().is_empty());
    assert!(factory.model.tracked_generate_inputs().is_empty());
}

#[tokio::test]
async fn generate_rejects_blank_topics_without_calling_model() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");

    for topic in ["", "   ", "\n\t"] {
        let error = generator
            .generate(topic)
            .await
            .expect_err("blank topic is rejected");
        assert!(matches!(error, IdeaError::EmptyTopic));
    }

    assert!(factory.keys().is_empty());
}

#[tokio::test]
async fn generate_returns_ideas_in_service_order() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");
    let expected = sample_ideas();
    factory.model.enqueue_generate(text_response(
        serde_json::to_string(&expected).expect("serializable ideas"),
    ));

    let ideas = generator
        .generate("team productivity")
        .await
        .expect("generation succeeds");

    assert_eq!(ideas.len(), IDEA_COUNT);
    assert_eq!(ideas, expected);
    assert!(ideas.iter().all(|idea| !idea.title.is_empty()));
    assert_eq!(factory.keys(), vec!["AIzaSyABCDEFGHIJKL".to_string()]);
}

#[tokio::test]
async fn generate_sends_schema_constrained_request() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");
    let generator = generator.with_locale(Locale::English);
    factory.model.enqueue_generate(text_response(
        serde_json::to_string(&sample_ideas()).expect("serializable ideas"),
    ));

    generator
        .generate("team productivity")
        .await
        .expect("generation succeeds");

    let inputs = factory.model.tracked_generate_inputs();
    assert_eq!(inputs.len(), 1);
    let LanguageModelInput {
        messages,
        temperature,
        response_format,
        ..
    } = inputs[0].clone();

    assert_eq!(temperature, Some(0.8));
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        Message::User(user) => match user.content.as_slice() {
            [Part::Text(text)] => {
                assert!(text.text.contains("\"team productivity\""));
                assert!(text.text.contains("Propose 5"));
            }
            other => panic!("unexpected prompt parts: {other:?}"),
        },
        other => panic!("unexpected message: {other:?}"),
    }
    match response_format {
        Some(ResponseFormatOption::Json(format)) => {
            assert_eq!(format.schema, Some(ideas_schema(Locale::English)));
        }
        other => panic!("unexpected response format: {other:?}"),
    }
}

#[tokio::test]
async fn generate_maps_invalid_payload_to_generation_error() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");
    factory
        .model
        .enqueue_generate(text_response("[{\"title\": \"Half an idea\""));

    let error = generator
        .generate("team productivity")
        .await
        .expect_err("invalid payload fails");

    assert_eq!(error.to_string(), "idea generation failed");
    assert!(error.is_retryable());
    match error {
        IdeaError::Generation(GenerationFailure::MalformedPayload(_)) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn generate_rejects_ideas_with_extra_or_missing_fields() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");
    factory.model.enqueue_generate(text_response(
        json!([
            { "title": "Valid", "description": "", "tags": [] },
            { "title": "Extra", "description": "", "tags": [], "priority": "high" }
        ])
        .to_string(),
    ));
    factory.model.enqueue_generate(text_response(
        json!([{ "title": "Missing tags", "description": "" }]).to_string(),
    ));

    for _ in 0..2 {
        let error = generator
            .generate("team productivity")
            .await
            .expect_err("schema violation fails");
        assert!(matches!(
            error,
            IdeaError::Generation(GenerationFailure::MalformedPayload(_))
        ));
    }
}

#[tokio::test]
async fn generate_maps_model_errors_and_keeps_cause() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");
    factory
        .model
        .enqueue_generate(LanguageModelError::StatusCode(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "{\"error\":{\"message\":\"Resource has been exhausted\"}}".to_string(),
        ));

    let error = generator
        .generate("team productivity")
        .await
        .expect_err("model error fails");

    assert_eq!(error.to_string(), "idea generation failed");
    let cause = error.source().expect("cause kept for diagnostics");
    assert!(cause.to_string().contains("Resource has been exhausted"));
    assert!(matches!(
        error,
        IdeaError::Generation(GenerationFailure::Model(LanguageModelError::StatusCode(..)))
    ));
}

#[tokio::test]
async fn generate_ignores_reasoning_parts() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");
    let expected = sample_ideas();
    factory.model.enqueue_generate(ModelResponse {
        content: vec![
            Part::reasoning("Listing ideas about focus time first."),
            Part::text(serde_json::to_string(&expected).expect("serializable ideas")),
        ],
        ..Default::default()
    });

    let ideas = generator
        .generate("team productivity")
        .await
        .expect("generation succeeds");

    assert_eq!(ideas, expected);
}

#[tokio::test]
async fn generate_uses_credential_active_at_call_time() {
    let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new())));
    let factory = Arc::new(RecordingFactory::default());
    let generator = IdeaGenerator::new(credentials.clone(), factory.clone());

    assert!(matches!(
        generator.generate("team productivity").await,
        Err(IdeaError::Auth)
    ));

    credentials.set("first-api-key-0001").expect("set succeeds");
    factory.model.enqueue_generate(text_response("[]"));
    generator
        .generate("team productivity")
        .await
        .expect("generation succeeds");

    credentials.set("second-api-key-0002").expect("set succeeds");
    factory.model.enqueue_generate(text_response("[]"));
    generator
        .generate("team productivity")
        .await
        .expect("generation succeeds");

    assert_eq!(
        factory.keys(),
        vec![
            "first-api-key-0001".to_string(),
            "second-api-key-0002".to_string()
        ]
    );
}

#[tokio::test]
async fn closures_can_act_as_model_factories() {
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(text_response("[]"));
    let calls = Arc::new(AtomicUsize::new(0));

    let factory = {
        let model = model.clone();
        let calls = calls.clone();
        move |_api_key: &str| -> Arc<dyn LanguageModel> {
            calls.fetch_add(1, Ordering::SeqCst);
            model.clone()
        }
    };
    let generator = IdeaGenerator::new(
        Arc::new(StaticCredential::new("AIzaSyABCDEFGHIJKL")),
        Arc::new(factory),
    );

    let ideas = generator
        .generate("team productivity")
        .await
        .expect("generation succeeds");

    assert!(ideas.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Answers with one idea whose title is the prompt, after a per-prompt delay.
struct EchoModel;

#[async_trait::async_trait]
impl LanguageModel for EchoModel {
    fn provider(&self) -> &'static str {
        "echo"
    }

    fn model_id(&self) -> String {
        "echo-model".to_string()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        let prompt = match input.messages.first() {
            Some(Message::User(user)) => match user.content.first() {
                Some(Part::Text(text)) => text.text.clone(),
                _ => String::new(),
            },
            _ => String::new(),
        };
        let delay = if prompt.contains("slow") { 50 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let ideas = vec![GeneratedIdea::new(prompt, "echo")];
        Ok(text_response(
            serde_json::to_string(&ideas).expect("serializable ideas"),
        ))
    }
}

#[tokio::test]
async fn concurrent_generations_resolve_independently() {
    let generator = IdeaGenerator::new(
        Arc::new(StaticCredential::new("AIzaSyABCDEFGHIJKL")),
        Arc::new(|_: &str| -> Arc<dyn LanguageModel> { Arc::new(EchoModel) }),
    )
    .with_locale(Locale::English);

    let (slow, fast) = tokio::join!(
        generator.generate("slow topic"),
        generator.generate("fast topic")
    );

    let slow = slow.expect("slow generation succeeds");
    let fast = fast.expect("fast generation succeeds");
    assert_eq!(slow.len(), 1);
    assert_eq!(fast.len(), 1);
    assert!(slow[0].title.contains("\"slow topic\""));
    assert!(fast[0].title.contains("\"fast topic\""));
}

/// Never answers.
struct PendingModel;

#[async_trait::async_trait]
impl LanguageModel for PendingModel {
    fn provider(&self) -> &'static str {
        "pending"
    }

    fn model_id(&self) -> String {
        "pending-model".to_string()
    }

    async fn generate(&self, _input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        futures::future::pending().await
    }
}

#[tokio::test]
async fn spawned_generation_can_be_aborted() {
    let generator = IdeaGenerator::new(
        Arc::new(StaticCredential::new("AIzaSyABCDEFGHIJKL")),
        Arc::new(|_: &str| -> Arc<dyn LanguageModel> { Arc::new(PendingModel) }),
    );

    let task = generator.spawn("team productivity");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!task.is_finished());

    task.abort();
    let error = task.await.expect_err("aborted task fails");
    assert!(matches!(error, IdeaError::Cancelled));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn spawned_generation_yields_result() {
    let (generator, factory) = generator_with_key("AIzaSyABCDEFGHIJKL");
    let expected = sample_ideas();
    factory.model.enqueue_generate(text_response(
        serde_json::to_string(&expected).expect("serializable ideas"),
    ));

    let ideas = generator
        .spawn("team productivity")
        .await
        .expect("generation succeeds");

    assert_eq!(ideas, expected);
}

#[tokio::test]
async fn spawned_generation_reports_auth_error() {
    let (generator, _factory) = generator_with_key("");

    let error = generator
        .spawn("team productivity")
        .await
        .expect_err("generation fails");

    assert!(matches!(error, IdeaError::Auth));
}
