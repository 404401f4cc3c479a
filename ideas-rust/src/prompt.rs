use crate::Locale;
use ideaboard_sdk::{
    JSONSchema, LanguageModelInput, Message, ResponseFormatJson, ResponseFormatOption,
};
use serde_json::json;

/// Number of ideas requested per generation.
pub const IDEA_COUNT: usize = 5;

/// Sampling temperature, tuned for varied rather than repeatable ideas.
pub const IDEA_TEMPERATURE: f64 = 0.8;

const RESPONSE_FORMAT_NAME: &str = "ideas";

struct FieldDescriptions {
    title: &'static str,
    description: &'static str,
    tags: &'static str,
}

fn field_descriptions(locale: Locale) -> FieldDescriptions {
    match locale {
        Locale::Japanese => FieldDescriptions {
            title: "アイデアの簡潔なタイトル (日本語)",
            description: "アイデアの具体的な説明 (日本語)",
            tags: "関連するタグの配列 (日本語)",
        },
        Locale::English => FieldDescriptions {
            title: "A concise title for the idea (English)",
            description: "A concrete description of the idea (English)",
            tags: "Related tags (English)",
        },
    }
}

/// The instruction sent to the model. The topic is embedded verbatim.
#[must_use]
pub fn build_prompt(topic: &str, locale: Locale) -> String {
    match locale {
        Locale::Japanese => format!(
            "「{topic}」というテーマに関するブレインストーミングのアイデアを{IDEA_COUNT}つ、\
             創造的かつ具体的に提案してください。それぞれのアイデアにはタイトル、説明、\
             そして関連タグを含めてください。"
        ),
        Locale::English => format!(
            "Propose {IDEA_COUNT} creative and concrete brainstorming ideas on the theme \
             \"{topic}\". Each idea must include a title, a description, and related tags. \
             Write everything in English."
        ),
    }
}

/// JSON Schema of the expected payload: exactly [`IDEA_COUNT`] objects with
/// `title`, `description` and `tags`, and nothing else.
#[must_use]
pub fn ideas_schema(locale: Locale) -> JSONSchema {
    let descriptions = field_descriptions(locale);
    json!({
        "type": "array",
        "minItems": IDEA_COUNT,
        "maxItems": IDEA_COUNT,
        "items": {
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": descriptions.title,
                },
                "description": {
                    "type": "string",
                    "description": descriptions.description,
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": descriptions.tags,
                },
            },
            "required": ["title", "description", "tags"],
            "additionalProperties": false,
        },
    })
}

/// The complete, schema-constrained model request for `topic`.
#[must_use]
pub fn build_input(topic: &str, locale: Locale) -> LanguageModelInput {
    LanguageModelInput {
        messages: vec![Message::user(vec![build_prompt(topic, locale)])],
        temperature: Some(IDEA_TEMPERATURE),
        response_format: Some(ResponseFormatOption::Json(ResponseFormatJson {
            name: RESPONSE_FORMAT_NAME.to_string(),
            description: Some("Brainstorming ideas for a topic".to_string()),
            schema: Some(ideas_schema(locale)),
        })),
        ..Default::default()
    }
}
