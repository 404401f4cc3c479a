use serde::{Deserialize, Serialize};
use std::fmt;

/// A single brainstorming idea as returned by the model.
///
/// Ideas are never persisted; they belong to whoever requested them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GeneratedIdea {
    /// Short display title.
    pub title: String,
    /// Longer explanation. May be empty.
    pub description: String,
    /// Related tags, in the order the model produced them. May be empty.
    pub tags: Vec<String>,
}

impl GeneratedIdea {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// The display language ideas are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Japanese,
    English,
}

impl Locale {
    /// BCP 47 language tag.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Japanese => "ja",
            Self::English => "en",
        }
    }

    /// Parse a language tag such as `ja`, `en` or `en-US`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let language = tag.split(['-', '_']).next()?.to_ascii_lowercase();
        match language.as_str() {
            "ja" => Some(Self::Japanese),
            "en" => Some(Self::English),
            _ => None,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn idea_rejects_unknown_fields() {
        let result = serde_json::from_value::<GeneratedIdea>(json!({
            "title": "Pair programming rotations",
            "description": "",
            "tags": [],
            "priority": "high"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn idea_requires_tags() {
        let result = serde_json::from_value::<GeneratedIdea>(json!({
            "title": "Pair programming rotations",
            "description": "Rotate pairs weekly."
        }));

        assert!(result.is_err());
    }

    #[test]
    fn locale_from_tag_accepts_regions() {
        assert_eq!(Locale::from_tag("en-US"), Some(Locale::English));
        assert_eq!(Locale::from_tag("ja_JP"), Some(Locale::Japanese));
        assert_eq!(Locale::from_tag("JA"), Some(Locale::Japanese));
        assert_eq!(Locale::from_tag("fr"), None);
        assert_eq!(Locale::from_tag(""), None);
    }
}
