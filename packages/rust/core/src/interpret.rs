//! Reading a model reply into a partially filled [`RawArticle`].
//!
//! Stages, first hit wins:
//!
//! 1. the whole reply (minus a surrounding code fence) is a JSON object;
//! 2. the first well-formed JSON object embedded in the text;
//! 3. plain prose: first line is the title, the rest become paragraphs.
//!
//! Prose is only used when the reply contains no JSON object at all.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::html::{escape, truncate_chars};

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```$").expect("valid regex")
});

static OBJECT_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*""#).expect("valid regex"));

/// Article fields as the model supplied them. Every field is optional;
/// empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    pub title: Option<String>,
    pub html: Option<String>,
    pub excerpt: Option<String>,
    pub meta_description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl RawArticle {
    /// Title and body are both present.
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.html.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields of `self`, with gaps filled from `other`.
    pub fn or(self, other: RawArticle) -> RawArticle {
        RawArticle {
            title: self.title.or(other.title),
            html: self.html.or(other.html),
            excerpt: self.excerpt.or(other.excerpt),
            meta_description: self.meta_description.or(other.meta_description),
            tags: self.tags.or(other.tags),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let text = |keys: &[&str]| {
            keys.iter().find_map(|k| {
                obj.get(*k)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        };
        Self {
            title: text(&["title"]),
            html: text(&["html", "body_html", "body"]),
            excerpt: text(&["excerpt", "summary"]),
            meta_description: text(&["meta_description", "metaDescription"]),
            tags: obj.get("tags").and_then(tag_list),
        }
    }
}

/// Tags as a JSON array of strings or one comma-separated string.
fn tag_list(value: &Value) -> Option<Vec<String>> {
    let tags: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(csv) => csv.split(',').map(str::to_string).collect(),
        _ => return None,
    };
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    (!tags.is_empty()).then_some(tags)
}

/// Which stage produced an [`Interpretation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Json,
    EmbeddedJson,
    Prose,
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub article: RawArticle,
    pub stage: Stage,
}

/// Interpret one reply. `title_cap` bounds prose titles.
pub fn interpret(reply: &str, title_cap: usize) -> Interpretation {
    let trimmed = reply.trim();
    let unfenced = FENCE_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(unfenced) {
        return Interpretation {
            article: RawArticle::from_object(&obj),
            stage: Stage::Json,
        };
    }

    if let Some(obj) = first_embedded_object(trimmed) {
        return Interpretation {
            article: RawArticle::from_object(&obj),
            stage: Stage::EmbeddedJson,
        };
    }

    let article = prose(trimmed, title_cap);
    let stage = if article.is_empty() {
        Stage::Nothing
    } else {
        Stage::Prose
    };
    Interpretation { article, stage }
}

/// The first position where a complete JSON object parses.
fn first_embedded_object(text: &str) -> Option<Map<String, Value>> {
    OBJECT_START_RE.find_iter(text).find_map(|m| {
        let mut stream = serde_json::Deserializer::from_str(&text[m.start()..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(obj))) => Some(obj),
            _ => None,
        }
    })
}

fn prose(text: &str, title_cap: usize) -> RawArticle {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return RawArticle::default();
    };

    let title = first
        .trim_start_matches('#')
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_')
        .trim();
    let title = truncate_chars(title, title_cap);

    let paragraphs: Vec<String> = lines.map(|l| format!("<p>{}</p>", escape(l))).collect();

    RawArticle {
        title: (!title.is_empty()).then_some(title),
        html: (!paragraphs.is_empty()).then(|| paragraphs.join("\n")),
        ..RawArticle::default()
    }
}
