//! Article generation with a one-shot repair round.
//!
//! The model is asked for JSON, but whatever comes back is turned into a
//! complete [`ArticleDraft`]: malformed output is never an error. Only a
//! transport failure on the primary call is.

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use shopscribe_shared::{
    AppConfig, ArticleDraft, CompletionRequest, GenerationService, LimitsConfig, Product, Result,
    product_urls,
};

use crate::html::{escape, first_words, strip_foreign_links, strip_tags, truncate_chars};
use crate::interpret::{RawArticle, interpret};

/// Fixed tags appended to the topic when the model supplies none.
const DEFAULT_TAGS: [&str; 2] = ["trending", "gift ideas"];

/// How many service calls one generation may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairPolicy {
    /// Primary call included; `2` means one repair round.
    pub max_attempts: u32,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub max_tokens: u32,
    pub repair_max_tokens: u32,
    /// Attach the article JSON schema to requests.
    pub structured_output: bool,
    pub limits: LimitsConfig,
    /// Fallback tag derived from the author name.
    pub brand_tag: String,
    pub repair: RepairPolicy,
}

impl GeneratorOptions {
    pub fn from_config(config: &AppConfig, author: &str) -> Self {
        Self {
            max_tokens: config.openai.max_tokens,
            repair_max_tokens: config.openai.repair_max_tokens,
            structured_output: config.openai.structured_output,
            limits: config.limits.clone(),
            brand_tag: brand_tag(author),
            repair: RepairPolicy::default(),
        }
    }
}

/// `"Brand 63"` becomes `"brand63"`.
pub fn brand_tag(author: &str) -> String {
    author
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// JSON schema of the reply shape, for strict structured output.
pub fn article_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["title", "html", "excerpt", "meta_description", "tags"],
        "properties": {
            "title": { "type": "string" },
            "html": { "type": "string" },
            "excerpt": { "type": "string" },
            "meta_description": { "type": "string" },
            "tags": { "type": "array", "items": { "type": "string" } }
        }
    })
}

pub fn build_prompt(topic: &str, products: &[Product]) -> String {
    let product_lines: Vec<String> = products
        .iter()
        .map(|p| format!("- {}: {}", p.title, p.url))
        .collect();

    format!(
        r#"You are writing a Shopify blog post about "{topic}" to increase organic traffic, search authority, reader interest, and conversions.

RULES:
- Use ONLY the internal product URLs provided. No external links.
- 600-800 words.
- Use clear <h2>/<h3> headings and helpful paragraphs.
- Helpful, friendly tone. No fluff.
- Naturally recommend these products:
{products}

Return ONLY valid JSON with EXACTLY these keys:
{{
  "title": "60-70 character SEO title",
  "html": "<h2>...</h2><p>...</p> (full article body, HTML only)",
  "excerpt": "20-30 word summary for previews",
  "meta_description": "120-160 character SEO description",
  "tags": ["3 to 6 short tags"]
}}
Do not add any text outside JSON."#,
        products = product_lines.join("\n"),
    )
}

pub fn build_repair_prompt(previous: &str) -> String {
    format!(
        "Convert to valid JSON with keys title, html, excerpt, meta_description, tags only:\n\n{previous}"
    )
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Turns a topic and products into an [`ArticleDraft`].
pub struct ContentGenerator<'a> {
    service: &'a dyn GenerationService,
    options: GeneratorOptions,
}

impl<'a> ContentGenerator<'a> {
    pub fn new(service: &'a dyn GenerationService, options: GeneratorOptions) -> Self {
        Self { service, options }
    }

    fn request(&self, prompt: String, max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            prompt,
            max_tokens,
            schema: self.options.structured_output.then(article_schema),
        }
    }

    #[instrument(skip_all, fields(topic = %topic, products = products.len()))]
    pub async fn generate(&self, topic: &str, products: &[Product]) -> Result<ArticleDraft> {
        let title_cap = self.options.limits.title_chars;

        let first_text = self
            .service
            .complete(&self.request(build_prompt(topic, products), self.options.max_tokens))
            .await?;
        let first = interpret(&first_text, title_cap);
        debug!(stage = ?first.stage, complete = first.article.is_complete(), "interpreted reply");

        let mut article = first.article;
        let mut attempts = 1;
        while !article.is_complete() && attempts < self.options.repair.max_attempts {
            attempts += 1;
            info!(attempt = attempts, "reply incomplete, requesting repair");
            let repair = self.request(
                build_repair_prompt(&first_text),
                self.options.repair_max_tokens,
            );
            match self.service.complete(&repair).await {
                Ok(text) => {
                    let repaired = interpret(&text, title_cap);
                    debug!(stage = ?repaired.stage, "interpreted repair reply");
                    article = repaired.article.or(article);
                }
                Err(e) => {
                    warn!(error = %e, "repair request failed, keeping first reply");
                    break;
                }
            }
        }

        Ok(finalize(article, topic, &product_urls(products), &self.options))
    }
}

/// Fill every gap with a local default, enforce caps and strip links
/// outside `allowed`.
fn finalize(
    raw: RawArticle,
    topic: &str,
    allowed: &[&str],
    options: &GeneratorOptions,
) -> ArticleDraft {
    let limits = &options.limits;

    let title = raw.title.unwrap_or_else(|| topic.to_string());
    let title = truncate_chars(title.trim(), limits.title_chars);

    // Unwrapping foreign links can leave nothing behind.
    let body = raw
        .html
        .map(|html| strip_foreign_links(&html, allowed))
        .filter(|html| !strip_tags(html).is_empty())
        .unwrap_or_else(|| format!("<p>{}</p>", escape(topic)));

    let excerpt = raw
        .excerpt
        .map(|e| strip_tags(&e))
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| first_words(&strip_tags(&body), limits.excerpt_words));
    let excerpt = if excerpt.is_empty() {
        topic.to_string()
    } else {
        excerpt
    };
    let excerpt = truncate_chars(&excerpt, limits.excerpt_chars);

    let meta_description = raw
        .meta_description
        .map(|m| strip_tags(&m))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| excerpt.clone());
    let meta_description = truncate_chars(&meta_description, limits.meta_description_chars);

    let mut tags = normalize_tags(raw.tags.unwrap_or_default(), limits.max_tags);
    if tags.is_empty() {
        tags = normalize_tags(default_tags(topic, &options.brand_tag), limits.max_tags);
    }

    ArticleDraft {
        title,
        body,
        excerpt,
        meta_description,
        tags,
    }
}

fn default_tags(topic: &str, brand: &str) -> Vec<String> {
    std::iter::once(topic)
        .chain(DEFAULT_TAGS)
        .chain(std::iter::once(brand))
        .map(str::to_string)
        .collect()
}

/// Trim, drop empties, dedupe case-insensitively (first spelling wins), cap.
fn normalize_tags(tags: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .take(max)
        .collect()
}
