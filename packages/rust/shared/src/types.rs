//! Core domain types shared by the catalog, selection, generation and
//! publishing stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------

/// A store product as seen by the pipeline.
///
/// Only products with at least one image are ever materialized; catalog
/// implementations drop image-less records before returning them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend identifier, unique per store.
    pub id: u64,
    /// Display title.
    pub title: String,
    /// URL-safe slug.
    pub handle: String,
    /// Public storefront URL (`https://<storefront>/products/<handle>`).
    pub url: String,
    /// Primary image URL.
    pub image: String,
    /// Creation timestamp, used for recency ordering.
    pub created_at: DateTime<Utc>,
    /// Raw comma-separated tag string.
    #[serde(default)]
    pub tags: String,
    /// Vendor name.
    #[serde(default)]
    pub vendor: String,
}

/// Product URLs in the given order; the only links an article may carry.
pub fn product_urls(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.url.as_str()).collect()
}

/// Public product URL for a handle on the given storefront domain.
pub fn product_url(storefront_domain: &str, handle: &str) -> String {
    let domain = storefront_domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{domain}/products/{handle}")
}

/// A curated collection, used only to locate product pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: u64,
    pub title: String,
    pub handle: String,
}

/// Sort order for store-wide product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrder {
    #[default]
    NewestFirst,
}

impl ProductOrder {
    /// Value for the backend's `order` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::NewestFirst => "created_at desc",
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Enumerated season tags a season window can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeasonTag {
    NewYear,
    HeritageMonth,
    Valentines,
    Spring,
    MothersDay,
    Summer,
    BackToSchool,
    Halloween,
    BlackFriday,
    WinterHoliday,
}

impl SeasonTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewYear => "new-year",
            Self::HeritageMonth => "heritage-month",
            Self::Valentines => "valentines",
            Self::Spring => "spring",
            Self::MothersDay => "mothers-day",
            Self::Summer => "summer",
            Self::BackToSchool => "back-to-school",
            Self::Halloween => "halloween",
            Self::BlackFriday => "black-friday",
            Self::WinterHoliday => "winter-holiday",
        }
    }
}

impl std::fmt::Display for SeasonTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which selection tier produced a [`SelectionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionTier {
    Seasonal,
    Freshness,
    CollectionFallback,
}

impl std::fmt::Display for SelectionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Seasonal => "seasonal",
            Self::Freshness => "freshness",
            Self::CollectionFallback => "collection-fallback",
        })
    }
}

/// The products and topic a post is about. Never empty.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    products: Vec<Product>,
    topic: String,
    season: Option<SeasonTag>,
    tier: SelectionTier,
}

impl SelectionResult {
    /// Build a selection; returns `None` for an empty product list.
    pub fn new(
        products: Vec<Product>,
        topic: impl Into<String>,
        season: Option<SeasonTag>,
        tier: SelectionTier,
    ) -> Option<Self> {
        if products.is_empty() {
            return None;
        }
        Some(Self {
            products,
            topic: topic.into(),
            season,
            tier,
        })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn season(&self) -> Option<SeasonTag> {
        self.season
    }

    pub fn tier(&self) -> SelectionTier {
        self.tier
    }
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

/// Normalized, platform-agnostic article content.
///
/// Serializes to the same JSON shape the generation prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    /// Body HTML.
    #[serde(rename = "html")]
    pub body: String,
    pub excerpt: String,
    pub meta_description: String,
    pub tags: Vec<String>,
}

/// Featured image attached to an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleImage {
    pub src: String,
    pub alt: String,
}

/// A typed metafield attached to an article after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafield {
    pub namespace: String,
    pub key: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: String,
}

/// Backend-ready article payload produced by the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRequest {
    pub title: String,
    pub author: String,
    /// Comma-joined tag list.
    pub tags: String,
    pub body_html: String,
    /// Excerpt shown in blog listings.
    pub summary_html: String,
    /// `true` publishes immediately, `false` leaves a draft.
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ArticleImage>,
    /// SEO description, written separately after the article exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metafield: Option<Metafield>,
}

/// What the backend returned after creating an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArticle {
    pub id: u64,
    pub title: String,
    pub handle: String,
    /// `None` while the article is a draft.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PublishedArticle {
    pub fn is_live(&self) -> bool {
        self.published_at.is_some()
    }
}

/// How the target blog is addressed in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlogRef {
    Id(u64),
    Handle(String),
}

impl std::str::FromStr for BlogRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<u64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Handle(s.to_string()),
        })
    }
}

impl std::fmt::Display for BlogRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Handle(handle) => f.write_str(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64) -> Product {
        Product {
            id,
            title: format!("Product {id}"),
            handle: format!("product-{id}"),
            url: product_url("shop.example.com", &format!("product-{id}")),
            image: format!("https://cdn.example.com/{id}.jpg"),
            created_at: Utc::now(),
            tags: String::new(),
            vendor: "Acme".into(),
        }
    }

    #[test]
    fn product_url_normalizes_domain() {
        assert_eq!(
            product_url("https://shop.example.com/", "blue-hoodie"),
            "https://shop.example.com/products/blue-hoodie"
        );
        assert_eq!(
            product_url("brand63.myshopify.com", "cap"),
            "https://brand63.myshopify.com/products/cap"
        );
    }

    #[test]
    fn selection_rejects_empty_products() {
        assert!(SelectionResult::new(vec![], "x", None, SelectionTier::Freshness).is_none());

        let sel = SelectionResult::new(
            vec![product(1), product(2)],
            "New Arrivals",
            None,
            SelectionTier::Freshness,
        )
        .expect("non-empty selection");
        assert_eq!(sel.products().len(), 2);
        assert_eq!(
            product_urls(sel.products()),
            vec![
                "https://shop.example.com/products/product-1",
                "https://shop.example.com/products/product-2"
            ]
        );
    }

    #[test]
    fn draft_serializes_body_as_html() {
        let draft = ArticleDraft {
            title: "T".into(),
            body: "<p>b</p>".into(),
            excerpt: "e".into(),
            meta_description: "m".into(),
            tags: vec!["a".into()],
        };
        let json = serde_json::to_value(&draft).expect("serialize");
        assert_eq!(json["html"], "<p>b</p>");
        assert!(json.get("body").is_none());
    }

    #[test]
    fn blog_ref_parses_ids_and_handles() {
        assert_eq!("123".parse::<BlogRef>().unwrap(), BlogRef::Id(123));
        assert_eq!(
            " news ".parse::<BlogRef>().unwrap(),
            BlogRef::Handle("news".into())
        );
    }

    #[test]
    fn season_tag_serde_matches_as_str() {
        let json = serde_json::to_string(&SeasonTag::BackToSchool).unwrap();
        assert_eq!(json, "\"back-to-school\"");
        assert_eq!(SeasonTag::BackToSchool.as_str(), "back-to-school");
    }
}
