//! Interfaces to the outside world: the commerce catalog, the blog
//! backend and the generative-text service.
//!
//! The pipeline only ever talks to these traits, so tests drive it with
//! in-memory fakes and the CLI wires in the HTTP clients.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ArticleRequest, BlogRef, CollectionRef, Metafield, ProductOrder, Product, PublishedArticle,
};

/// Read-only access to store products and collections.
///
/// Implementations must drop products that have no image.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Active products store-wide, at most `limit`, in `order`.
    async fn list_active_products(&self, limit: usize, order: ProductOrder)
    -> Result<Vec<Product>>;

    /// Every collection in the store.
    async fn list_collections(&self) -> Result<Vec<CollectionRef>>;

    /// Products of one collection, at most `limit`.
    async fn list_products_in_collection(
        &self,
        collection_id: u64,
        limit: usize,
    ) -> Result<Vec<Product>>;
}

/// Write access to the blog backend.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Resolve a configured blog reference to a backend blog id.
    async fn resolve_blog(&self, blog: &BlogRef) -> Result<u64>;

    /// Create an article in the given blog.
    async fn create_article(&self, blog_id: u64, request: &ArticleRequest)
    -> Result<PublishedArticle>;

    /// Attach a metafield to an existing article. Callers treat failure
    /// as non-fatal.
    async fn attach_metafield(&self, article_id: u64, field: &Metafield) -> Result<()>;
}

/// A single completion request to the generation service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    /// JSON schema for strict structured output, when the service honors it.
    pub schema: Option<serde_json::Value>,
}

/// A generative-text service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Return the raw text of the model's reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
