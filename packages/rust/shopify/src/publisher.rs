//! [`Publisher`] implementation: blogs, articles and metafields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use shopscribe_shared::{
    ArticleImage, ArticleRequest, BlogRef, Metafield, Publisher, PublishedArticle, Result,
};

use crate::ShopifyClient;

#[derive(Debug, Deserialize)]
struct RawBlog {
    id: u64,
    #[serde(default)]
    handle: String,
}

#[derive(Debug, Deserialize)]
struct BlogEnvelope {
    blog: RawBlog,
}

#[derive(Debug, Deserialize)]
struct ArticleEnvelope {
    article: PublishedArticle,
}

/// Wire shape of `POST blogs/{id}/articles.json`.
#[derive(Debug, Serialize)]
struct ArticlePayload<'a> {
    title: &'a str,
    author: &'a str,
    tags: &'a str,
    body_html: &'a str,
    summary_html: &'a str,
    published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a ArticleImage>,
}

impl<'a> From<&'a ArticleRequest> for ArticlePayload<'a> {
    fn from(req: &'a ArticleRequest) -> Self {
        Self {
            title: &req.title,
            author: &req.author,
            tags: &req.tags,
            body_html: &req.body_html,
            summary_html: &req.summary_html,
            published: req.published,
            image: req.image.as_ref(),
        }
    }
}

/// Title for a blog created on demand from its handle (`trendsetter-news`
/// becomes `Trendsetter news`).
fn blog_title(handle: &str) -> String {
    let words = handle.replace(['-', '_'], " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "News".to_string(),
    }
}

#[async_trait]
impl Publisher for ShopifyClient {
    /// Numeric ids are used as-is. Handles are looked up; when no blog
    /// matches, the first blog is used, and a store without blogs gets one
    /// created.
    #[instrument(skip(self), fields(blog = %blog))]
    async fn resolve_blog(&self, blog: &BlogRef) -> Result<u64> {
        let handle = match blog {
            BlogRef::Id(id) => return Ok(*id),
            BlogRef::Handle(handle) => handle,
        };

        let blogs: Vec<RawBlog> = self.get_paged("blogs.json", "blogs", &[], usize::MAX).await?;
        if let Some(found) = blogs.iter().find(|b| &b.handle == handle) {
            return Ok(found.id);
        }
        if let Some(first) = blogs.first() {
            info!(requested = %handle, using = %first.handle, "blog handle not found, using first blog");
            return Ok(first.id);
        }

        info!(%handle, "store has no blogs, creating one");
        let created: BlogEnvelope = self
            .post_json(
                "blogs.json",
                &json!({ "blog": { "title": blog_title(handle), "handle": handle } }),
            )
            .await?;
        Ok(created.blog.id)
    }

    #[instrument(skip_all, fields(blog_id = blog_id, title = %request.title, published = request.published))]
    async fn create_article(
        &self,
        blog_id: u64,
        request: &ArticleRequest,
    ) -> Result<PublishedArticle> {
        let payload = json!({ "article": ArticlePayload::from(request) });
        let created: ArticleEnvelope = self
            .post_json(&format!("blogs/{blog_id}/articles.json"), &payload)
            .await?;
        info!(article_id = created.article.id, handle = %created.article.handle, "article created");
        Ok(created.article)
    }

    #[instrument(skip_all, fields(article_id = article_id, key = %field.key))]
    async fn attach_metafield(&self, article_id: u64, field: &Metafield) -> Result<()> {
        let payload = json!({
            "metafield": {
                "namespace": field.namespace,
                "key": field.key,
                "type": field.value_type,
                "value": field.value,
                "owner_id": article_id,
                "owner_resource": "article",
            }
        });
        let _: serde_json::Value = self.post_json("metafields.json", &payload).await?;
        Ok(())
    }
}
