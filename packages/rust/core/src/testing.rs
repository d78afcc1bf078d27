//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use shopscribe_shared::{
    ArticleRequest, BlogRef, Catalog, CollectionRef, CompletionRequest, GenerationService,
    Metafield, Product, ProductOrder, PublishedArticle, Publisher, Result, ShopscribeError,
    product_url,
};

pub const STOREFRONT: &str = "shop.example.com";

/// Product `id` created `id` days after a fixed epoch, so higher ids are newer.
pub fn product(id: u64, title: &str) -> Product {
    let handle = title.to_lowercase().replace(' ', "-");
    Product {
        id,
        title: title.to_string(),
        url: product_url(STOREFRONT, &handle),
        handle,
        image: format!("https://cdn.example.com/{id}.jpg"),
        created_at: epoch() + Duration::days(id as i64),
        tags: String::new(),
        vendor: "Brand63".into(),
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn collection(id: u64, title: &str) -> CollectionRef {
    CollectionRef {
        id,
        title: title.to_string(),
        handle: title.to_lowercase().replace(' ', "-"),
    }
}

fn backend_down(what: &str) -> ShopscribeError {
    ShopscribeError::Http {
        status: 503,
        url: format!("https://fake.test/{what}"),
        body: "unavailable".into(),
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCatalog {
    pub products: Vec<Product>,
    pub collections: Vec<(CollectionRef, Vec<Product>)>,
    pub fail_products: bool,
    pub fail_collections: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn with_images(products: &[Product], limit: usize) -> Vec<Product> {
    products
        .iter()
        .filter(|p| !p.image.is_empty())
        .take(limit)
        .cloned()
        .collect()
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn list_active_products(
        &self,
        limit: usize,
        _order: ProductOrder,
    ) -> Result<Vec<Product>> {
        self.record(format!("products({limit})"));
        if self.fail_products {
            return Err(backend_down("products.json"));
        }
        let mut sorted = self.products.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(with_images(&sorted, limit))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionRef>> {
        self.record("collections".into());
        if self.fail_collections {
            return Err(backend_down("custom_collections.json"));
        }
        Ok(self.collections.iter().map(|(c, _)| c.clone()).collect())
    }

    async fn list_products_in_collection(
        &self,
        collection_id: u64,
        limit: usize,
    ) -> Result<Vec<Product>> {
        self.record(format!("collection({collection_id})"));
        Ok(self
            .collections
            .iter()
            .find(|(c, _)| c.id == collection_id)
            .map(|(_, products)| with_images(products, limit))
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Replays canned replies in order; `Err` entries become transport errors.
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text)])
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ShopscribeError::Network(message)),
            None => Err(ShopscribeError::Network("no scripted reply left".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePublisher {
    pub reject_article: bool,
    pub reject_metafield: bool,
    pub articles: Mutex<Vec<(u64, ArticleRequest)>>,
    pub metafields: Mutex<Vec<(u64, Metafield)>>,
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn resolve_blog(&self, blog: &BlogRef) -> Result<u64> {
        Ok(match blog {
            BlogRef::Id(id) => *id,
            BlogRef::Handle(_) => 100,
        })
    }

    async fn create_article(
        &self,
        blog_id: u64,
        request: &ArticleRequest,
    ) -> Result<PublishedArticle> {
        if self.reject_article {
            return Err(ShopscribeError::Http {
                status: 422,
                url: format!("https://fake.test/blogs/{blog_id}/articles.json"),
                body: r#"{"errors":{"body_html":["is invalid"]}}"#.into(),
            });
        }
        self.articles
            .lock()
            .unwrap()
            .push((blog_id, request.clone()));
        Ok(PublishedArticle {
            id: 9001,
            title: request.title.clone(),
            handle: request.title.to_lowercase().replace(' ', "-"),
            published_at: request.published.then(epoch),
            created_at: Some(epoch()),
        })
    }

    async fn attach_metafield(&self, article_id: u64, field: &Metafield) -> Result<()> {
        if self.reject_metafield {
            return Err(backend_down("metafields.json"));
        }
        self.metafields
            .lock()
            .unwrap()
            .push((article_id, field.clone()));
        Ok(())
    }
}
