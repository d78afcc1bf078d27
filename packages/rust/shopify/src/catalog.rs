//! [`Catalog`] implementation: products and collections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use shopscribe_shared::{Catalog, CollectionRef, Product, ProductOrder, Result, product_url};

use crate::{MAX_PAGE_SIZE, ShopifyClient};

/// Product record as returned by the Admin API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub images: Vec<RawImage>,
    #[serde(default)]
    pub image: Option<RawImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImage {
    pub src: String,
}

impl RawProduct {
    /// Convert to a [`Product`]; `None` for products without an image,
    /// without a title or handle, or not active.
    pub fn into_product(self, storefront_domain: &str) -> Option<Product> {
        if self.status.as_deref().is_some_and(|s| s != "active") {
            return None;
        }
        let image = self
            .images
            .into_iter()
            .next()
            .or(self.image)
            .map(|img| img.src)
            .filter(|src| !src.trim().is_empty())?;
        let title = self.title.trim().to_string();
        if title.is_empty() || self.handle.is_empty() {
            return None;
        }

        Some(Product {
            id: self.id,
            url: product_url(storefront_domain, &self.handle),
            title,
            handle: self.handle,
            image,
            created_at: self.created_at,
            tags: self.tags,
            vendor: self.vendor,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    handle: String,
}

impl From<RawCollection> for CollectionRef {
    fn from(raw: RawCollection) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            handle: raw.handle,
        }
    }
}

impl ShopifyClient {
    fn keep_with_images(&self, raw: Vec<RawProduct>) -> Vec<Product> {
        let total = raw.len();
        let products: Vec<Product> = raw
            .into_iter()
            .filter_map(|p| p.into_product(&self.options.storefront_domain))
            .collect();
        debug!(
            total,
            kept = products.len(),
            "filtered products without images"
        );
        products
    }
}

#[async_trait]
impl Catalog for ShopifyClient {
    #[instrument(skip(self), fields(order = order.as_query()))]
    async fn list_active_products(
        &self,
        limit: usize,
        order: ProductOrder,
    ) -> Result<Vec<Product>> {
        let params = [
            ("status", "active".to_string()),
            ("order", order.as_query().to_string()),
        ];
        let raw: Vec<RawProduct> = self.get_paged("products.json", "products", &params, limit).await?;
        Ok(self.keep_with_images(raw))
    }

    #[instrument(skip(self))]
    async fn list_collections(&self) -> Result<Vec<CollectionRef>> {
        let mut collections: Vec<CollectionRef> = Vec::new();
        for (path, key) in [
            ("custom_collections.json", "custom_collections"),
            ("smart_collections.json", "smart_collections"),
        ] {
            let raw: Vec<RawCollection> = self.get_paged(path, key, &[], usize::MAX).await?;
            collections.extend(raw.into_iter().map(CollectionRef::from));
        }
        debug!(count = collections.len(), "listed collections");
        Ok(collections)
    }

    #[instrument(skip(self))]
    async fn list_products_in_collection(
        &self,
        collection_id: u64,
        limit: usize,
    ) -> Result<Vec<Product>> {
        let path = format!("collections/{collection_id}/products.json");
        let raw: Vec<RawProduct> = self
            .get_paged(&path, "products", &[], limit.min(MAX_PAGE_SIZE * 4))
            .await?;
        Ok(self.keep_with_images(raw))
    }
}
