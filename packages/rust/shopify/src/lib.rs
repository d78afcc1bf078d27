//! Shopify Admin REST client.
//!
//! Implements the [`Catalog`](shopscribe_shared::Catalog) and
//! [`Publisher`](shopscribe_shared::Publisher) collaborators on top of
//! one `reqwest` client. Reads and writes carry separate timeouts; any
//! non-2xx answer becomes [`ShopscribeError::Http`] with the raw body.

mod catalog;
mod pagination;
mod publisher;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use shopscribe_shared::{Result, RunConfig, ShopscribeError, StoreConfig};

pub use catalog::RawProduct;

/// User-Agent string for Admin API requests.
const USER_AGENT: &str = concat!("Shopscribe/", env!("CARGO_PKG_VERSION"));

/// Largest page size the Admin API accepts.
pub(crate) const MAX_PAGE_SIZE: usize = 250;

/// Connection settings for one store.
#[derive(Clone)]
pub struct ShopifyOptions {
    /// Admin API root, ending in `/admin/api/<version>/`.
    pub base_url: Url,
    pub access_token: String,
    /// Public domain product URLs are built on.
    pub storefront_domain: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl std::fmt::Debug for ShopifyOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyOptions")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"<redacted>")
            .field("storefront_domain", &self.storefront_domain)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

impl ShopifyOptions {
    /// Options for `https://<store_domain>/admin/api/<version>/`.
    pub fn from_config(run: &RunConfig, store: &StoreConfig) -> Result<Self> {
        let base = format!(
            "https://{}/admin/api/{}/",
            run.store_domain, store.api_version
        );
        let base_url = Url::parse(&base).map_err(|e| {
            ShopscribeError::config(format!("invalid store domain '{}': {e}", run.store_domain))
        })?;

        Ok(Self {
            base_url,
            access_token: run.access_token.clone(),
            storefront_domain: run.storefront_domain.clone(),
            read_timeout: Duration::from_secs(store.read_timeout_secs),
            write_timeout: Duration::from_secs(store.write_timeout_secs),
        })
    }
}

/// Admin API client for a single store.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    options: ShopifyOptions,
    client: Client,
}

impl ShopifyClient {
    pub fn new(options: ShopifyOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ShopscribeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { options, client })
    }

    /// Absolute URL for an Admin API path such as `products.json`.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.options
            .base_url
            .join(path)
            .map_err(|e| ShopscribeError::validation(format!("bad API path '{path}': {e}")))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("X-Shopify-Access-Token", &self.options.access_token)
    }

    /// GET with the read timeout. Returns the raw response for header access.
    async fn get_response(&self, url: Url, query: &[(&str, String)]) -> Result<Response> {
        debug!(%url, "GET");
        let request = self
            .authorized(self.client.get(url.clone()))
            .query(query)
            .timeout(self.options.read_timeout);
        let response = request
            .send()
            .await
            .map_err(|e| ShopscribeError::Network(format!("{url}: {e}")))?;
        ensure_success(response).await
    }

    /// POST a JSON body with the write timeout and decode the reply.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self
            .authorized(self.client.post(url.clone()))
            .json(body)
            .timeout(self.options.write_timeout)
            .send()
            .await
            .map_err(|e| ShopscribeError::Network(format!("{url}: {e}")))?;
        let response = ensure_success(response).await?;
        decode(response).await
    }
}

/// Turn non-2xx responses into [`ShopscribeError::Http`] carrying the body.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(ShopscribeError::Http {
        status: status.as_u16(),
        url,
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    let text = response
        .text()
        .await
        .map_err(|e| ShopscribeError::Network(format!("{url}: failed to read body: {e}")))?;
    serde_json::from_str(&text)
        .map_err(|e| ShopscribeError::parse(format!("{url}: unexpected response shape: {e}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Client pointed at a wiremock server.
    pub fn client_for(server: &wiremock::MockServer) -> ShopifyClient {
        let base_url = Url::parse(&format!("{}/admin/api/2024-07/", server.uri())).unwrap();
        ShopifyClient::new(ShopifyOptions {
            base_url,
            access_token: "shpat_test".into(),
            storefront_domain: "shop.example.com".into(),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    pub fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/shopify/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }
}
