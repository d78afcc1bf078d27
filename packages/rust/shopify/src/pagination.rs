//! Cursor pagination over the Admin API `Link` header.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use shopscribe_shared::{Result, ShopscribeError};

use crate::{MAX_PAGE_SIZE, ShopifyClient, decode};

/// Extract the `rel="next"` target from a `Link` header.
pub(crate) fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    static NEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).expect("valid regex")
    });

    let header = headers.get(LINK)?.to_str().ok()?;
    header
        .split(',')
        .find_map(|part| NEXT_RE.captures(part.trim()))
        .and_then(|caps| Url::parse(&caps[1]).ok())
}

impl ShopifyClient {
    /// GET `path` page by page until `limit` items were collected or the
    /// backend has no further page. Items live under `key` in each body.
    pub(crate) async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        params: &[(&str, String)],
        limit: usize,
    ) -> Result<Vec<T>> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE);
        let mut url = self.endpoint(path)?;
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("limit", page_size.to_string()));

        let mut items: Vec<T> = Vec::new();
        let mut pages = 0usize;

        loop {
            let response = self.get_response(url, &query).await?;
            let next = next_page_url(response.headers());
            let mut body: serde_json::Value = decode(response).await?;

            let page: Vec<T> = match body.get_mut(key).map(serde_json::Value::take) {
                Some(value) => serde_json::from_value(value).map_err(|e| {
                    ShopscribeError::parse(format!("{path}: malformed '{key}' list: {e}"))
                })?,
                None => {
                    return Err(ShopscribeError::parse(format!(
                        "{path}: response has no '{key}' field"
                    )));
                }
            };

            pages += 1;
            let page_len = page.len();
            items.extend(page);

            if items.len() >= limit || page_len == 0 {
                break;
            }
            match next {
                // The cursor URL already carries `limit` and `page_info`;
                // other filters must not be repeated alongside it.
                Some(next_url) => {
                    url = next_url;
                    query = Vec::new();
                }
                None => break,
            }
        }

        items.truncate(limit);
        debug!(path, pages, items = items.len(), "paged fetch complete");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(link: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(LINK, HeaderValue::from_str(link).unwrap());
        map
    }

    #[test]
    fn finds_next_link() {
        let map = headers(
            r#"<https://s.myshopify.com/admin/api/2024-07/products.json?limit=250&page_info=abc>; rel="next""#,
        );
        let next = next_page_url(&map).expect("next link");
        assert_eq!(next.query(), Some("limit=250&page_info=abc"));
    }

    #[test]
    fn picks_next_among_previous_and_next() {
        let map = headers(
            r#"<https://s.test/p.json?page_info=prev>; rel="previous", <https://s.test/p.json?page_info=nxt>; rel="next""#,
        );
        let next = next_page_url(&map).expect("next link");
        assert_eq!(next.query(), Some("page_info=nxt"));
    }

    #[test]
    fn no_next_on_last_page() {
        let map = headers(r#"<https://s.test/p.json?page_info=prev>; rel="previous""#);
        assert!(next_page_url(&map).is_none());
        assert!(next_page_url(&HeaderMap::new()).is_none());
    }
}
