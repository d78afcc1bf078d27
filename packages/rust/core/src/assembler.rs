//! Article assembler.
//!
//! Merges a generated draft with a product gallery and produces the
//! backend-ready [`ArticleRequest`], then checks that the final body links
//! nowhere but the selected products.

use tracing::{debug, instrument};

use shopscribe_shared::{
    ArticleDraft, ArticleImage, ArticleRequest, Metafield, Product, Result, ShopscribeError,
    product_urls,
};

use crate::html::{escape, foreign_links, truncate_chars};

/// Heading above the product gallery.
pub const GALLERY_HEADING: &str = "Shop These Featured Picks";

/// SEO description metafield coordinates.
pub const META_NAMESPACE: &str = "global";
pub const META_KEY: &str = "description_tag";
pub const META_TYPE: &str = "single_line_text_field";

/// Longest value the description metafield accepts.
pub const META_VALUE_CHARS: usize = 320;

/// Configuration for article assembly.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub author: String,
    /// Publish immediately instead of creating a draft.
    pub published: bool,
}

/// Build the backend request for `draft` featuring `products` in order.
///
/// Fails with a validation error if the final body links outside the
/// product URL set.
#[instrument(skip_all, fields(title = %draft.title, products = products.len()))]
pub fn assemble(
    draft: &ArticleDraft,
    products: &[Product],
    options: &AssembleOptions,
) -> Result<ArticleRequest> {
    let body_html = if products.is_empty() {
        draft.body.clone()
    } else {
        let figures: Vec<String> = products
            .iter()
            .map(|p| figure(p, &options.author))
            .collect();
        format!(
            "{}\n<hr/>\n<h2>{GALLERY_HEADING}</h2>\n{}",
            draft.body,
            figures.join("\n")
        )
    };

    validate_links(&body_html, &product_urls(products))?;

    let image = products.first().map(|p| ArticleImage {
        src: p.image.clone(),
        alt: image_alt(p, &options.author),
    });

    let metafield = Some(draft.meta_description.trim())
        .filter(|m| !m.is_empty())
        .map(|m| Metafield {
            namespace: META_NAMESPACE.into(),
            key: META_KEY.into(),
            value_type: META_TYPE.into(),
            value: truncate_chars(&single_line(m), META_VALUE_CHARS),
        });

    debug!(
        body_len = body_html.len(),
        has_image = image.is_some(),
        "assembled article"
    );

    Ok(ArticleRequest {
        title: draft.title.clone(),
        author: options.author.clone(),
        tags: draft.tags.join(", "),
        body_html,
        summary_html: draft.excerpt.clone(),
        published: options.published,
        image,
        metafield,
    })
}

/// Alt text for a featured product image.
pub fn image_alt(product: &Product, author: &str) -> String {
    format!("{} by {author}", product.title)
}

fn figure(product: &Product, author: &str) -> String {
    let url = escape(&product.url);
    let title = escape(&product.title);
    format!(
        concat!(
            "<figure>\n",
            "  <a href=\"{url}\" target=\"_self\" rel=\"noopener\">\n",
            "    <img src=\"{src}\" alt=\"{alt}\" loading=\"lazy\" />\n",
            "  </a>\n",
            "  <figcaption><a href=\"{url}\" target=\"_self\">Shop {title}</a></figcaption>\n",
            "</figure>"
        ),
        url = url,
        src = escape(&product.image),
        alt = escape(&image_alt(product, author)),
        title = title,
    )
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reject a body that links anywhere but `allowed`.
pub fn validate_links(body_html: &str, allowed: &[&str]) -> Result<()> {
    let foreign = foreign_links(body_html, allowed);
    if foreign.is_empty() {
        return Ok(());
    }
    Err(ShopscribeError::validation(format!(
        "article body links outside the selected products: {}",
        foreign.join(", ")
    )))
}
