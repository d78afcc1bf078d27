//! Shared types, error model, configuration and collaborator interfaces
//! for Shopscribe.
//!
//! This crate is the foundation depended on by all other Shopscribe crates.
//! It provides:
//! - [`ShopscribeError`]: the unified error type
//! - Domain types ([`Product`], [`SelectionResult`], [`ArticleDraft`], ...)
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)
//! - The [`Catalog`], [`Publisher`] and [`GenerationService`] traits

pub mod collaborators;
pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use collaborators::{Catalog, CompletionRequest, GenerationService, Publisher};
pub use config::{
    AppConfig, BlogConfig, LimitsConfig, MonthDay, OpenAiConfig, RunConfig, SeasonWindowConfig,
    SelectionConfig, StoreConfig, config_dir, config_file_path, default_seasons, init_config,
    load_config, load_config_from,
};
pub use error::{Result, ShopscribeError};
pub use types::{
    ArticleDraft, ArticleImage, ArticleRequest, BlogRef, CollectionRef, Metafield, Product,
    ProductOrder, PublishedArticle, SeasonTag, SelectionResult, SelectionTier, product_url,
    product_urls,
};
