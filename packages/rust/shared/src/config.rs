//! Application configuration for Shopscribe.
//!
//! Tunables and season rules live in `~/.shopscribe/shopscribe.toml`.
//! Credentials and per-store settings come from the environment, which
//! overrides file values. Everything is resolved once into a [`RunConfig`]
//! that is passed by value into each component.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopscribeError};
use crate::types::{BlogRef, SeasonTag};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "shopscribe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".shopscribe";

/// Environment variable names.
pub const ENV_STORE_DOMAIN: &str = "SHOPIFY_STORE_DOMAIN";
pub const ENV_ACCESS_TOKEN: &str = "SHOPIFY_ADMIN_ACCESS_TOKEN";
pub const ENV_BLOG: &str = "BLOG_HANDLE";
pub const ENV_AUTHOR: &str = "AUTHOR_NAME";
pub const ENV_STOREFRONT_DOMAIN: &str = "STOREFRONT_DOMAIN";
pub const ENV_AUTO_PUBLISH: &str = "AUTO_PUBLISH";

// ---------------------------------------------------------------------------
// Config structs (matching shopscribe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub blog: BlogConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    /// Season windows in priority order: the first active one wins.
    #[serde(default = "default_seasons")]
    pub seasons: Vec<SeasonWindowConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            blog: BlogConfig::default(),
            openai: OpenAiConfig::default(),
            selection: SelectionConfig::default(),
            limits: LimitsConfig::default(),
            seasons: default_seasons(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Admin REST API version.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Public storefront domain; defaults to the store domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storefront_domain: Option<String>,

    /// Timeout for catalog reads.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Timeout for article and metafield writes.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            storefront_domain: None,
            read_timeout_secs: default_read_timeout(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

fn default_api_version() -> String {
    "2024-07".into()
}
fn default_read_timeout() -> u64 {
    60
}
fn default_write_timeout() -> u64 {
    120
}

/// `[blog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    /// Blog handle, or a numeric blog id.
    #[serde(default = "default_blog_handle")]
    pub handle: String,

    /// Author display name.
    #[serde(default = "default_author")]
    pub author: String,

    /// Publish immediately instead of leaving a draft.
    #[serde(default)]
    pub auto_publish: bool,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            handle: default_blog_handle(),
            author: default_author(),
            auto_publish: false,
        }
    }
}

fn default_blog_handle() -> String {
    "news".into()
}
fn default_author() -> String {
    "Brand63".into()
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Completion budget for the primary request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Completion budget for the repair request.
    #[serde(default = "default_repair_max_tokens")]
    pub repair_max_tokens: u32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Ask the service for strict JSON-schema output.
    #[serde(default = "default_true")]
    pub structured_output: bool,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            repair_max_tokens: default_repair_max_tokens(),
            timeout_secs: default_generation_timeout(),
            structured_output: true,
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-5".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_max_tokens() -> u32 {
    1100
}
fn default_repair_max_tokens() -> u32 {
    700
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

/// `[selection]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Products per post.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Newest products pulled store-wide.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Newest sub-window of the pool that is sampled from.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Collections tried by the collection-fallback tier.
    #[serde(default = "default_collection_attempts")]
    pub collection_attempts: usize,

    /// IANA timezone that season windows are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Optional newline-delimited seed keyword file.
    #[serde(default = "default_keywords_file")]
    pub keywords_file: PathBuf,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            pool_size: default_pool_size(),
            window: default_window(),
            collection_attempts: default_collection_attempts(),
            timezone: default_timezone(),
            keywords_file: default_keywords_file(),
        }
    }
}

fn default_count() -> usize {
    3
}
fn default_pool_size() -> usize {
    500
}
fn default_window() -> usize {
    120
}
fn default_collection_attempts() -> usize {
    5
}
fn default_timezone() -> String {
    "America/New_York".into()
}
fn default_keywords_file() -> PathBuf {
    PathBuf::from("keywords.csv")
}

/// `[limits]` section: hard caps applied to generated fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_title_chars")]
    pub title_chars: usize,

    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Words taken from the body when the excerpt is missing.
    #[serde(default = "default_excerpt_words")]
    pub excerpt_words: usize,

    #[serde(default = "default_meta_description_chars")]
    pub meta_description_chars: usize,

    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            title_chars: default_title_chars(),
            excerpt_chars: default_excerpt_chars(),
            excerpt_words: default_excerpt_words(),
            meta_description_chars: default_meta_description_chars(),
            max_tags: default_max_tags(),
        }
    }
}

fn default_title_chars() -> usize {
    100
}
fn default_excerpt_chars() -> usize {
    300
}
fn default_excerpt_words() -> usize {
    30
}
fn default_meta_description_chars() -> usize {
    320
}
fn default_max_tags() -> usize {
    6
}

// ---------------------------------------------------------------------------
// Season windows
// ---------------------------------------------------------------------------

/// A calendar day without a year, written `MM-DD` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        let max_day = match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 => 29,
            _ => {
                return Err(ShopscribeError::config(format!(
                    "month {month} is out of range"
                )));
            }
        };
        if day == 0 || day > max_day {
            return Err(ShopscribeError::config(format!(
                "day {day} is out of range for month {month}"
            )));
        }
        Ok(Self { month, day })
    }
}

impl TryFrom<String> for MonthDay {
    type Error = ShopscribeError;

    fn try_from(value: String) -> Result<Self> {
        let (m, d) = value
            .trim()
            .split_once('-')
            .ok_or_else(|| ShopscribeError::config(format!("expected MM-DD, got '{value}'")))?;
        let month = m
            .parse()
            .map_err(|_| ShopscribeError::config(format!("bad month in '{value}'")))?;
        let day = d
            .parse()
            .map_err(|_| ShopscribeError::config(format!("bad day in '{value}'")))?;
        Self::new(month, day)
    }
}

impl From<MonthDay> for String {
    fn from(md: MonthDay) -> Self {
        format!("{:02}-{:02}", md.month, md.day)
    }
}

/// `[[seasons]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonWindowConfig {
    /// Stable identifier used in logs and error messages.
    pub name: String,
    /// Descriptive name, used as the article topic.
    pub label: String,
    pub tag: SeasonTag,
    /// First day of the window (inclusive).
    pub start: MonthDay,
    /// Last day of the window (inclusive); may fall in the next year.
    pub end: MonthDay,
    /// Days before `start` during which the window is already active.
    #[serde(default)]
    pub lead_in_days: u32,
    /// Curated collection handles to draw products from.
    pub collections: Vec<String>,
}

fn season(
    name: &str,
    label: &str,
    tag: SeasonTag,
    start: (u32, u32),
    end: (u32, u32),
    lead_in_days: u32,
    collections: &[&str],
) -> SeasonWindowConfig {
    SeasonWindowConfig {
        name: name.into(),
        label: label.into(),
        tag,
        start: MonthDay {
            month: start.0,
            day: start.1,
        },
        end: MonthDay {
            month: end.0,
            day: end.1,
        },
        lead_in_days,
        collections: collections.iter().map(|c| (*c).to_string()).collect(),
    }
}

/// Built-in season rules, in priority order. An observance outranks the
/// lead-in of a shorter holiday that overlaps it.
pub fn default_seasons() -> Vec<SeasonWindowConfig> {
    vec![
        season(
            "black-history-month",
            "Black History Month",
            SeasonTag::HeritageMonth,
            (2, 1),
            (2, 29),
            0,
            &["black-history-month", "black-owned-brands"],
        ),
        season(
            "valentines-day",
            "Valentine's Day Gift Ideas",
            SeasonTag::Valentines,
            (2, 14),
            (2, 14),
            13,
            &["valentines-day", "gifts-for-her", "gifts-for-him"],
        ),
        season(
            "mothers-day",
            "Mother's Day Gifts",
            SeasonTag::MothersDay,
            (5, 1),
            (5, 14),
            7,
            &["mothers-day"],
        ),
        season(
            "back-to-school",
            "Back to School Essentials",
            SeasonTag::BackToSchool,
            (8, 1),
            (9, 7),
            0,
            &["back-to-school"],
        ),
        season(
            "halloween",
            "Halloween Picks",
            SeasonTag::Halloween,
            (10, 1),
            (10, 31),
            14,
            &["halloween"],
        ),
        season(
            "black-friday",
            "Black Friday Deals",
            SeasonTag::BlackFriday,
            (11, 20),
            (11, 30),
            7,
            &["black-friday", "deals"],
        ),
        season(
            "new-year",
            "New Year, New Style",
            SeasonTag::NewYear,
            (12, 31),
            (1, 7),
            0,
            &["new-year"],
        ),
        season(
            "winter-holidays",
            "Holiday Gift Guide",
            SeasonTag::WinterHoliday,
            (12, 1),
            (12, 31),
            10,
            &["holiday-gifts", "gift-ideas"],
        ),
    ]
}

impl AppConfig {
    /// Check values that serde cannot: timezone name and selection knobs.
    pub fn validate(&self) -> Result<()> {
        self.selection
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| ShopscribeError::config(format!("invalid timezone: {e}")))?;

        if self.selection.count == 0 {
            return Err(ShopscribeError::config("selection.count must be at least 1"));
        }
        if self.selection.window == 0 || self.selection.pool_size == 0 {
            return Err(ShopscribeError::config(
                "selection.window and selection.pool_size must be at least 1",
            ));
        }
        for window in &self.seasons {
            MonthDay::new(window.start.month, window.start.day)?;
            MonthDay::new(window.end.month, window.end.day)?;
            if window.collections.is_empty() {
                return Err(ShopscribeError::config(format!(
                    "season '{}' has no collections",
                    window.name
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config file + environment)
// ---------------------------------------------------------------------------

/// Per-run settings and credentials, resolved once before any network call.
#[derive(Clone)]
pub struct RunConfig {
    pub store_domain: String,
    pub access_token: String,
    pub openai_api_key: String,
    pub blog: BlogRef,
    pub author: String,
    pub storefront_domain: String,
    pub auto_publish: bool,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("store_domain", &self.store_domain)
            .field("access_token", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .field("blog", &self.blog)
            .field("author", &self.author)
            .field("storefront_domain", &self.storefront_domain)
            .field("auto_publish", &self.auto_publish)
            .finish()
    }
}

impl RunConfig {
    /// Resolve from the process environment.
    pub fn resolve(app: &AppConfig) -> Result<Self> {
        Self::resolve_with(app, |name| std::env::var(name).ok())
    }

    /// Resolve using `lookup` for environment values. Every missing
    /// required name is reported at once.
    pub fn resolve_with(app: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store_domain = get(ENV_STORE_DOMAIN);
        let access_token = get(ENV_ACCESS_TOKEN);
        let openai_api_key = get(&app.openai.api_key_env);

        let mut missing = Vec::new();
        if store_domain.is_none() {
            missing.push(ENV_STORE_DOMAIN.to_string());
        }
        if access_token.is_none() {
            missing.push(ENV_ACCESS_TOKEN.to_string());
        }
        if openai_api_key.is_none() {
            missing.push(app.openai.api_key_env.clone());
        }

        let (Some(store_domain), Some(access_token), Some(openai_api_key)) =
            (store_domain, access_token, openai_api_key)
        else {
            return Err(ShopscribeError::MissingConfig { names: missing });
        };

        let store_domain = store_domain
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        let blog = get(ENV_BLOG)
            .unwrap_or_else(|| app.blog.handle.clone())
            .parse::<BlogRef>()
            .unwrap_or_else(|never| match never {});

        let auto_publish = match get(ENV_AUTO_PUBLISH) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ShopscribeError::config(format!("{ENV_AUTO_PUBLISH} must be true or false, got '{raw}'"))
            })?,
            None => app.blog.auto_publish,
        };

        let storefront_domain = get(ENV_STOREFRONT_DOMAIN)
            .or_else(|| app.store.storefront_domain.clone())
            .unwrap_or_else(|| store_domain.clone());

        Ok(Self {
            blog,
            author: get(ENV_AUTHOR).unwrap_or_else(|| app.blog.author.clone()),
            storefront_domain,
            auto_publish,
            store_domain,
            access_token,
            openai_api_key,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.shopscribe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ShopscribeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.shopscribe/shopscribe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ShopscribeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ShopscribeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ShopscribeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ShopscribeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ShopscribeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
