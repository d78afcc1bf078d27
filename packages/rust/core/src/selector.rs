//! Product selection: which products and topic a post is about.
//!
//! Three tiers are tried in order, each only when the previous one came
//! up empty:
//!
//! 1. **Seasonal**: the active season window's curated collections.
//! 2. **Freshness**: a uniform sample from the newest store-wide products.
//! 3. **Collection fallback**: a random collection that has products.
//!
//! Catalog errors in the first two tiers are logged and skipped; in the
//! last tier they end the run. The result is ordered newest first.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument, warn};

use shopscribe_shared::{
    AppConfig, Catalog, Product, ProductOrder, Result, SeasonWindowConfig, SelectionResult,
    SelectionTier, ShopscribeError,
};

use crate::clock::Clock;
use crate::keywords::SeedKeywords;
use crate::season::SeasonCalendar;

/// Topic used by the freshness tier when no seed keyword is available.
pub const NEW_ARRIVALS_TOPIC: &str = "New Arrivals";

/// Everything selection needs besides the catalog, clock and randomness.
#[derive(Debug, Clone)]
pub struct SelectionRules {
    pub calendar: SeasonCalendar,
    /// Products per post.
    pub count: usize,
    /// Products pulled per catalog listing.
    pub pool_size: usize,
    /// Newest sub-window sampled from.
    pub window: usize,
    pub collection_attempts: usize,
    pub keywords: SeedKeywords,
}

impl SelectionRules {
    pub fn from_config(config: &AppConfig, keywords: SeedKeywords) -> Result<Self> {
        Ok(Self {
            calendar: SeasonCalendar::new(&config.selection.timezone, config.seasons.clone())?,
            count: config.selection.count,
            pool_size: config.selection.pool_size,
            window: config.selection.window,
            collection_attempts: config.selection.collection_attempts,
            keywords,
        })
    }
}

/// Pick the products and topic for one post.
///
/// Fails with [`ShopscribeError::EmptyPool`] naming every tier attempted
/// when none produced a product.
#[instrument(skip_all, fields(count = rules.count))]
pub async fn select<R: Rng + Send>(
    catalog: &dyn Catalog,
    clock: &dyn Clock,
    rules: &SelectionRules,
    rng: &mut R,
) -> Result<SelectionResult> {
    let mut attempted: Vec<String> = Vec::new();

    if let Some(window) = rules.calendar.active_at(clock.now()) {
        attempted.push(format!("seasonal({})", window.name));
        match seasonal_tier(catalog, window, rules, rng).await {
            Ok(Some(selection)) => return Ok(finish(selection)),
            Ok(None) => info!(season = %window.name, "season collections have no products"),
            Err(e) => warn!(season = %window.name, error = %e, "seasonal tier failed"),
        }
    }

    attempted.push(SelectionTier::Freshness.to_string());
    match freshness_tier(catalog, rules, rng).await {
        Ok(Some(selection)) => return Ok(finish(selection)),
        Ok(None) => info!("store has no active products with images"),
        Err(e) => warn!(error = %e, "freshness tier failed"),
    }

    attempted.push(SelectionTier::CollectionFallback.to_string());
    if let Some(selection) = collection_tier(catalog, rules, rng).await? {
        return Ok(finish(selection));
    }

    Err(ShopscribeError::EmptyPool { tiers: attempted })
}

fn finish(selection: SelectionResult) -> SelectionResult {
    info!(
        tier = %selection.tier(),
        topic = selection.topic(),
        products = selection.products().len(),
        "selected products"
    );
    selection
}

async fn seasonal_tier<R: Rng + Send>(
    catalog: &dyn Catalog,
    window: &SeasonWindowConfig,
    rules: &SelectionRules,
    rng: &mut R,
) -> Result<Option<SelectionResult>> {
    let collections = catalog.list_collections().await?;
    let mut pool = Vec::new();
    for handle in &window.collections {
        let Some(found) = collections
            .iter()
            .find(|c| c.handle.eq_ignore_ascii_case(handle))
        else {
            debug!(%handle, "season collection not in store");
            continue;
        };
        pool.extend(
            catalog
                .list_products_in_collection(found.id, rules.pool_size)
                .await?,
        );
    }
    let picked = sample_newest(pool, rules, rng);
    Ok(SelectionResult::new(
        picked,
        window.label.clone(),
        Some(window.tag),
        SelectionTier::Seasonal,
    ))
}

async fn freshness_tier<R: Rng + Send>(
    catalog: &dyn Catalog,
    rules: &SelectionRules,
    rng: &mut R,
) -> Result<Option<SelectionResult>> {
    let pool = catalog
        .list_active_products(rules.pool_size, ProductOrder::NewestFirst)
        .await?;
    let picked = sample_newest(pool, rules, rng);
    if picked.is_empty() {
        return Ok(None);
    }
    let topic = rules
        .keywords
        .choose(rng)
        .unwrap_or(NEW_ARRIVALS_TOPIC)
        .to_string();
    Ok(SelectionResult::new(
        picked,
        topic,
        None,
        SelectionTier::Freshness,
    ))
}

async fn collection_tier<R: Rng + Send>(
    catalog: &dyn Catalog,
    rules: &SelectionRules,
    rng: &mut R,
) -> Result<Option<SelectionResult>> {
    let mut collections = catalog.list_collections().await?;
    collections.shuffle(rng);

    for collection in collections.iter().take(rules.collection_attempts) {
        let pool = catalog
            .list_products_in_collection(collection.id, rules.pool_size)
            .await?;
        let picked = sample_newest(pool, rules, rng);
        if let Some(selection) = SelectionResult::new(
            picked,
            collection.title.clone(),
            None,
            SelectionTier::CollectionFallback,
        ) {
            return Ok(Some(selection));
        }
        debug!(collection = %collection.handle, "collection has no products with images");
    }
    Ok(None)
}

/// Deduplicate by id, keep the newest `window`, draw `count` uniformly and
/// return them newest first.
fn sample_newest<R: Rng>(mut pool: Vec<Product>, rules: &SelectionRules, rng: &mut R) -> Vec<Product> {
    let mut seen = HashSet::new();
    pool.retain(|p| seen.insert(p.id));
    pool.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    pool.truncate(rules.window.max(1));

    let mut picked: Vec<Product> = pool
        .choose_multiple(rng, rules.count)
        .cloned()
        .collect();
    picked.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    picked
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use shopscribe_shared::{SeasonTag, default_seasons};

    use super::*;
    use crate::clock::FixedClock;
    use crate::testing::{FakeCatalog, collection, product};

    fn rules(count: usize) -> SelectionRules {
        let mut config = AppConfig::default();
        config.selection.count = count;
        SelectionRules::from_config(&config, SeedKeywords::default()).unwrap()
    }

    /// A date with no active season window.
    fn off_season() -> FixedClock {
        FixedClock("2024-06-15T16:00:00Z".parse::<DateTime<Utc>>().unwrap())
    }

    fn halloween() -> FixedClock {
        FixedClock("2024-10-20T16:00:00Z".parse::<DateTime<Utc>>().unwrap())
    }

    fn ids(selection: &SelectionResult) -> Vec<u64> {
        selection.products().iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn three_of_five_with_images_in_recency_order() {
        let mut products = vec![
            product(1, "Trail Cap"),
            product(2, "Placeholder Jacket"),
            product(3, "Canvas Tote"),
            product(4, "Imageless Scarf"),
            product(5, "Storm Hoodie"),
        ];
        products[1].image.clear();
        products[3].image.clear();
        let catalog = FakeCatalog::with_products(products);

        let mut rng = StdRng::seed_from_u64(42);
        let selection = select(&catalog, &off_season(), &rules(3), &mut rng)
            .await
            .unwrap();

        assert_eq!(selection.tier(), SelectionTier::Freshness);
        assert_eq!(ids(&selection), vec![5, 3, 1]);
        assert_eq!(selection.topic(), NEW_ARRIVALS_TOPIC);
        assert_eq!(selection.season(), None);
    }

    #[tokio::test]
    async fn returns_min_of_count_and_available_distinct() {
        let products: Vec<Product> = (1..=40).map(|i| product(i, &format!("Item {i}"))).collect();
        let catalog = FakeCatalog::with_products(products);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select(&catalog, &off_season(), &rules(4), &mut rng)
                .await
                .unwrap();
            let picked = ids(&selection);
            assert_eq!(picked.len(), 4);
            let unique: HashSet<u64> = picked.iter().copied().collect();
            assert_eq!(unique.len(), 4);
            assert!(picked.windows(2).all(|w| w[0] > w[1]), "newest first: {picked:?}");
        }

        let small = FakeCatalog::with_products(vec![product(1, "Only One")]);
        let mut rng = StdRng::seed_from_u64(1);
        let selection = select(&small, &off_season(), &rules(3), &mut rng)
            .await
            .unwrap();
        assert_eq!(ids(&selection), vec![1]);
    }

    #[tokio::test]
    async fn samples_only_from_newest_window() {
        let products: Vec<Product> = (1..=50).map(|i| product(i, &format!("Item {i}"))).collect();
        let catalog = FakeCatalog::with_products(products);
        let mut rules = rules(3);
        rules.window = 5;

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select(&catalog, &off_season(), &rules, &mut rng).await.unwrap();
            assert!(ids(&selection).iter().all(|id| *id > 45));
        }
    }

    #[tokio::test]
    async fn seed_keyword_becomes_freshness_topic() {
        let catalog = FakeCatalog::with_products(vec![product(1, "Cap"), product(2, "Tee")]);
        let mut rules = rules(3);
        rules.keywords = SeedKeywords::new(vec!["cozy streetwear".into()]);

        let mut rng = StdRng::seed_from_u64(3);
        let selection = select(&catalog, &off_season(), &rules, &mut rng).await.unwrap();
        assert_eq!(selection.topic(), "cozy streetwear");
    }

    #[tokio::test]
    async fn active_season_uses_only_curated_collections() {
        let spooky: Vec<Product> = (100..106).map(|i| product(i, &format!("Spooky {i}"))).collect();
        let catalog = FakeCatalog {
            products: (1..=30).map(|i| product(i, &format!("Item {i}"))).collect(),
            collections: vec![
                (collection(11, "Halloween"), spooky),
                (collection(12, "Summer"), vec![product(200, "Beach Towel")]),
            ],
            ..FakeCatalog::default()
        };

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select(&catalog, &halloween(), &rules(3), &mut rng)
                .await
                .unwrap();
            assert_eq!(selection.tier(), SelectionTier::Seasonal);
            assert_eq!(selection.season(), Some(SeasonTag::Halloween));
            assert_eq!(selection.topic(), "Halloween Picks");
            assert!(ids(&selection).iter().all(|id| (100..106).contains(id)));
        }
    }

    #[tokio::test]
    async fn season_products_are_deduplicated_across_collections() {
        let shared = product(7, "Black Friday Hoodie");
        let mut seasons = default_seasons();
        seasons.retain(|s| s.name == "black-friday");
        let mut config = AppConfig::default();
        config.seasons = seasons;
        let rules = SelectionRules::from_config(&config, SeedKeywords::default()).unwrap();

        let catalog = FakeCatalog {
            collections: vec![
                (collection(1, "Black Friday"), vec![shared.clone()]),
                (collection(2, "Deals"), vec![shared, product(8, "Deal Mug")]),
            ],
            ..FakeCatalog::default()
        };
        let clock = FixedClock("2024-11-25T16:00:00Z".parse().unwrap());
        let mut rng = StdRng::seed_from_u64(5);
        let selection = select(&catalog, &clock, &rules, &mut rng).await.unwrap();
        assert_eq!(ids(&selection), vec![8, 7]);
    }

    #[tokio::test]
    async fn empty_season_falls_through_to_freshness() {
        let catalog = FakeCatalog {
            products: vec![product(1, "Cap")],
            collections: vec![(collection(11, "Halloween"), vec![])],
            ..FakeCatalog::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let selection = select(&catalog, &halloween(), &rules(3), &mut rng)
            .await
            .unwrap();
        assert_eq!(selection.tier(), SelectionTier::Freshness);
    }

    #[tokio::test]
    async fn freshness_failure_falls_through_to_collections() {
        let catalog = FakeCatalog {
            fail_products: true,
            collections: vec![
                (collection(1, "Empty"), vec![]),
                (collection(2, "Gift Ideas"), vec![product(9, "Gift Card Tin")]),
            ],
            ..FakeCatalog::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let selection = select(&catalog, &off_season(), &rules(3), &mut rng)
            .await
            .unwrap();
        assert_eq!(selection.tier(), SelectionTier::CollectionFallback);
        assert_eq!(selection.topic(), "Gift Ideas");
        assert_eq!(ids(&selection), vec![9]);
    }

    #[tokio::test]
    async fn collection_tier_errors_are_fatal() {
        let catalog = FakeCatalog {
            fail_collections: true,
            ..FakeCatalog::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let err = select(&catalog, &off_season(), &rules(3), &mut rng)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn empty_store_names_tier_chain() {
        let catalog = FakeCatalog::default();
        let mut rng = StdRng::seed_from_u64(1);

        let err = select(&catalog, &halloween(), &rules(3), &mut rng)
            .await
            .unwrap_err();
        match &err {
            ShopscribeError::EmptyPool { tiers } => {
                assert_eq!(tiers, &["seasonal(halloween)", "freshness", "collection-fallback"]);
            }
            other => panic!("expected EmptyPool, got {other:?}"),
        }
        assert!(err
            .to_string()
            .contains("seasonal(halloween) -> freshness -> collection-fallback"));

        let err = select(&catalog, &off_season(), &rules(3), &mut rng)
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("freshness -> collection-fallback"));
    }

    #[tokio::test]
    async fn collection_attempts_are_bounded() {
        let empties: Vec<_> = (1..=10).map(|i| (collection(i, &format!("C{i}")), vec![])).collect();
        let catalog = FakeCatalog {
            collections: empties,
            ..FakeCatalog::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let _ = select(&catalog, &off_season(), &rules(3), &mut rng).await;
        let visited = catalog
            .calls()
            .iter()
            .filter(|c| c.starts_with("collection("))
            .count();
        assert_eq!(visited, 5);
    }
}
