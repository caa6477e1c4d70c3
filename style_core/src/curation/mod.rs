//! Commerce Curation Engine - turns a style profile into recommendations and
//! discounted product sets.
//!
//! Every catalog product gets a match score from five components:
//! 1. **Brand**: affinity to the product's brand
//! 2. **Category**: the category's share, relative to the top category
//! 3. **Color**: the best matching dominant color
//! 4. **Price**: closeness to the shopper's price sweet spot
//! 5. **Recent**: how much recent activity touched the brand or category
//!
//! Recommendations are the best-scoring products; sets group candidates by
//! theme and price them as a bundle.

mod bundle;

pub use bundle::*;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shop_domain::{
    same_key, BehaviorEvent, EventType, PriceTier, Product, ProductCatalog, ProductId, SetId,
};
use std::collections::HashSet;
use tracing::debug;

use crate::error::StyleResult;
use crate::profile::{normalize_category, normalize_color, StyleProfile};

/// Weights of the score components. They should sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub brand: f64,
    pub category: f64,
    pub color: f64,
    pub price: f64,
    pub recent: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            brand: 0.30,
            category: 0.25,
            color: 0.20,
            price: 0.15,
            recent: 0.10,
        }
    }
}

/// Configuration for curation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    pub max_recommendations: usize,
    /// Maximum number of products in a set.
    pub set_size: usize,
    pub max_sets: usize,
    /// Discount of a two-item set.
    pub base_discount: f64,
    /// Extra discount per item beyond two.
    pub per_item_discount: f64,
    pub max_discount: f64,
    /// Recent views of set items that raise urgency to medium.
    pub medium_urgency_views: usize,
    pub weights: ScoreWeights,
}

impl CurationConfig {
    /// `max_discount` limited to [0, 1]; unusable values count as no discount.
    pub fn discount_cap(&self) -> f64 {
        self.max_discount.max(0.0).min(1.0)
    }
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 10,
            set_size: 3,
            max_sets: 3,
            base_discount: 0.10,
            per_item_discount: 0.025,
            max_discount: 0.25,
            medium_urgency_views: 5,
            weights: ScoreWeights::default(),
        }
    }
}

/// Why a product was recommended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecommendationReason {
    BrandAffinity(String),
    CategoryMatch(String),
    ColorMatch(String),
    PriceFit(PriceTier),
    RecentInterest,
}

/// A scored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    pub title: String,
    /// Match score from 0.0 to 1.0.
    pub score: f64,
    pub reasons: Vec<RecommendationReason>,
}

/// Result of curating for one shopper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationResult {
    pub recommendations: Vec<Recommendation>,
    pub sets: Vec<ShoppableSet>,
}

/// Scores products against a profile and assembles sets.
#[derive(Debug, Clone, Default)]
pub struct CurationEngine {
    config: CurationConfig,
}

impl CurationEngine {
    pub fn new(config: CurationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    /// Score one product. Returns the weighted score and the strong components.
    pub fn score_product(
        &self,
        profile: &StyleProfile,
        recent_events: &[BehaviorEvent],
        product: &Product,
    ) -> (f64, Vec<RecommendationReason>) {
        let weights = &self.config.weights;
        let mut reasons = Vec::new();

        let brand = profile.brand_score(&product.brand);
        if brand >= 0.5 {
            reasons.push(RecommendationReason::BrandAffinity(product.brand.clone()));
        }

        let top_category = profile.top_category().map(|c| c.weight).unwrap_or(0.0);
        let category = if top_category > 0.0 {
            (profile.category_weight(&product.category) / top_category).min(1.0)
        } else {
            0.0
        };
        if category >= 0.5 {
            reasons.push(RecommendationReason::CategoryMatch(normalize_category(
                &product.category,
            )));
        }

        let best_color = product
            .colors
            .iter()
            .map(|c| (c, profile.color_weight(c)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let color = best_color.map(|(_, w)| w).unwrap_or(0.0);
        if let Some((name, weight)) = best_color {
            if weight >= 0.5 {
                reasons.push(RecommendationReason::ColorMatch(normalize_color(name)));
            }
        }

        let tier = product.price_tier();
        let price = match profile.sweet_spot() {
            Some(spot) => match spot.tier.rank().abs_diff(tier.rank()) {
                0 => 1.0,
                1 => 0.5,
                _ => 0.0,
            },
            None => 0.5,
        };
        if profile.sweet_spot().is_some() && price >= 0.5 {
            reasons.push(RecommendationReason::PriceFit(tier));
        }

        let recent = if recent_events.is_empty() {
            0.0
        } else {
            let touched = recent_events
                .iter()
                .filter(|e| {
                    e.involves_brand(&product.brand) || e.involves_category(&product.category)
                })
                .count();
            (touched as f64 / recent_events.len() as f64).min(1.0)
        };
        if recent >= 0.5 {
            reasons.push(RecommendationReason::RecentInterest);
        }

        let score = brand * weights.brand
            + category * weights.category
            + color * weights.color
            + price * weights.price
            + recent * weights.recent;

        (score.clamp(0.0, 1.0), reasons)
    }

    /// Rank catalog products for a shopper, skipping recent purchases.
    pub fn recommend(
        &self,
        profile: &StyleProfile,
        recent_events: &[BehaviorEvent],
        catalog: &ProductCatalog,
    ) -> Vec<Recommendation> {
        let mut recommendations = self.candidates(profile, recent_events, catalog);
        recommendations.truncate(self.config.max_recommendations);

        debug!(
            user = %profile.user_id,
            catalog = catalog.len(),
            recommended = recommendations.len(),
            "recommendations ranked"
        );

        recommendations
    }

    /// Assemble themed, discounted sets from the best candidates.
    pub fn curate_sets(
        &self,
        profile: &StyleProfile,
        recent_events: &[BehaviorEvent],
        catalog: &ProductCatalog,
        now: DateTime<Utc>,
    ) -> StyleResult<Vec<ShoppableSet>> {
        let candidates = self.candidates(profile, recent_events, catalog);
        let size = self.config.set_size;

        let mut themed: Vec<(SetTheme, Vec<&Recommendation>)> = Vec::new();

        let mut seen_categories = HashSet::new();
        let look: Vec<_> = candidates
            .iter()
            .filter(|r| {
                catalog
                    .get(&r.product_id)
                    .is_some_and(|p| seen_categories.insert(normalize_category(&p.category)))
            })
            .take(size)
            .collect();
        themed.push((SetTheme::CompleteTheLook, look));

        let of_brand = |r: &Recommendation, brand: &str| {
            catalog
                .get(&r.product_id)
                .is_some_and(|p| same_key(&p.brand, brand))
        };
        if let Some(brand) = profile
            .preferred_brands
            .iter()
            .find(|b| candidates.iter().any(|r| of_brand(r, &b.brand)))
        {
            let edit: Vec<_> = candidates
                .iter()
                .filter(|r| of_brand(*r, &brand.brand))
                .take(size)
                .collect();
            themed.push((
                SetTheme::BrandEdit {
                    brand: brand.brand.clone(),
                },
                edit,
            ));
        }

        if let Some(color) = profile.top_color() {
            let palette: Vec<_> = candidates
                .iter()
                .filter(|r| {
                    catalog
                        .get(&r.product_id)
                        .is_some_and(|p| p.has_color(&color.color))
                })
                .take(size)
                .collect();
            themed.push((
                SetTheme::InYourColors {
                    color: color.color.clone(),
                },
                palette,
            ));
        }

        let mut sets = Vec::new();
        for (theme, picks) in themed {
            if sets.len() >= self.config.max_sets {
                break;
            }
            if picks.len() < 2 {
                continue;
            }
            let set = self.build_set(theme, &picks, recent_events, catalog, now);
            set.validate(self.config.discount_cap())?;
            sets.push(set);
        }

        debug!(
            user = %profile.user_id,
            candidates = candidates.len(),
            sets = sets.len(),
            "sets curated"
        );

        Ok(sets)
    }

    /// Discount for a set of `items` products.
    pub fn discount_for(&self, items: usize) -> f64 {
        let extra = items.saturating_sub(2) as f64 * self.config.per_item_discount;
        (self.config.base_discount + extra)
            .max(0.0)
            .min(self.config.discount_cap())
    }

    fn candidates(
        &self,
        profile: &StyleProfile,
        recent_events: &[BehaviorEvent],
        catalog: &ProductCatalog,
    ) -> Vec<Recommendation> {
        let purchased: HashSet<&ProductId> = recent_events
            .iter()
            .filter(|e| e.event_type == EventType::Purchase)
            .filter_map(|e| e.product_id.as_ref())
            .collect();

        let mut candidates: Vec<_> = catalog
            .products()
            .into_iter()
            .filter(|p| !purchased.contains(&p.id))
            .filter_map(|product| {
                let (score, reasons) = self.score_product(profile, recent_events, product);
                (score > 0.0).then(|| Recommendation {
                    product_id: product.id.clone(),
                    title: product.title.clone(),
                    score,
                    reasons,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        candidates
    }

    fn build_set(
        &self,
        theme: SetTheme,
        picks: &[&Recommendation],
        recent_events: &[BehaviorEvent],
        catalog: &ProductCatalog,
        now: DateTime<Utc>,
    ) -> ShoppableSet {
        let items: Vec<SetItem> = picks
            .iter()
            .filter_map(|r| {
                catalog.get(&r.product_id).map(|p| SetItem {
                    product_id: p.id.clone(),
                    title: p.title.clone(),
                    price: p.price.amount.max(0.0),
                    score: r.score,
                })
            })
            .collect();

        let prices: Vec<f64> = items.iter().map(|i| i.price).collect();
        let pricing = SetPricing::for_prices(&prices, self.discount_for(items.len()));

        let touching = |event_type: EventType| {
            recent_events
                .iter()
                .filter(move |e| e.event_type == event_type)
                .filter_map(|e| e.product_id.as_ref())
                .filter(|id| items.iter().any(|i| &i.product_id == *id))
                .collect::<HashSet<_>>()
        };
        let carted = touching(EventType::AddToCart);
        let purchased = touching(EventType::Purchase);
        let views = recent_events
            .iter()
            .filter(|e| e.event_type == EventType::View)
            .filter(|e| items.iter().any(|i| e.involves_product(&i.product_id)))
            .count();

        let (level, reason) = if carted.iter().any(|id| !purchased.contains(id)) {
            (UrgencyLevel::High, "Items from this set are waiting in your cart")
        } else if views >= self.config.medium_urgency_views {
            (UrgencyLevel::Medium, "You keep coming back to these")
        } else {
            (UrgencyLevel::Low, "Curated for your style")
        };

        let completed = items
            .iter()
            .filter(|i| carted.contains(&i.product_id) || purchased.contains(&i.product_id))
            .count();
        let completion_status = if items.is_empty() {
            0.0
        } else {
            completed as f64 / items.len() as f64
        };

        ShoppableSet {
            id: SetId::new(),
            title: theme.title(),
            theme,
            items,
            pricing,
            urgency: Urgency {
                level,
                expires_at: now + Duration::hours(level.window_hours()),
                reason: reason.to_string(),
            },
            completion_status,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileAggregator;
    use chrono::TimeZone;
    use shop_domain::UserId;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn user() -> UserId {
        UserId::new("u1")
    }

    fn event(event_type: EventType, product: &Product) -> BehaviorEvent {
        BehaviorEvent::new(user(), event_type)
            .with_product(product.id.as_str())
            .with_brand(product.brand.clone())
            .with_category(product.category.clone())
            .with_price(product.price.amount)
            .with_colors(product.colors.clone())
            .at(now())
    }

    fn catalog() -> ProductCatalog {
        vec![
            Product::new("shirt", "Linen Shirt")
                .with_brand("Aether")
                .with_category("tops")
                .with_price(80.0)
                .with_colors(["navy"]),
            Product::new("tee", "Pocket Tee")
                .with_brand("Aether")
                .with_category("tops")
                .with_price(40.0)
                .with_colors(["navy", "white"]),
            Product::new("chino", "Slim Chino")
                .with_brand("Aether")
                .with_category("bottoms")
                .with_price(95.0)
                .with_colors(["navy"]),
            Product::new("loafer", "Suede Loafer")
                .with_brand("Nord")
                .with_category("shoes")
                .with_price(180.0)
                .with_colors(["tan"]),
            Product::new("gown", "Silk Gown")
                .with_brand("Maison")
                .with_category("dresses")
                .with_price(1200.0)
                .with_colors(["red"]),
        ]
        .into_iter()
        .collect()
    }

    fn history(catalog: &ProductCatalog) -> Vec<BehaviorEvent> {
        let shirt = catalog.get(&ProductId::new("shirt")).unwrap();
        let chino = catalog.get(&ProductId::new("chino")).unwrap();
        let loafer = catalog.get(&ProductId::new("loafer")).unwrap();
        vec![
            event(EventType::View, shirt),
            event(EventType::AddToCart, shirt),
            event(EventType::View, chino),
            event(EventType::Purchase, chino),
            event(EventType::View, loafer),
        ]
    }

    fn profile(events: &[BehaviorEvent]) -> StyleProfile {
        ProfileAggregator::with_defaults().build(&user(), events, now())
    }

    #[test]
    fn test_score_product_components() {
        let catalog = catalog();
        let events = history(&catalog);
        let profile = profile(&events);
        let engine = CurationEngine::with_defaults();

        let tee = catalog.get(&ProductId::new("tee")).unwrap();
        let (score, reasons) = engine.score_product(&profile, &events, tee);
        assert!(score > 0.5, "tee score {}", score);
        assert!(reasons.contains(&RecommendationReason::BrandAffinity("Aether".to_string())));
        assert!(reasons.contains(&RecommendationReason::ColorMatch("navy".to_string())));

        let gown = catalog.get(&ProductId::new("gown")).unwrap();
        let (gown_score, gown_reasons) = engine.score_product(&profile, &events, gown);
        assert!(gown_score < score);
        assert!(gown_reasons.is_empty());
    }

    #[test]
    fn test_recommend_skips_purchases_and_ranks() {
        let catalog = catalog();
        let events = history(&catalog);
        let engine = CurationEngine::with_defaults();

        let recs = engine.recommend(&profile(&events), &events, &catalog);
        assert!(recs.iter().all(|r| r.product_id != ProductId::new("chino")));
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(recs.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn test_recommend_respects_limit() {
        let catalog = catalog();
        let events = history(&catalog);
        let engine = CurationEngine::new(CurationConfig {
            max_recommendations: 2,
            ..Default::default()
        });

        assert_eq!(engine.recommend(&profile(&events), &events, &catalog).len(), 2);
    }

    #[test]
    fn test_discount_for() {
        let engine = CurationEngine::with_defaults();
        assert!((engine.discount_for(2) - 0.10).abs() < 1e-9);
        assert!((engine.discount_for(3) - 0.125).abs() < 1e-9);
        assert!((engine.discount_for(20) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_curate_sets() {
        let catalog = catalog();
        let events = history(&catalog);
        let engine = CurationEngine::with_defaults();

        let sets = engine
            .curate_sets(&profile(&events), &events, &catalog, now())
            .unwrap();
        assert!(!sets.is_empty());
        assert!(sets.len() <= 3);

        let look = &sets[0];
        assert_eq!(look.theme, SetTheme::CompleteTheLook);
        assert!(!look.contains(&ProductId::new("chino")));
        assert!(look.validate(0.25).is_ok());

        // the carted shirt makes any set holding it urgent
        for set in sets.iter().filter(|s| s.contains(&ProductId::new("shirt"))) {
            assert_eq!(set.urgency.level, UrgencyLevel::High);
            assert_eq!(set.urgency.expires_at, now() + Duration::hours(24));
            assert!(set.completion_status > 0.0);
        }
    }

    #[test]
    fn test_curate_sets_builds_every_theme() {
        let catalog = catalog();
        let events = history(&catalog);
        let engine = CurationEngine::with_defaults();

        let sets = engine
            .curate_sets(&profile(&events), &events, &catalog, now())
            .unwrap();
        let themes: Vec<_> = sets.iter().map(|s| s.theme.clone()).collect();
        assert_eq!(
            themes,
            vec![
                SetTheme::CompleteTheLook,
                SetTheme::BrandEdit {
                    brand: "Aether".to_string()
                },
                SetTheme::InYourColors {
                    color: "navy".to_string()
                },
            ]
        );

        let look = &sets[0];
        assert!(look.contains(&ProductId::new("shirt")));
        assert!(look.contains(&ProductId::new("loafer")));
        assert_eq!(look.items.len(), 2);

        let edit = &sets[1];
        assert_eq!(edit.title, "The Aether edit");
        assert!(edit.items.iter().all(|i| {
            catalog
                .get(&i.product_id)
                .is_some_and(|p| p.brand == "Aether")
        }));

        let palette = &sets[2];
        assert_eq!(palette.title, "In your navy");
        assert!(palette.items.iter().all(|i| {
            catalog
                .get(&i.product_id)
                .is_some_and(|p| p.has_color("navy"))
        }));
    }

    #[test]
    fn test_repeated_views_raise_medium_urgency() {
        let catalog = catalog();
        let shirt = catalog.get(&ProductId::new("shirt")).unwrap();
        let tee = catalog.get(&ProductId::new("tee")).unwrap();
        let events: Vec<_> = (0..3)
            .flat_map(|_| [event(EventType::View, shirt), event(EventType::View, tee)])
            .collect();
        let engine = CurationEngine::with_defaults();

        let sets = engine
            .curate_sets(&profile(&events), &events, &catalog, now())
            .unwrap();

        let edit = sets
            .iter()
            .find(|s| matches!(s.theme, SetTheme::BrandEdit { .. }))
            .unwrap();
        assert!(edit.contains(&ProductId::new("shirt")));
        assert!(edit.contains(&ProductId::new("tee")));
        assert_eq!(edit.urgency.level, UrgencyLevel::Medium);
        assert_eq!(edit.urgency.expires_at, now() + Duration::hours(48));
        assert_eq!(edit.completion_status, 0.0);

        // one top plus the chino: only three views touch it
        let look = sets
            .iter()
            .find(|s| s.theme == SetTheme::CompleteTheLook)
            .unwrap();
        assert_eq!(look.urgency.level, UrgencyLevel::Low);
        assert_eq!(look.urgency.expires_at, now() + Duration::hours(72));
    }

    #[test]
    fn test_price_component() {
        use crate::profile::PriceRange;

        let engine = CurationEngine::with_defaults();
        let price_weight = engine.config().weights.price;
        let product = |price: f64| Product::new("p", "Product").with_price(price);

        // no price data: neutral half score, no reason
        let unpriced = StyleProfile::empty(user(), now());
        let (score, reasons) = engine.score_product(&unpriced, &[], &product(80.0));
        assert!((score - 0.5 * price_weight).abs() < 1e-9);
        assert!(reasons.is_empty());

        let mut priced = StyleProfile::empty(user(), now());
        priced.price_ranges.push(PriceRange {
            tier: PriceTier::Mid,
            min_seen: 60.0,
            max_seen: 120.0,
            frequency: 4,
            share: 1.0,
        });

        let (same, reasons) = engine.score_product(&priced, &[], &product(80.0));
        assert!((same - price_weight).abs() < 1e-9);
        assert_eq!(reasons, vec![RecommendationReason::PriceFit(PriceTier::Mid)]);

        let (neighbour, reasons) = engine.score_product(&priced, &[], &product(40.0));
        assert!((neighbour - 0.5 * price_weight).abs() < 1e-9);
        assert_eq!(reasons, vec![RecommendationReason::PriceFit(PriceTier::Budget)]);

        let (far, reasons) = engine.score_product(&priced, &[], &product(900.0));
        assert_eq!(far, 0.0);
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_negative_max_discount_does_not_panic() {
        let engine = CurationEngine::new(CurationConfig {
            max_discount: -0.1,
            ..Default::default()
        });
        assert_eq!(engine.discount_for(3), 0.0);

        let catalog = catalog();
        let events = history(&catalog);
        let sets = engine
            .curate_sets(&profile(&events), &events, &catalog, now())
            .unwrap();
        assert!(sets.iter().all(|s| s.pricing.discount_rate == 0.0));
    }

    #[test]
    fn test_empty_catalog_gives_nothing() {
        let events = history(&catalog());
        let engine = CurationEngine::with_defaults();
        let empty = ProductCatalog::new();

        assert!(engine.recommend(&profile(&events), &events, &empty).is_empty());
        assert!(engine
            .curate_sets(&profile(&events), &events, &empty, now())
            .unwrap()
            .is_empty());
    }
}
