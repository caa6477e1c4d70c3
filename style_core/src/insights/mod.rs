//! Insights derived from sessions and profiles.

use serde::{Deserialize, Serialize};
use shop_domain::{BehaviorEvent, SessionTotals};
use std::collections::HashMap;

use crate::profile::{normalize_brand, normalize_category, AffinityTally, StyleProfile};

/// Kinds of insight the generator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsightKind {
    // Session
    WindowShopper,
    CartConversion,
    BigSpender,
    BrandLoyal,
    TopCategory,

    // Profile
    SignatureColor,
    FavoriteBrand,
    PriceSweetSpot,
    SeasonalPeak,
    StyleEvolution,
}

/// A single displayable insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub headline: String,
    pub detail: String,
    /// Confidence from 0.0 to 1.0.
    pub confidence: f64,
}

impl Insight {
    fn new(
        kind: InsightKind,
        headline: impl Into<String>,
        detail: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind,
            headline: headline.into(),
            detail: detail.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Thresholds for session insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Views without a cart add that mark a window shopper.
    pub window_shopper_views: u32,
    pub big_spender_threshold: f64,
    /// Share of branded events one brand must hold to count as loyalty.
    pub brand_loyalty_share: f64,
    pub brand_loyalty_min_events: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            window_shopper_views: 5,
            big_spender_threshold: 200.0,
            brand_loyalty_share: 0.6,
            brand_loyalty_min_events: 3,
        }
    }
}

/// Turns session totals and profiles into insights.
#[derive(Debug, Clone, Default)]
pub struct InsightGenerator {
    config: InsightConfig,
}

impl InsightGenerator {
    pub fn new(config: InsightConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Insights for one session, from its totals and events.
    pub fn session_insights(&self, totals: &SessionTotals, events: &[&BehaviorEvent]) -> Vec<Insight> {
        let mut insights = Vec::new();

        if totals.views >= self.config.window_shopper_views && totals.cart_adds == 0 {
            insights.push(Insight::new(
                InsightKind::WindowShopper,
                "Window shopper",
                format!("Browsed {} items without adding to cart", totals.views),
                totals.views as f64 / (2 * self.config.window_shopper_views.max(1)) as f64,
            ));
        }

        if totals.cart_adds > 0 {
            let insight = match totals.cart_conversion() {
                Some(ratio) => Insight::new(
                    InsightKind::CartConversion,
                    format!("Cart conversion {:.0}%", ratio * 100.0),
                    format!("{} of {} views ended in the cart", totals.cart_adds, totals.views),
                    0.8,
                ),
                None => Insight::new(
                    InsightKind::CartConversion,
                    "Cart conversion 100%",
                    format!("Added {} items straight to the cart", totals.cart_adds),
                    0.8,
                ),
            };
            insights.push(insight);
        }

        if totals.total_spent >= self.config.big_spender_threshold {
            insights.push(Insight::new(
                InsightKind::BigSpender,
                "Big spender",
                format!("Spent ${:.2} this session", totals.total_spent),
                0.9,
            ));
        }

        let mut brands: AffinityTally<String> = AffinityTally::new();
        let mut spelling: HashMap<String, &str> = HashMap::new();
        for brand in events
            .iter()
            .filter_map(|e| e.brand_name.as_deref().map(str::trim))
            .filter(|b| !b.is_empty())
        {
            let key = normalize_brand(brand);
            spelling.entry(key.clone()).or_insert(brand);
            brands.add(key, 1.0);
        }
        let branded = brands.total() as usize;
        if branded >= self.config.brand_loyalty_min_events {
            if let Some((key, count)) = brands.heaviest() {
                let share = count / branded as f64;
                if share >= self.config.brand_loyalty_share {
                    let brand = spelling.get(key).copied().unwrap_or(key.as_str());
                    insights.push(Insight::new(
                        InsightKind::BrandLoyal,
                        format!("Brand loyal: {}", brand),
                        format!("{:.0}% of your branded activity", share * 100.0),
                        share,
                    ));
                }
            }
        }

        let categories: AffinityTally<String> = events
            .iter()
            .filter_map(|e| e.category_id.as_deref().map(normalize_category))
            .filter(|c| !c.is_empty())
            .map(|c| (c, 1.0))
            .collect();
        if let Some((category, count)) = categories.heaviest() {
            insights.push(Insight::new(
                InsightKind::TopCategory,
                format!("Most browsed: {}", category),
                format!("{} interactions", count as u32),
                count / categories.total(),
            ));
        }

        insights
    }

    /// Insights describing a profile. A style evolution insight is added when
    /// the evolution score reaches `evolution_threshold` in magnitude.
    pub fn profile_insights(&self, profile: &StyleProfile, evolution_threshold: f64) -> Vec<Insight> {
        let mut insights = Vec::new();

        if let Some(color) = profile.top_color() {
            insights.push(Insight::new(
                InsightKind::SignatureColor,
                format!("Signature color: {}", color.color),
                format!("Seen on {} of your favorites", color.frequency),
                color.weight,
            ));
        }

        if let Some(brand) = profile.top_brand() {
            insights.push(Insight::new(
                InsightKind::FavoriteBrand,
                format!("Favorite brand: {}", brand.brand),
                format!(
                    "{} interactions, {} purchases",
                    brand.interactions, brand.purchases
                ),
                brand.score,
            ));
        }

        if let Some(range) = profile.sweet_spot() {
            insights.push(Insight::new(
                InsightKind::PriceSweetSpot,
                format!("Sweet spot: {}", range.tier.label()),
                format!(
                    "{:.0}% of priced items between ${:.0} and ${:.0}",
                    range.share * 100.0,
                    range.min_seen,
                    range.max_seen
                ),
                range.share,
            ));
        }

        if let Some(trend) = profile.peak_season() {
            let detail = if trend.top_categories.is_empty() {
                "Most of your activity lands here".to_string()
            } else {
                format!("Top picks: {}", trend.top_categories.join(", "))
            };
            insights.push(Insight::new(
                InsightKind::SeasonalPeak,
                format!("{} shopper", trend.season.label()),
                detail,
                trend.weight,
            ));
        }

        let score = profile.evolution_score;
        if score.abs() >= evolution_threshold && score != 0.0 {
            let (headline, detail) = if score > 0.0 {
                ("Style shift: branching out", "Your picks are widening and trading up")
            } else {
                ("Style shift: paring back", "Your picks are narrowing and trading down")
            };
            insights.push(Insight::new(
                InsightKind::StyleEvolution,
                headline,
                detail,
                score.abs(),
            ));
        }

        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{BrandAffinity, ColorPreference};
    use chrono::Utc;
    use shop_domain::{EventType, UserId};

    fn event(event_type: EventType) -> BehaviorEvent {
        BehaviorEvent::new(UserId::new("u1"), event_type)
    }

    fn kinds(insights: &[Insight]) -> Vec<InsightKind> {
        insights.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_window_shopper() {
        let events: Vec<_> = (0..6).map(|_| event(EventType::View)).collect();
        let totals = SessionTotals::from_events(&events);
        let refs: Vec<_> = events.iter().collect();

        let insights = InsightGenerator::with_defaults().session_insights(&totals, &refs);
        assert_eq!(kinds(&insights), vec![InsightKind::WindowShopper]);
        assert!((insights[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_conversion_and_spend() {
        let events = vec![
            event(EventType::View),
            event(EventType::View),
            event(EventType::AddToCart),
            event(EventType::Purchase).with_price(250.0),
        ];
        let totals = SessionTotals::from_events(&events);
        let refs: Vec<_> = events.iter().collect();

        let insights = InsightGenerator::with_defaults().session_insights(&totals, &refs);
        assert_eq!(
            kinds(&insights),
            vec![InsightKind::CartConversion, InsightKind::BigSpender]
        );
        assert_eq!(insights[0].headline, "Cart conversion 50%");
    }

    #[test]
    fn test_brand_loyalty_and_top_category() {
        let events = vec![
            event(EventType::View).with_brand("Aether").with_category("Tops"),
            event(EventType::View).with_brand("Aether").with_category("tops"),
            event(EventType::View).with_brand("Aether").with_category("shoes"),
            event(EventType::View).with_brand("Nord"),
        ];
        let totals = SessionTotals::from_events(&events);
        let refs: Vec<_> = events.iter().collect();

        let insights = InsightGenerator::with_defaults().session_insights(&totals, &refs);
        let loyal = insights
            .iter()
            .find(|i| i.kind == InsightKind::BrandLoyal)
            .unwrap();
        assert_eq!(loyal.headline, "Brand loyal: Aether");
        assert!((loyal.confidence - 0.75).abs() < 1e-9);

        let top = insights
            .iter()
            .find(|i| i.kind == InsightKind::TopCategory)
            .unwrap();
        assert_eq!(top.headline, "Most browsed: tops");
    }

    #[test]
    fn test_brand_loyalty_ignores_casing() {
        let events = vec![
            event(EventType::View).with_brand("Nike"),
            event(EventType::View).with_brand("NIKE"),
            event(EventType::View).with_brand("nike"),
        ];
        let totals = SessionTotals::from_events(&events);
        let refs: Vec<_> = events.iter().collect();

        let insights = InsightGenerator::with_defaults().session_insights(&totals, &refs);
        let loyal = insights
            .iter()
            .find(|i| i.kind == InsightKind::BrandLoyal)
            .unwrap();
        assert_eq!(loyal.headline, "Brand loyal: Nike");
        assert!((loyal.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_profile_insights() {
        let mut profile = StyleProfile::empty(UserId::new("u1"), Utc::now());
        profile.dominant_colors.push(ColorPreference {
            color: "navy".to_string(),
            weight: 1.0,
            frequency: 4,
        });
        profile.preferred_brands.push(BrandAffinity {
            brand: "Aether".to_string(),
            score: 1.0,
            interactions: 5,
            purchases: 2,
            last_interaction: Utc::now(),
        });
        profile.evolution_score = -0.4;

        let insights = InsightGenerator::with_defaults().profile_insights(&profile, 0.3);
        assert_eq!(
            kinds(&insights),
            vec![
                InsightKind::SignatureColor,
                InsightKind::FavoriteBrand,
                InsightKind::StyleEvolution
            ]
        );
        assert_eq!(insights[2].headline, "Style shift: paring back");

        let calm = InsightGenerator::with_defaults().profile_insights(&profile, 0.5);
        assert!(!kinds(&calm).contains(&InsightKind::StyleEvolution));
    }
}
