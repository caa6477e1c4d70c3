//! Folds behavior events into a fresh style profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_domain::{BehaviorEvent, EventType, PriceTier, Season, UserId};
use std::collections::HashMap;
use tracing::debug;

use super::{
    normalize_brand, normalize_category, normalize_color, with_shares, AffinityTally, BrandAffinity,
    CategoryPreference, ColorPreference, PriceRange, SeasonalTrend, StyleProfile,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Limits and weighting for profile aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub top_colors: usize,
    pub top_brands: usize,
    pub top_categories: usize,
    /// Age at which an event counts half as much. Zero disables recency weighting.
    pub recency_half_life_days: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            top_colors: 5,
            top_brands: 5,
            top_categories: 6,
            recency_half_life_days: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
struct BrandStats {
    /// First-seen spelling.
    display: String,
    interactions: u32,
    purchases: u32,
    last_interaction: DateTime<Utc>,
}

/// Builds style profiles from event batches.
#[derive(Debug, Clone, Default)]
pub struct ProfileAggregator {
    config: AggregationConfig,
}

impl ProfileAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(AggregationConfig::default())
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Intent weight of an event, discounted by its age at `now`.
    ///
    /// Events stamped after `now` count in full.
    pub fn event_weight(&self, event: &BehaviorEvent, now: DateTime<Utc>) -> f64 {
        let half_life = self.config.recency_half_life_days;
        let recency = if half_life > 0.0 {
            let age_days = (now - event.timestamp).num_seconds().max(0) as f64 / SECONDS_PER_DAY;
            0.5_f64.powf(age_days / half_life)
        } else {
            1.0
        };
        event.event_type.weight() * recency
    }

    /// Build a profile for `user_id` from the events belonging to that user.
    pub fn build(
        &self,
        user_id: &UserId,
        events: &[BehaviorEvent],
        now: DateTime<Utc>,
    ) -> StyleProfile {
        let events: Vec<&BehaviorEvent> =
            events.iter().filter(|e| &e.user_id == user_id).collect();

        let mut profile = StyleProfile::empty(user_id.clone(), now);
        if events.is_empty() {
            return profile;
        }

        let weights: Vec<f64> = events.iter().map(|e| self.event_weight(e, now)).collect();

        profile.dominant_colors = self.colors(&events, &weights);
        profile.preferred_brands = self.brands(&events, &weights);
        profile.category_preferences = self.categories(&events, &weights);
        profile.price_ranges = price_ranges(&events);
        profile.seasonal_trends = seasonal_trends(&events, &weights);
        profile.event_count = events.len();

        debug!(
            user = %user_id,
            events = profile.event_count,
            colors = profile.dominant_colors.len(),
            brands = profile.preferred_brands.len(),
            categories = profile.category_preferences.len(),
            "profile aggregated"
        );

        profile
    }

    fn colors(&self, events: &[&BehaviorEvent], weights: &[f64]) -> Vec<ColorPreference> {
        let mut tally = AffinityTally::new();
        let mut frequency: HashMap<String, u32> = HashMap::new();

        for (event, weight) in events.iter().zip(weights) {
            for color in &event.metadata.colors {
                let color = normalize_color(color);
                if color.is_empty() {
                    continue;
                }
                *frequency.entry(color.clone()).or_default() += 1;
                tally.add(color, *weight);
            }
        }

        tally.normalize();
        tally
            .top(self.config.top_colors)
            .into_iter()
            .map(|(color, weight)| ColorPreference {
                color: color.clone(),
                weight,
                frequency: frequency.get(color).copied().unwrap_or(0),
            })
            .collect()
    }

    fn brands(&self, events: &[&BehaviorEvent], weights: &[f64]) -> Vec<BrandAffinity> {
        let mut tally = AffinityTally::new();
        let mut stats: HashMap<String, BrandStats> = HashMap::new();

        for (event, weight) in events.iter().zip(weights) {
            let Some(brand) = event.brand_name.as_deref().map(str::trim) else {
                continue;
            };
            if brand.is_empty() {
                continue;
            }

            let key = normalize_brand(brand);
            tally.add(key.clone(), *weight);
            let entry = stats.entry(key).or_insert_with(|| BrandStats {
                display: brand.to_string(),
                interactions: 0,
                purchases: 0,
                last_interaction: event.timestamp,
            });
            entry.interactions += 1;
            if event.event_type == EventType::Purchase {
                entry.purchases += 1;
            }
            entry.last_interaction = entry.last_interaction.max(event.timestamp);
        }

        tally.normalize();
        tally
            .top(self.config.top_brands)
            .into_iter()
            .filter_map(|(key, score)| {
                stats.get(key).map(|s| BrandAffinity {
                    brand: s.display.clone(),
                    score,
                    interactions: s.interactions,
                    purchases: s.purchases,
                    last_interaction: s.last_interaction,
                })
            })
            .collect()
    }

    fn categories(&self, events: &[&BehaviorEvent], weights: &[f64]) -> Vec<CategoryPreference> {
        let mut tally = AffinityTally::new();
        let mut interactions: HashMap<String, u32> = HashMap::new();

        for (event, weight) in events.iter().zip(weights) {
            let Some(category) = event.category_id.as_deref().map(normalize_category) else {
                continue;
            };
            if category.is_empty() {
                continue;
            }
            *interactions.entry(category.clone()).or_default() += 1;
            tally.add(category, *weight);
        }

        let shares = tally.into_shares();
        shares
            .top(self.config.top_categories)
            .into_iter()
            .map(|(category, weight)| CategoryPreference {
                category: category.clone(),
                weight,
                interactions: interactions.get(category).copied().unwrap_or(0),
            })
            .collect()
    }
}

fn price_ranges(events: &[&BehaviorEvent]) -> Vec<PriceRange> {
    let mut by_tier: HashMap<PriceTier, PriceRange> = HashMap::new();

    for price in events.iter().filter_map(|e| e.metadata.price) {
        if !price.is_finite() || price < 0.0 {
            continue;
        }
        let tier = PriceTier::for_amount(price);
        let range = by_tier.entry(tier).or_insert(PriceRange {
            tier,
            min_seen: price,
            max_seen: price,
            frequency: 0,
            share: 0.0,
        });
        range.min_seen = range.min_seen.min(price);
        range.max_seen = range.max_seen.max(price);
        range.frequency += 1;
    }

    with_shares(by_tier.into_values().collect())
}

fn seasonal_trends(events: &[&BehaviorEvent], weights: &[f64]) -> Vec<SeasonalTrend> {
    let mut seasons = AffinityTally::new();
    let mut categories: HashMap<Season, AffinityTally<String>> = HashMap::new();

    for (event, weight) in events.iter().zip(weights) {
        let season = Season::from_datetime(event.timestamp);
        seasons.add(season, *weight);
        if let Some(category) = event.category_id.as_deref().map(normalize_category) {
            if !category.is_empty() {
                categories.entry(season).or_default().add(category, *weight);
            }
        }
    }

    let shares = seasons.into_shares();
    shares
        .ranked()
        .into_iter()
        .map(|(season, weight)| SeasonalTrend {
            season: *season,
            weight,
            top_categories: categories
                .get(season)
                .map(|t| t.top(3).into_iter().map(|(c, _)| c.clone()).collect())
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn user() -> UserId {
        UserId::new("u1")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    fn event(event_type: EventType) -> BehaviorEvent {
        BehaviorEvent::new(user(), event_type).at(now())
    }

    #[test]
    fn test_empty_events_give_empty_profile() {
        let aggregator = ProfileAggregator::with_defaults();
        let profile = aggregator.build(&user(), &[], now());
        assert!(profile.is_empty());
        assert_eq!(profile.evolution_score, 0.0);
    }

    #[test]
    fn test_other_users_are_ignored() {
        let aggregator = ProfileAggregator::with_defaults();
        let events = vec![
            event(EventType::View).with_brand("Aether"),
            BehaviorEvent::new(UserId::new("u2"), EventType::Purchase)
                .with_brand("Other")
                .at(now()),
        ];

        let profile = aggregator.build(&user(), &events, now());
        assert_eq!(profile.event_count, 1);
        assert_eq!(profile.preferred_brands.len(), 1);
        assert_eq!(profile.preferred_brands[0].brand, "Aether");
    }

    #[test]
    fn test_recency_halves_weight() {
        let aggregator = ProfileAggregator::with_defaults();
        let old = event(EventType::View).at(now() - Duration::days(30));
        let fresh = event(EventType::View);
        let future = event(EventType::View).at(now() + Duration::days(3));

        assert!((aggregator.event_weight(&old, now()) - 0.5).abs() < 1e-9);
        assert!((aggregator.event_weight(&fresh, now()) - 1.0).abs() < 1e-9);
        assert!((aggregator.event_weight(&future, now()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_brand_affinity_weighs_intent() {
        let aggregator = ProfileAggregator::with_defaults();
        let events = vec![
            event(EventType::View).with_brand("Aether"),
            event(EventType::View).with_brand("Aether"),
            event(EventType::Purchase).with_brand("Nord"),
        ];

        let profile = aggregator.build(&user(), &events, now());
        let top = profile.top_brand().unwrap();
        assert_eq!(top.brand, "Nord");
        assert_eq!(top.score, 1.0);
        assert_eq!(top.purchases, 1);
        assert!((profile.brand_score("aether") - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_brand_spellings_fold_together() {
        let aggregator = ProfileAggregator::with_defaults();
        let events = vec![
            event(EventType::View).with_brand("Nike"),
            event(EventType::View).with_brand("NIKE"),
            event(EventType::View).with_brand(" nike "),
            event(EventType::View).with_brand("Ünique"),
            event(EventType::View).with_brand("üNIQUE"),
        ];

        let profile = aggregator.build(&user(), &events, now());
        assert_eq!(profile.preferred_brands.len(), 2);

        let nike = &profile.preferred_brands[0];
        assert_eq!(nike.brand, "Nike");
        assert_eq!(nike.interactions, 3);
        assert_eq!(nike.score, 1.0);
        assert_eq!(profile.brand_score("nIkE"), 1.0);
        assert!((profile.brand_score("ÜNIQUE") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_colors_are_normalized_and_capped() {
        let config = AggregationConfig {
            top_colors: 2,
            ..Default::default()
        };
        let aggregator = ProfileAggregator::new(config);
        let events = vec![
            event(EventType::Purchase).with_colors(["Navy", "cream"]),
            event(EventType::View).with_colors([" navy ", "red"]),
            event(EventType::View).with_colors(["olive"]),
        ];

        let profile = aggregator.build(&user(), &events, now());
        assert_eq!(profile.dominant_colors.len(), 2);
        assert_eq!(profile.dominant_colors[0].color, "navy");
        assert_eq!(profile.dominant_colors[0].weight, 1.0);
        assert_eq!(profile.dominant_colors[0].frequency, 2);
        assert_eq!(profile.dominant_colors[1].color, "cream");
    }

    #[test]
    fn test_category_shares() {
        let aggregator = ProfileAggregator::with_defaults();
        let events = vec![
            event(EventType::AddToCart).with_category("Tops"),
            event(EventType::View).with_category("bottoms"),
        ];

        let profile = aggregator.build(&user(), &events, now());
        let total: f64 = profile.category_preferences.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(profile.top_category().unwrap().category, "tops");
        assert!((profile.category_weight("tops") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_price_ranges() {
        let aggregator = ProfileAggregator::with_defaults();
        let events = vec![
            event(EventType::View).with_price(20.0),
            event(EventType::View).with_price(35.0),
            event(EventType::Purchase).with_price(120.0),
            event(EventType::View).with_price(-3.0),
            event(EventType::View),
        ];

        let profile = aggregator.build(&user(), &events, now());
        assert_eq!(profile.price_ranges.len(), 2);

        let budget = &profile.price_ranges[0];
        assert_eq!(budget.tier, PriceTier::Budget);
        assert_eq!(budget.frequency, 2);
        assert_eq!(budget.min_seen, 20.0);
        assert_eq!(budget.max_seen, 35.0);
        assert!((budget.share - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_seasonal_trends() {
        let config = AggregationConfig {
            recency_half_life_days: 0.0,
            ..Default::default()
        };
        let aggregator = ProfileAggregator::new(config);
        let winter = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let events = vec![
            event(EventType::View).with_category("swim"),
            event(EventType::View).with_category("sandals"),
            event(EventType::View).with_category("coats").at(winter),
        ];

        let profile = aggregator.build(&user(), &events, now());
        let peak = profile.peak_season().unwrap();
        assert_eq!(peak.season, Season::Summer);
        assert!((peak.weight - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(peak.top_categories, vec!["sandals", "swim"]);
        assert_eq!(profile.seasonal_trends[1].season, Season::Winter);
    }
}
