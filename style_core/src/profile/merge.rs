//! Incremental profile updates and evolution scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_domain::Season;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use super::{
    normalize_brand, with_shares, AggregationConfig, BrandAffinity, CategoryPreference, ColorPreference,
    PriceRange, SeasonalTrend, StyleProfile,
};
use crate::error::{StyleError, StyleResult};

/// Settings for blending profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Weight of the incoming profile when blending (0.0-1.0).
    pub blend_rate: f64,
    /// Absolute evolution score at which a change counts as significant.
    pub significant_change: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            blend_rate: 0.3,
            significant_change: 0.3,
        }
    }
}

/// Blends new aggregates into an existing profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileMerger {
    config: MergeConfig,
    limits: AggregationConfig,
}

impl ProfileMerger {
    /// Create a merger. `limits` caps the merged lists the same way aggregation does.
    pub fn new(config: MergeConfig, limits: AggregationConfig) -> Self {
        Self { config, limits }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// True when the score marks a meaningful shift in preferences.
    pub fn is_significant(&self, score: f64) -> bool {
        score.abs() >= self.config.significant_change
    }

    /// Blend `incoming` into `existing`, producing a new profile.
    ///
    /// Each weight becomes `old * (1 - rate) + new * rate`; counters are summed.
    /// An empty side leaves the other side unchanged.
    pub fn merge(
        &self,
        existing: &StyleProfile,
        incoming: &StyleProfile,
        now: DateTime<Utc>,
    ) -> StyleResult<StyleProfile> {
        if existing.user_id != incoming.user_id {
            return Err(StyleError::UserMismatch {
                expected: existing.user_id.clone(),
                found: incoming.user_id.clone(),
            });
        }

        if incoming.is_empty() {
            let mut merged = existing.clone();
            merged.last_updated = now;
            return Ok(merged);
        }
        if existing.is_empty() {
            let mut merged = incoming.clone();
            merged.evolution_score = 0.0;
            merged.last_updated = now;
            return Ok(merged);
        }

        let rate = self.config.blend_rate.clamp(0.0, 1.0);
        let evolution_score = evolution_score(existing, incoming);

        let merged = StyleProfile {
            user_id: existing.user_id.clone(),
            dominant_colors: self.blend_colors(existing, incoming, rate),
            preferred_brands: self.blend_brands(existing, incoming, rate),
            category_preferences: self.blend_categories(existing, incoming, rate),
            price_ranges: merge_price_ranges(&existing.price_ranges, &incoming.price_ranges),
            seasonal_trends: blend_seasons(existing, incoming, rate),
            evolution_score,
            event_count: existing.event_count + incoming.event_count,
            last_updated: now,
        };

        info!(
            user = %merged.user_id,
            evolution_score,
            significant = self.is_significant(evolution_score),
            events = merged.event_count,
            "profile merged"
        );

        Ok(merged)
    }

    fn blend_colors(
        &self,
        existing: &StyleProfile,
        incoming: &StyleProfile,
        rate: f64,
    ) -> Vec<ColorPreference> {
        let mut blended: BTreeMap<String, ColorPreference> = BTreeMap::new();
        for (color, side_rate) in existing
            .dominant_colors
            .iter()
            .map(|c| (c, 1.0 - rate))
            .chain(incoming.dominant_colors.iter().map(|c| (c, rate)))
        {
            let entry = blended
                .entry(color.color.clone())
                .or_insert_with(|| ColorPreference {
                    color: color.color.clone(),
                    weight: 0.0,
                    frequency: 0,
                });
            entry.weight += color.weight * side_rate;
            entry.frequency += color.frequency;
        }

        let mut colors: Vec<_> = blended.into_values().collect();
        colors.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.color.cmp(&b.color)));
        colors.truncate(self.limits.top_colors);
        colors
    }

    fn blend_brands(
        &self,
        existing: &StyleProfile,
        incoming: &StyleProfile,
        rate: f64,
    ) -> Vec<BrandAffinity> {
        let mut blended: BTreeMap<String, BrandAffinity> = BTreeMap::new();
        for (brand, side_rate) in existing
            .preferred_brands
            .iter()
            .map(|b| (b, 1.0 - rate))
            .chain(incoming.preferred_brands.iter().map(|b| (b, rate)))
        {
            let entry = blended
                .entry(normalize_brand(&brand.brand))
                .or_insert_with(|| BrandAffinity {
                    score: 0.0,
                    interactions: 0,
                    purchases: 0,
                    ..brand.clone()
                });
            entry.score += brand.score * side_rate;
            entry.interactions += brand.interactions;
            entry.purchases += brand.purchases;
            entry.last_interaction = entry.last_interaction.max(brand.last_interaction);
        }

        let mut brands: Vec<_> = blended.into_values().collect();
        brands.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| normalize_brand(&a.brand).cmp(&normalize_brand(&b.brand)))
        });
        brands.truncate(self.limits.top_brands);
        brands
    }

    fn blend_categories(
        &self,
        existing: &StyleProfile,
        incoming: &StyleProfile,
        rate: f64,
    ) -> Vec<CategoryPreference> {
        let mut blended: BTreeMap<String, CategoryPreference> = BTreeMap::new();
        for (category, side_rate) in existing
            .category_preferences
            .iter()
            .map(|c| (c, 1.0 - rate))
            .chain(incoming.category_preferences.iter().map(|c| (c, rate)))
        {
            let entry = blended
                .entry(category.category.clone())
                .or_insert_with(|| CategoryPreference {
                    category: category.category.clone(),
                    weight: 0.0,
                    interactions: 0,
                });
            entry.weight += category.weight * side_rate;
            entry.interactions += category.interactions;
        }

        let mut categories: Vec<_> = blended.into_values().collect();
        categories.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.category.cmp(&b.category))
        });
        categories.truncate(self.limits.top_categories);
        categories
    }
}

fn merge_price_ranges(existing: &[PriceRange], incoming: &[PriceRange]) -> Vec<PriceRange> {
    let mut merged: HashMap<_, PriceRange> = HashMap::new();
    for range in existing.iter().chain(incoming) {
        merged
            .entry(range.tier)
            .and_modify(|r| {
                r.min_seen = r.min_seen.min(range.min_seen);
                r.max_seen = r.max_seen.max(range.max_seen);
                r.frequency += range.frequency;
            })
            .or_insert_with(|| range.clone());
    }
    with_shares(merged.into_values().collect())
}

fn blend_seasons(existing: &StyleProfile, incoming: &StyleProfile, rate: f64) -> Vec<SeasonalTrend> {
    let mut blended: BTreeMap<Season, SeasonalTrend> = BTreeMap::new();
    for trend in &existing.seasonal_trends {
        blended.insert(
            trend.season,
            SeasonalTrend {
                weight: trend.weight * (1.0 - rate),
                ..trend.clone()
            },
        );
    }
    for trend in &incoming.seasonal_trends {
        let entry = blended.entry(trend.season).or_insert_with(|| SeasonalTrend {
            season: trend.season,
            weight: 0.0,
            top_categories: Vec::new(),
        });
        entry.weight += trend.weight * rate;
        if !trend.top_categories.is_empty() {
            entry.top_categories = trend.top_categories.clone();
        }
    }

    let mut trends: Vec<_> = blended.into_values().collect();
    trends.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.season.cmp(&b.season)));
    trends
}

/// How far preferences moved between two snapshots, from -1.0 to 1.0.
///
/// The magnitude is the mean distribution drift over colors, brands, and
/// categories. The sign follows the mean price: positive when spending moves
/// up. Without a price signal, a widening palette counts as positive and a
/// narrowing one as negative.
pub fn evolution_score(old: &StyleProfile, new: &StyleProfile) -> f64 {
    let drift = [
        1.0 - old.color_tally().overlap(&new.color_tally()),
        1.0 - old.brand_tally().overlap(&new.brand_tally()),
        1.0 - old.category_tally().overlap(&new.category_tally()),
    ]
    .iter()
    .sum::<f64>()
        / 3.0;

    let price_delta = match (old.mean_price(), new.mean_price()) {
        (Some(before), Some(after)) if (after - before).abs() > f64::EPSILON => Some(after - before),
        _ => None,
    };
    let direction = match price_delta {
        Some(delta) => delta.signum(),
        None if new.distinct_keys() >= old.distinct_keys() => 1.0,
        None => -1.0,
    };

    (direction * drift).clamp(-1.0, 1.0)
}
