//! Style profile module - the "Style DNA" of a shopper.
//!
//! A profile is built in two ways:
//! - **Aggregation**: fold a batch of behavior events into a fresh profile
//! - **Merging**: blend a freshly aggregated profile into an existing one,
//!   scoring how far preferences moved in the process

mod aggregator;
mod merge;
mod tally;

pub use aggregator::*;
pub use merge::*;
pub use tally::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_domain::{fold_key, PriceTier, Season, UserId};

/// Preference for a color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPreference {
    /// Lowercased, trimmed color name.
    pub color: String,
    /// Weight from 0.0 to 1.0, relative to the strongest color.
    pub weight: f64,
    pub frequency: u32,
}

/// Affinity to a brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandAffinity {
    pub brand: String,
    /// Score from 0.0 to 1.0, relative to the strongest brand.
    pub score: f64,
    pub interactions: u32,
    pub purchases: u32,
    pub last_interaction: DateTime<Utc>,
}

/// Share of attention a category receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPreference {
    pub category: String,
    /// Share from 0.0 to 1.0.
    pub weight: f64,
    pub interactions: u32,
}

/// Observed spending within one price tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub tier: PriceTier,
    pub min_seen: f64,
    pub max_seen: f64,
    pub frequency: u32,
    /// Share of priced events falling in this tier.
    pub share: f64,
}

/// Activity concentrated in one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTrend {
    pub season: Season,
    pub weight: f64,
    /// Up to three categories most active in this season.
    pub top_categories: Vec<String>,
}

/// Aggregated summary of a shopper's inferred aesthetic and spending preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub user_id: UserId,
    pub dominant_colors: Vec<ColorPreference>,
    pub preferred_brands: Vec<BrandAffinity>,
    pub category_preferences: Vec<CategoryPreference>,
    pub price_ranges: Vec<PriceRange>,
    pub seasonal_trends: Vec<SeasonalTrend>,
    /// How much preferences moved at the last merge, from -1.0 to 1.0.
    pub evolution_score: f64,
    /// Number of events folded into this profile.
    pub event_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl StyleProfile {
    /// Create an empty profile.
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            dominant_colors: Vec::new(),
            preferred_brands: Vec::new(),
            category_preferences: Vec::new(),
            price_ranges: Vec::new(),
            seasonal_trends: Vec::new(),
            evolution_score: 0.0,
            event_count: 0,
            last_updated: now,
        }
    }

    /// True when no events have been folded in.
    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    pub fn top_color(&self) -> Option<&ColorPreference> {
        self.dominant_colors.first()
    }

    pub fn top_brand(&self) -> Option<&BrandAffinity> {
        self.preferred_brands.first()
    }

    pub fn top_category(&self) -> Option<&CategoryPreference> {
        self.category_preferences.first()
    }

    pub fn peak_season(&self) -> Option<&SeasonalTrend> {
        self.seasonal_trends.first()
    }

    /// The tier with the largest share; ties go to the cheaper tier.
    pub fn sweet_spot(&self) -> Option<&PriceRange> {
        self.price_ranges.iter().fold(None, |best: Option<&PriceRange>, range| match best {
            Some(b) if b.share >= range.share => Some(b),
            _ => Some(range),
        })
    }

    /// Frequency-weighted mean of tier midpoints.
    pub fn mean_price(&self) -> Option<f64> {
        let total: u32 = self.price_ranges.iter().map(|r| r.frequency).sum();
        if total == 0 {
            return None;
        }
        let sum: f64 = self
            .price_ranges
            .iter()
            .map(|r| r.tier.midpoint() * r.frequency as f64)
            .sum();
        Some(sum / total as f64)
    }

    /// Affinity score of a brand (case-insensitive), 0.0 if unknown.
    pub fn brand_score(&self, brand: &str) -> f64 {
        let brand = normalize_brand(brand);
        self.preferred_brands
            .iter()
            .find(|b| normalize_brand(&b.brand) == brand)
            .map(|b| b.score)
            .unwrap_or(0.0)
    }

    /// Share of a category (case-insensitive), 0.0 if unknown.
    pub fn category_weight(&self, category: &str) -> f64 {
        let category = normalize_category(category);
        self.category_preferences
            .iter()
            .find(|c| normalize_category(&c.category) == category)
            .map(|c| c.weight)
            .unwrap_or(0.0)
    }

    /// Weight of a color (case-insensitive), 0.0 if unknown.
    pub fn color_weight(&self, color: &str) -> f64 {
        let color = normalize_color(color);
        self.dominant_colors
            .iter()
            .find(|c| c.color == color)
            .map(|c| c.weight)
            .unwrap_or(0.0)
    }

    /// Number of distinct colors, brands, and categories.
    pub fn distinct_keys(&self) -> usize {
        self.dominant_colors.len() + self.preferred_brands.len() + self.category_preferences.len()
    }

    pub fn color_tally(&self) -> AffinityTally<String> {
        self.dominant_colors
            .iter()
            .map(|c| (c.color.clone(), c.weight))
            .collect()
    }

    pub fn brand_tally(&self) -> AffinityTally<String> {
        self.preferred_brands
            .iter()
            .map(|b| (normalize_brand(&b.brand), b.score))
            .collect()
    }

    pub fn category_tally(&self) -> AffinityTally<String> {
        self.category_preferences
            .iter()
            .map(|c| (c.category.clone(), c.weight))
            .collect()
    }
}

/// Canonical form of a color name.
pub fn normalize_color(color: &str) -> String {
    fold_key(color)
}

/// Canonical form of a category id.
pub fn normalize_category(category: &str) -> String {
    fold_key(category)
}

/// Tally key of a brand. Profiles keep the first-seen casing for display.
pub fn normalize_brand(brand: &str) -> String {
    fold_key(brand)
}

/// Recompute shares and order ranges by tier, dropping empty tiers.
pub(crate) fn with_shares(mut ranges: Vec<PriceRange>) -> Vec<PriceRange> {
    ranges.retain(|r| r.frequency > 0);
    ranges.sort_by_key(|r| r.tier);
    let total: u32 = ranges.iter().map(|r| r.frequency).sum();
    for range in &mut ranges {
        range.share = if total > 0 {
            range.frequency as f64 / total as f64
        } else {
            0.0
        };
    }
    ranges
}
