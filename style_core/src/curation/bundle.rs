//! Shoppable sets - curated, price-bundled product collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_domain::{ProductId, SetId};

use crate::error::{StyleError, StyleResult};

/// What ties the products of a set together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetTheme {
    /// One product from each of several categories.
    CompleteTheLook,
    /// Products of a single favorite brand.
    BrandEdit { brand: String },
    /// Products sharing a dominant color.
    InYourColors { color: String },
}

impl SetTheme {
    pub fn title(&self) -> String {
        match self {
            SetTheme::CompleteTheLook => "Complete the look".to_string(),
            SetTheme::BrandEdit { brand } => format!("The {} edit", brand),
            SetTheme::InYourColors { color } => format!("In your {}", color),
        }
    }
}

/// A product inside a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: f64,
    /// Match score the product was picked with.
    pub score: f64,
}

/// Bundle pricing of a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPricing {
    pub original_total: f64,
    pub bundle_price: f64,
    pub savings: f64,
    /// Fraction taken off the original total.
    pub discount_rate: f64,
}

impl SetPricing {
    /// Price a bundle of `prices` at the given discount rate.
    pub fn for_prices(prices: &[f64], discount_rate: f64) -> Self {
        let discount_rate = discount_rate.clamp(0.0, 1.0);
        let original_total = round2(prices.iter().sum());
        let bundle_price = round2(original_total * (1.0 - discount_rate));
        Self {
            original_total,
            bundle_price,
            savings: round2(original_total - bundle_price),
            discount_rate,
        }
    }
}

/// How pressing a set is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
}

impl UrgencyLevel {
    /// How long an offer at this level stays open.
    pub fn window_hours(&self) -> i64 {
        match self {
            UrgencyLevel::High => 24,
            UrgencyLevel::Medium => 48,
            UrgencyLevel::Low => 72,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Urgency {
    pub level: UrgencyLevel,
    pub expires_at: DateTime<Utc>,
    pub reason: String,
}

/// A curated, price-bundled collection presented as one purchasable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppableSet {
    pub id: SetId,
    pub title: String,
    pub theme: SetTheme,
    pub items: Vec<SetItem>,
    pub pricing: SetPricing,
    pub urgency: Urgency,
    /// Fraction of items already carted or purchased (0.0-1.0).
    pub completion_status: f64,
    pub created_at: DateTime<Utc>,
}

impl ShoppableSet {
    /// Check the set invariants against the allowed maximum discount.
    pub fn validate(&self, max_discount: f64) -> StyleResult<()> {
        if self.items.is_empty() {
            return Err(invalid("set has no items"));
        }
        if !(0.0..=1.0).contains(&self.completion_status) {
            return Err(invalid(format!(
                "completion status {} outside [0, 1]",
                self.completion_status
            )));
        }
        if self.pricing.bundle_price > self.pricing.original_total {
            return Err(invalid(format!(
                "bundle price {:.2} exceeds original total {:.2}",
                self.pricing.bundle_price, self.pricing.original_total
            )));
        }
        if !(0.0..=max_discount).contains(&self.pricing.discount_rate) {
            return Err(invalid(format!(
                "discount {:.3} outside [0, {:.3}]",
                self.pricing.discount_rate, max_discount
            )));
        }
        Ok(())
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|i| &i.product_id == product_id)
    }
}

fn invalid(reason: impl Into<String>) -> StyleError {
    StyleError::InvalidSet {
        reason: reason.into(),
    }
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
