//! Product definitions.

use serde::{Deserialize, Serialize};

use super::ProductId;
use crate::interactions::PriceTier;

/// Case-folded form of a brand, color or category, used for every comparison.
pub fn fold_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Whether two attribute values match once folded.
pub fn same_key(a: &str, b: &str) -> bool {
    fold_key(a) == fold_key(b)
}

/// A monetary amount in a given currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Shorthand for a USD amount.
    pub fn usd(amount: f64) -> Self {
        Self::new(amount, "USD")
    }
}

/// A product as supplied by the commerce SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub brand: String,
    pub category: String,
    pub price: Money,
    /// Pre-sale price, when the product is marked down.
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Product {
    /// Create a new product with the given id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: ProductId::new(id),
            title: title.into(),
            brand: String::new(),
            category: String::new(),
            price: Money::usd(0.0),
            compare_at_price: None,
            colors: Vec::new(),
            rating: None,
            tags: Vec::new(),
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_price(mut self, amount: f64) -> Self {
        self.price = Money::usd(amount);
        self
    }

    pub fn with_colors(mut self, colors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    /// Price tier of the current price.
    pub fn price_tier(&self) -> PriceTier {
        PriceTier::for_amount(self.price.amount)
    }

    /// Check if the product carries a given color (case-insensitive).
    pub fn has_color(&self, color: &str) -> bool {
        self.colors.iter().any(|c| same_key(c, color))
    }
}
