//! Interaction mechanics: event types, intent weights, and price tiers.

use serde::{Deserialize, Serialize};

/// All interaction types a shopper can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    AddToCart,
    Purchase,
    Share,
    Save,
    Search,
    Filter,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::View,
        EventType::AddToCart,
        EventType::Purchase,
        EventType::Share,
        EventType::Save,
        EventType::Search,
        EventType::Filter,
    ];

    /// Intent weight of this interaction when folding events into a profile.
    pub fn weight(&self) -> f64 {
        match self {
            EventType::View => 1.0,
            EventType::AddToCart => 3.0,
            EventType::Purchase => 5.0,
            EventType::Share => 2.0,
            EventType::Save => 2.5,
            EventType::Search => 0.5,
            EventType::Filter => 0.5,
        }
    }

    /// Cart adds and purchases.
    pub fn is_conversion(&self) -> bool {
        matches!(self, EventType::AddToCart | EventType::Purchase)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::AddToCart => "add_to_cart",
            EventType::Purchase => "purchase",
            EventType::Share => "share",
            EventType::Save => "save",
            EventType::Search => "search",
            EventType::Filter => "filter",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price tiers used for spending analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceTier {
    /// Under 50.
    Budget,
    /// 50 to 150.
    Mid,
    /// 150 to 500.
    Premium,
    /// 500 and up.
    Luxury,
}

impl PriceTier {
    pub const ALL: [PriceTier; 4] = [
        PriceTier::Budget,
        PriceTier::Mid,
        PriceTier::Premium,
        PriceTier::Luxury,
    ];

    /// Pick the tier for an amount. Negative amounts count as Budget.
    pub fn for_amount(amount: f64) -> Self {
        if amount < 50.0 {
            PriceTier::Budget
        } else if amount < 150.0 {
            PriceTier::Mid
        } else if amount < 500.0 {
            PriceTier::Premium
        } else {
            PriceTier::Luxury
        }
    }

    /// Lower (inclusive) and upper (exclusive) bounds. Luxury is open-ended.
    pub fn bounds(&self) -> (f64, Option<f64>) {
        match self {
            PriceTier::Budget => (0.0, Some(50.0)),
            PriceTier::Mid => (50.0, Some(150.0)),
            PriceTier::Premium => (150.0, Some(500.0)),
            PriceTier::Luxury => (500.0, None),
        }
    }

    /// Representative price used when averaging across tiers.
    pub fn midpoint(&self) -> f64 {
        match self.bounds() {
            (low, Some(high)) => (low + high) / 2.0,
            (_, None) => 750.0,
        }
    }

    /// Position of the tier, from 0 (Budget) to 3 (Luxury).
    pub fn rank(&self) -> usize {
        match self {
            PriceTier::Budget => 0,
            PriceTier::Mid => 1,
            PriceTier::Premium => 2,
            PriceTier::Luxury => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceTier::Budget => "Budget",
            PriceTier::Mid => "Mid-range",
            PriceTier::Premium => "Premium",
            PriceTier::Luxury => "Luxury",
        }
    }
}
