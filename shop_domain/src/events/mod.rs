//! Behavior events - single recorded interactions of a shopper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::{same_key, EventId, ProductId, SessionId, UserId};
use crate::interactions::EventType;

/// Free-form detail attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unit price seen or paid.
    pub price: Option<f64>,
    /// Colors of the product involved.
    #[serde(default)]
    pub colors: Vec<String>,
    pub search_query: Option<String>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single recorded user interaction. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub event_type: EventType,
    pub product_id: Option<ProductId>,
    pub category_id: Option<String>,
    pub brand_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl BehaviorEvent {
    /// Create a new event stamped with the current time, outside any session.
    pub fn new(user_id: UserId, event_type: EventType) -> Self {
        Self {
            id: EventId::new(),
            user_id,
            event_type,
            product_id: None,
            category_id: None,
            brand_name: None,
            timestamp: Utc::now(),
            session_id: SessionId::nil(),
            metadata: EventMetadata::default(),
        }
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(ProductId::new(product_id));
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_id = Some(category.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand_name = Some(brand.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.metadata.price = Some(price);
        self
    }

    pub fn with_colors(mut self, colors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.metadata.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search_query(mut self, query: impl Into<String>) -> Self {
        self.metadata.search_query = Some(query.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }

    pub fn in_session(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check if the event touched a specific product.
    pub fn involves_product(&self, product_id: &ProductId) -> bool {
        self.product_id.as_ref() == Some(product_id)
    }

    /// Check if the event touched a brand (case-insensitive).
    pub fn involves_brand(&self, brand: &str) -> bool {
        self.brand_name
            .as_deref()
            .is_some_and(|b| same_key(b, brand))
    }

    /// Check if the event touched a category (case-insensitive).
    pub fn involves_category(&self, category: &str) -> bool {
        self.category_id
            .as_deref()
            .is_some_and(|c| same_key(c, category))
    }
}
