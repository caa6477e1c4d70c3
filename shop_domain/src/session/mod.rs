//! Shopping sessions - groups of events between a start and an end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{EventId, SessionId, UserId};
use crate::events::BehaviorEvent;
use crate::interactions::EventType;

/// Counters derived from the events of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub views: u32,
    pub cart_adds: u32,
    pub purchases: u32,
    pub shares: u32,
    pub saves: u32,
    pub searches: u32,
    /// Sum of purchase prices.
    pub total_spent: f64,
    pub duration_secs: i64,
}

impl SessionTotals {
    /// Tally the given events. Duration is left at zero.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a BehaviorEvent>) -> Self {
        let mut totals = SessionTotals::default();
        for event in events {
            match event.event_type {
                EventType::View => totals.views += 1,
                EventType::AddToCart => totals.cart_adds += 1,
                EventType::Purchase => {
                    totals.purchases += 1;
                    totals.total_spent += event.metadata.price.unwrap_or(0.0);
                }
                EventType::Share => totals.shares += 1,
                EventType::Save => totals.saves += 1,
                EventType::Search | EventType::Filter => totals.searches += 1,
            }
        }
        totals
    }

    /// Cart adds per view, if anything was viewed.
    pub fn cart_conversion(&self) -> Option<f64> {
        (self.views > 0).then(|| self.cart_adds as f64 / self.views as f64)
    }
}

/// A shopping session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    /// None while the session is open.
    pub ended_at: Option<DateTime<Utc>>,
    pub event_ids: Vec<EventId>,
    pub totals: SessionTotals,
    /// Headlines of the insights derived when the session ended.
    pub insights: Vec<String>,
}

impl ShoppingSession {
    /// Open a new session.
    pub fn start(user_id: UserId, started_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            started_at,
            ended_at: None,
            event_ids: Vec::new(),
            totals: SessionTotals::default(),
            insights: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Close the session with derived totals and insight headlines.
    pub fn close(
        &mut self,
        ended_at: DateTime<Utc>,
        mut totals: SessionTotals,
        insights: Vec<String>,
    ) {
        totals.duration_secs = (ended_at - self.started_at).num_seconds().max(0);
        self.ended_at = Some(ended_at);
        self.totals = totals;
        self.insights = insights;
    }
}
