//! Event Store - persists behavior events and shopping sessions.
//!
//! The event log is capped: once it exceeds `max_events`, the oldest events
//! are dropped. Sessions are capped the same way. Everything is written back
//! to the backend after each change.

mod backend;

pub use backend::*;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shop_domain::{BehaviorEvent, EventId, SessionId, SessionTotals, ShoppingSession, UserId};
use tracing::{info, warn};

use crate::error::{StyleError, StyleResult};
use crate::insights::InsightGenerator;

/// Storage key of the event log.
pub const EVENTS_KEY: &str = "shop_story.events";

/// Storage key of the session list.
pub const SESSIONS_KEY: &str = "shop_story.sessions";

/// Capacity limits of the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStoreConfig {
    pub max_events: usize,
    pub max_sessions: usize,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            max_sessions: 50,
        }
    }
}

/// Append-only, capped log of behavior events plus the sessions grouping them.
pub struct EventStore {
    backend: Box<dyn StorageBackend>,
    config: EventStoreConfig,
    events: Vec<BehaviorEvent>,
    sessions: Vec<ShoppingSession>,
    insights: InsightGenerator,
}

impl EventStore {
    /// Open a store, loading whatever the backend holds.
    ///
    /// Corrupt stored data is discarded with a warning; backend I/O errors
    /// are returned.
    pub fn open(backend: Box<dyn StorageBackend>, config: EventStoreConfig) -> StyleResult<Self> {
        let mut events: Vec<BehaviorEvent> = load_or_default(backend.as_ref(), EVENTS_KEY)?;
        let mut sessions: Vec<ShoppingSession> = load_or_default(backend.as_ref(), SESSIONS_KEY)?;
        drop_oldest(&mut events, config.max_events);
        drop_oldest(&mut sessions, config.max_sessions);

        Ok(Self {
            backend,
            config,
            events,
            sessions,
            insights: InsightGenerator::with_defaults(),
        })
    }

    /// A store backed by memory with default limits.
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            config: EventStoreConfig::default(),
            events: Vec::new(),
            sessions: Vec::new(),
            insights: InsightGenerator::with_defaults(),
        }
    }

    /// Use a custom insight generator when closing sessions.
    pub fn with_insights(mut self, insights: InsightGenerator) -> Self {
        self.insights = insights;
        self
    }

    pub fn config(&self) -> &EventStoreConfig {
        &self.config
    }

    /// Give back the backend, e.g. to reopen the store later.
    pub fn into_backend(self) -> Box<dyn StorageBackend> {
        self.backend
    }

    /// Append an event, evicting the oldest beyond capacity.
    pub fn record(&mut self, event: BehaviorEvent) -> StyleResult<EventId> {
        if event.user_id.is_blank() {
            return Err(StyleError::BlankUserId);
        }

        let id = event.id;
        if let Some(session) = self
            .sessions
            .iter_mut()
            .find(|s| s.id == event.session_id && s.user_id == event.user_id && s.is_open())
        {
            session.event_ids.push(id);
        }

        self.events.push(event);
        drop_oldest(&mut self.events, self.config.max_events);
        self.persist()?;
        Ok(id)
    }

    /// All events, oldest first.
    pub fn events(&self) -> &[BehaviorEvent] {
        &self.events
    }

    pub fn events_for_user(&self, user_id: &UserId) -> Vec<BehaviorEvent> {
        self.events
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Events of a user stamped strictly after `since`.
    pub fn events_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Vec<BehaviorEvent> {
        self.events
            .iter()
            .filter(|e| &e.user_id == user_id && e.timestamp > since)
            .cloned()
            .collect()
    }

    /// The last `n` events of a user, oldest first.
    pub fn recent(&self, user_id: &UserId, n: usize) -> Vec<BehaviorEvent> {
        let mut recent: Vec<_> = self
            .events
            .iter()
            .rev()
            .filter(|e| &e.user_id == user_id)
            .take(n)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    /// Events recorded in a session by the session's owner.
    pub fn session_events(&self, session_id: SessionId) -> Vec<&BehaviorEvent> {
        let Some(session) = self.session(session_id) else {
            return Vec::new();
        };
        self.events
            .iter()
            .filter(|e| e.session_id == session_id && e.user_id == session.user_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Open a new session for a user.
    pub fn start_session(&mut self, user_id: UserId, at: DateTime<Utc>) -> StyleResult<SessionId> {
        if user_id.is_blank() {
            return Err(StyleError::BlankUserId);
        }

        let session = ShoppingSession::start(user_id, at);
        let id = session.id;
        self.sessions.push(session);
        drop_oldest(&mut self.sessions, self.config.max_sessions);
        self.persist()?;
        Ok(id)
    }

    /// Close a session, deriving its totals and insight headlines.
    pub fn end_session(&mut self, id: SessionId, at: DateTime<Utc>) -> StyleResult<ShoppingSession> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or(StyleError::UnknownSession(id))?;
        if !self.sessions[index].is_open() {
            return Err(StyleError::SessionClosed(id));
        }

        let events = self.session_events(id);
        let totals = SessionTotals::from_events(events.iter().copied());
        let headlines = self
            .insights
            .session_insights(&totals, &events)
            .into_iter()
            .map(|i| i.headline)
            .collect();

        let session = &mut self.sessions[index];
        session.close(at, totals, headlines);
        let closed = session.clone();

        info!(
            session = %closed.id,
            user = %closed.user_id,
            views = closed.totals.views,
            purchases = closed.totals.purchases,
            total_spent = closed.totals.total_spent,
            "session ended"
        );

        self.persist()?;
        Ok(closed)
    }

    pub fn session(&self, id: SessionId) -> Option<&ShoppingSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Sessions of a user, oldest first.
    pub fn sessions_for_user(&self, user_id: &UserId) -> Vec<&ShoppingSession> {
        self.sessions
            .iter()
            .filter(|s| &s.user_id == user_id)
            .collect()
    }

    /// Drop all events and sessions, in memory and in the backend.
    pub fn clear(&mut self) -> StyleResult<()> {
        self.events.clear();
        self.sessions.clear();
        self.backend.remove(EVENTS_KEY)?;
        self.backend.remove(SESSIONS_KEY)?;
        Ok(())
    }

    fn persist(&mut self) -> StyleResult<()> {
        let events = serde_json::to_string(&self.events)?;
        let sessions = serde_json::to_string(&self.sessions)?;
        self.backend.save(EVENTS_KEY, &events)?;
        self.backend.save(SESSIONS_KEY, &sessions)?;
        Ok(())
    }
}

fn load_or_default<T>(backend: &dyn StorageBackend, key: &str) -> StyleResult<T>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = backend.load(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(key, error = %err, "discarding corrupt stored data");
            Ok(T::default())
        }
    }
}

fn drop_oldest<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let overflow = items.len() - max;
        items.drain(..overflow);
    }
}
