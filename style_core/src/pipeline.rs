//! Shop Story pipeline - records events, keeps profiles current, and turns
//! them into curated sets and stories.

use chrono::{DateTime, Utc};
use shop_domain::{BehaviorEvent, EventId, ProductCatalog, UserId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::config::EngineConfig;
use crate::curation::{CurationEngine, CurationResult};
use crate::error::{StyleError, StyleResult};
use crate::event_store::{EventStore, StorageBackend};
use crate::insights::{Insight, InsightGenerator};
use crate::profile::{ProfileAggregator, ProfileMerger, StyleProfile};
use crate::story::{Story, StoryRenderer};

/// Owns the event store and one profile per user.
pub struct ShopStory {
    store: EventStore,
    config: EngineConfig,
    aggregator: ProfileAggregator,
    merger: ProfileMerger,
    insights: InsightGenerator,
    curation: CurationEngine,
    renderer: StoryRenderer,
    profiles: HashMap<UserId, StyleProfile>,
    /// Events already folded into each profile.
    folded: HashMap<UserId, HashSet<EventId>>,
}

impl ShopStory {
    pub fn new(store: EventStore, config: EngineConfig) -> Self {
        let insights = InsightGenerator::new(config.insights.clone());
        Self {
            store: store.with_insights(insights.clone()),
            aggregator: ProfileAggregator::new(config.aggregation.clone()),
            merger: ProfileMerger::new(config.merge.clone(), config.aggregation.clone()),
            insights,
            curation: CurationEngine::new(config.curation.clone()),
            renderer: StoryRenderer::new(config.story.clone()),
            profiles: HashMap::new(),
            folded: HashMap::new(),
            config,
        }
    }

    /// Open the store on `backend` with the configured limits.
    pub fn open(backend: Box<dyn StorageBackend>, config: EngineConfig) -> StyleResult<Self> {
        let store = EventStore::open(backend, config.event_store.clone())?;
        Ok(Self::new(store, config))
    }

    /// An in-memory pipeline with default settings.
    pub fn in_memory() -> Self {
        Self::new(EventStore::in_memory(), EngineConfig::default())
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EventStore {
        &mut self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record an event.
    pub fn record(&mut self, event: BehaviorEvent) -> StyleResult<EventId> {
        self.store.record(event)
    }

    /// The current profile of a user, if one was built.
    pub fn profile(&self, user_id: &UserId) -> Option<&StyleProfile> {
        self.profiles.get(user_id)
    }

    /// Bring a user's profile up to date.
    ///
    /// The first call aggregates every stored event of the user. Later calls
    /// aggregate only events not yet folded into the profile and merge them
    /// in, whatever their timestamps.
    pub fn refresh_profile(&mut self, user_id: &UserId, now: DateTime<Utc>) -> StyleResult<&StyleProfile> {
        let events = self.store.events_for_user(user_id);
        let folded = self.folded.get(user_id);
        let fresh: Vec<BehaviorEvent> = events
            .iter()
            .filter(|e| !folded.is_some_and(|f| f.contains(&e.id)))
            .cloned()
            .collect();

        let refreshed = match self.profiles.get(user_id) {
            None if fresh.is_empty() => return Err(StyleError::NoProfile(user_id.clone())),
            None => Some(self.aggregator.build(user_id, &fresh, now)),
            Some(_) if fresh.is_empty() => {
                debug!(user = %user_id, "profile already current");
                None
            }
            Some(existing) => {
                let incoming = self.aggregator.build(user_id, &fresh, now);
                Some(self.merger.merge(existing, &incoming, now)?)
            }
        };

        if let Some(profile) = refreshed {
            let folded = self.folded.entry(user_id.clone()).or_default();
            folded.extend(fresh.iter().map(|e| e.id));
            // forget ids the store has evicted
            let stored: HashSet<EventId> = events.iter().map(|e| e.id).collect();
            folded.retain(|id| stored.contains(id));
            self.profiles.insert(user_id.clone(), profile);
        }
        self.profiles
            .get(user_id)
            .ok_or_else(|| StyleError::NoProfile(user_id.clone()))
    }

    /// Insights for a user: profile insights, then those of the last closed session.
    pub fn insights(&self, user_id: &UserId) -> StyleResult<Vec<Insight>> {
        let profile = self
            .profiles
            .get(user_id)
            .ok_or_else(|| StyleError::NoProfile(user_id.clone()))?;

        let mut insights = self
            .insights
            .profile_insights(profile, self.config.merge.significant_change);

        if let Some(session) = self
            .store
            .sessions_for_user(user_id)
            .into_iter()
            .rev()
            .find(|s| !s.is_open())
        {
            let events = self.store.session_events(session.id);
            insights.extend(self.insights.session_insights(&session.totals, &events));
        }

        Ok(insights)
    }

    /// Refresh the profile, then recommend products and assemble sets.
    pub fn curate(
        &mut self,
        user_id: &UserId,
        catalog: &ProductCatalog,
        now: DateTime<Utc>,
    ) -> StyleResult<CurationResult> {
        let profile = self.refresh_profile(user_id, now)?.clone();
        let recent = self.store.recent(user_id, self.config.recent_window);

        Ok(CurationResult {
            recommendations: self.curation.recommend(&profile, &recent, catalog),
            sets: self.curation.curate_sets(&profile, &recent, catalog, now)?,
        })
    }

    /// Refresh the profile and render the user's story.
    pub fn story(
        &mut self,
        user_id: &UserId,
        catalog: &ProductCatalog,
        now: DateTime<Utc>,
    ) -> StyleResult<Story> {
        let profile = self.refresh_profile(user_id, now)?.clone();
        let insights = self.insights(user_id)?;
        let recent = self.store.recent(user_id, self.config.recent_window);
        let sets = self.curation.curate_sets(&profile, &recent, catalog, now)?;

        Ok(self.renderer.render(&profile, &insights, &sets))
    }
}
