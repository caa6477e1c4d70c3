//! Engine-wide configuration.

use serde::{Deserialize, Serialize};

use crate::curation::CurationConfig;
use crate::error::{StyleError, StyleResult};
use crate::event_store::EventStoreConfig;
use crate::insights::InsightConfig;
use crate::profile::{AggregationConfig, MergeConfig};
use crate::story::StoryConfig;

/// All engine settings. Every section falls back to its defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub event_store: EventStoreConfig,
    pub aggregation: AggregationConfig,
    pub merge: MergeConfig,
    pub insights: InsightConfig,
    pub curation: CurationConfig,
    pub story: StoryConfig,
    /// Number of latest events treated as "recent" for curation.
    pub recent_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_store: EventStoreConfig::default(),
            aggregation: AggregationConfig::default(),
            merge: MergeConfig::default(),
            insights: InsightConfig::default(),
            curation: CurationConfig::default(),
            story: StoryConfig::default(),
            recent_window: 50,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document and check its values.
    pub fn from_toml_str(raw: &str) -> StyleResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> StyleResult<()> {
        let fractions = [
            ("curation.base_discount", self.curation.base_discount),
            ("curation.per_item_discount", self.curation.per_item_discount),
            ("curation.max_discount", self.curation.max_discount),
            ("merge.blend_rate", self.merge.blend_rate),
            ("merge.significant_change", self.merge.significant_change),
            ("insights.brand_loyalty_share", self.insights.brand_loyalty_share),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("{} is outside [0, 1]", value)));
            }
        }

        let half_life = self.aggregation.recency_half_life_days;
        if !half_life.is_finite() || half_life < 0.0 {
            return Err(invalid(
                "aggregation.recency_half_life_days",
                format!("{} is not a non-negative number of days", half_life),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> StyleError {
    StyleError::InvalidConfig {
        field: field.to_string(),
        reason,
    }
}
