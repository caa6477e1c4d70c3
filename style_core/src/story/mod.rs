//! Story Renderer - maps a profile, insights, and curated sets onto a
//! sequence of story slides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_domain::UserId;
use uuid::Uuid;

use crate::curation::ShoppableSet;
use crate::insights::{Insight, InsightKind};
use crate::profile::StyleProfile;

/// Configuration for story rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub slide_duration_ms: u32,
    /// Accent used when the profile has no dominant color.
    pub fallback_accent: String,
    pub max_slides: usize,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            slide_duration_ms: 5000,
            fallback_accent: "#6b46c1".to_string(),
            max_slides: 8,
        }
    }
}

/// Slide templates, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoryTemplate {
    Intro,
    StyleDna,
    BrandLove,
    CategoryMix,
    PriceSweetSpot,
    SeasonalShift,
    Evolution,
    Insights,
    CuratedSet,
}

/// One full-screen card of a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySlide {
    pub template: StoryTemplate,
    pub title: String,
    pub subtitle: String,
    pub highlights: Vec<String>,
    pub accent: String,
    pub duration_ms: u32,
}

/// A displayable story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub slides: Vec<StorySlide>,
}

impl Story {
    /// Total play time of all slides.
    pub fn duration_ms(&self) -> u64 {
        self.slides.iter().map(|s| s.duration_ms as u64).sum()
    }

    pub fn has_template(&self, template: StoryTemplate) -> bool {
        self.slides.iter().any(|s| s.template == template)
    }

    /// Format the story as text.
    pub fn to_display_string(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("# Shop Story for {}\n\n", self.user_id));

        for (index, slide) in self.slides.iter().enumerate() {
            out.push_str(&format!("## {}. {}\n", index + 1, slide.title));
            if !slide.subtitle.is_empty() {
                out.push_str(&slide.subtitle);
                out.push('\n');
            }
            for highlight in &slide.highlights {
                out.push_str(&format!("- {}\n", highlight));
            }
            out.push('\n');
        }

        out
    }
}

/// Renders stories from profile data.
#[derive(Debug, Clone, Default)]
pub struct StoryRenderer {
    config: StoryConfig,
}

impl StoryRenderer {
    pub fn new(config: StoryConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Render a story. Templates without data are skipped; the evolution
    /// slide only appears when the insights carry a style shift.
    pub fn render(
        &self,
        profile: &StyleProfile,
        insights: &[Insight],
        sets: &[ShoppableSet],
    ) -> Story {
        let accent = profile
            .top_color()
            .map(|c| c.color.clone())
            .unwrap_or_else(|| self.config.fallback_accent.clone());
        let slide = |template, title: String, subtitle: String, highlights: Vec<String>| StorySlide {
            template,
            title,
            subtitle,
            highlights,
            accent: accent.clone(),
            duration_ms: self.config.slide_duration_ms,
        };

        let mut slides = Vec::new();

        let intro = if profile.is_empty() {
            "Start exploring to build your Style DNA".to_string()
        } else {
            format!("{} moments of style", profile.event_count)
        };
        slides.push(slide(
            StoryTemplate::Intro,
            "Your Shop Story".to_string(),
            intro,
            Vec::new(),
        ));

        if !profile.dominant_colors.is_empty() {
            slides.push(slide(
                StoryTemplate::StyleDna,
                "Your Style DNA".to_string(),
                "Colors you keep coming back to".to_string(),
                profile
                    .dominant_colors
                    .iter()
                    .map(|c| format!("{} {:.0}%", c.color, c.weight * 100.0))
                    .collect(),
            ));
        }

        if let Some(top) = profile.top_brand() {
            slides.push(slide(
                StoryTemplate::BrandLove,
                format!("Brand love: {}", top.brand),
                format!("{} interactions, {} purchases", top.interactions, top.purchases),
                profile
                    .preferred_brands
                    .iter()
                    .take(3)
                    .map(|b| format!("{} ({} interactions)", b.brand, b.interactions))
                    .collect(),
            ));
        }

        if !profile.category_preferences.is_empty() {
            slides.push(slide(
                StoryTemplate::CategoryMix,
                "Your category mix".to_string(),
                "Where your attention goes".to_string(),
                profile
                    .category_preferences
                    .iter()
                    .map(|c| format!("{} {:.0}%", c.category, c.weight * 100.0))
                    .collect(),
            ));
        }

        if let Some(spot) = profile.sweet_spot() {
            slides.push(slide(
                StoryTemplate::PriceSweetSpot,
                "Your price sweet spot".to_string(),
                format!(
                    "{}: ${:.0}-${:.0}",
                    spot.tier.label(),
                    spot.min_seen,
                    spot.max_seen
                ),
                profile
                    .price_ranges
                    .iter()
                    .map(|r| format!("{} {:.0}%", r.tier.label(), r.share * 100.0))
                    .collect(),
            ));
        }

        if let Some(peak) = profile.peak_season() {
            slides.push(slide(
                StoryTemplate::SeasonalShift,
                format!("{} is your season", peak.season.label()),
                format!("{:.0}% of your activity", peak.weight * 100.0),
                peak.top_categories.clone(),
            ));
        }

        if let Some(shift) = insights.iter().find(|i| i.kind == InsightKind::StyleEvolution) {
            slides.push(slide(
                StoryTemplate::Evolution,
                shift.headline.clone(),
                shift.detail.clone(),
                vec![format!("Evolution score {:+.2}", profile.evolution_score)],
            ));
        }

        let headlines: Vec<String> = insights
            .iter()
            .filter(|i| i.kind != InsightKind::StyleEvolution)
            .map(|i| i.headline.clone())
            .collect();
        if !headlines.is_empty() {
            slides.push(slide(
                StoryTemplate::Insights,
                "What we noticed".to_string(),
                String::new(),
                headlines,
            ));
        }

        for set in sets {
            slides.push(slide(
                StoryTemplate::CuratedSet,
                set.title.clone(),
                format!(
                    "${:.2} (save {:.0}%)",
                    set.pricing.bundle_price,
                    set.pricing.discount_rate * 100.0
                ),
                set.items.iter().map(|i| i.title.clone()).collect(),
            ));
        }

        slides.truncate(self.config.max_slides);

        Story {
            id: Uuid::new_v4(),
            user_id: profile.user_id.clone(),
            created_at: profile.last_updated,
            slides,
        }
    }
}
