use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use shop_domain::{BehaviorEvent, EventType, Product, ProductCatalog, UserId};
use style_core::{evolution_score, CurationEngine, ProfileAggregator, ProfileMerger, SetPricing};

const BRANDS: [&str; 4] = ["Aether", "Nord", "Basics", "Lumen"];
const COLORS: [&str; 4] = ["navy", "black", "olive", "white"];
const CATEGORIES: [&str; 3] = ["Outerwear", "Knitwear", "Footwear"];

fn event_strategy() -> impl Strategy<Value = (usize, usize, usize, usize, f64, i64)> {
    (
        0..EventType::ALL.len(),
        0..BRANDS.len(),
        0..COLORS.len(),
        0..CATEGORIES.len(),
        1.0f64..900.0,
        0i64..240,
    )
}

fn events(raw: &[(usize, usize, usize, usize, f64, i64)]) -> Vec<BehaviorEvent> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    raw.iter()
        .map(|&(kind, brand, color, category, price, hours)| {
            BehaviorEvent::new(UserId::new("u1"), EventType::ALL[kind])
                .with_brand(BRANDS[brand])
                .with_colors([COLORS[color]])
                .with_category(CATEGORIES[category])
                .with_price(price)
                .at(start + Duration::hours(hours))
        })
        .collect()
}

proptest! {
    #[test]
    fn evolution_score_is_bounded(
        old in prop::collection::vec(event_strategy(), 1..30),
        new in prop::collection::vec(event_strategy(), 1..30),
    ) {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let aggregator = ProfileAggregator::with_defaults();
        let user = UserId::new("u1");
        let old = aggregator.build(&user, &events(&old), now);
        let new = aggregator.build(&user, &events(&new), now);

        let score = evolution_score(&old, &new);
        prop_assert!((-1.0..=1.0).contains(&score), "score {}", score);

        let merged = ProfileMerger::with_defaults().merge(&old, &new, now).unwrap();
        prop_assert_eq!(merged.event_count, old.event_count + new.event_count);
        prop_assert!(merged.dominant_colors.len() <= aggregator.config().top_colors);
    }

    #[test]
    fn aggregated_weights_are_normalized(raw in prop::collection::vec(event_strategy(), 1..40)) {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let profile = ProfileAggregator::with_defaults().build(&UserId::new("u1"), &events(&raw), now);

        for color in &profile.dominant_colors {
            prop_assert!(color.weight > 0.0 && color.weight <= 1.0 + 1e-9);
        }
        let shares: f64 = profile.price_ranges.iter().map(|r| r.share).sum();
        prop_assert!((shares - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bundle_pricing_never_exceeds_total(
        prices in prop::collection::vec(0.5f64..2000.0, 2..6),
        rate in 0.0f64..0.25,
    ) {
        let pricing = SetPricing::for_prices(&prices, rate);
        prop_assert!(pricing.bundle_price <= pricing.original_total);
        prop_assert!(pricing.savings >= 0.0);
    }

    #[test]
    fn curated_sets_validate(
        raw in prop::collection::vec(event_strategy(), 1..30),
        prices in prop::collection::vec(5.0f64..800.0, 6),
    ) {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let events = events(&raw);
        let profile = ProfileAggregator::with_defaults().build(&UserId::new("u1"), &events, now);

        let catalog: ProductCatalog = prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                Product::new(format!("p{}", i), format!("Product {}", i))
                    .with_brand(BRANDS[i % BRANDS.len()])
                    .with_category(CATEGORIES[i % CATEGORIES.len()])
                    .with_colors([COLORS[i % COLORS.len()]])
                    .with_price(*price)
            })
            .collect();

        let engine = CurationEngine::with_defaults();
        let sets = engine.curate_sets(&profile, &events, &catalog, now).unwrap();
        for set in &sets {
            prop_assert!(set.validate(engine.config().max_discount).is_ok());
            prop_assert!(set.urgency.expires_at > now);
        }
    }
}
