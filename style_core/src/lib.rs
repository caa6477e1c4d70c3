//! # Style Core
//!
//! The Shop Story engine. It folds behavior events into a "Style DNA"
//! profile, keeps that profile current as new events arrive, curates product
//! bundles and recommendations from it, and renders the result as a story.
//!
//! ## Core Components
//!
//! - **event_store**: Capped event log and sessions over a key/value backend
//! - **profile**: Aggregation of events into profiles, merging, and evolution scoring
//! - **curation**: Recommendations and discounted shoppable sets
//! - **insights**: Session and profile insights
//! - **story**: Slide-by-slide story rendering
//! - **pipeline**: Facade wiring the components together

pub mod config;
pub mod curation;
pub mod error;
pub mod event_store;
pub mod insights;
pub mod pipeline;
pub mod profile;
pub mod story;

pub use config::*;
pub use curation::*;
pub use error::*;
pub use event_store::*;
pub use insights::*;
pub use pipeline::*;
pub use profile::*;
pub use story::*;
