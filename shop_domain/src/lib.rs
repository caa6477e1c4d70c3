//! # Shop Domain
//!
//! The data model for Shop Story - ids, behavior events, products, sessions,
//! seasons, and pricing tiers. This crate is the single source of truth for
//! shopping data and does not contain any analytics logic.

pub mod catalog;
pub mod entities;
pub mod events;
pub mod interactions;
pub mod session;

pub use catalog::*;
pub use entities::*;
pub use events::*;
pub use interactions::*;
pub use session::*;
