//! Infrastructure layer
//!
//! Gateway adapters that need no network. HTTP adapters live in the SDK
//! crate.

pub mod persistence;

pub use persistence::{InMemoryCampaignRepository, InMemoryCatalog, InMemorySegmentRepository};
