//! Application layer
//!
//! Adapts backend payloads and orchestrates use cases over the domain.

pub mod adapter;
pub mod commands;
pub mod dto;

pub use adapter::{adapt_campaign, campaign_to_wire};
pub use commands::{CampaignService, SegmentService};
pub use dto::*;
