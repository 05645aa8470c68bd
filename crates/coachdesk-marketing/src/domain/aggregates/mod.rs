//! Aggregates
pub mod campaign;
pub mod contact_pool;
pub mod email_unit;
pub mod pipeline;
pub mod segment;

pub use campaign::{Campaign, CampaignParts, CampaignStats, CampaignStatus};
pub use contact_pool::ContactPool;
pub use email_unit::{EmailStatus, EmailUnit};
pub use pipeline::{Pipeline, PipelineStage};
pub use segment::{Segment, SegmentStage};
