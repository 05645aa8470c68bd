//! Domain services module

pub mod editor;
pub mod membership;
pub mod personalization;
pub mod statistics;

pub use editor::PipelineEditor;
pub use membership::{MembershipSession, Pool, StageCount};
pub use personalization::{EmailDraft, PersonalizationResolver};
pub use statistics::{FunnelCounts, FunnelPercentages, StageBreakdown, StatisticsAggregator};
