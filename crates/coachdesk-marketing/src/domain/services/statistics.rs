//! Statistics aggregator
//!
//! Derives funnel percentages from raw counts. Percentages are display
//! values only; the counts stay the source of truth.
//!
//! Per-stage figures come from the stage's own email units while campaign
//! figures come from the campaign counters, so the two granularities are not
//! guaranteed to agree.

use serde::Serialize;

use crate::domain::aggregates::{Campaign, CampaignStats, EmailStatus, PipelineStage};
use crate::domain::value_objects::EntityId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FunnelCounts {
    pub total_sent: u64,
    pub received: u64,
    pub opened: u64,
    pub clicked: u64,
    pub converted: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FunnelPercentages {
    pub sent: f64,
    pub received: f64,
    pub opened: f64,
    pub clicked: f64,
    pub converted: f64,
}

/// Funnel figures of a single stage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageBreakdown {
    pub stage_id: EntityId,
    pub name: String,
    pub emails: usize,
    pub percentage: f64,
    pub funnel: FunnelPercentages,
}

pub struct StatisticsAggregator;

impl StatisticsAggregator {
    /// `part` as a percentage of `total`, rounded half-up to one decimal
    /// place. The ratio is taken in integer tenths so `23 / 80` gives exactly
    /// `28.8`. Zero when nothing was sent.
    pub fn percentage(part: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let (part, total) = (u128::from(part), u128::from(total));
        let tenths = (part * 2000 + total) / (total * 2);
        tenths as f64 / 10.0
    }

    pub fn breakdown(counts: &FunnelCounts) -> FunnelPercentages {
        let total = counts.total_sent;
        FunnelPercentages {
            sent: Self::percentage(total, total),
            received: Self::percentage(counts.received, total),
            opened: Self::percentage(counts.opened, total),
            clicked: Self::percentage(counts.clicked, total),
            converted: Self::percentage(counts.converted, total),
        }
    }

    pub fn campaign_counts(stats: &CampaignStats) -> FunnelCounts {
        FunnelCounts {
            total_sent: stats.sent,
            received: stats.received,
            opened: stats.opened,
            clicked: stats.clicked,
            converted: stats.converted,
        }
    }

    /// Counts derived from the stage's email units, measured against the
    /// campaign-wide number of sent emails.
    pub fn stage_counts(stage: &PipelineStage, total_sent: u64) -> FunnelCounts {
        let reached = |milestone: EmailStatus| {
            stage
                .emails()
                .iter()
                .filter(|e| e.status().reached(milestone))
                .count() as u64
        };
        FunnelCounts {
            total_sent,
            received: reached(EmailStatus::Received),
            opened: reached(EmailStatus::Opened),
            clicked: reached(EmailStatus::Clicked),
            converted: reached(EmailStatus::Converted),
        }
    }

    /// Share of the campaign's sent emails attributed to a stage: its email
    /// unit count, or its contact count for display-only stages.
    pub fn stage_percentage(stage: &PipelineStage, total_sent: u64) -> f64 {
        let part = if stage.is_synthetic() {
            stage.contact_count()
        } else {
            stage.emails().len() as u64
        };
        Self::percentage(part, total_sent)
    }

    pub fn campaign_breakdown(campaign: &Campaign) -> FunnelPercentages {
        Self::breakdown(&Self::campaign_counts(campaign.stats()))
    }

    pub fn stage_breakdowns(campaign: &Campaign) -> Vec<StageBreakdown> {
        let sent = campaign.stats().sent;
        campaign
            .pipeline()
            .stages()
            .iter()
            .map(|stage| StageBreakdown {
                stage_id: stage.id().clone(),
                name: stage.name().to_string(),
                emails: stage.emails().len(),
                percentage: Self::stage_percentage(stage, sent),
                funnel: Self::breakdown(&Self::stage_counts(stage, sent)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::EmailUnit;
    use proptest::prelude::*;

    fn unit(status: EmailStatus) -> EmailUnit {
        EmailUnit::restore(EntityId::new(), "s".into(), "b".into(), vec![], status, None)
    }

    #[test]
    fn test_three_emails_of_two_hundred() {
        assert_eq!(StatisticsAggregator::percentage(3, 200), 1.5);
    }

    #[test]
    fn test_zero_sent_is_zero_everywhere() {
        let counts = FunnelCounts { total_sent: 0, received: 5, opened: 3, clicked: 1, converted: 1 };
        assert_eq!(StatisticsAggregator::breakdown(&counts), FunnelPercentages::default());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(StatisticsAggregator::percentage(1, 3), 33.3);
        assert_eq!(StatisticsAggregator::percentage(2, 3), 66.7);
    }

    #[test]
    fn test_half_tenths_round_up() {
        // 23 / 80 is exactly 28.75
        assert_eq!(StatisticsAggregator::percentage(23, 80), 28.8);
        assert_eq!(StatisticsAggregator::percentage(1, 8), 12.5);
        assert_eq!(StatisticsAggregator::percentage(1, 16), 6.3);
        assert_eq!(StatisticsAggregator::percentage(1, 2000), 0.1);
        assert_eq!(StatisticsAggregator::percentage(1, 2001), 0.0);
    }

    /// Long division to tenths, then half-up on the remainder.
    fn long_division_tenths(part: u64, total: u64) -> f64 {
        let scaled = u128::from(part) * 100;
        let total = u128::from(total);
        let whole = scaled / total;
        let rest = (scaled % total) * 10;
        let mut tenths = whole * 10 + rest / total;
        if (rest % total) * 2 >= total {
            tenths += 1;
        }
        format!("{}.{}", tenths / 10, tenths % 10).parse().unwrap()
    }

    #[test]
    fn test_stage_counts_follow_funnel() {
        let stage = PipelineStage::restore(
            EntityId::from("s"),
            "Abiertos".into(),
            0,
            0,
            vec![
                unit(EmailStatus::Sent),
                unit(EmailStatus::Opened),
                unit(EmailStatus::Clicked),
                unit(EmailStatus::Converted),
            ],
            None,
            false,
        );
        let counts = StatisticsAggregator::stage_counts(&stage, 10);
        assert_eq!(counts.received, 3);
        assert_eq!(counts.opened, 3);
        assert_eq!(counts.clicked, 2);
        assert_eq!(counts.converted, 1);
        assert_eq!(StatisticsAggregator::stage_percentage(&stage, 10), 40.0);
    }

    #[test]
    fn test_synthetic_stage_uses_contact_count() {
        let stage = PipelineStage::synthetic("Abiertos", 50);
        assert_eq!(StatisticsAggregator::stage_percentage(&stage, 200), 25.0);
    }

    proptest! {
        #[test]
        fn prop_zero_total_never_nan(part in 0u64..1_000_000) {
            let pct = StatisticsAggregator::percentage(part, 0);
            prop_assert_eq!(pct, 0.0);
        }

        #[test]
        fn prop_percentage_matches_rounded_ratio(total in 1u64..1_000_000, part in 0u64..1_000_000) {
            let expected = long_division_tenths(part, total);
            prop_assert_eq!(StatisticsAggregator::percentage(part, total), expected);
            prop_assert_eq!(StatisticsAggregator::percentage(total, total), 100.0);
        }
    }
}
