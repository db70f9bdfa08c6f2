use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

const MS_PER_DAY: i64 = 86_400_000;

/// Cancellation refund tier. Tiers are evaluated highest threshold first;
/// the first one the lead time satisfies wins.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct RefundTier {
    pub min_days: i64,
    pub percentage: u32,
    pub description: &'static str,
}

pub const REFUND_POLICY: [RefundTier; 3] = [
    RefundTier {
        min_days: 7,
        percentage: 100,
        description: "100% refund for cancellations 7+ days before rental start",
    },
    RefundTier {
        min_days: 3,
        percentage: 50,
        description: "50% refund for cancellations 3-7 days before rental start",
    },
    RefundTier {
        min_days: 0,
        percentage: 0,
        description: "No refund for cancellations less than 3 days before rental start",
    },
];

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RefundQuote {
    pub refund_amount: Decimal,
    pub refund_percentage: u32,
    pub policy: &'static str,
}

pub struct RefundService;

impl RefundService {
    /// Calendar days between now and the rental start, rounded up. Negative
    /// once the start date has passed.
    pub fn days_until_start(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let ms = (start - now).num_milliseconds();
        (ms + MS_PER_DAY - 1).div_euclid(MS_PER_DAY)
    }

    /// Map a paid total and lead time onto the refund policy. Total over
    /// all lead times; anything below 3 days (including negative values)
    /// lands in the 0% tier. The amount is rounded to two places at
    /// output, banker's rounding.
    pub fn compute_refund(total_amount: Decimal, days_until_start: i64) -> RefundQuote {
        // Negative lead times (cancelling after the start date) fall
        // through every threshold into the 0% tier.
        let tier = REFUND_POLICY
            .iter()
            .find(|t| days_until_start >= t.min_days)
            .unwrap_or(&REFUND_POLICY[REFUND_POLICY.len() - 1]);

        let refund_amount =
            (total_amount * Decimal::from(tier.percentage) / Decimal::from(100)).round_dp(2);

        RefundQuote {
            refund_amount,
            refund_percentage: tier.percentage,
            policy: tier.description,
        }
    }
}
