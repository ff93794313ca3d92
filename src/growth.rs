//! Growth-rate computation over a tree's measurement history
//!
//! A lag-and-diff pass over the time-ordered measurements: each consecutive
//! pair yields height change per hour. Pairs with identical timestamps are
//! skipped rather than dividing by zero, and the first measurement has no
//! rate at all.

use crate::store::Measurement;

/// Growth rate derived from two consecutive measurements
///
/// `height` and `captured_at` are those of the later measurement of the
/// pair, so a rate series lines up with the observations that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthRate {
    pub height: f64,
    pub captured_at: i64,
    pub rate_ft_per_hour: f64,
}

/// Compute growth rates for a time-ordered measurement history.
pub fn growth_rates(history: &[Measurement]) -> Vec<GrowthRate> {
    let mut rates = Vec::new();

    for pair in history.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.captured_at == prev.captured_at {
            continue;
        }
        let delta_hours = (cur.captured_at - prev.captured_at) as f64 / 3600.0;
        rates.push(GrowthRate {
            height: cur.height,
            captured_at: cur.captured_at,
            rate_ft_per_hour: (cur.height - prev.height) / delta_hours,
        });
    }

    rates
}
