use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::analytics::{PortfolioPoint, ValuationPoint};

/// Aggregates per-instrument valuation series into one portfolio-level
/// series of invested capital vs. current value.
///
/// Alignment across instruments with different trading calendars: the output
/// covers the union of all instruments' dates. On a date where an instrument
/// has no record of its own (a different market's holiday), its last known
/// valuation is carried forward — treating it as zero would understate the
/// portfolio. Before an instrument's first record it contributes zero.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Sum per-instrument series into daily portfolio totals.
    ///
    /// Pure aggregation over already-converted series — all inputs must be
    /// in the same reporting currency.
    #[must_use]
    pub fn aggregate(&self, per_instrument: &[Vec<ValuationPoint>]) -> Vec<PortfolioPoint> {
        let dates: BTreeSet<NaiveDate> = per_instrument
            .iter()
            .flat_map(|series| series.iter().map(|p| p.date))
            .collect();

        // One cursor per series; forward-fill its last seen point.
        let mut cursors = vec![0_usize; per_instrument.len()];
        let mut carried: Vec<Option<(f64, f64)>> = vec![None; per_instrument.len()];

        let mut portfolio = Vec::with_capacity(dates.len());
        for date in dates {
            let mut total_value = 0.0;
            let mut total_invested = 0.0;

            for (idx, series) in per_instrument.iter().enumerate() {
                while cursors[idx] < series.len() && series[cursors[idx]].date <= date {
                    let point = &series[cursors[idx]];
                    carried[idx] = Some((point.value_reporting, point.cost_basis_reporting));
                    cursors[idx] += 1;
                }
                if let Some((value, invested)) = carried[idx] {
                    total_value += value;
                    total_invested += invested;
                }
            }

            portfolio.push(PortfolioPoint {
                date,
                total_value_reporting: total_value,
                total_invested_reporting: total_invested,
            });
        }

        portfolio
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
