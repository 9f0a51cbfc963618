use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::analytics::{BenchmarkPoint, BenchmarkSeries};
use crate::models::ledger::Ledger;

/// Rebases benchmark index closes into percentage-return series.
///
/// The base is the index's first trading day at or after the requested start
/// date (typically a portfolio's or instrument's first transaction date), so
/// the result is directly comparable to a position's percentage return. The
/// rebased series is exactly 0% on its base date by definition.
pub struct BenchmarkService;

impl BenchmarkService {
    pub fn new() -> Self {
        Self
    }

    /// Rebase a tracked benchmark over `start..=to`.
    ///
    /// When `start` predates the index's available history, the earliest
    /// available close becomes the base and the series is flagged
    /// `approximate`. An index with no stored data yields an empty series.
    pub fn rebase(
        &self,
        ledger: &Ledger,
        symbol: &str,
        start: NaiveDate,
        to: NaiveDate,
    ) -> Result<BenchmarkSeries, CoreError> {
        let benchmark = ledger
            .settings
            .benchmarks
            .iter()
            .find(|b| b.symbol == symbol)
            .ok_or_else(|| CoreError::UnknownBenchmark(symbol.to_string()))?;

        let empty = BenchmarkSeries {
            symbol: benchmark.symbol.clone(),
            name: benchmark.name.clone(),
            requested_start: start,
            effective_start: None,
            approximate: false,
            points: Vec::new(),
        };

        let Some(series) = ledger.index_prices.get(symbol) else {
            return Ok(empty); // no data yet
        };

        let window = series.range(start, to);
        let Some(base_point) = window.first() else {
            return Ok(empty);
        };

        let approximate = series
            .first_date()
            .is_some_and(|first| start < first);

        let base = base_point.close;
        let points = window
            .iter()
            .map(|p| BenchmarkPoint {
                date: p.date,
                return_pct: 100.0 * (p.close / base - 1.0),
            })
            .collect();

        Ok(BenchmarkSeries {
            symbol: benchmark.symbol.clone(),
            name: benchmark.name.clone(),
            requested_start: start,
            effective_start: Some(base_point.date),
            approximate,
            points,
        })
    }
}

impl Default for BenchmarkService {
    fn default() -> Self {
        Self::new()
    }
}
