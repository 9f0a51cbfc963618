use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instrument::Instrument;

/// One day of an instrument's valuation series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    /// Trading day this record is for
    pub date: NaiveDate,

    /// Quantity held as of this date
    pub quantity: f64,

    /// quantity × close, in the instrument's trading currency
    pub value_native: f64,

    /// Position value converted to the reporting currency
    pub value_reporting: f64,

    /// Net invested capital (average-cost basis) in the reporting currency
    pub cost_basis_reporting: f64,

    /// Position value as a percentage of net invested capital; 100 means
    /// break-even. Omitted when there is no open cost basis.
    pub gain_loss_pct: Option<f64>,
}

/// One day of the aggregated portfolio series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub date: NaiveDate,

    /// Sum of all instruments' position values, reporting currency
    pub total_value_reporting: f64,

    /// Sum of all instruments' net invested capital, reporting currency
    pub total_invested_reporting: f64,
}

/// One day of a single tranche's trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranchePoint {
    pub date: NaiveDate,

    /// Lot value in the reporting currency
    pub value_reporting: f64,

    /// Lot value as a percentage of its own purchase cost; 100 = break-even
    pub return_pct: f64,
}

/// The forward trajectory of one purchase lot, independent of later sells.
///
/// Sells are not attributed to tranches (no lot matching) — a partially or
/// fully sold lot keeps reporting as if still held. That is a documented
/// simplification of the average-cost design, not an oversight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheSeries {
    /// Identifier of the originating buy transaction
    pub tranche_id: Uuid,

    pub isin: String,
    pub purchase_date: NaiveDate,
    pub quantity: f64,

    /// Effective cost per unit at purchase (price plus fee per unit),
    /// instrument currency
    pub cost_per_unit: f64,

    pub points: Vec<TranchePoint>,
}

/// One day of a rebased benchmark series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkPoint {
    pub date: NaiveDate,

    /// Percentage return relative to the base date's close; exactly 0 there
    pub return_pct: f64,
}

/// A benchmark index rebased to 0% at a start date, comparable against
/// instrument or portfolio percentage returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSeries {
    pub symbol: String,
    pub name: String,

    /// The start date the caller asked for
    pub requested_start: NaiveDate,

    /// The base date actually used (first trading day at or after the
    /// requested start, or the earliest available day)
    pub effective_start: Option<NaiveDate>,

    /// True when the requested start predates the index's available history
    pub approximate: bool,

    pub points: Vec<BenchmarkPoint>,
}

/// Current holdings row for the dashboard overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub instrument: Instrument,

    /// Quantity held as of the queried date
    pub quantity: f64,

    /// Number of ledger transactions for this instrument
    pub transaction_count: usize,

    /// Most recent close at or before the queried date, native currency
    pub latest_close: Option<f64>,

    /// Date of that close
    pub price_date: Option<NaiveDate>,

    /// Change from the previous available close, percent
    pub day_change_pct: Option<f64>,
}

/// Freshness of the locally stored market data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketDataStatus {
    /// Most recent price date across all instrument series
    pub latest_date: Option<NaiveDate>,

    /// Total stored instrument price points
    pub price_points: usize,
}
