use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar day's OHLC(V) for an instrument or a benchmark index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded volume; absent for indices.
    pub volume: Option<u64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume: Some(volume),
        }
    }

    /// A close-only point, as benchmark index feeds deliver.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: None,
        }
    }
}

/// A daily price series for one instrument or index.
///
/// Points are kept sorted by date with at most one point per date. A later
/// fetch may overwrite or extend the series, but missing trading days stay
/// absent — gaps are never interpolated here; forward-filling for weekends
/// and holidays is a valuation-time policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from unordered points (sorts, last point per date wins).
    pub fn from_points(points: Vec<PricePoint>) -> Self {
        let mut series = Self::new();
        series.upsert_many(points);
        series
    }

    /// Insert or replace the point for its date. O(log n) position lookup.
    pub fn upsert(&mut self, point: PricePoint) {
        match self.points.binary_search_by_key(&point.date, |p| p.date) {
            Ok(idx) => self.points[idx] = point,
            Err(idx) => self.points.insert(idx, point),
        }
    }

    /// Insert or replace several points (e.g., from a history fetch).
    pub fn upsert_many(&mut self, points: Vec<PricePoint>) {
        for point in points {
            self.upsert(point);
        }
    }

    /// Closing price on an exact date. `None` for non-trading days.
    #[must_use]
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].close)
    }

    /// Last point at or before `date` — the forward-fill lookup used when a
    /// calendar date falls on a weekend, holiday, or a different market's
    /// trading day.
    #[must_use]
    pub fn point_on_or_before(&self, date: NaiveDate) -> Option<&PricePoint> {
        let idx = self.points.partition_point(|p| p.date <= date);
        if idx == 0 {
            None
        } else {
            Some(&self.points[idx - 1])
        }
    }

    /// All points with `from <= date <= to`, in date order.
    #[must_use]
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> &[PricePoint] {
        let start = self.points.partition_point(|p| p.date < from);
        let end = self.points.partition_point(|p| p.date <= to);
        &self.points[start..end]
    }

    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Remove all points strictly before `before`. Returns how many were removed.
    pub fn prune_before(&mut self, before: NaiveDate) -> usize {
        let split = self.points.partition_point(|p| p.date < before);
        self.points.drain(..split);
        split
    }
}
