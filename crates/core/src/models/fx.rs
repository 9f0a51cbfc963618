use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// FX series key: (from_currency, to_currency), e.g., ("USD", "EUR").
pub type CurrencyPair = (String, String);

/// One day's conversion rate, quoted in multiply convention:
/// `amount_to = amount_from * rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxRate {
    pub date: NaiveDate,
    pub rate: f64,
}

/// A daily conversion-rate series for one currency pair.
///
/// Sorted by date, one rate per date. A single "current rate" from a
/// provider that has no history degenerates to a one-point series — the
/// nearest-earlier lookup then applies it to every later date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FxSeries {
    rates: Vec<FxRate>,
}

impl FxSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rates(rates: Vec<FxRate>) -> Self {
        let mut series = Self::new();
        series.upsert_many(rates);
        series
    }

    /// A degenerate series holding a single current rate.
    pub fn constant(date: NaiveDate, rate: f64) -> Self {
        Self {
            rates: vec![FxRate { date, rate }],
        }
    }

    /// Insert or replace the rate for its date.
    pub fn upsert(&mut self, rate: FxRate) {
        match self.rates.binary_search_by_key(&rate.date, |r| r.date) {
            Ok(idx) => self.rates[idx] = rate,
            Err(idx) => self.rates.insert(idx, rate),
        }
    }

    pub fn upsert_many(&mut self, rates: Vec<FxRate>) {
        for rate in rates {
            self.upsert(rate);
        }
    }

    /// Rate on an exact date.
    #[must_use]
    pub fn rate_on(&self, date: NaiveDate) -> Option<f64> {
        self.rates
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|idx| self.rates[idx].rate)
    }

    /// Nearest-earlier fallback: the last rate at or before `date`.
    #[must_use]
    pub fn rate_on_or_before(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.rates.partition_point(|r| r.date <= date);
        if idx == 0 {
            None
        } else {
            Some(self.rates[idx - 1].rate)
        }
    }

    #[must_use]
    pub fn rates(&self) -> &[FxRate] {
        &self.rates
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rates.last().map(|r| r.date)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
