use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Quantity below which a position counts as closed. Plain `f64::EPSILON`
/// is too tight once quantities have been through repeated +/- arithmetic.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// The reconstructed state of one instrument's position as of a date:
/// cumulative quantity held and running total cost under the average-cost
/// method, in the instrument's trading currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    /// Date this state took effect (date of the causing transaction)
    pub date: NaiveDate,

    /// Cumulative quantity held
    pub quantity: f64,

    /// Running total cost of the held quantity, instrument currency
    pub cost_native: f64,
}

impl PositionState {
    /// Blended average cost per held unit. `None` when the position is closed.
    #[must_use]
    pub fn average_cost(&self) -> Option<f64> {
        if self.quantity > QUANTITY_EPSILON {
            Some(self.cost_native / self.quantity)
        } else {
            None
        }
    }

    /// Whether any quantity is held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.quantity > QUANTITY_EPSILON
    }
}

/// Piecewise-constant position history of one instrument: one state per
/// transaction date, holding between transactions. Derived from the full
/// transaction history on every request — never persisted, so late-arriving
/// or corrected transactions retroactively change all downstream dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTimeline {
    pub isin: String,
    states: Vec<PositionState>,
}

impl PositionTimeline {
    pub fn new(isin: impl Into<String>, states: Vec<PositionState>) -> Self {
        Self {
            isin: isin.into(),
            states,
        }
    }

    /// The state in effect on `date`: the last state at or before it.
    /// `None` before the first transaction.
    #[must_use]
    pub fn state_on(&self, date: NaiveDate) -> Option<&PositionState> {
        let idx = self.states.partition_point(|s| s.date <= date);
        if idx == 0 {
            None
        } else {
            Some(&self.states[idx - 1])
        }
    }

    /// Quantity held on `date` (zero before the first transaction).
    #[must_use]
    pub fn quantity_on(&self, date: NaiveDate) -> f64 {
        self.state_on(date).map_or(0.0, |s| s.quantity)
    }

    /// Date of the first transaction, if any.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.states.first().map(|s| s.date)
    }

    #[must_use]
    pub fn states(&self) -> &[PositionState] {
        &self.states
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
