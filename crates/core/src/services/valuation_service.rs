use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::analytics::ValuationPoint;
use crate::models::ledger::Ledger;
use crate::models::position::QUANTITY_EPSILON;
use crate::services::fx_service::FxService;
use crate::services::position_service::PositionService;

/// Cost basis below which a position counts as having no open investment,
/// making the percentage return undefined.
const COST_EPSILON: f64 = 1e-9;

/// Combines reconstructed positions with price and FX data into daily
/// valuation series.
///
/// The output is indexed by the instrument's available trading days: a
/// transaction executed on a non-trading day (weekend, holiday) takes effect
/// on the next available price date, consistently for every query. Missing
/// trading days simply produce no record — partial price data is routine,
/// never an error.
pub struct ValuationService {
    position_service: PositionService,
    fx_service: FxService,
}

impl ValuationService {
    pub fn new() -> Self {
        Self {
            position_service: PositionService::new(),
            fx_service: FxService::new(),
        }
    }

    /// Daily valuation of one instrument over `from..=to`.
    ///
    /// Records start at the instrument's first transaction (clipped to the
    /// requested range) and continue for every available price date, through
    /// fully-sold stretches (quantity 0, `gain_loss_pct` omitted). Returns an
    /// empty series when the instrument has no transactions or no price data
    /// yet — an unknown ISIN is the caller's error to raise.
    pub fn instrument_series(
        &self,
        ledger: &Ledger,
        isin: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ValuationPoint>, CoreError> {
        let upper = isin.to_uppercase();
        let instrument = ledger
            .instrument(&upper)
            .ok_or_else(|| CoreError::UnknownInstrument(upper.clone()))?;

        let transactions = ledger.transactions_for(&upper);
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        let timeline = self.position_service.reconstruct(&upper, &transactions)?;

        let Some(prices) = ledger.prices.get(&upper) else {
            return Ok(Vec::new()); // no data yet
        };

        let start = match timeline.first_date() {
            Some(first) => first.max(from),
            None => return Ok(Vec::new()),
        };

        let reporting = &ledger.settings.reporting_currency;
        let mut series = Vec::new();

        for point in prices.range(start, to) {
            let Some(state) = timeline.state_on(point.date).copied() else {
                continue;
            };

            let fx = self
                .fx_service
                .rate_on(ledger, &instrument.currency, reporting, point.date)?;

            let value_native = state.quantity * point.close;
            let value_reporting = value_native * fx;
            let cost_basis_reporting = state.cost_native * fx;

            let gain_loss_pct = if cost_basis_reporting > COST_EPSILON {
                Some(100.0 * value_reporting / cost_basis_reporting)
            } else {
                None
            };

            series.push(ValuationPoint {
                date: point.date,
                quantity: if state.quantity > QUANTITY_EPSILON {
                    state.quantity
                } else {
                    0.0
                },
                value_native,
                value_reporting,
                cost_basis_reporting,
                gain_loss_pct,
            });
        }

        Ok(series)
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}
