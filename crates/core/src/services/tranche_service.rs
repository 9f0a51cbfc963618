use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::analytics::{TranchePoint, TrancheSeries};
use crate::models::ledger::Ledger;
use crate::services::fx_service::FxService;

/// Decomposes an instrument's performance into per-purchase lots.
///
/// Each buy transaction becomes an independent tranche whose value and
/// return are tracked forward from its purchase date. Sells are not matched
/// against tranches — they only affect the aggregate position — so a lot
/// that has been partially or fully sold keeps reporting as if held. This
/// no-lot-matching behavior is a deliberate simplification of the
/// average-cost design and is exercised explicitly by the test suite.
pub struct TrancheService {
    fx_service: FxService,
}

impl TrancheService {
    pub fn new() -> Self {
        Self {
            fx_service: FxService::new(),
        }
    }

    /// One series per buy transaction of `isin`, each starting at its
    /// purchase date (clipped to the requested range). Tranche ids are the
    /// ids of the originating buy transactions.
    pub fn decompose(
        &self,
        ledger: &Ledger,
        isin: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TrancheSeries>, CoreError> {
        let upper = isin.to_uppercase();
        let instrument = ledger
            .instrument(&upper)
            .ok_or_else(|| CoreError::UnknownInstrument(upper.clone()))?;

        let Some(prices) = ledger.prices.get(&upper) else {
            return Ok(Vec::new()); // no data yet
        };

        let reporting = &ledger.settings.reporting_currency;
        let mut tranches = Vec::new();

        for transaction in ledger.transactions_for(&upper) {
            if transaction.quantity <= 0.0 {
                continue; // sells never open a tranche
            }

            let quantity = transaction.quantity;
            // Effective unit cost carries the fee, consistent with the
            // average-cost basis accumulation.
            let cost_per_unit = transaction.price + transaction.fee / quantity;
            let start = transaction.date().max(from);

            let mut points = Vec::new();
            for point in prices.range(start, to) {
                let fx = self
                    .fx_service
                    .rate_on(ledger, &instrument.currency, reporting, point.date)?;

                let value_reporting = quantity * point.close * fx;
                let basis_reporting = quantity * cost_per_unit * fx;
                points.push(TranchePoint {
                    date: point.date,
                    value_reporting,
                    return_pct: 100.0 * value_reporting / basis_reporting,
                });
            }

            tranches.push(TrancheSeries {
                tranche_id: transaction.id,
                isin: upper.clone(),
                purchase_date: transaction.date(),
                quantity,
                cost_per_unit,
                points,
            });
        }

        Ok(tranches)
    }
}

impl Default for TrancheService {
    fn default() -> Self {
        Self::new()
    }
}
