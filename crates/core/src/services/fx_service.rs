use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;

/// Resolves conversion rates between an instrument's trading currency and
/// the reporting currency.
///
/// Resolution order for `from → to` on a date:
/// 1. identity — same currency, rate 1.0, no error possible;
/// 2. the stored FX series for the pair, nearest-earlier rate;
/// 3. the inverted stored series for the reverse pair;
/// 4. the latest broker execution rate at or before the date, taken from the
///    transaction history (broker convention, so inverted on use) — only when
///    converting into the reporting currency;
/// 5. `MissingFxRate` — the computation fails rather than guessing.
pub struct FxService;

impl FxService {
    pub fn new() -> Self {
        Self
    }

    /// Conversion rate in multiply convention: `amount_to = amount_from * rate`.
    pub fn rate_on(
        &self,
        ledger: &Ledger,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        let from = from_currency.to_uppercase();
        let to = to_currency.to_uppercase();

        if from == to {
            return Ok(1.0);
        }

        if let Some(series) = ledger.fx_rates.get(&(from.clone(), to.clone())) {
            if let Some(rate) = series.rate_on_or_before(date) {
                return Ok(rate);
            }
        }

        if let Some(series) = ledger.fx_rates.get(&(to.clone(), from.clone())) {
            if let Some(rate) = series.rate_on_or_before(date) {
                if rate != 0.0 {
                    return Ok(1.0 / rate);
                }
            }
        }

        if to == ledger.settings.reporting_currency.to_uppercase() {
            if let Some(rate) = self.broker_rate_on_or_before(ledger, &from, date) {
                return Ok(rate);
            }
        }

        Err(CoreError::MissingFxRate { from, to, date })
    }

    /// Convert an amount between currencies on a date.
    pub fn convert(
        &self,
        ledger: &Ledger,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        let rate = self.rate_on(ledger, from_currency, to_currency, date)?;
        Ok(amount * rate)
    }

    /// Latest execution rate recorded on a transaction of any instrument
    /// trading in `currency`, at or before `date`. Broker rates are quoted
    /// as instrument units per reporting unit, so the result is inverted
    /// into multiply convention.
    fn broker_rate_on_or_before(
        &self,
        ledger: &Ledger,
        currency: &str,
        date: NaiveDate,
    ) -> Option<f64> {
        ledger
            .transactions
            .iter()
            .rev()
            .filter(|t| t.date() <= date)
            .filter(|t| {
                ledger
                    .instrument(&t.isin)
                    .is_some_and(|i| i.currency == currency)
            })
            .find_map(|t| t.broker_fx_rate)
            .filter(|r| *r != 0.0)
            .map(|r| 1.0 / r)
    }
}

impl Default for FxService {
    fn default() -> Self {
        Self::new()
    }
}
