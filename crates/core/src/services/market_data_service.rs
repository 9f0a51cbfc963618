use chrono::{Duration, NaiveDate};
use log::{debug, warn};

use crate::errors::CoreError;
use crate::models::fx::FxSeries;
use crate::models::ledger::Ledger;
use crate::models::price::{PricePoint, PriceSeries};
use crate::providers::registry::ProviderRegistry;
use crate::services::position_service::PositionService;

/// Fills the ledger's price and FX series from the configured providers.
///
/// Providers are tried in registration order; if the primary fails (outage,
/// rate limit), the next one is used. A partial result from a provider is
/// merged as-is — a shorter series than requested is routine, never an
/// error, and gaps are never fabricated.
///
/// Nothing here runs inside the valuation computations: providers only
/// populate the ledger beforehand, keeping the computation core free of
/// network I/O.
pub struct MarketDataService {
    registry: ProviderRegistry,
}

impl MarketDataService {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Backfill the full historical window for one instrument.
    /// Returns the number of price points merged.
    pub async fn backfill_instrument(
        &self,
        ledger: &mut Ledger,
        isin: &str,
        today: NaiveDate,
    ) -> Result<usize, CoreError> {
        let window = i64::from(ledger.settings.history_window_days);
        let from = today - Duration::days(window);
        self.fetch_instrument_range(ledger, isin, from, today).await
    }

    /// Refresh the recent window for one instrument (weekends and publishing
    /// lag make a single-day fetch unreliable).
    pub async fn refresh_instrument(
        &self,
        ledger: &mut Ledger,
        isin: &str,
        today: NaiveDate,
    ) -> Result<usize, CoreError> {
        let window = i64::from(ledger.settings.refresh_window_days);
        let from = today - Duration::days(window);
        self.fetch_instrument_range(ledger, isin, from, today).await
    }

    /// Refresh the recent window for every instrument currently held.
    /// Returns the number of price points merged across instruments.
    pub async fn refresh_held_instruments(
        &self,
        ledger: &mut Ledger,
        today: NaiveDate,
    ) -> Result<usize, CoreError> {
        let holdings = PositionService::new().holdings_on(ledger, today)?;
        let mut merged = 0;
        for isin in holdings.into_keys() {
            merged += self.refresh_instrument(ledger, &isin, today).await?;
        }
        Ok(merged)
    }

    /// Fetch the latest available quote for every held instrument and merge
    /// it into the stored series (the dashboard's live-price refresh).
    ///
    /// A failing or unresolved instrument is skipped with a warning rather
    /// than failing the whole sweep — a live refresh is best-effort.
    pub async fn refresh_latest_quotes(
        &self,
        ledger: &mut Ledger,
        today: NaiveDate,
    ) -> Result<usize, CoreError> {
        let holdings = PositionService::new().holdings_on(ledger, today)?;
        let mut merged = 0;

        for isin in holdings.into_keys() {
            let Some(ticker) = ledger
                .instrument(&isin)
                .and_then(|i| i.quote_ticker.clone())
            else {
                warn!("no quote ticker resolved for {isin}, skipping live refresh");
                continue;
            };

            match self.fetch_latest(&ticker).await {
                Ok(point) => {
                    let series = ledger
                        .prices
                        .entry(isin)
                        .or_insert_with(PriceSeries::new);
                    merged += Self::merge_points(series, vec![point]);
                }
                Err(e) => warn!("live quote for {isin} ({ticker}) failed: {e}"),
            }
        }
        Ok(merged)
    }

    /// Fetch close history for every tracked benchmark index. An index with
    /// no stored data gets the full historical window, otherwise the recent
    /// refresh window.
    pub async fn refresh_indices(
        &self,
        ledger: &mut Ledger,
        today: NaiveDate,
    ) -> Result<usize, CoreError> {
        let benchmarks = ledger.settings.benchmarks.clone();
        let history = i64::from(ledger.settings.history_window_days);
        let recent = i64::from(ledger.settings.refresh_window_days);

        let mut merged = 0;
        for benchmark in benchmarks {
            let backfill = ledger
                .index_prices
                .get(&benchmark.symbol)
                .is_none_or(|s| s.is_empty());
            let from = today - Duration::days(if backfill { history } else { recent });

            let points = self.fetch_quotes(&benchmark.symbol, from, today).await?;
            let series = ledger
                .index_prices
                .entry(benchmark.symbol.clone())
                .or_insert_with(PriceSeries::new);
            merged += Self::merge_points(series, points);
        }
        Ok(merged)
    }

    /// Refresh FX series for every currency pair the ledger needs: each
    /// instrument currency that differs from the reporting currency.
    pub async fn refresh_fx_rates(
        &self,
        ledger: &mut Ledger,
        today: NaiveDate,
    ) -> Result<usize, CoreError> {
        let reporting = ledger.settings.reporting_currency.to_uppercase();
        let currencies: Vec<String> = ledger
            .instruments
            .values()
            .map(|i| i.currency.clone())
            .filter(|c| *c != reporting)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let window = i64::from(ledger.settings.history_window_days);
        let from = today - Duration::days(window);

        let mut merged = 0;
        for currency in currencies {
            let pair = (currency.clone(), reporting.clone());
            let already = ledger.fx_rates.get(&pair).map_or(0, FxSeries::len);

            let rates = self.fetch_rates(&currency, &reporting, from, today).await?;
            let series = ledger.fx_rates.entry(pair).or_insert_with(FxSeries::new);
            series.upsert_many(rates);
            merged += series.len().saturating_sub(already);
        }
        Ok(merged)
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn fetch_instrument_range(
        &self,
        ledger: &mut Ledger,
        isin: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<usize, CoreError> {
        let upper = isin.to_uppercase();
        let instrument = ledger
            .instrument(&upper)
            .ok_or_else(|| CoreError::UnknownInstrument(upper.clone()))?;

        let ticker = instrument.quote_ticker.clone().ok_or_else(|| {
            CoreError::ValidationError(format!(
                "No quote ticker resolved for {} (ISIN: {upper})",
                instrument.name
            ))
        })?;

        let points = self.fetch_quotes(&ticker, from, to).await?;
        debug!("fetched {} price points for {upper} ({ticker})", points.len());

        let series = ledger
            .prices
            .entry(upper)
            .or_insert_with(PriceSeries::new);
        Ok(Self::merge_points(series, points))
    }

    /// Try each quote provider in order until one delivers.
    async fn fetch_quotes(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let providers = self.registry.quote_providers();
        if providers.is_empty() {
            return Err(CoreError::NoProvider("quotes".into()));
        }

        let mut last_error = None;
        for provider in providers {
            match provider.quote_history(ticker, from, to).await {
                Ok(points) => return Ok(points),
                Err(e) => {
                    warn!("{} failed for {ticker}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("quotes".into())))
    }

    /// Try each quote provider in order for the most recent quote.
    async fn fetch_latest(&self, ticker: &str) -> Result<PricePoint, CoreError> {
        let providers = self.registry.quote_providers();
        if providers.is_empty() {
            return Err(CoreError::NoProvider("quotes".into()));
        }

        let mut last_error = None;
        for provider in providers {
            match provider.latest_quote(ticker).await {
                Ok(point) => return Ok(point),
                Err(e) => {
                    warn!("{} failed for {ticker}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("quotes".into())))
    }

    /// Try each FX provider in order until one delivers.
    async fn fetch_rates(
        &self,
        from_currency: &str,
        to_currency: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<crate::models::fx::FxRate>, CoreError> {
        let providers = self.registry.fx_providers();
        if providers.is_empty() {
            return Err(CoreError::NoProvider("FX rates".into()));
        }

        let mut last_error = None;
        for provider in providers {
            match provider
                .rate_history(from_currency, to_currency, from, to)
                .await
            {
                Ok(rates) => return Ok(rates),
                Err(e) => {
                    warn!(
                        "{} failed for {from_currency}/{to_currency}: {e}",
                        provider.name()
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("FX rates".into())))
    }

    /// Merge fetched points, counting only genuinely new dates. Finite,
    /// positive closes only — a provider glitch must not poison the series.
    fn merge_points(series: &mut PriceSeries, points: Vec<PricePoint>) -> usize {
        let before = series.len();
        series.upsert_many(
            points
                .into_iter()
                .filter(|p| p.close.is_finite() && p.close > 0.0)
                .collect(),
        );
        series.len() - before
    }
}
