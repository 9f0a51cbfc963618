use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::fx::FxRate;
use crate::models::price::PricePoint;

/// Trait abstraction for daily OHLC(V) quote providers.
///
/// Each market-data API (Yahoo Finance, Twelve Data) implements this trait.
/// If an API stops working or changes, only that one implementation is
/// replaced — the rest of the codebase is untouched. Providers speak quote
/// tickers (e.g., "ASML.AS", "^GSPC"), never ISINs; the import layer owns
/// the mapping.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// The most recent available quote for a ticker.
    async fn latest_quote(&self, ticker: &str) -> Result<PricePoint, CoreError>;

    /// Daily quote history for a ticker over an inclusive date range.
    /// Returns points sorted by date; may be shorter than requested.
    async fn quote_history(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;
}

/// Trait abstraction for currency conversion rate providers.
///
/// Rates are quoted in multiply convention: `amount_to = amount_from * rate`.
#[async_trait]
pub trait FxRateProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// The current conversion rate for a currency pair.
    async fn latest_rate(&self, from: &str, to: &str) -> Result<f64, CoreError>;

    /// Daily conversion rates over an inclusive date range.
    /// Returns rates sorted by date; may be shorter than requested.
    async fn rate_history(
        &self,
        from: &str,
        to: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<FxRate>, CoreError>;
}
