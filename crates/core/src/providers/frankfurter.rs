use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::fx::FxRate;
use super::traits::FxRateProvider;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter provider for fiat exchange rates.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) reference rates.
/// - **Coverage**: ~30 currencies (EUR, USD, GBP, SEK, ...), which covers
///   every currency a DEGIRO-style brokerage account trades in.
/// - **Endpoints**: `/latest`, `/{start}..{end}`
///
/// ECB publishes one reference rate per business day; weekend and holiday
/// dates are absent from the response, which the ledger's nearest-earlier
/// lookup papers over at valuation time.
pub struct FrankfurterProvider {
    client: Client,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    rates: HashMap<String, HashMap<String, f64>>,
}

#[async_trait]
impl FxRateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    async fn latest_rate(&self, from: &str, to: &str) -> Result<f64, CoreError> {
        let base = from.to_uppercase();
        let target = to.to_uppercase();

        // Same currency → rate is 1.0
        if base == target {
            return Ok(1.0);
        }

        let url = format!("{BASE_URL}/latest?base={base}&symbols={target}");

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse response for {base}/{target}: {e}"),
            })?;

        resp.rates.get(&target).copied().ok_or_else(|| CoreError::Api {
            provider: "Frankfurter".into(),
            message: format!("No rate found for {base}/{target}"),
        })
    }

    async fn rate_history(
        &self,
        from: &str,
        to: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<FxRate>, CoreError> {
        let base = from.to_uppercase();
        let target = to.to_uppercase();

        if base == target {
            // Identity pair: a single anchor point is enough, the
            // nearest-earlier lookup extends it forward.
            return Ok(vec![FxRate {
                date: from_date,
                rate: 1.0,
            }]);
        }

        let from_str = from_date.format("%Y-%m-%d");
        let to_str = to_date.format("%Y-%m-%d");
        let url = format!("{BASE_URL}/{from_str}..{to_str}?base={base}&symbols={target}");

        let resp: TimeSeriesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse time series for {base}/{target}: {e}"),
            })?;

        let mut rates: Vec<FxRate> = resp
            .rates
            .iter()
            .filter_map(|(date_str, day_rates)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                let rate = day_rates.get(&target)?;
                Some(FxRate { date, rate: *rate })
            })
            .collect();

        rates.sort_by_key(|r| r.date);
        Ok(rates)
    }
}
