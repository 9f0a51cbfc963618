use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use super::traits::QuoteProvider;

const BASE_URL: &str = "https://api.twelvedata.com";

/// Twelve Data provider for stock quotes.
///
/// - **Free tier**: 800 requests/day, 8 requests/minute.
/// - **Requires**: API key (set via settings as "twelvedata").
/// - **Coverage**: Global equities including European listings.
/// - **Role**: Fallback when Yahoo Finance is rate-limited or down.
///
/// Numeric fields come back as JSON strings and are parsed here.
pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
}

impl TwelveDataProvider {
    pub fn new(api_key: String) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }
}

// ── Twelve Data API response types ──────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    values: Option<Vec<TimeSeriesValue>>,
    status: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesValue {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: Option<String>,
}

#[derive(Deserialize)]
struct QuoteResponse {
    datetime: Option<String>,
    open: Option<String>,
    high: Option<String>,
    low: Option<String>,
    close: Option<String>,
    volume: Option<String>,
}

impl TimeSeriesValue {
    fn to_point(&self) -> Option<PricePoint> {
        // datetime is "YYYY-MM-DD" for daily interval
        let date = NaiveDate::parse_from_str(&self.datetime, "%Y-%m-%d").ok()?;
        Some(PricePoint {
            date,
            open: self.open.parse().ok()?,
            high: self.high.parse().ok()?,
            low: self.low.parse().ok()?,
            close: self.close.parse().ok()?,
            volume: self.volume.as_deref().and_then(|v| v.parse().ok()),
        })
    }
}

#[async_trait]
impl QuoteProvider for TwelveDataProvider {
    fn name(&self) -> &str {
        "Twelve Data"
    }

    async fn latest_quote(&self, ticker: &str) -> Result<PricePoint, CoreError> {
        let url = format!("{BASE_URL}/quote");
        let resp: QuoteResponse = self
            .client
            .get(&url)
            .query(&[
                ("symbol", ticker),
                ("interval", "1day"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Twelve Data".into(),
                message: format!("Failed to parse quote for {ticker}: {e}"),
            })?;

        let parse = |field: &Option<String>| -> Option<f64> {
            field.as_deref().and_then(|v| v.parse().ok())
        };

        let date = resp
            .datetime
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        match (date, parse(&resp.open), parse(&resp.high), parse(&resp.low), parse(&resp.close)) {
            (Some(date), Some(open), Some(high), Some(low), Some(close)) => Ok(PricePoint {
                date,
                open,
                high,
                low,
                close,
                volume: resp.volume.as_deref().and_then(|v| v.parse().ok()),
            }),
            _ => Err(CoreError::Api {
                provider: "Twelve Data".into(),
                message: format!("Incomplete quote for {ticker}. API limit may be exceeded."),
            }),
        }
    }

    async fn quote_history(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let url = format!("{BASE_URL}/time_series");
        let from_str = from.format("%Y-%m-%d").to_string();
        let to_str = to.format("%Y-%m-%d").to_string();

        let resp: TimeSeriesResponse = self
            .client
            .get(&url)
            .query(&[
                ("symbol", ticker),
                ("interval", "1day"),
                ("start_date", &from_str),
                ("end_date", &to_str),
                ("outputsize", "5000"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Twelve Data".into(),
                message: format!("Failed to parse time series for {ticker}: {e}"),
            })?;

        if resp.status.as_deref() == Some("error") {
            return Err(CoreError::Api {
                provider: "Twelve Data".into(),
                message: resp
                    .message
                    .unwrap_or_else(|| format!("Request failed for {ticker}")),
            });
        }

        let values = resp.values.ok_or_else(|| CoreError::Api {
            provider: "Twelve Data".into(),
            message: format!("No time series data for {ticker}. API limit may be exceeded."),
        })?;

        let mut points: Vec<PricePoint> = values
            .iter()
            .filter_map(TimeSeriesValue::to_point)
            .filter(|p| p.date >= from && p.date <= to)
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
