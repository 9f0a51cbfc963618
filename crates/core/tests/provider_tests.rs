// ═══════════════════════════════════════════════════════════════════
// Provider Tests — ProviderRegistry, MarketDataService fallback and
// merging, with mock providers (no network)
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};

use portfolio_tracker_core::errors::CoreError;
use portfolio_tracker_core::models::fx::FxRate;
use portfolio_tracker_core::models::instrument::Instrument;
use portfolio_tracker_core::models::ledger::Ledger;
use portfolio_tracker_core::models::price::{PricePoint, PriceSeries};
use portfolio_tracker_core::models::transaction::Transaction;
use portfolio_tracker_core::providers::registry::ProviderRegistry;
use portfolio_tracker_core::providers::traits::{FxRateProvider, QuoteProvider};
use portfolio_tracker_core::services::market_data_service::MarketDataService;

const ISIN_US: &str = "US0378331005";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn close_point(y: i32, m: u32, d: u32, close: f64) -> PricePoint {
    PricePoint::new(date(y, m, d), close, close, close, close, 100)
}

// ═══════════════════════════════════════════════════════════════════
// Mock Providers
// ═══════════════════════════════════════════════════════════════════

/// Serves a fixed set of points and records every requested range.
struct MockQuoteProvider {
    points: Vec<PricePoint>,
    requests: Arc<Mutex<Vec<(String, NaiveDate, NaiveDate)>>>,
}

impl MockQuoteProvider {
    fn new(points: Vec<PricePoint>) -> Self {
        Self {
            points,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle onto the recorded (ticker, from, to) requests.
    fn request_log(&self) -> Arc<Mutex<Vec<(String, NaiveDate, NaiveDate)>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        "MockQuotes"
    }

    async fn latest_quote(&self, ticker: &str) -> Result<PricePoint, CoreError> {
        self.points
            .last()
            .cloned()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: ticker.into(),
                currency: "USD".into(),
                date: "latest".into(),
            })
    }

    async fn quote_history(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.requests
            .lock()
            .unwrap()
            .push((ticker.to_string(), from, to));
        Ok(self
            .points
            .iter()
            .filter(|p| p.date >= from && p.date <= to)
            .cloned()
            .collect())
    }
}

/// Always fails — stands in for a provider outage.
struct FailingQuoteProvider;

#[async_trait]
impl QuoteProvider for FailingQuoteProvider {
    fn name(&self) -> &str {
        "FailingQuotes"
    }

    async fn latest_quote(&self, _ticker: &str) -> Result<PricePoint, CoreError> {
        Err(CoreError::Api {
            provider: "FailingQuotes".into(),
            message: "simulated outage".into(),
        })
    }

    async fn quote_history(
        &self,
        _ticker: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        Err(CoreError::Api {
            provider: "FailingQuotes".into(),
            message: "simulated outage".into(),
        })
    }
}

struct MockFxProvider {
    rates: Vec<FxRate>,
}

#[async_trait]
impl FxRateProvider for MockFxProvider {
    fn name(&self) -> &str {
        "MockFx"
    }

    async fn latest_rate(&self, _from: &str, _to: &str) -> Result<f64, CoreError> {
        self.rates
            .last()
            .map(|r| r.rate)
            .ok_or_else(|| CoreError::Api {
                provider: "MockFx".into(),
                message: "no rates".into(),
            })
    }

    async fn rate_history(
        &self,
        _from: &str,
        _to: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<FxRate>, CoreError> {
        Ok(self
            .rates
            .iter()
            .filter(|r| r.date >= from_date && r.date <= to_date)
            .copied()
            .collect())
    }
}

fn ledger_with_instrument() -> Ledger {
    let mut ledger = Ledger::new();
    ledger.instruments.insert(
        ISIN_US.into(),
        Instrument::new(ISIN_US, "AAPL", "Apple Inc.", "USD", "NSY").with_quote_ticker("AAPL"),
    );
    ledger
}

// ═══════════════════════════════════════════════════════════════════
// ProviderRegistry
// ═══════════════════════════════════════════════════════════════════

mod registry {
    use super::*;

    #[test]
    fn empty_registry_has_no_providers() {
        let registry = ProviderRegistry::new();
        assert!(registry.quote_providers().is_empty());
        assert!(registry.fx_providers().is_empty());
    }

    #[test]
    fn registration_order_is_fallback_order() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(FailingQuoteProvider));
        registry.register_quote_provider(Box::new(MockQuoteProvider::new(vec![])));

        let names: Vec<&str> = registry.quote_providers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["FailingQuotes", "MockQuotes"]);
    }

    #[test]
    fn defaults_include_fx_provider() {
        let registry = ProviderRegistry::new_with_defaults(&Default::default());
        // Frankfurter needs no API key and is always registered
        assert!(!registry.fx_providers().is_empty());
    }

    #[test]
    fn twelvedata_requires_api_key() {
        let no_keys = ProviderRegistry::new_with_defaults(&Default::default());
        let without: Vec<String> = no_keys
            .quote_providers()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert!(!without.contains(&"Twelve Data".to_string()));

        let mut keys = std::collections::HashMap::new();
        keys.insert("twelvedata".to_string(), "demo-key".to_string());
        let with_key = ProviderRegistry::new_with_defaults(&keys);
        let with: Vec<String> = with_key
            .quote_providers()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert!(with.contains(&"Twelve Data".to_string()));
    }
}

// ═══════════════════════════════════════════════════════════════════
// MarketDataService
// ═══════════════════════════════════════════════════════════════════

mod market_data {
    use super::*;

    #[tokio::test]
    async fn backfill_merges_points_over_the_history_window() {
        let mock = MockQuoteProvider::new(vec![
            close_point(2025, 1, 2, 100.0),
            close_point(2025, 1, 3, 101.0),
        ]);
        let requests = mock.request_log();
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(mock));
        let service = MarketDataService::new(registry);

        let mut ledger = ledger_with_instrument();
        let merged = service
            .backfill_instrument(&mut ledger, ISIN_US, date(2025, 1, 10))
            .await
            .unwrap();

        assert_eq!(merged, 2);
        let series = ledger.prices.get(ISIN_US).unwrap();
        assert_eq!(series.close_on(date(2025, 1, 2)), Some(100.0));
        assert_eq!(series.close_on(date(2025, 1, 3)), Some(101.0));

        // The request used the resolved ticker and the configured window
        let log = requests.lock().unwrap();
        let (ticker, from, to) = &log[0];
        assert_eq!(ticker, "AAPL");
        assert_eq!(*to, date(2025, 1, 10));
        assert_eq!(*from, date(2025, 1, 10) - chrono::Duration::days(1825));
    }

    #[tokio::test]
    async fn refresh_counts_only_new_points() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(MockQuoteProvider::new(vec![
            close_point(2025, 1, 8, 100.0),
            close_point(2025, 1, 9, 101.0),
        ])));
        let service = MarketDataService::new(registry);

        let mut ledger = ledger_with_instrument();
        ledger.prices.insert(
            ISIN_US.into(),
            PriceSeries::from_points(vec![close_point(2025, 1, 8, 100.0)]),
        );
        // Something must be held for the refresh to pick the instrument up
        ledger.insert_transaction_sorted(Transaction::new(
            ISIN_US,
            date(2025, 1, 8).and_hms_opt(10, 0, 0).unwrap(),
            1.0,
            100.0,
        ));

        let merged = service
            .refresh_held_instruments(&mut ledger, date(2025, 1, 10))
            .await
            .unwrap();
        assert_eq!(merged, 1); // Jan 8 was already present
    }

    #[tokio::test]
    async fn falls_back_to_next_provider_on_failure() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(FailingQuoteProvider));
        registry.register_quote_provider(Box::new(MockQuoteProvider::new(vec![close_point(
            2025, 1, 2, 100.0,
        )])));
        let service = MarketDataService::new(registry);

        let mut ledger = ledger_with_instrument();
        let merged = service
            .backfill_instrument(&mut ledger, ISIN_US, date(2025, 1, 10))
            .await
            .unwrap();
        assert_eq!(merged, 1);
    }

    #[tokio::test]
    async fn surfaces_last_error_when_all_providers_fail() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(FailingQuoteProvider));
        let service = MarketDataService::new(registry);

        let mut ledger = ledger_with_instrument();
        let err = service
            .backfill_instrument(&mut ledger, ISIN_US, date(2025, 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Api { .. }));
    }

    #[tokio::test]
    async fn no_providers_is_an_error() {
        let service = MarketDataService::new(ProviderRegistry::new());
        let mut ledger = ledger_with_instrument();
        let err = service
            .backfill_instrument(&mut ledger, ISIN_US, date(2025, 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoProvider(_)));
    }

    #[tokio::test]
    async fn unknown_instrument_is_an_error() {
        let service = MarketDataService::new(ProviderRegistry::new());
        let mut ledger = Ledger::new();
        let err = service
            .backfill_instrument(&mut ledger, "XX0000000000", date(2025, 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownInstrument(_)));
    }

    #[tokio::test]
    async fn unresolved_ticker_is_a_validation_error() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(MockQuoteProvider::new(vec![])));
        let service = MarketDataService::new(registry);

        let mut ledger = Ledger::new();
        ledger.instruments.insert(
            ISIN_US.into(),
            Instrument::new(ISIN_US, "AAPL", "Apple Inc.", "USD", "NSY"), // no ticker
        );

        let err = service
            .backfill_instrument(&mut ledger, ISIN_US, date(2025, 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(msg) if msg.contains(ISIN_US)));
    }

    #[tokio::test]
    async fn invalid_closes_are_filtered_out() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(MockQuoteProvider::new(vec![
            close_point(2025, 1, 2, 100.0),
            close_point(2025, 1, 3, f64::NAN),
            close_point(2025, 1, 6, -5.0),
        ])));
        let service = MarketDataService::new(registry);

        let mut ledger = ledger_with_instrument();
        let merged = service
            .backfill_instrument(&mut ledger, ISIN_US, date(2025, 1, 10))
            .await
            .unwrap();
        assert_eq!(merged, 1);
        assert_eq!(ledger.prices.get(ISIN_US).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn live_quote_refresh_is_best_effort() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(MockQuoteProvider::new(vec![close_point(
            2025, 1, 10, 131.5,
        )])));
        let service = MarketDataService::new(registry);

        let mut ledger = ledger_with_instrument();
        ledger.insert_transaction_sorted(Transaction::new(
            ISIN_US,
            date(2025, 1, 2).and_hms_opt(10, 0, 0).unwrap(),
            1.0,
            100.0,
        ));
        // A second held instrument with no resolved ticker is skipped,
        // not an error
        ledger.instruments.insert(
            "NL0010273215".into(),
            Instrument::new("NL0010273215", "ASML", "ASML Holding", "EUR", "EAM"),
        );
        ledger.insert_transaction_sorted(Transaction::new(
            "NL0010273215",
            date(2025, 1, 2).and_hms_opt(11, 0, 0).unwrap(),
            1.0,
            600.0,
        ));

        let merged = service
            .refresh_latest_quotes(&mut ledger, date(2025, 1, 10))
            .await
            .unwrap();

        assert_eq!(merged, 1);
        assert_eq!(
            ledger.prices.get(ISIN_US).unwrap().close_on(date(2025, 1, 10)),
            Some(131.5)
        );
    }

    #[tokio::test]
    async fn refresh_indices_backfills_empty_series() {
        let mut registry = ProviderRegistry::new();
        registry.register_quote_provider(Box::new(MockQuoteProvider::new(vec![
            close_point(2025, 1, 2, 5000.0),
            close_point(2025, 1, 3, 5050.0),
        ])));
        let service = MarketDataService::new(registry);

        let mut ledger = Ledger::new();
        let merged = service
            .refresh_indices(&mut ledger, date(2025, 1, 10))
            .await
            .unwrap();

        // Two tracked benchmarks by default, both served the same fixture
        assert_eq!(merged, 4);
        assert!(ledger.index_prices.contains_key("^GSPC"));
        assert!(ledger.index_prices.contains_key("^STOXX50E"));
    }

    #[tokio::test]
    async fn refresh_fx_covers_each_foreign_currency() {
        let mut registry = ProviderRegistry::new();
        registry.register_fx_provider(Box::new(MockFxProvider {
            rates: vec![
                FxRate { date: date(2025, 1, 2), rate: 0.90 },
                FxRate { date: date(2025, 1, 3), rate: 0.91 },
            ],
        }));
        let service = MarketDataService::new(registry);

        let mut ledger = ledger_with_instrument(); // USD instrument, EUR reporting
        ledger.instruments.insert(
            "NL0010273215".into(),
            Instrument::new("NL0010273215", "ASML", "ASML Holding", "EUR", "EAM"),
        );

        let merged = service
            .refresh_fx_rates(&mut ledger, date(2025, 1, 10))
            .await
            .unwrap();

        // Only USD/EUR needs rates; the EUR instrument is the reporting currency
        assert_eq!(merged, 2);
        assert!(ledger
            .fx_rates
            .contains_key(&("USD".to_string(), "EUR".to_string())));
        assert_eq!(ledger.fx_rates.len(), 1);
    }
}
