// ═══════════════════════════════════════════════════════════════════
// Model Tests — Instrument, Transaction, PriceSeries, FxSeries,
// PositionTimeline, Settings, Ledger
// ═══════════════════════════════════════════════════════════════════

use chrono::{NaiveDate, NaiveDateTime};

use portfolio_tracker_core::models::fx::{FxRate, FxSeries};
use portfolio_tracker_core::models::instrument::Instrument;
use portfolio_tracker_core::models::ledger::Ledger;
use portfolio_tracker_core::models::position::{PositionState, PositionTimeline};
use portfolio_tracker_core::models::price::{PricePoint, PriceSeries};
use portfolio_tracker_core::models::settings::Settings;
use portfolio_tracker_core::models::transaction::{Transaction, TransactionKind};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(10, 30, 0).unwrap()
}

fn apple() -> Instrument {
    Instrument::new("US0378331005", "AAPL", "Apple Inc.", "USD", "NSY")
}

// ═══════════════════════════════════════════════════════════════════
// Instrument
// ═══════════════════════════════════════════════════════════════════

mod instrument {
    use super::*;

    #[test]
    fn new_uppercases_identifiers() {
        let i = Instrument::new("us0378331005", "aapl", "Apple Inc.", "usd", "NSY");
        assert_eq!(i.isin, "US0378331005");
        assert_eq!(i.symbol, "AAPL");
        assert_eq!(i.currency, "USD");
        assert_eq!(i.name, "Apple Inc.");
    }

    #[test]
    fn equality_is_by_isin_only() {
        let a = apple();
        let b = Instrument::new("US0378331005", "APPLE", "Renamed", "USD", "XET");
        assert_eq!(a, b);
    }

    #[test]
    fn different_isins_are_not_equal() {
        let a = apple();
        let b = Instrument::new("NL0010273215", "ASML", "ASML Holding", "EUR", "EAM");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_follows_equality() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(apple());
        set.insert(Instrument::new("US0378331005", "APPLE", "Other name", "USD", "XET"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn with_quote_ticker() {
        let i = apple().with_quote_ticker("AAPL");
        assert_eq!(i.quote_ticker.as_deref(), Some("AAPL"));
    }

    #[test]
    fn display_shows_symbol_and_isin() {
        assert_eq!(apple().to_string(), "AAPL (US0378331005)");
    }

    #[test]
    fn serde_roundtrip() {
        let i = apple().with_quote_ticker("AAPL");
        let json = serde_json::to_string(&i).unwrap();
        let back: Instrument = serde_json::from_str(&json).unwrap();
        assert_eq!(i, back);
        assert_eq!(back.quote_ticker.as_deref(), Some("AAPL"));
    }

    #[test]
    fn deserializes_without_quote_ticker() {
        let json = r#"{"isin":"US0378331005","symbol":"AAPL","name":"Apple Inc.","currency":"USD","exchange":"NSY"}"#;
        let i: Instrument = serde_json::from_str(json).unwrap();
        assert!(i.quote_ticker.is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Transaction
// ═══════════════════════════════════════════════════════════════════

mod transaction {
    use super::*;

    #[test]
    fn buy_kind_from_positive_quantity() {
        let t = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        assert_eq!(t.kind(), TransactionKind::Buy);
    }

    #[test]
    fn sell_kind_from_negative_quantity() {
        let t = Transaction::new("US0378331005", dt(2025, 1, 15), -5.0, 100.0);
        assert_eq!(t.kind(), TransactionKind::Sell);
        assert_eq!(t.unsigned_quantity(), 5.0);
    }

    #[test]
    fn builders_attach_details() {
        let t = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0)
            .with_fee(1.0)
            .with_value_reporting(901.0)
            .with_broker_fx_rate(1.1111);
        assert_eq!(t.fee, 1.0);
        assert_eq!(t.value_reporting, 901.0);
        assert_eq!(t.broker_fx_rate, Some(1.1111));
    }

    #[test]
    fn isin_is_uppercased() {
        let t = Transaction::new("us0378331005", dt(2025, 1, 15), 10.0, 100.0);
        assert_eq!(t.isin, "US0378331005");
    }

    #[test]
    fn date_truncates_time() {
        let t = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        assert_eq!(t.date(), date(2025, 1, 15));
    }

    #[test]
    fn ids_are_unique() {
        let a = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        let b = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn duplicate_detection_ignores_id() {
        let a = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        let b = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        assert!(a.is_duplicate_of(&b));
    }

    #[test]
    fn duplicate_detection_checks_all_fields() {
        let a = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        let other_qty = Transaction::new("US0378331005", dt(2025, 1, 15), 11.0, 100.0);
        let other_price = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 101.0);
        let other_time = Transaction::new("US0378331005", dt(2025, 1, 16), 10.0, 100.0);
        assert!(!a.is_duplicate_of(&other_qty));
        assert!(!a.is_duplicate_of(&other_price));
        assert!(!a.is_duplicate_of(&other_time));
    }

    #[test]
    fn serde_defaults_for_optional_fields() {
        let json = r#"{
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "isin": "US0378331005",
            "executed_at": "2025-01-15T10:30:00",
            "quantity": 10.0,
            "price": 100.0
        }"#;
        let t: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(t.fee, 0.0);
        assert_eq!(t.value_reporting, 0.0);
        assert!(t.broker_fx_rate.is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let t = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0)
            .with_fee(1.0)
            .with_broker_fx_rate(1.1);
        let json = serde_json::to_string(&t).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}

// ═══════════════════════════════════════════════════════════════════
// PriceSeries
// ═══════════════════════════════════════════════════════════════════

mod price_series {
    use super::*;

    fn series() -> PriceSeries {
        PriceSeries::from_points(vec![
            PricePoint::new(date(2025, 1, 17), 103.0, 106.0, 102.0, 105.0, 1_200),
            PricePoint::new(date(2025, 1, 15), 99.0, 101.0, 98.0, 100.0, 1_000),
            PricePoint::new(date(2025, 1, 16), 100.0, 103.0, 99.0, 102.0, 1_100),
        ])
    }

    #[test]
    fn from_points_sorts_by_date() {
        let s = series();
        let dates: Vec<NaiveDate> = s.points().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 15), date(2025, 1, 16), date(2025, 1, 17)]
        );
    }

    #[test]
    fn upsert_replaces_same_date() {
        let mut s = series();
        s.upsert(PricePoint::new(date(2025, 1, 16), 1.0, 1.0, 1.0, 999.0, 5));
        assert_eq!(s.len(), 3);
        assert_eq!(s.close_on(date(2025, 1, 16)), Some(999.0));
    }

    #[test]
    fn close_on_missing_date_is_none() {
        assert_eq!(series().close_on(date(2025, 1, 18)), None);
    }

    #[test]
    fn point_on_or_before_exact() {
        let s = series();
        let p = s.point_on_or_before(date(2025, 1, 16)).unwrap();
        assert_eq!(p.date, date(2025, 1, 16));
    }

    #[test]
    fn point_on_or_before_falls_back_to_earlier() {
        let s = series();
        // A weekend date between points resolves to the prior trading day
        let p = s.point_on_or_before(date(2025, 1, 18)).unwrap();
        assert_eq!(p.date, date(2025, 1, 17));
    }

    #[test]
    fn point_on_or_before_before_history_is_none() {
        assert!(series().point_on_or_before(date(2025, 1, 14)).is_none());
    }

    #[test]
    fn range_is_inclusive() {
        let s = series();
        let r = s.range(date(2025, 1, 15), date(2025, 1, 16));
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].date, date(2025, 1, 15));
        assert_eq!(r[1].date, date(2025, 1, 16));
    }

    #[test]
    fn range_outside_history_is_empty() {
        let s = series();
        assert!(s.range(date(2025, 2, 1), date(2025, 2, 28)).is_empty());
    }

    #[test]
    fn first_and_last_dates() {
        let s = series();
        assert_eq!(s.first_date(), Some(date(2025, 1, 15)));
        assert_eq!(s.last_date(), Some(date(2025, 1, 17)));
    }

    #[test]
    fn prune_before_removes_older_points() {
        let mut s = series();
        let removed = s.prune_before(date(2025, 1, 16));
        assert_eq!(removed, 1);
        assert_eq!(s.first_date(), Some(date(2025, 1, 16)));
    }

    #[test]
    fn index_point_has_no_volume() {
        let p = PricePoint::from_close(date(2025, 1, 15), 4800.0);
        assert_eq!(p.close, 4800.0);
        assert_eq!(p.open, 4800.0);
        assert!(p.volume.is_none());
    }

    #[test]
    fn empty_series_lookups() {
        let s = PriceSeries::new();
        assert!(s.is_empty());
        assert!(s.close_on(date(2025, 1, 15)).is_none());
        assert!(s.point_on_or_before(date(2025, 1, 15)).is_none());
        assert!(s.range(date(2025, 1, 1), date(2025, 12, 31)).is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let s = series();
        let json = serde_json::to_string(&s).unwrap();
        let back: PriceSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}

// ═══════════════════════════════════════════════════════════════════
// FxSeries
// ═══════════════════════════════════════════════════════════════════

mod fx_series {
    use super::*;

    fn series() -> FxSeries {
        FxSeries::from_rates(vec![
            FxRate { date: date(2025, 1, 17), rate: 0.92 },
            FxRate { date: date(2025, 1, 15), rate: 0.90 },
        ])
    }

    #[test]
    fn rates_are_sorted() {
        let s = series();
        assert_eq!(s.rates()[0].date, date(2025, 1, 15));
        assert_eq!(s.rates()[1].date, date(2025, 1, 17));
    }

    #[test]
    fn rate_on_exact_date() {
        assert_eq!(series().rate_on(date(2025, 1, 15)), Some(0.90));
        assert_eq!(series().rate_on(date(2025, 1, 16)), None);
    }

    #[test]
    fn nearest_earlier_fallback() {
        let s = series();
        assert_eq!(s.rate_on_or_before(date(2025, 1, 16)), Some(0.90));
        assert_eq!(s.rate_on_or_before(date(2025, 2, 1)), Some(0.92));
        assert_eq!(s.rate_on_or_before(date(2025, 1, 14)), None);
    }

    #[test]
    fn constant_series_applies_forward() {
        let s = FxSeries::constant(date(2025, 1, 1), 0.85);
        assert_eq!(s.rate_on_or_before(date(2025, 6, 1)), Some(0.85));
        assert_eq!(s.rate_on_or_before(date(2024, 12, 31)), None);
    }

    #[test]
    fn upsert_replaces_same_date() {
        let mut s = series();
        s.upsert(FxRate { date: date(2025, 1, 15), rate: 0.91 });
        assert_eq!(s.len(), 2);
        assert_eq!(s.rate_on(date(2025, 1, 15)), Some(0.91));
    }
}

// ═══════════════════════════════════════════════════════════════════
// PositionState & PositionTimeline
// ═══════════════════════════════════════════════════════════════════

mod position {
    use super::*;

    #[test]
    fn average_cost_of_open_position() {
        let s = PositionState {
            date: date(2025, 1, 15),
            quantity: 10.0,
            cost_native: 1001.0,
        };
        assert!((s.average_cost().unwrap() - 100.1).abs() < 1e-9);
        assert!(s.is_open());
    }

    #[test]
    fn average_cost_of_closed_position_is_none() {
        let s = PositionState {
            date: date(2025, 1, 15),
            quantity: 0.0,
            cost_native: 0.0,
        };
        assert!(s.average_cost().is_none());
        assert!(!s.is_open());
    }

    #[test]
    fn state_on_is_piecewise_constant() {
        let timeline = PositionTimeline::new(
            "US0378331005",
            vec![
                PositionState { date: date(2025, 1, 15), quantity: 10.0, cost_native: 1000.0 },
                PositionState { date: date(2025, 1, 20), quantity: 15.0, cost_native: 1600.0 },
            ],
        );
        assert!(timeline.state_on(date(2025, 1, 14)).is_none());
        assert_eq!(timeline.state_on(date(2025, 1, 15)).unwrap().quantity, 10.0);
        assert_eq!(timeline.state_on(date(2025, 1, 18)).unwrap().quantity, 10.0);
        assert_eq!(timeline.state_on(date(2025, 1, 20)).unwrap().quantity, 15.0);
        assert_eq!(timeline.state_on(date(2025, 6, 1)).unwrap().quantity, 15.0);
    }

    #[test]
    fn quantity_on_before_first_transaction_is_zero() {
        let timeline = PositionTimeline::new(
            "US0378331005",
            vec![PositionState { date: date(2025, 1, 15), quantity: 10.0, cost_native: 1000.0 }],
        );
        assert_eq!(timeline.quantity_on(date(2025, 1, 1)), 0.0);
        assert_eq!(timeline.first_date(), Some(date(2025, 1, 15)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.reporting_currency, "EUR");
        assert!(s.api_keys.is_empty());
        assert_eq!(s.history_window_days, 1825);
        assert_eq!(s.refresh_window_days, 7);
        assert_eq!(s.benchmarks.len(), 2);
        assert_eq!(s.benchmarks[0].symbol, "^GSPC");
        assert_eq!(s.benchmarks[1].symbol, "^STOXX50E");
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let json = r#"{"reporting_currency":"USD","api_keys":{}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.reporting_currency, "USD");
        assert_eq!(s.history_window_days, 1825);
        assert_eq!(s.benchmarks.len(), 2);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Ledger
// ═══════════════════════════════════════════════════════════════════

mod ledger {
    use super::*;

    fn ledger_with_transactions() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.insert_transaction_sorted(Transaction::new(
            "US0378331005",
            dt(2025, 1, 20),
            5.0,
            120.0,
        ));
        ledger.insert_transaction_sorted(Transaction::new(
            "NL0010273215",
            dt(2025, 1, 10),
            3.0,
            600.0,
        ));
        ledger.insert_transaction_sorted(Transaction::new(
            "US0378331005",
            dt(2025, 1, 15),
            10.0,
            100.0,
        ));
        ledger
    }

    #[test]
    fn insert_keeps_timestamp_order() {
        let ledger = ledger_with_transactions();
        let dates: Vec<NaiveDate> = ledger.transactions.iter().map(|t| t.date()).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 10), date(2025, 1, 15), date(2025, 1, 20)]
        );
    }

    #[test]
    fn transactions_for_filters_by_isin_in_order() {
        let ledger = ledger_with_transactions();
        let apple_txs = ledger.transactions_for("US0378331005");
        assert_eq!(apple_txs.len(), 2);
        assert_eq!(apple_txs[0].date(), date(2025, 1, 15));
        assert_eq!(apple_txs[1].date(), date(2025, 1, 20));
    }

    #[test]
    fn transactions_for_is_case_insensitive() {
        let ledger = ledger_with_transactions();
        assert_eq!(ledger.transactions_for("us0378331005").len(), 2);
    }

    #[test]
    fn first_transaction_date() {
        let ledger = ledger_with_transactions();
        assert_eq!(
            ledger.first_transaction_date("US0378331005"),
            Some(date(2025, 1, 15))
        );
        assert_eq!(ledger.first_transaction_date("XX0000000000"), None);
    }

    #[test]
    fn transacted_isins_sorted_unique() {
        let ledger = ledger_with_transactions();
        assert_eq!(
            ledger.transacted_isins(),
            vec!["NL0010273215".to_string(), "US0378331005".to_string()]
        );
    }

    #[test]
    fn contains_duplicate() {
        let ledger = ledger_with_transactions();
        let dup = Transaction::new("US0378331005", dt(2025, 1, 15), 10.0, 100.0);
        let fresh = Transaction::new("US0378331005", dt(2025, 1, 16), 10.0, 100.0);
        assert!(ledger.contains_duplicate(&dup));
        assert!(!ledger.contains_duplicate(&fresh));
    }

    #[test]
    fn instrument_lookup_is_case_insensitive() {
        let mut ledger = Ledger::new();
        ledger
            .instruments
            .insert("US0378331005".into(), apple());
        assert!(ledger.instrument("us0378331005").is_some());
    }

    #[test]
    fn bincode_roundtrip() {
        let ledger = ledger_with_transactions();
        let bytes = bincode::serialize(&ledger).unwrap();
        let back: Ledger = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.transactions, ledger.transactions);
        assert_eq!(back.settings, ledger.settings);
    }
}
