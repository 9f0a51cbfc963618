use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::fx::{CurrencyPair, FxSeries};
use super::instrument::Instrument;
use super::price::PriceSeries;
use super::settings::Settings;
use super::transaction::Transaction;

/// The main data container. Everything in here gets serialized, encrypted,
/// and saved to the portable ledger file.
///
/// Transactions form an append-only event log: all position, valuation and
/// performance state is derived from them functionally on every query.
/// Nothing derived is stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    /// Registered instruments, keyed by ISIN
    pub instruments: HashMap<String, Instrument>,

    /// All buy/sell transactions, sorted by execution timestamp
    pub transactions: Vec<Transaction>,

    /// Daily price series per instrument ISIN
    pub prices: HashMap<String, PriceSeries>,

    /// Daily close series per benchmark index symbol
    pub index_prices: HashMap<String, PriceSeries>,

    /// Daily FX series per currency pair, multiply convention
    pub fx_rates: HashMap<CurrencyPair, FxSeries>,

    /// User settings (reporting currency, API keys, fetch windows, benchmarks)
    pub settings: Settings,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            instruments: HashMap::new(),
            transactions: Vec::new(),
            prices: HashMap::new(),
            index_prices: HashMap::new(),
            fx_rates: HashMap::new(),
            settings: Settings::default(),
        }
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn instrument(&self, isin: &str) -> Option<&Instrument> {
        self.instruments.get(&isin.to_uppercase())
    }

    /// All transactions for one instrument, in execution order.
    #[must_use]
    pub fn transactions_for(&self, isin: &str) -> Vec<&Transaction> {
        let upper = isin.to_uppercase();
        self.transactions
            .iter()
            .filter(|t| t.isin == upper)
            .collect()
    }

    /// Date of the instrument's first transaction.
    #[must_use]
    pub fn first_transaction_date(&self, isin: &str) -> Option<NaiveDate> {
        let upper = isin.to_uppercase();
        self.transactions
            .iter()
            .find(|t| t.isin == upper)
            .map(|t| t.date())
    }

    /// ISINs of every instrument that has at least one transaction,
    /// in deterministic (sorted) order.
    #[must_use]
    pub fn transacted_isins(&self) -> Vec<String> {
        self.transactions
            .iter()
            .map(|t| t.isin.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Insert a transaction at its timestamp-sorted position. O(log n) lookup.
    pub fn insert_transaction_sorted(&mut self, transaction: Transaction) {
        let pos = self
            .transactions
            .partition_point(|t| t.executed_at <= transaction.executed_at);
        self.transactions.insert(pos, transaction);
    }

    /// Whether an identical broker record is already in the ledger.
    #[must_use]
    pub fn contains_duplicate(&self, transaction: &Transaction) -> bool {
        self.transactions
            .iter()
            .any(|t| t.is_duplicate_of(transaction))
    }
}
