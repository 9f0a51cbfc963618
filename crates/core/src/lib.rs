pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use models::{
    analytics::{
        BenchmarkSeries, HoldingSummary, MarketDataStatus, PortfolioPoint, TrancheSeries,
        ValuationPoint,
    },
    fx::FxRate,
    instrument::Instrument,
    ledger::Ledger,
    position::{PositionState, QUANTITY_EPSILON},
    price::{PricePoint, PriceSeries},
    settings::{BenchmarkIndex, Settings},
    transaction::{Transaction, TransactionSortOrder},
};
use providers::registry::ProviderRegistry;
use services::{
    benchmark_service::BenchmarkService, fx_service::FxService,
    market_data_service::MarketDataService, portfolio_service::PortfolioService,
    position_service::PositionService, tranche_service::TrancheService,
    valuation_service::ValuationService,
};
use storage::manager::StorageManager;

use errors::CoreError;

/// Maximum valuation query range in days (10 years).
const MAX_QUERY_RANGE_DAYS: i64 = 3650;

/// Main entry point for the Portfolio Tracker core library.
/// Holds the transaction ledger and all services needed to operate on it.
///
/// All analytics are recomputed from the full immutable transaction history
/// on every query — there is no incremental derived state to go stale when
/// a re-import corrects past transactions.
#[must_use]
pub struct PortfolioTracker {
    ledger: Ledger,
    position_service: PositionService,
    valuation_service: ValuationService,
    tranche_service: TrancheService,
    portfolio_service: PortfolioService,
    benchmark_service: BenchmarkService,
    fx_service: FxService,
    market_data_service: MarketDataService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("instruments", &self.ledger.instruments.len())
            .field("transactions", &self.ledger.transactions.len())
            .field("settings", &self.ledger.settings)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioTracker {
    /// Create a brand new empty ledger with default settings.
    pub fn create_new() -> Self {
        Self::build(Ledger::default())
    }

    /// Load an existing ledger from encrypted bytes (password required).
    pub fn load_from_bytes(encrypted: &[u8], password: &str) -> Result<Self, CoreError> {
        let ledger = StorageManager::load_from_bytes(encrypted, password)?;
        Ok(Self::build(ledger))
    }

    /// Save the current ledger to encrypted bytes.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self, password: &str) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.ledger, password)?;
        self.dirty = false;
        Ok(bytes)
    }

    /// Load from an encrypted file on disk.
    pub fn load_from_file(path: &str, password: &str) -> Result<Self, CoreError> {
        let ledger = StorageManager::load_from_file(path, password)?;
        Ok(Self::build(ledger))
    }

    /// Save to an encrypted file on disk.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_file(&mut self, path: &str, password: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.ledger, path, password)?;
        self.dirty = false;
        Ok(())
    }

    // ── Instrument Management ───────────────────────────────────────

    /// Register a new instrument. Registering an ISIN twice is an error —
    /// instruments are immutable once created.
    pub fn register_instrument(&mut self, instrument: Instrument) -> Result<(), CoreError> {
        if self.ledger.instruments.contains_key(&instrument.isin) {
            return Err(CoreError::ValidationError(format!(
                "Instrument {} is already registered",
                instrument.isin
            )));
        }
        self.ledger
            .instruments
            .insert(instrument.isin.clone(), instrument);
        self.dirty = true;
        Ok(())
    }

    /// Get a registered instrument by ISIN.
    #[must_use]
    pub fn get_instrument(&self, isin: &str) -> Option<&Instrument> {
        self.ledger.instrument(isin)
    }

    /// All registered instruments, sorted by symbol for deterministic display.
    #[must_use]
    pub fn instruments(&self) -> Vec<&Instrument> {
        let mut instruments: Vec<&Instrument> = self.ledger.instruments.values().collect();
        instruments.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        instruments
    }

    /// Attach or replace the resolved quote ticker of an instrument.
    /// The ticker itself comes from the out-of-scope import layer.
    pub fn set_quote_ticker(
        &mut self,
        isin: &str,
        ticker: impl Into<String>,
    ) -> Result<(), CoreError> {
        let upper = isin.to_uppercase();
        let instrument = self
            .ledger
            .instruments
            .get_mut(&upper)
            .ok_or(CoreError::UnknownInstrument(upper))?;
        instrument.quote_ticker = Some(ticker.into());
        self.dirty = true;
        Ok(())
    }

    // ── Transaction Management ──────────────────────────────────────

    /// Add a single transaction to the ledger.
    ///
    /// Validates the record (non-zero quantity, known instrument) and checks
    /// that it does not drive the instrument's cumulative position negative
    /// at any point — an overselling record is rejected with
    /// `LedgerInconsistency`, never clamped.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<uuid::Uuid, CoreError> {
        self.validate_transaction(&transaction)?;
        self.position_service
            .validate_with(&self.ledger, &transaction)?;

        let id = transaction.id;
        self.ledger.insert_transaction_sorted(transaction);
        self.dirty = true;
        Ok(id)
    }

    /// Import a batch of transactions (e.g., a broker re-export).
    ///
    /// Records already present in the ledger — same instrument, timestamp,
    /// quantity and price — are skipped, so re-importing an overlapping
    /// export is harmless. All new records are validated against a scratch
    /// copy first; if any fails, nothing is imported (all-or-nothing).
    /// Returns the number of transactions actually added.
    pub fn import_transactions(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<usize, CoreError> {
        let mut staged = self.ledger.clone();
        let mut added = 0;

        for transaction in transactions {
            if staged.contains_duplicate(&transaction) {
                continue;
            }
            self.validate_transaction_against(&staged, &transaction)?;
            self.position_service.validate_with(&staged, &transaction)?;
            staged.insert_transaction_sorted(transaction);
            added += 1;
        }

        if added > 0 {
            self.ledger = staged;
            self.dirty = true;
        }
        Ok(added)
    }

    /// Remove a transaction by its ID.
    /// Rejects the removal if the remaining history would be inconsistent
    /// (e.g., removing a buy that a later sell depends on).
    pub fn remove_transaction(&mut self, id: uuid::Uuid) -> Result<(), CoreError> {
        let idx = self
            .ledger
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;

        let removed = self.ledger.transactions.remove(idx);

        let remaining = self.ledger.transactions_for(&removed.isin);
        if let Err(e) = self.position_service.reconstruct(&removed.isin, &remaining) {
            // Rollback: re-insert at its sorted position
            self.ledger.insert_transaction_sorted(removed);
            return Err(e);
        }

        self.dirty = true;
        Ok(())
    }

    /// Get a single transaction by its ID.
    #[must_use]
    pub fn get_transaction(&self, id: uuid::Uuid) -> Option<&Transaction> {
        self.ledger.transactions.iter().find(|t| t.id == id)
    }

    /// All transactions, newest first for display.
    #[must_use]
    pub fn transactions(&self) -> Vec<&Transaction> {
        let mut transactions: Vec<&Transaction> = self.ledger.transactions.iter().collect();
        transactions.reverse(); // internal storage is oldest-first
        transactions
    }

    /// Transactions for one instrument, newest first.
    #[must_use]
    pub fn transactions_for_instrument(&self, isin: &str) -> Vec<&Transaction> {
        let mut transactions = self.ledger.transactions_for(isin);
        transactions.reverse();
        transactions
    }

    /// Transactions sorted by a specific order.
    #[must_use]
    pub fn transactions_sorted(&self, order: &TransactionSortOrder) -> Vec<&Transaction> {
        let mut transactions: Vec<&Transaction> = self.ledger.transactions.iter().collect();
        match order {
            TransactionSortOrder::DateDesc => {
                transactions.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
            }
            TransactionSortOrder::DateAsc => {
                transactions.sort_by(|a, b| a.executed_at.cmp(&b.executed_at));
            }
            TransactionSortOrder::QuantityDesc => {
                transactions.sort_by(|a, b| {
                    b.unsigned_quantity()
                        .partial_cmp(&a.unsigned_quantity())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            TransactionSortOrder::IsinAsc => {
                transactions.sort_by(|a, b| a.isin.cmp(&b.isin));
            }
        }
        transactions
    }

    /// Total number of ledger transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.ledger.transactions.len()
    }

    /// Date of the earliest transaction in the ledger, if any.
    #[must_use]
    pub fn inception_date(&self) -> Option<NaiveDate> {
        self.ledger.transactions.first().map(|t| t.date())
    }

    /// Date of the most recent transaction in the ledger, if any.
    #[must_use]
    pub fn latest_transaction_date(&self) -> Option<NaiveDate> {
        self.ledger.transactions.last().map(|t| t.date())
    }

    // ── Positions & Holdings ────────────────────────────────────────

    /// Position state (quantity held, average-cost basis) of one instrument
    /// as of `date`, recomputed from its full transaction history.
    /// `None` before the instrument's first transaction.
    pub fn position_on(
        &self,
        isin: &str,
        date: NaiveDate,
    ) -> Result<Option<PositionState>, CoreError> {
        let upper = isin.to_uppercase();
        if self.ledger.instrument(&upper).is_none() {
            return Err(CoreError::UnknownInstrument(upper));
        }
        self.position_service.position_on(&self.ledger, &upper, date)
    }

    /// Dashboard overview: every open position as of `date`, with the most
    /// recent close and its day-over-day change. Sorted by symbol.
    pub fn holdings(&self, date: NaiveDate) -> Result<Vec<HoldingSummary>, CoreError> {
        let mut summaries = Vec::new();

        for isin in self.ledger.transacted_isins() {
            let transactions = self.ledger.transactions_for(&isin);
            let timeline = self.position_service.reconstruct(&isin, &transactions)?;
            let quantity = timeline.quantity_on(date);
            if quantity <= QUANTITY_EPSILON {
                continue;
            }

            let Some(instrument) = self.ledger.instrument(&isin) else {
                continue;
            };

            let (latest, previous) = match self.ledger.prices.get(&isin) {
                Some(series) => {
                    let points = series.points();
                    let idx = points.partition_point(|p| p.date <= date);
                    (
                        idx.checked_sub(1).map(|i| &points[i]),
                        idx.checked_sub(2).map(|i| &points[i]),
                    )
                }
                None => (None, None),
            };

            let day_change_pct = match (latest, previous) {
                (Some(l), Some(p)) if p.close > 0.0 => {
                    Some((l.close - p.close) / p.close * 100.0)
                }
                _ => None,
            };

            summaries.push(HoldingSummary {
                instrument: instrument.clone(),
                quantity,
                transaction_count: transactions.len(),
                latest_close: latest.map(|p| p.close),
                price_date: latest.map(|p| p.date),
                day_change_pct,
            });
        }

        summaries.sort_by(|a, b| a.instrument.symbol.cmp(&b.instrument.symbol));
        Ok(summaries)
    }

    /// Current holdings (as of today).
    pub fn current_holdings(&self) -> Result<Vec<HoldingSummary>, CoreError> {
        self.holdings(chrono::Utc::now().date_naive())
    }

    // ── Valuation & Performance ─────────────────────────────────────

    /// Daily valuation series of one instrument over a date range:
    /// quantity held, native and reporting-currency value, cost basis, and
    /// percentage return relative to net invested capital.
    pub fn instrument_valuation(
        &self,
        isin: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ValuationPoint>, CoreError> {
        Self::validate_range(from, to)?;
        self.valuation_service
            .instrument_series(&self.ledger, isin, from, to)
    }

    /// Daily portfolio-level series over a date range: total position value
    /// vs. total net invested capital, both in the reporting currency,
    /// aggregated across every instrument ever transacted.
    pub fn portfolio_valuation(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PortfolioPoint>, CoreError> {
        Self::validate_range(from, to)?;

        let mut per_instrument = Vec::new();
        for isin in self.ledger.transacted_isins() {
            per_instrument.push(
                self.valuation_service
                    .instrument_series(&self.ledger, &isin, from, to)?,
            );
        }
        Ok(self.portfolio_service.aggregate(&per_instrument))
    }

    /// Per-purchase-lot decomposition of one instrument's performance.
    /// Each buy transaction yields an independent tranche trajectory.
    pub fn tranche_series(
        &self,
        isin: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TrancheSeries>, CoreError> {
        Self::validate_range(from, to)?;
        self.tranche_service.decompose(&self.ledger, isin, from, to)
    }

    /// A tracked benchmark index rebased to 0% at `start`, for comparison
    /// against instrument or portfolio percentage returns.
    pub fn benchmark_returns(
        &self,
        symbol: &str,
        start: NaiveDate,
        to: NaiveDate,
    ) -> Result<BenchmarkSeries, CoreError> {
        Self::validate_range(start, to)?;
        self.benchmark_service.rebase(&self.ledger, symbol, start, to)
    }

    /// Freshness of the stored market data.
    #[must_use]
    pub fn market_data_status(&self) -> MarketDataStatus {
        MarketDataStatus {
            latest_date: self
                .ledger
                .prices
                .values()
                .filter_map(PriceSeries::last_date)
                .max(),
            price_points: self.ledger.prices.values().map(PriceSeries::len).sum(),
        }
    }

    // ── Price & FX Data ─────────────────────────────────────────────

    /// Merge daily price points for an instrument (historical import,
    /// offline data, or tests). Re-fetches may overwrite or extend the
    /// series; gaps stay gaps.
    pub fn upsert_prices(
        &mut self,
        isin: &str,
        points: Vec<PricePoint>,
    ) -> Result<(), CoreError> {
        let upper = isin.to_uppercase();
        if self.ledger.instrument(&upper).is_none() {
            return Err(CoreError::UnknownInstrument(upper));
        }
        self.ledger
            .prices
            .entry(upper)
            .or_insert_with(PriceSeries::new)
            .upsert_many(points);
        self.dirty = true;
        Ok(())
    }

    /// Merge daily close points for a tracked benchmark index.
    pub fn upsert_index_prices(
        &mut self,
        symbol: &str,
        points: Vec<PricePoint>,
    ) -> Result<(), CoreError> {
        if !self
            .ledger
            .settings
            .benchmarks
            .iter()
            .any(|b| b.symbol == symbol)
        {
            return Err(CoreError::UnknownBenchmark(symbol.to_string()));
        }
        self.ledger
            .index_prices
            .entry(symbol.to_string())
            .or_default()
            .upsert_many(points);
        self.dirty = true;
        Ok(())
    }

    /// Merge daily FX rates for a currency pair (multiply convention:
    /// `amount_to = amount_from * rate`).
    pub fn upsert_fx_rates(&mut self, from: &str, to: &str, rates: Vec<FxRate>) {
        self.ledger
            .fx_rates
            .entry((from.to_uppercase(), to.to_uppercase()))
            .or_default()
            .upsert_many(rates);
        self.dirty = true;
    }

    /// Conversion rate between two currencies on a date, after all
    /// fallbacks (stored series, inverse series, broker execution rates).
    pub fn fx_rate_on(&self, from: &str, to: &str, date: NaiveDate) -> Result<f64, CoreError> {
        self.fx_service.rate_on(&self.ledger, from, to, date)
    }

    // ── Market Data Refresh ─────────────────────────────────────────

    /// Backfill the full historical price window for one instrument.
    /// Returns the number of price points merged.
    pub async fn backfill_instrument_prices(&mut self, isin: &str) -> Result<usize, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let merged = self
            .market_data_service
            .backfill_instrument(&mut self.ledger, isin, today)
            .await?;
        if merged > 0 {
            self.dirty = true;
        }
        Ok(merged)
    }

    /// Refresh recent prices for all held instruments and tracked indices.
    /// Returns the number of price points merged.
    pub async fn refresh_market_data(&mut self) -> Result<usize, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let mut merged = self
            .market_data_service
            .refresh_held_instruments(&mut self.ledger, today)
            .await?;
        merged += self
            .market_data_service
            .refresh_indices(&mut self.ledger, today)
            .await?;
        if merged > 0 {
            self.dirty = true;
        }
        Ok(merged)
    }

    /// Best-effort live-quote refresh for all held instruments: merges the
    /// most recent available quote into each stored series.
    /// Returns the number of price points merged.
    pub async fn refresh_live_quotes(&mut self) -> Result<usize, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let merged = self
            .market_data_service
            .refresh_latest_quotes(&mut self.ledger, today)
            .await?;
        if merged > 0 {
            self.dirty = true;
        }
        Ok(merged)
    }

    /// Refresh FX series for every currency pair the ledger needs.
    /// Returns the number of rates merged.
    pub async fn refresh_fx_rates(&mut self) -> Result<usize, CoreError> {
        let today = chrono::Utc::now().date_naive();
        let merged = self
            .market_data_service
            .refresh_fx_rates(&mut self.ledger, today)
            .await?;
        if merged > 0 {
            self.dirty = true;
        }
        Ok(merged)
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Set the reporting currency (e.g., "EUR", "USD").
    /// Currency code must be a 3-letter alphabetic string.
    pub fn set_reporting_currency(&mut self, currency: String) -> Result<(), CoreError> {
        let trimmed = currency.trim().to_uppercase();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::ValidationError(format!(
                "Invalid currency code '{currency}': must be exactly 3 ASCII letters (e.g., EUR, USD)"
            )));
        }
        self.ledger.settings.reporting_currency = trimmed;
        self.dirty = true;
        Ok(())
    }

    /// Get current settings.
    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.ledger.settings
    }

    /// Track an additional benchmark index.
    pub fn add_benchmark(&mut self, symbol: impl Into<String>, name: impl Into<String>) {
        let benchmark = BenchmarkIndex::new(symbol, name);
        if !self
            .ledger
            .settings
            .benchmarks
            .iter()
            .any(|b| b.symbol == benchmark.symbol)
        {
            self.ledger.settings.benchmarks.push(benchmark);
            self.dirty = true;
        }
    }

    /// Set an API key for a provider (e.g., "twelvedata").
    /// Rebuilds the provider registry so the new key takes effect immediately.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.ledger.settings.api_keys.insert(provider, key);
        self.rebuild_providers();
        self.dirty = true;
    }

    /// Remove an API key for a provider.
    /// Rebuilds the provider registry so the removal takes effect immediately.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.ledger.settings.api_keys.remove(provider).is_some();
        if removed {
            self.rebuild_providers();
            self.dirty = true;
        }
        removed
    }

    // ── Password & Dirty State ──────────────────────────────────────

    /// Re-encrypt the ledger with a new password.
    /// Returns the encrypted bytes. The caller should write them to storage.
    ///
    /// `last_saved_bytes` must be the most recently saved encrypted bytes
    /// for this ledger. The current password is verified by decrypting them;
    /// if verification fails, returns `CoreError::Decryption`.
    pub fn change_password(
        &mut self,
        last_saved_bytes: &[u8],
        current_password: &str,
        new_password: &str,
    ) -> Result<Vec<u8>, CoreError> {
        StorageManager::load_from_bytes(last_saved_bytes, current_password)?;

        let new_bytes = StorageManager::save_to_bytes(&self.ledger, new_password)?;
        self.dirty = false;
        Ok(new_bytes)
    }

    /// Returns `true` if the ledger has been modified since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export all transactions as a JSON string.
    pub fn export_transactions_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.ledger.transactions).map_err(|e| {
            CoreError::Serialization(format!("Failed to serialize transactions to JSON: {e}"))
        })
    }

    /// Import transactions from a JSON string (same dedup and all-or-nothing
    /// rules as `import_transactions`). Returns the number imported.
    pub fn import_transactions_from_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let transactions: Vec<Transaction> = serde_json::from_str(json)?;
        self.import_transactions(transactions)
    }

    /// Remove all instruments, transactions, and market data, keeping
    /// settings. Returns the number of transactions removed.
    pub fn purge(&mut self) -> usize {
        let removed = self.ledger.transactions.len();
        self.ledger.instruments.clear();
        self.ledger.transactions.clear();
        self.ledger.prices.clear();
        self.ledger.index_prices.clear();
        self.ledger.fx_rates.clear();
        self.dirty = true;
        removed
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(ledger: Ledger) -> Self {
        let registry = ProviderRegistry::new_with_defaults(&ledger.settings.api_keys);
        Self {
            ledger,
            position_service: PositionService::new(),
            valuation_service: ValuationService::new(),
            tranche_service: TrancheService::new(),
            portfolio_service: PortfolioService::new(),
            benchmark_service: BenchmarkService::new(),
            fx_service: FxService::new(),
            market_data_service: MarketDataService::new(registry),
            dirty: false,
        }
    }

    fn rebuild_providers(&mut self) {
        let registry = ProviderRegistry::new_with_defaults(&self.ledger.settings.api_keys);
        self.market_data_service = MarketDataService::new(registry);
    }

    fn validate_transaction(&self, transaction: &Transaction) -> Result<(), CoreError> {
        self.validate_transaction_against(&self.ledger, transaction)
    }

    fn validate_transaction_against(
        &self,
        ledger: &Ledger,
        transaction: &Transaction,
    ) -> Result<(), CoreError> {
        if ledger.instrument(&transaction.isin).is_none() {
            return Err(CoreError::UnknownInstrument(transaction.isin.clone()));
        }
        if transaction.quantity == 0.0 || !transaction.quantity.is_finite() {
            return Err(CoreError::ValidationError(
                "Transaction quantity must be non-zero and finite".into(),
            ));
        }
        if !(transaction.price.is_finite() && transaction.price >= 0.0) {
            return Err(CoreError::ValidationError(
                "Transaction price must be finite and non-negative".into(),
            ));
        }
        if !transaction.fee.is_finite() {
            return Err(CoreError::ValidationError(
                "Transaction fee must be finite".into(),
            ));
        }
        Ok(())
    }

    fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), CoreError> {
        if from > to {
            return Err(CoreError::ValidationError(format!(
                "'from' date ({from}) must not be after 'to' date ({to})"
            )));
        }
        let range_days = (to - from).num_days();
        if range_days > MAX_QUERY_RANGE_DAYS {
            return Err(CoreError::ValidationError(format!(
                "Query range of {range_days} days exceeds maximum of {MAX_QUERY_RANGE_DAYS} days (10 years)"
            )));
        }
        Ok(())
    }
}
