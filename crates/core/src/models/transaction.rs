use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a transaction, derived from the sign of its quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Buy => write!(f, "Buy"),
            TransactionKind::Sell => write!(f, "Sell"),
        }
    }
}

/// Sort order for transaction listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSortOrder {
    /// Newest execution first (default for display)
    DateDesc,
    /// Oldest execution first
    DateAsc,
    /// Largest absolute quantity first
    QuantityDesc,
    /// Alphabetical by ISIN
    IsinAsc,
}

/// One buy or sell of an instrument, as normalized by the import layer.
///
/// Transactions are created once at import time and are immutable — they are
/// never mutated, only superseded by re-import. The ledger keeps them sorted
/// by execution timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier. Buy transactions double as tranche identifiers.
    pub id: Uuid,

    /// ISIN of the transacted instrument
    pub isin: String,

    /// Execution timestamp (broker exports carry date and time)
    pub executed_at: NaiveDateTime,

    /// Signed quantity: positive = buy, negative = sell. Zero is invalid.
    pub quantity: f64,

    /// Price per unit, in the instrument's trading currency
    pub price: f64,

    /// Broker fee charged on execution. Folded into the cost basis at face
    /// value alongside the native price.
    #[serde(default)]
    pub fee: f64,

    /// Total transaction value in the reporting currency, as recorded by the
    /// broker at execution time.
    #[serde(default)]
    pub value_reporting: f64,

    /// FX rate the broker applied at execution, quoted in broker convention:
    /// instrument-currency units per reporting-currency unit. `None` for
    /// transactions in the reporting currency itself.
    #[serde(default)]
    pub broker_fx_rate: Option<f64>,
}

impl Transaction {
    pub fn new(
        isin: impl Into<String>,
        executed_at: NaiveDateTime,
        quantity: f64,
        price: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            isin: isin.into().to_uppercase(),
            executed_at,
            quantity,
            price,
            fee: 0.0,
            value_reporting: 0.0,
            broker_fx_rate: None,
        }
    }

    /// Attach the broker fee (builder style).
    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = fee;
        self
    }

    /// Attach the broker-recorded total value in the reporting currency.
    pub fn with_value_reporting(mut self, value: f64) -> Self {
        self.value_reporting = value;
        self
    }

    /// Attach the broker execution FX rate (instrument units per reporting unit).
    pub fn with_broker_fx_rate(mut self, rate: f64) -> Self {
        self.broker_fx_rate = Some(rate);
        self
    }

    /// Buy or Sell, from the sign of the quantity.
    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        if self.quantity >= 0.0 {
            TransactionKind::Buy
        } else {
            TransactionKind::Sell
        }
    }

    /// Calendar date the transaction takes effect on.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.executed_at.date()
    }

    /// Unsigned quantity, for display.
    #[must_use]
    pub fn unsigned_quantity(&self) -> f64 {
        self.quantity.abs()
    }

    /// Two records describe the same broker transaction if instrument,
    /// timestamp, quantity and price all match. Used for re-import dedup.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &Transaction) -> bool {
        self.isin == other.isin
            && self.executed_at == other.executed_at
            && self.quantity == other.quantity
            && self.price == other.price
    }
}
