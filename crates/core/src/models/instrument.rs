use serde::{Deserialize, Serialize};

/// A tradable security tracked by the ledger.
///
/// **Equality and hashing** are based solely on `isin` — the ISIN is the
/// stable identity under which transactions and price series are filed.
/// Symbol and name are display attributes and may differ between broker
/// exports for the same security.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// International Securities Identification Number, uppercased (e.g., "US0378331005")
    pub isin: String,

    /// Display ticker symbol (e.g., "AAPL", "ASML")
    pub symbol: String,

    /// Human-readable name (e.g., "Apple Inc.")
    pub name: String,

    /// Currency the instrument trades in (e.g., "USD", "EUR", "SEK")
    pub currency: String,

    /// Exchange the transactions were executed on (e.g., "NSY", "XET")
    pub exchange: String,

    /// Quote ticker resolved by the import layer (e.g., "ASML.AS" for Yahoo).
    /// `None` until resolution has happened; market-data refresh requires it.
    #[serde(default)]
    pub quote_ticker: Option<String>,
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        self.isin == other.isin
    }
}

impl Eq for Instrument {}

impl std::hash::Hash for Instrument {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.isin.hash(state);
    }
}

impl Instrument {
    pub fn new(
        isin: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        currency: impl Into<String>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            isin: isin.into().to_uppercase(),
            symbol: symbol.into().to_uppercase(),
            name: name.into(),
            currency: currency.into().to_uppercase(),
            exchange: exchange.into(),
            quote_ticker: None,
        }
    }

    /// Attach a resolved quote ticker (builder style).
    pub fn with_quote_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.quote_ticker = Some(ticker.into());
        self
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.symbol, self.isin)
    }
}
