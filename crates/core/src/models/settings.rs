use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A benchmark index the dashboard compares returns against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkIndex {
    /// Quote symbol (e.g., "^GSPC")
    pub symbol: String,
    /// Display name (e.g., "S&P 500")
    pub name: String,
}

impl BenchmarkIndex {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// User-configurable settings, stored inside the encrypted ledger file.
///
/// Configuration is an explicit value passed around with the ledger — the
/// computations themselves read nothing ambient or global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// The single currency all positions are converted into for aggregation
    /// and display (e.g., "EUR").
    pub reporting_currency: String,

    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "twelvedata"). Values: the key string.
    pub api_keys: HashMap<String, String>,

    /// How far back the initial historical price backfill reaches, in days.
    #[serde(default = "default_history_window_days")]
    pub history_window_days: u32,

    /// Window re-fetched on an incremental refresh, in days. Wide enough to
    /// cover weekends and provider publishing lag.
    #[serde(default = "default_refresh_window_days")]
    pub refresh_window_days: u32,

    /// Benchmark indices tracked for comparison charts.
    #[serde(default = "default_benchmarks")]
    pub benchmarks: Vec<BenchmarkIndex>,
}

fn default_history_window_days() -> u32 {
    1825 // 5 years
}

fn default_refresh_window_days() -> u32 {
    7
}

fn default_benchmarks() -> Vec<BenchmarkIndex> {
    vec![
        BenchmarkIndex::new("^GSPC", "S&P 500"),
        BenchmarkIndex::new("^STOXX50E", "Euro Stoxx 50"),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reporting_currency: "EUR".to_string(),
            api_keys: HashMap::new(),
            history_window_days: default_history_window_days(),
            refresh_window_days: default_refresh_window_days(),
            benchmarks: default_benchmarks(),
        }
    }
}
