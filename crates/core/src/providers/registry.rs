use std::collections::HashMap;

use super::frankfurter::FrankfurterProvider;
use super::traits::{FxRateProvider, QuoteProvider};
use super::twelvedata::TwelveDataProvider;
use super::yahoo_finance::YahooFinanceProvider;

/// Registry of all configured market-data providers.
///
/// Quote and FX providers are kept in registration order, which is the
/// fallback order: if the primary fails (outage, rate limit), the next one
/// is tried. New providers can be added without modifying existing code.
pub struct ProviderRegistry {
    quote_providers: Vec<Box<dyn QuoteProvider>>,
    fx_providers: Vec<Box<dyn FxRateProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            quote_providers: Vec::new(),
            fx_providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance — stocks and indices, no API key needed (primary)
        if let Ok(yahoo) = YahooFinanceProvider::new() {
            registry.register_quote_provider(Box::new(yahoo));
        }

        // Twelve Data — stocks, requires API key (fallback)
        if let Some(key) = api_keys.get("twelvedata") {
            registry.register_quote_provider(Box::new(TwelveDataProvider::new(key.clone())));
        }

        // Frankfurter — ECB exchange rates, no API key needed
        registry.register_fx_provider(Box::new(FrankfurterProvider::new()));

        registry
    }

    /// Register a quote provider at the end of the fallback chain.
    pub fn register_quote_provider(&mut self, provider: Box<dyn QuoteProvider>) {
        self.quote_providers.push(provider);
    }

    /// Register an FX provider at the end of the fallback chain.
    pub fn register_fx_provider(&mut self, provider: Box<dyn FxRateProvider>) {
        self.fx_providers.push(provider);
    }

    /// All quote providers, in fallback order.
    #[must_use]
    pub fn quote_providers(&self) -> Vec<&dyn QuoteProvider> {
        self.quote_providers.iter().map(|p| p.as_ref()).collect()
    }

    /// All FX providers, in fallback order.
    #[must_use]
    pub fn fx_providers(&self) -> Vec<&dyn FxRateProvider> {
        self.fx_providers.iter().map(|p| p.as_ref()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
