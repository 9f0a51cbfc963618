pub mod benchmark_service;
pub mod fx_service;
pub mod market_data_service;
pub mod portfolio_service;
pub mod position_service;
pub mod tranche_service;
pub mod valuation_service;
