pub mod analytics;
pub mod fx;
pub mod instrument;
pub mod ledger;
pub mod position;
pub mod price;
pub mod settings;
pub mod transaction;
