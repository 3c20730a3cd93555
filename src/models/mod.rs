pub mod currency_rate;
pub mod inventory;
pub mod offer;
pub mod product;
pub mod transaction;
