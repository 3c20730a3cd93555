pub mod currency;
pub mod events;
pub mod inventory;
pub mod my_cart;
pub mod offer;
pub mod price_rule;
pub mod product;
pub mod purchase;
pub mod transaction;
pub mod user;
