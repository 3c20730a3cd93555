pub mod currency;
pub mod inventory;
pub mod my_cart;
pub mod offer;
pub mod product;
pub mod purchase;
pub mod transaction;
pub mod user;
