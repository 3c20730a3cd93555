pub mod currency;
pub mod events;
pub mod inventory;
pub mod my_cart;
pub mod offers;
pub mod price_rules;
pub mod products;
pub mod purchases;
pub mod transactions;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(currency::routes())
        .merge(events::routes())
        .merge(inventory::routes())
        .merge(my_cart::routes())
        .merge(offers::routes())
        .merge(price_rules::routes())
        .merge(products::routes())
        .merge(purchases::routes())
        .merge(transactions::routes())
        .merge(users::routes())
}
