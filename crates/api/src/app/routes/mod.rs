use axum::Router;

pub mod accounts;
pub mod system;
pub mod transactions;

/// Router for all `/api/v1` endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/accounts", accounts::router())
        .nest("/transactions", transactions::router())
}
