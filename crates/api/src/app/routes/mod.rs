use axum::Router;

pub mod issues;
pub mod returns;
pub mod stock_levels;
pub mod system;

/// Router for all actor-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/issues", issues::router())
        .nest("/returns", returns::router())
        .nest("/stock-levels", stock_levels::router())
}
