pub mod health;
pub mod tools;

use axum::Router;

pub fn router() -> Router {
    Router::new()
        .merge(health::router())
        .merge(tools::router())
}
