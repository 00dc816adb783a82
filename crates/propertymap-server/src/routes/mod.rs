use axum::routing::get;
use axum::Router;

pub mod geocode;
pub mod health;
pub mod properties;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::get_health))
        .nest(
            "/api",
            Router::new()
                .merge(properties::router())
                .merge(geocode::router()),
        )
}
