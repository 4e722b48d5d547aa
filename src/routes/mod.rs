pub mod admin;
pub mod auth;
pub mod checkout;
pub mod coupons;
pub mod offers;
pub mod profiles;
pub mod prompts;
pub mod settings;
pub mod tools;
pub mod transactions;
pub mod uploads;
pub mod users;

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{request, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::state::AppState;

/// Origins from the allow-list, plus the root domain and its subdomains.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let config = config.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &request::Parts| {
                origin.to_str().is_ok_and(|o| config.allows(o))
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

async fn health() -> &'static str {
    "ok"
}

/// The complete HTTP application.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);
    let max_upload = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(users::router())
        .merge(admin::router())
        .merge(profiles::router())
        .merge(tools::router())
        .merge(prompts::router())
        .merge(offers::router())
        .merge(settings::router())
        .merge(coupons::router())
        .merge(checkout::router())
        .merge(transactions::router())
        .merge(uploads::router(max_upload))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
