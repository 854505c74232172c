use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use handlers::WebError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/feeds", get(handlers::list_sites))
        .route("/feeds/:site", get(handlers::get_feed))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use sf_core::{Error, Result};
}
