use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/sync/run", post(handlers::sync_run))
        .route("/sync/run/:artist_name", post(handlers::sync_run_artist))
        .route("/sync/results", get(handlers::get_results))
        .route("/sync/results/:id", get(handlers::get_results_by_id))
        .route("/sync/crawled", get(handlers::get_crawled))
        .route("/health/", get(handlers::health))
        .with_state(state)
}
