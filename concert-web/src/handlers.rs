use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use concert_scraper::{batch, ArtistSyncOutcome};
use tracing::error;

use crate::models::{ArtistNameQuery, ErrorResponse, ForceQuery, HealthResponse};
use crate::state::AppState;

pub async fn sync_run(State(state): State<AppState>, Query(q): Query<ForceQuery>) -> impl IntoResponse {
    match batch::sync_all(state.repo.as_ref(), &state.crawlers, state.llm.as_deref(), &state.lock, q.force).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!(error = %e, "sync_run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

pub async fn sync_run_artist(
    State(state): State<AppState>,
    Path(artist_name): Path<String>,
    Query(q): Query<ForceQuery>,
) -> impl IntoResponse {
    let result = batch::sync_by_artist_name(
        state.repo.as_ref(),
        &state.crawlers,
        state.llm.as_deref(),
        &state.lock,
        &artist_name,
        q.force,
    )
    .await;

    match result {
        Ok(ArtistSyncOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse { error: format!("artist not found: {artist_name}") }),
        )
            .into_response(),
        Ok(ArtistSyncOutcome::Synced { concerts_found, skipped }) => Json(concert_core::ArtistSyncResponse {
            artist_name,
            concerts_found,
            skipped,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, artist_name, "sync_run_artist failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

pub async fn get_results(State(state): State<AppState>, Query(q): Query<ArtistNameQuery>) -> impl IntoResponse {
    match state.repo.get_results(q.artist_name.as_deref()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response(),
    }
}

pub async fn get_results_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.repo.get_results_by_keyword_id(id).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response(),
    }
}

pub async fn get_crawled(State(state): State<AppState>, Query(q): Query<ArtistNameQuery>) -> impl IntoResponse {
    match state.repo.get_crawled_data(q.artist_name.as_deref()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
