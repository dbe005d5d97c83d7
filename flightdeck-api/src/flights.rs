use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use flightdeck_core::{Flight, NavFix, Page, Pilot, SearchParams};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::pilot_auth_middleware;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/flights", get(search_flights))
        .route("/api/flights/search", get(search_flights))
        .route("/api/flights/{id}", get(get_flight))
        .route("/api/flights/{id}/briefing", get(get_briefing))
        .route("/api/flights/{id}/route", get(get_route))
        .route_layer(axum::middleware::from_fn_with_state(state, pilot_auth_middleware))
}

/// GET /api/flights/search
async fn search_flights(
    State(state): State<AppState>,
    Extension(pilot): Extension<Pilot>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<Flight>>, AppError> {
    let policy = state.flights.load_policy().await?;
    let page = state.flights.search(&policy, &pilot, &params).await?;
    Ok(Json(page))
}

/// GET /api/flights/{id}
async fn get_flight(
    State(state): State<AppState>,
    Extension(pilot): Extension<Pilot>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Flight>>, AppError> {
    let flight = state.flights.get_by_id(&id, &pilot).await?;
    Ok(Json(DataResponse { data: flight }))
}

/// GET /api/flights/{id}/briefing
///
/// Returns the stored flight plan document as-is.
async fn get_briefing(
    State(state): State<AppState>,
    Extension(pilot): Extension<Pilot>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let briefing = state.flights.get_briefing(&id, &pilot).await?;
    Ok(([(header::CONTENT_TYPE, briefing.content_type)], briefing.body).into_response())
}

/// GET /api/flights/{id}/route
async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Vec<NavFix>>>, AppError> {
    let fixes = state.flights.get_route(&id).await?;
    Ok(Json(DataResponse { data: fixes }))
}
