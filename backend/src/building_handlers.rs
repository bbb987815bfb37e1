// Handlers for the campus building directory endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::AppState;
use crate::buildings::BuildingDirectory;
use crate::error::{ApiResult, NavError, api_error};
use crate::geo::MAIN_GATE;
use crate::models::{Building, BuildingCategory, Coordinate, Route, RouteOptions};
use crate::routing::safest_of;

const DEFAULT_NEARBY_RADIUS_M: f64 = 500.0;

#[derive(Debug, Deserialize)]
pub struct BuildingSearchQuery {
    #[serde(default)]
    pub q: String,
    pub category: Option<BuildingCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingRouteQuery {
    pub from_lat: Option<f64>,
    pub from_lng: Option<f64>,
}

fn owned(buildings: Vec<&Building>) -> Json<Vec<Building>> {
    Json(buildings.into_iter().cloned().collect())
}

/// GET /api/buildings - Search by name, description or facility
pub async fn search_buildings(Query(query): Query<BuildingSearchQuery>) -> Json<Vec<Building>> {
    owned(BuildingDirectory::campus().search(&query.q, query.category))
}

/// GET /api/buildings/popular - Best-rated buildings
pub async fn popular_buildings() -> Json<Vec<Building>> {
    owned(BuildingDirectory::campus().popular())
}

/// GET /api/buildings/nearby - Buildings within a radius of a point
pub async fn nearby_buildings(Query(query): Query<NearbyQuery>) -> ApiResult<Json<Vec<Building>>> {
    let location = Coordinate::new(query.lat, query.lng)
        .validate()
        .map_err(|err| api_error(err.into()))?;
    let radius_m = query
        .radius_m
        .filter(|radius| radius.is_finite() && *radius > 0.0)
        .unwrap_or(DEFAULT_NEARBY_RADIUS_M);
    Ok(owned(BuildingDirectory::campus().nearby(location, radius_m)))
}

/// GET /api/buildings/:id/route - Safest route to a building
///
/// Starts at the main gate unless both `fromLat` and `fromLng` are given.
pub async fn route_to_building(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<BuildingRouteQuery>,
) -> ApiResult<Json<Route>> {
    safest_route_to(&state, &id, query)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn safest_route_to(
    state: &AppState,
    id: &str,
    query: BuildingRouteQuery,
) -> Result<Route, NavError> {
    let building = BuildingDirectory::campus()
        .by_id(id)
        .ok_or_else(|| NavError::UnknownBuilding(id.to_string()))?;
    let from = match (query.from_lat, query.from_lng) {
        (Some(lat), Some(lng)) => Coordinate::new(lat, lng).validate()?,
        (None, None) => MAIN_GATE,
        _ => return Err(NavError::PartialOrigin),
    };

    let (routes, _) = state
        .route_bundle(from, building.coordinates, &RouteOptions::default())
        .await?;
    tracing::debug!("routing to {} from ({}, {})", building.name, from.lat, from.lng);
    safest_of(&routes)
        .cloned()
        .ok_or(NavError::NoRouteCandidates)
}
