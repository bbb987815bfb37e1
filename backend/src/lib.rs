pub mod building_handlers;
pub mod buildings;
pub mod cache;
pub mod config;
pub mod emergency;
pub mod emergency_handlers;
pub mod error;
pub mod geo;
pub mod gpx_export;
pub mod heatmap;
pub mod incident_handlers;
pub mod incidents;
pub mod models;
pub mod pathways;
pub mod routing;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post, put},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::cache::RouteCache;
use crate::config::Config;
use crate::emergency::EmergencyService;
use crate::error::{ApiResult, NavError, api_error};
use crate::gpx_export::encode_route_as_gpx;
use crate::heatmap::{SafetyZoneAggregator, location_safety_score};
use crate::incidents::IncidentStore;
use crate::models::{
    Coordinate, HeatmapResponse, LocationSafety, MultiRouteRequest, MultiRouteResponse,
    PathwayRequest, PathwayRoute, Route, RouteOptions, RouteRequest, RouteResponse, RouteType,
};
use crate::pathways::{PathFinder, PathwayNetwork};
use crate::routing::{RouteCalculator, local_hour};

#[derive(Clone)]
pub struct AppState {
    pub calculator: Arc<Mutex<RouteCalculator>>,
    pub route_cache: Arc<RouteCache>,
    pub incidents: Arc<IncidentStore>,
    pub emergency: Arc<EmergencyService>,
    pub pathways: Arc<dyn PathFinder>,
    pub heatmap: Arc<SafetyZoneAggregator>,
    pub include_sample_incidents: bool,
    pub simulated_latency: Duration,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let calculator = match config.route_seed {
            Some(seed) => RouteCalculator::seeded(seed),
            None => RouteCalculator::from_entropy(),
        };
        Self {
            calculator: Arc::new(Mutex::new(calculator)),
            route_cache: Arc::new(RouteCache::new(
                config.route_cache_capacity,
                config.route_cache_ttl,
            )),
            incidents: Arc::new(IncidentStore::new()),
            emergency: Arc::new(EmergencyService::new(config.sos_response_delay)),
            pathways: Arc::new(PathwayNetwork::campus()),
            heatmap: Arc::new(SafetyZoneAggregator::default()),
            include_sample_incidents: config.include_sample_incidents,
            simulated_latency: config.simulated_latency,
        }
    }

    fn with_calculator<T>(
        &self,
        f: impl FnOnce(&mut RouteCalculator) -> T,
    ) -> Result<T, NavError> {
        let mut calculator = self.calculator.lock().map_err(|_| NavError::StatePoisoned)?;
        Ok(f(&mut calculator))
    }

    async fn simulate_latency(&self) {
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }
    }

    /// The three standard variants for a leg, from the cache when fresh.
    /// The flag reports whether the cache answered.
    pub(crate) async fn route_bundle(
        &self,
        from: Coordinate,
        to: Coordinate,
        options: &RouteOptions,
    ) -> Result<(Vec<Route>, bool), NavError> {
        if let Some(routes) = self.route_cache.get(from, to) {
            return Ok((routes, true));
        }
        self.simulate_latency().await;
        let routes = self.with_calculator(|calc| calc.calculate_multiple_routes(from, to, options))?;
        self.route_cache.insert(from, to, routes.clone());
        Ok((routes, false))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/routes", post(route_handler))
        .route("/api/routes/multiple", post(multiple_routes_handler))
        .route("/api/buildings", get(building_handlers::search_buildings))
        .route(
            "/api/buildings/popular",
            get(building_handlers::popular_buildings),
        )
        .route(
            "/api/buildings/nearby",
            get(building_handlers::nearby_buildings),
        )
        .route(
            "/api/buildings/:id/route",
            get(building_handlers::route_to_building),
        )
        .route(
            "/api/incidents",
            get(incident_handlers::list_incidents).post(incident_handlers::report_incident),
        )
        .route(
            "/api/incident-types",
            get(incident_handlers::incident_catalog),
        )
        .route("/api/heatmap", get(heatmap_handler))
        .route("/api/safety", get(location_safety_handler))
        .route("/api/pathways/route", post(pathway_handler))
        .route(
            "/api/emergency/contacts",
            get(emergency_handlers::list_contacts),
        )
        .route(
            "/api/emergency/alerts",
            get(emergency_handlers::active_alerts),
        )
        .route("/api/emergency/sos", post(emergency_handlers::trigger_sos))
        .route(
            "/api/emergency/alerts/:id",
            put(emergency_handlers::update_alert),
        )
        .route(
            "/api/emergency/share",
            post(emergency_handlers::share_location),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn resolve_route_type(requested: Option<&str>) -> RouteType {
    match requested {
        None => RouteType::default(),
        Some(name) => RouteType::parse(name).unwrap_or_else(|| {
            tracing::warn!("unknown route type {name:?}, using shortest");
            RouteType::parse_lenient(name)
        }),
    }
}

async fn route_handler(
    State(state): State<AppState>,
    Json(req): Json<RouteRequest>,
) -> ApiResult<Json<RouteResponse>> {
    plan_route(&state, req).await.map(Json).map_err(api_error)
}

fn check_hour(hour: u8) -> Result<u8, NavError> {
    if hour > 23 {
        return Err(NavError::InvalidHour(hour));
    }
    Ok(hour)
}

fn validate_options(options: &RouteOptions) -> Result<(), NavError> {
    options.time_of_day.map(check_hour).transpose()?;
    Ok(())
}

async fn plan_route(state: &AppState, req: RouteRequest) -> Result<RouteResponse, NavError> {
    let from = req.from.validate()?;
    let to = req.to.validate()?;
    validate_options(&req.options)?;
    let route_type = resolve_route_type(req.route_type.as_deref());

    state.simulate_latency().await;
    let route =
        state.with_calculator(|calc| calc.calculate_route(from, to, route_type, &req.options))?;
    let gpx_base64 = encode_route_as_gpx(&route)?;

    Ok(RouteResponse { route, gpx_base64 })
}

async fn multiple_routes_handler(
    State(state): State<AppState>,
    Json(req): Json<MultiRouteRequest>,
) -> ApiResult<Json<MultiRouteResponse>> {
    plan_route_bundle(&state, req)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn plan_route_bundle(
    state: &AppState,
    req: MultiRouteRequest,
) -> Result<MultiRouteResponse, NavError> {
    let from = req.from.validate()?;
    let to = req.to.validate()?;
    validate_options(&req.options)?;
    let (routes, from_cache) = state.route_bundle(from, to, &req.options).await?;
    Ok(MultiRouteResponse { routes, from_cache })
}

async fn heatmap_handler(State(state): State<AppState>) -> ApiResult<Json<HeatmapResponse>> {
    let incidents = state
        .incidents
        .heatmap_input(state.include_sample_incidents)
        .map_err(api_error)?;
    let zones = state.heatmap.generate_safety_zones(&incidents);
    Ok(Json(HeatmapResponse {
        zones,
        incident_count: incidents.len(),
    }))
}

#[derive(Debug, Deserialize)]
struct SafetyQuery {
    lat: f64,
    lng: f64,
    hour: Option<u8>,
}

async fn location_safety_handler(
    State(state): State<AppState>,
    Query(query): Query<SafetyQuery>,
) -> ApiResult<Json<LocationSafety>> {
    assess_location(&state, query).map(Json).map_err(api_error)
}

fn assess_location(state: &AppState, query: SafetyQuery) -> Result<LocationSafety, NavError> {
    let location = Coordinate::new(query.lat, query.lng).validate()?;
    let hour = match query.hour {
        Some(hour) => check_hour(hour)?,
        None => local_hour(),
    };
    let incidents = state.incidents.heatmap_input(state.include_sample_incidents)?;
    Ok(LocationSafety {
        location,
        hour,
        within_campus: geo::is_within_campus(location),
        safety_score: location_safety_score(location, hour, &incidents),
    })
}

async fn pathway_handler(
    State(state): State<AppState>,
    Json(req): Json<PathwayRequest>,
) -> ApiResult<Json<PathwayRoute>> {
    find_pathway(state.pathways.as_ref(), &req)
        .map(Json)
        .map_err(api_error)
}

fn find_pathway(pathways: &dyn PathFinder, req: &PathwayRequest) -> Result<PathwayRoute, NavError> {
    req.from.validate()?;
    req.to.validate()?;
    pathways.find_path(req).ok_or(NavError::NoPathwayRoute)
}
