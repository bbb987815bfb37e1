// Handlers for incident reporting endpoints

use axum::{Json, extract::State, http::StatusCode};

use crate::AppState;
use crate::error::{ApiResult, api_error};
use crate::incidents::{IncidentCatalog, catalog};
use crate::models::{Incident, NewIncident};

/// GET /api/incidents - Reported incidents, newest first
pub async fn list_incidents(State(state): State<AppState>) -> ApiResult<Json<Vec<Incident>>> {
    state.incidents.list().map(Json).map_err(api_error)
}

/// POST /api/incidents - File a new report
pub async fn report_incident(
    State(state): State<AppState>,
    Json(report): Json<NewIncident>,
) -> ApiResult<(StatusCode, Json<Incident>)> {
    state
        .incidents
        .report(report)
        .map(|incident| (StatusCode::CREATED, Json(incident)))
        .map_err(api_error)
}

/// GET /api/incident-types - Incident types and severities with display metadata
pub async fn incident_catalog() -> Json<IncidentCatalog> {
    Json(catalog())
}
