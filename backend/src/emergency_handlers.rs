// Handlers for SOS alerts and emergency contacts

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::AppState;
use crate::emergency::{emergency_contacts, location_share_message};
use crate::error::{ApiResult, api_error};
use crate::models::{
    AlertStatusUpdate, EmergencyAlert, EmergencyContact, ShareLocationRequest,
    ShareLocationResponse, SosRequest, SosResponse,
};

/// GET /api/emergency/contacts
pub async fn list_contacts() -> Json<Vec<EmergencyContact>> {
    Json(emergency_contacts())
}

/// GET /api/emergency/alerts - Alerts still awaiting a response
pub async fn active_alerts(State(state): State<AppState>) -> ApiResult<Json<Vec<EmergencyAlert>>> {
    state.emergency.active_alerts().map(Json).map_err(api_error)
}

/// POST /api/emergency/sos - Raise an SOS alert
pub async fn trigger_sos(
    State(state): State<AppState>,
    Json(req): Json<SosRequest>,
) -> ApiResult<(StatusCode, Json<SosResponse>)> {
    state
        .emergency
        .trigger_sos(req.location, req.description)
        .map(|alert_id| (StatusCode::CREATED, Json(SosResponse { alert_id })))
        .map_err(api_error)
}

/// PUT /api/emergency/alerts/:id - Change an alert's status
pub async fn update_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<AlertStatusUpdate>,
) -> ApiResult<Json<EmergencyAlert>> {
    state
        .emergency
        .update_alert_status(&id, update.status)
        .map(Json)
        .map_err(api_error)
}

/// POST /api/emergency/share - Message with a maps link for the location
pub async fn share_location(
    Json(req): Json<ShareLocationRequest>,
) -> ApiResult<Json<ShareLocationResponse>> {
    let location = req.location.validate().map_err(|err| api_error(err.into()))?;
    tracing::info!("sharing location ({}, {})", location.lat, location.lng);
    Ok(Json(ShareLocationResponse {
        message: location_share_message(location),
    }))
}
