use axum::{Json, http::StatusCode};
use thiserror::Error;

use crate::models::{ApiError, InvalidCoordinate};

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Error)]
pub enum NavError {
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinate),
    #[error("hour must be between 0 and 23, got {0}")]
    InvalidHour(u8),
    #[error("fromLat and fromLng must be given together")]
    PartialOrigin,
    #[error("incident description must not be empty")]
    EmptyDescription,
    #[error("building {0} not found")]
    UnknownBuilding(String),
    #[error("alert {0} not found")]
    UnknownAlert(String),
    #[error("no pathway connects the requested points")]
    NoPathwayRoute,
    #[error("route calculation produced no candidates")]
    NoRouteCandidates,
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("shared state lock poisoned")]
    StatePoisoned,
}

impl NavError {
    pub fn status(&self) -> StatusCode {
        match self {
            NavError::InvalidCoordinate(_)
            | NavError::InvalidHour(_)
            | NavError::PartialOrigin
            | NavError::EmptyDescription => StatusCode::BAD_REQUEST,
            NavError::UnknownBuilding(_) | NavError::UnknownAlert(_) | NavError::NoPathwayRoute => {
                StatusCode::NOT_FOUND
            }
            NavError::NoRouteCandidates | NavError::Gpx(_) | NavError::StatePoisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub fn api_error(err: NavError) -> (StatusCode, Json<ApiError>) {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!("request failed: {err}");
    } else {
        tracing::debug!("request rejected: {err}");
    }
    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    #[test]
    fn client_errors_map_to_4xx() {
        let invalid = NavError::from(InvalidCoordinate(Coordinate::new(91.0, 0.0)));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(NavError::InvalidHour(24).status(), StatusCode::BAD_REQUEST);
        assert_eq!(NavError::PartialOrigin.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            NavError::UnknownBuilding("nowhere".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn api_error_carries_message() {
        let (status, Json(body)) = api_error(NavError::UnknownAlert("sos-1".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "alert sos-1 not found");
    }
}
